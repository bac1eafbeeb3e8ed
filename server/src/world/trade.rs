//! Two-sided item trades.
//!
//! A trade is open while both characters name each other as partner. Any
//! change to an offer withdraws both agreements; once both sides agree the
//! items change hands in one step or the trade is cancelled.

use log::{debug, info, warn};
use realm_shared::{InventoryEntry, PlayerId, ServerMessage};

use crate::entities::{Character, TradeLink};
use crate::network::Transport;

use super::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradePhase {
    /// Open, waiting for both agreements
    Proposed,
    /// Both agreed, about to commit
    BothAgreed,
    /// Items exchanged, trade closed
    Committed,
    /// Trade closed without exchange
    Cancelled,
}

impl World {
    /// Phase of `who`'s open trade
    pub fn trade_phase(&self, who: PlayerId) -> Option<TradePhase> {
        let character = self.characters.get(&who)?;
        let partner = self.characters.get(&character.trade_partner()?)?;

        if character.trade_agreed() && partner.trade_agreed() {
            Some(TradePhase::BothAgreed)
        } else {
            Some(TradePhase::Proposed)
        }
    }

    /// Ask `to` to trade. Both must be free and on the same map.
    pub fn trade_request(&mut self, from: PlayerId, to: PlayerId) -> bool {
        if from == to {
            return false;
        }
        let (Some(sender), Some(target)) = (self.characters.get(&from), self.characters.get(&to)) else {
            return false;
        };
        if sender.is_trading() || target.is_trading() || sender.map != target.map || target.nowhere {
            debug!("Trade request from {} to {} refused", from, to);
            return false;
        }

        let name = sender.name.clone();
        if let Some(target) = self.characters.get_mut(&to) {
            target.trade_request_from = Some(from);
        }
        self.outbox.send(to, ServerMessage::TradeRequest { requester_id: from, name });
        true
    }

    /// Open the trade `requester` asked for
    pub fn trade_accept(&mut self, acceptor: PlayerId, requester: PlayerId) -> bool {
        match self.characters.get(&acceptor) {
            Some(c) if c.trade_request_from == Some(requester) && !c.is_trading() => {}
            _ => return false,
        }
        let (requester_name, acceptor_name) = match self.characters.get(&requester) {
            Some(r) if !r.is_trading() => (r.name.clone(), self.characters[&acceptor].name.clone()),
            _ => return false,
        };

        for (who, partner) in [(acceptor, requester), (requester, acceptor)] {
            if let Some(c) = self.characters.get_mut(&who) {
                c.trade_request_from = None;
                c.trade_inventory.clear();
                c.trade = Some(TradeLink { partner, agreed: false });
            }
        }

        self.outbox.send(acceptor, ServerMessage::TradeOpen { partner_id: requester, partner_name: requester_name });
        self.outbox.send(requester, ServerMessage::TradeOpen { partner_id: acceptor, partner_name: acceptor_name });
        info!("Trade opened between {} and {}", requester, acceptor);
        true
    }

    pub fn trade_add(&mut self, who: PlayerId, item: i16, amount: i32) -> bool {
        let Some(partner) = self.characters.get(&who).and_then(|c| c.trade_partner()) else {
            return false;
        };
        let Some(character) = self.characters.get_mut(&who) else {
            return false;
        };
        if !character.add_trade_item(&self.ctx, item, amount) {
            return false;
        }

        self.offers_changed(who, partner);
        true
    }

    pub fn trade_remove(&mut self, who: PlayerId, item: i16) -> bool {
        let Some(partner) = self.characters.get(&who).and_then(|c| c.trade_partner()) else {
            return false;
        };
        let Some(character) = self.characters.get_mut(&who) else {
            return false;
        };
        if !character.del_trade_item(item) {
            return false;
        }

        self.offers_changed(who, partner);
        true
    }

    /// Withdraw both agreements and show both sides the new offers
    fn offers_changed(&mut self, who: PlayerId, partner: PlayerId) {
        for id in [who, partner] {
            if let Some(link) = self.characters.get_mut(&id).and_then(|c| c.trade.as_mut()) {
                link.agreed = false;
            }
        }

        let msg = ServerMessage::TradeReply {
            first_id: who,
            first: self.offer_of(who),
            second_id: partner,
            second: self.offer_of(partner),
        };
        self.outbox.send(who, msg.clone());
        self.outbox.send(partner, msg);
    }

    fn offer_of(&self, who: PlayerId) -> Vec<InventoryEntry> {
        self.characters
            .get(&who)
            .map(|c| c.trade_inventory.clone())
            .unwrap_or_default()
    }

    /// Set `who`'s agreement. When both sides agree the trade commits.
    pub fn trade_agree(&mut self, who: PlayerId, agree: bool) -> Option<TradePhase> {
        let partner = self.characters.get(&who)?.trade_partner()?;

        // agreeing to an empty exchange is meaningless
        if agree && self.offer_of(who).is_empty() && self.offer_of(partner).is_empty() {
            return self.trade_phase(who);
        }

        if let Some(link) = self.characters.get_mut(&who).and_then(|c| c.trade.as_mut()) {
            link.agreed = agree;
        }
        self.outbox.send(who, ServerMessage::TradeAgree { id: who, agree });
        self.outbox.send(partner, ServerMessage::TradeAgree { id: who, agree });

        match self.trade_phase(who) {
            Some(TradePhase::BothAgreed) => Some(self.commit_trade(who, partner)),
            phase => phase,
        }
    }

    /// Move both offers across, or cancel if either side cannot take them
    fn commit_trade(&mut self, a: PlayerId, b: PlayerId) -> TradePhase {
        let offer_a = self.offer_of(a);
        let offer_b = self.offer_of(b);

        let (Some(char_a), Some(char_b)) = (self.characters.get(&a), self.characters.get(&b)) else {
            self.cancel_trade(a);
            return TradePhase::Cancelled;
        };

        let max_item = self.ctx.config.max_item();
        let still_held = |c: &Character, offer: &[InventoryEntry]| {
            offer.iter().all(|e| c.has_item(e.id, true) >= e.amount)
        };
        let fits = |c: &Character, offer: &[InventoryEntry]| {
            offer.iter().all(|e| {
                self.ctx.item(e.id).is_some() && c.can_hold_item(&self.ctx, e.id, max_item) >= e.amount
            })
        };

        if !still_held(char_a, &offer_a)
            || !still_held(char_b, &offer_b)
            || !fits(char_a, &offer_b)
            || !fits(char_b, &offer_a)
        {
            debug!("Trade between {} and {} cannot complete", a, b);
            self.cancel_trade(a);
            return TradePhase::Cancelled;
        }

        for (who, gives, gets) in [(a, &offer_a, &offer_b), (b, &offer_b, &offer_a)] {
            if let Some(c) = self.characters.get_mut(&who) {
                c.clear_trade();
                for entry in gives {
                    if !c.del_item(&self.ctx, entry.id, entry.amount) {
                        warn!("{} lost {} of item {} before the trade moved it", c.name, entry.amount, entry.id);
                    }
                }
                for entry in gets {
                    if !c.add_item(&self.ctx, entry.id, entry.amount) {
                        warn!("{} could not receive {} of item {}", c.name, entry.amount, entry.id);
                    }
                }
                c.calculate_stats(&self.ctx, true);
            }
        }

        let msg = ServerMessage::TradeUse { first_id: a, first: offer_a, second_id: b, second: offer_b };
        for who in [a, b] {
            self.outbox.send(who, msg.clone());
            if let Some(c) = self.characters.get(&who) {
                self.outbox.send(who, c.inventory_update());
            }
        }

        info!("Trade between {} and {} committed", a, b);
        TradePhase::Committed
    }

    /// Close `who`'s trade on both sides
    pub fn cancel_trade(&mut self, who: PlayerId) -> bool {
        let Some(partner) = self.characters.get(&who).and_then(|c| c.trade_partner()) else {
            return false;
        };

        for id in [who, partner] {
            if let Some(c) = self.characters.get_mut(&id) {
                c.clear_trade();
            }
        }
        self.outbox.send(who, ServerMessage::TradeClose { partner_id: partner });
        self.outbox.send(partner, ServerMessage::TradeClose { partner_id: who });

        debug!("Trade between {} and {} cancelled", who, partner);
        true
    }
}
