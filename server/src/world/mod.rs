//! Game world management.
//!
//! The world owns every character, the party registry and the NPCs spells
//! can target. Anything that touches more than one character goes through
//! here so both sides of a relation change in the same call.

mod party;
mod spell;
mod trade;

pub use party::{Characters, Party, PartyId, PartyRegistry, ShareMode};
pub use trade::TradePhase;

use std::collections::HashMap;

use log::{debug, info};
use realm_shared::{PartyRequestKind, PlayerId, ServerMessage};

use crate::config::GameContext;
use crate::entities::{Character, MapId, PartyRequest, ServerNpc};
use crate::network::{Outbox, Transport};
use crate::timestamp::Timestamp;

/// The game world containing all entities
pub struct World {
    pub ctx: GameContext,
    characters: Characters,
    parties: PartyRegistry,
    npcs: HashMap<u16, ServerNpc>,
    next_npc_index: u16,
    outbox: Outbox,
}

impl World {
    pub fn new(ctx: GameContext) -> Self {
        Self {
            ctx,
            characters: HashMap::new(),
            parties: PartyRegistry::default(),
            npcs: HashMap::new(),
            next_npc_index: 1,
            outbox: Outbox::default(),
        }
    }

    /// Spawn an NPC, returning its index
    pub fn spawn_npc(&mut self, map: MapId, max_hp: i16, experience_reward: i32) -> u16 {
        let index = self.next_npc_index;
        self.next_npc_index = self.next_npc_index.wrapping_add(1).max(1);

        self.npcs.insert(index, ServerNpc::new(index, map, max_hp, experience_reward));
        index
    }

    pub fn npc(&self, index: u16) -> Option<&ServerNpc> {
        self.npcs.get(&index)
    }

    pub fn get_character(&self, id: PlayerId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn get_character_mut(&mut self, id: PlayerId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    #[cfg(test)]
    pub fn party(&self, id: PartyId) -> Option<&Party> {
        self.parties.get(id)
    }

    pub fn party_count(&self) -> usize {
        self.parties.len()
    }

    /// Messages produced since the last drain, in send order
    pub fn drain_outbox(&mut self) -> Vec<(PlayerId, ServerMessage)> {
        self.outbox.drain()
    }

    /// Place a character in the world with fresh derived stats
    pub fn add_character(&mut self, mut character: Character, now: Timestamp) {
        character.calculate_stats(&self.ctx, true);
        character.timestamp = now;
        info!("{} entered the world as {}", character.name, character.player_id);
        self.characters.insert(character.player_id, character);
    }

    /// Logout path: cancel trade and spell, leave the party, forget pending
    /// requests that point at this character, then hand it back for saving.
    pub fn remove_character(&mut self, id: PlayerId) -> Option<Character> {
        if !self.characters.contains_key(&id) {
            return None;
        }

        self.cancel_trade(id);
        self.cancel_spell(id);
        if let Some(party) = self.characters.get(&id).and_then(|c| c.party) {
            self.parties.leave(party, &mut self.characters, &mut self.outbox, id);
        }

        for other in self.characters.values_mut() {
            if other.trade_request_from == Some(id) {
                other.trade_request_from = None;
            }
            if other.party_request.map(|r| r.from) == Some(id) {
                other.party_request = None;
            }
        }

        let character = self.characters.remove(&id)?;
        info!("{} left the world", character.name);
        Some(character)
    }

    /// Advance timers. Returns how many spells became ready.
    pub fn update(&mut self, now: Timestamp) -> usize {
        let mut fired = 0;
        for character in self.characters.values_mut() {
            if character.spell.fire_if_due(now) {
                fired += 1;
            }
        }
        if fired > 0 {
            debug!("{} spell timers fired", fired);
        }
        fired
    }

    /// Give `who` experience, shared with their party when in one
    pub fn award_exp(&mut self, who: PlayerId, exp: i32) {
        let Some(character) = self.characters.get_mut(&who) else {
            return;
        };

        match character.party.map(|id| (id, character.map)) {
            Some((party_id, map)) => {
                let mode = self.ctx.config.party_share_mode();
                if let Some(party) = self.parties.get_mut(party_id) {
                    party.share_exp(&self.ctx, &mut self.characters, &mut self.outbox, exp, mode, map);
                }
            }
            None => {
                character.gain_exp(&self.ctx, exp);
                self.outbox.send(who, character.stats_update());
            }
        }
    }

    /// Set hp (clamped to the maximum) and tell the party
    pub fn set_hp(&mut self, who: PlayerId, hp: i16) {
        let Some(character) = self.characters.get_mut(&who) else {
            return;
        };
        character.hp = hp.clamp(0, character.max_hp);
        let party = character.party;

        if let Some(party) = party.and_then(|id| self.parties.get(id)) {
            party.update_hp(&self.characters, &mut self.outbox, who);
        }
    }

    /// Move to another map. Moving away ends any trade or cast.
    pub fn set_map(&mut self, who: PlayerId, map: MapId) {
        self.cancel_trade(who);
        self.cancel_spell(who);
        if let Some(character) = self.characters.get_mut(&who) {
            character.map = map;
        }
    }

    // =========================================================================
    // Equipment
    // =========================================================================

    pub fn equip(&mut self, who: PlayerId, item: i16, subloc: u8) -> bool {
        let Some(character) = self.characters.get_mut(&who) else {
            return false;
        };
        if !character.equip(&self.ctx, item, subloc) {
            return false;
        }
        self.after_equipment_change(who);
        true
    }

    pub fn unequip(&mut self, who: PlayerId, item: i16, subloc: u8) -> bool {
        let Some(character) = self.characters.get_mut(&who) else {
            return false;
        };
        if !character.unequip(&self.ctx, item, subloc) {
            return false;
        }
        self.after_equipment_change(who);
        true
    }

    fn after_equipment_change(&mut self, who: PlayerId) {
        let Some(character) = self.characters.get(&who) else {
            return;
        };
        self.outbox.send(who, character.inventory_update());
        self.outbox.send(who, character.stats_update());

        // max hp may have moved
        if let Some(party) = character.party.and_then(|id| self.parties.get(id)) {
            party.update_hp(&self.characters, &mut self.outbox, who);
        }
    }

    // =========================================================================
    // Parties
    // =========================================================================

    /// Record an invitation on `to`. `Join` asks to join `to`'s party,
    /// `Invite` asks `to` into ours.
    pub fn party_request(&mut self, from: PlayerId, to: PlayerId, kind: PartyRequestKind) -> bool {
        if from == to {
            return false;
        }
        let (Some(sender), Some(target)) = (self.characters.get(&from), self.characters.get(&to)) else {
            return false;
        };

        let allowed = match kind {
            PartyRequestKind::Invite => target.party.is_none() && self.leads_or_solo(sender),
            PartyRequestKind::Join => sender.party.is_none() && self.leads_or_solo(target),
        };
        if !allowed {
            debug!("Party request {:?} from {} to {} refused", kind, from, to);
            return false;
        }

        let name = sender.name.clone();
        if let Some(target) = self.characters.get_mut(&to) {
            target.party_request = Some(PartyRequest { from, kind });
        }
        self.outbox.send(to, ServerMessage::PartyRequest { requester_id: from, name, kind });
        true
    }

    fn leads_or_solo(&self, character: &Character) -> bool {
        match character.party.and_then(|id| self.parties.get(id)) {
            Some(party) => party.leader == character.player_id,
            None => true,
        }
    }

    /// Accept the pending request `from` sent us, forming or growing a party
    pub fn party_accept(&mut self, acceptor: PlayerId, from: PlayerId, kind: PartyRequestKind) -> bool {
        let Some(character) = self.characters.get_mut(&acceptor) else {
            return false;
        };
        if character.party_request != Some(PartyRequest { from, kind }) {
            return false;
        }
        character.party_request = None;

        let (leader, joiner) = match kind {
            PartyRequestKind::Invite => (from, acceptor),
            PartyRequestKind::Join => (acceptor, from),
        };

        let Some(leader_char) = self.characters.get(&leader) else {
            return false;
        };
        if !self.leads_or_solo(leader_char) {
            return false;
        }

        let existing = leader_char.party;
        match existing {
            Some(party) => self.parties.join(party, &mut self.characters, &mut self.outbox, joiner),
            None => self
                .parties
                .create(&mut self.characters, &mut self.outbox, leader, joiner)
                .is_some(),
        }
    }

    /// Leave (own id) or, as leader, kick `target`
    pub fn party_remove(&mut self, who: PlayerId, target: PlayerId) -> bool {
        let Some(party_id) = self.characters.get(&who).and_then(|c| c.party) else {
            return false;
        };
        if who != target {
            match self.parties.get(party_id) {
                Some(party) if party.leader == who => {}
                _ => return false,
            }
        }
        self.parties.leave(party_id, &mut self.characters, &mut self.outbox, target)
    }

    pub fn party_list(&mut self, who: PlayerId) {
        let party = self.characters.get(&who).and_then(|c| c.party);
        if let Some(party) = party.and_then(|id| self.parties.get(id)) {
            party.refresh_members(&self.characters, &mut self.outbox, who);
        }
    }

    pub fn party_chat(&mut self, who: PlayerId, message: &str) {
        let party = self.characters.get(&who).and_then(|c| c.party);
        if let Some(party) = party.and_then(|id| self.parties.get(id)) {
            party.msg(&self.ctx, &self.characters, &mut self.outbox, who, message, false);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;

    /// World with one logged-in character per name, ids from 1
    pub(crate) fn world_with(names: &[&str]) -> World {
        let mut world = World::new(GameContext::new(Config::default()));
        for (i, name) in names.iter().enumerate() {
            let character = Character::new(i as PlayerId + 1, name.to_string());
            world.add_character(character, Timestamp::new(0));
        }
        world
    }

    #[test]
    fn test_invite_and_accept_forms_party() {
        let mut world = world_with(&["alice", "bobby", "carol"]);

        assert!(world.party_request(1, 2, PartyRequestKind::Invite));
        assert_eq!(
            world.outbox.messages_for(2),
            vec![&ServerMessage::PartyRequest { requester_id: 1, name: "alice".into(), kind: PartyRequestKind::Invite }]
        );

        // wrong requester or kind
        assert!(!world.party_accept(2, 3, PartyRequestKind::Invite));
        assert!(!world.party_accept(2, 1, PartyRequestKind::Join));

        assert!(world.party_accept(2, 1, PartyRequestKind::Invite));
        let party_id = world.get_character(1).unwrap().party.unwrap();
        assert_eq!(world.party(party_id).unwrap().leader, 1);
        assert_eq!(world.get_character(2).unwrap().party_request, None);

        // a join request makes the target's party grow
        assert!(world.party_request(3, 1, PartyRequestKind::Join));
        assert!(world.party_accept(1, 3, PartyRequestKind::Join));
        assert_eq!(world.party(party_id).unwrap().members, vec![1, 2, 3]);

        // only the leader may invite
        let mut world = world_with(&["alice", "bobby", "carol", "david"]);
        world.party_request(1, 2, PartyRequestKind::Invite);
        world.party_accept(2, 1, PartyRequestKind::Invite);
        assert!(!world.party_request(2, 3, PartyRequestKind::Invite));
        assert!(!world.party_request(4, 2, PartyRequestKind::Join));
    }

    #[test]
    fn test_join_request_makes_target_leader() {
        let mut world = world_with(&["alice", "bobby"]);
        assert!(world.party_request(2, 1, PartyRequestKind::Join));
        assert!(world.party_accept(1, 2, PartyRequestKind::Join));
        let party_id = world.get_character(2).unwrap().party.unwrap();
        assert_eq!(world.party(party_id).unwrap().leader, 1);
    }

    #[test]
    fn test_only_leader_can_kick() {
        let mut world = world_with(&["alice", "bobby", "carol"]);
        world.party_request(1, 2, PartyRequestKind::Invite);
        world.party_accept(2, 1, PartyRequestKind::Invite);
        world.party_request(1, 3, PartyRequestKind::Invite);
        world.party_accept(3, 1, PartyRequestKind::Invite);

        assert!(!world.party_remove(2, 3));
        assert!(world.party_remove(1, 3));
        assert_eq!(world.get_character(3).unwrap().party, None);
        assert!(world.get_character(2).unwrap().party.is_some());

        // leaving yourself
        assert!(world.party_remove(2, 2));
        assert!(world.characters().all(|c| c.party.is_none()));
    }

    #[test]
    fn test_logout_leaves_party_and_clears_requests() {
        let mut world = world_with(&["alice", "bobby", "carol"]);
        world.party_request(1, 2, PartyRequestKind::Invite);
        world.party_accept(2, 1, PartyRequestKind::Invite);
        world.party_request(1, 3, PartyRequestKind::Invite);
        world.drain_outbox();

        let alice = world.remove_character(1).unwrap();
        assert_eq!(alice.party, None);
        assert_eq!(world.get_character(2).unwrap().party, None);
        assert_eq!(world.get_character(3).unwrap().party_request, None);
        assert!(world.drain_outbox().iter().any(|(to, msg)| *to == 2
            && *msg == ServerMessage::PartyClose { sentinel: 255 }));

        assert!(world.remove_character(1).is_none());
    }

    #[test]
    fn test_award_exp_solo_and_shared() {
        let mut world = world_with(&["alice", "bobby", "carol"]);
        world.award_exp(3, 40);
        assert_eq!(world.get_character(3).unwrap().exp, 40);

        world.party_request(1, 2, PartyRequestKind::Invite);
        world.party_accept(2, 1, PartyRequestKind::Invite);
        world.award_exp(1, 40);
        // default share mode is level weighted, both level 0
        assert_eq!(world.get_character(1).unwrap().exp, 20);
        assert_eq!(world.get_character(2).unwrap().exp, 20);
    }

    #[test]
    fn test_set_hp_reports_to_party() {
        let mut world = world_with(&["alice", "bobby"]);
        world.party_request(1, 2, PartyRequestKind::Invite);
        world.party_accept(2, 1, PartyRequestKind::Invite);
        world.drain_outbox();

        world.set_hp(2, 5);
        assert_eq!(world.get_character(2).unwrap().hp, 5);
        assert_eq!(
            world.outbox.messages_for(1),
            vec![&ServerMessage::PartyAgree { id: 2, hp_percent: 50 }]
        );

        world.set_hp(2, 1000);
        assert_eq!(world.get_character(2).unwrap().hp, 10);
    }

    #[test]
    fn test_equip_through_world_sends_updates() {
        let mut world = world_with(&["alice"]);
        let ctx = world.ctx.clone();
        world.get_character_mut(1).unwrap().add_item(&ctx, 4, 1);

        assert!(world.equip(1, 4, 0));
        let messages = world.drain_outbox();
        assert!(matches!(messages[0].1, ServerMessage::InventoryUpdate { .. }));
        assert!(matches!(messages[1].1, ServerMessage::StatsUpdate { max_hp: 15, .. }));

        assert!(!world.equip(1, 4, 0));
        assert!(world.unequip(1, 4, 0));
        assert!(!world.unequip(9, 4, 0));
    }
}
