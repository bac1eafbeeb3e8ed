//! Parties: a leader plus at least one other member, sharing experience and
//! a chat channel.
//!
//! Every member's `party` field names the party it belongs to. The registry
//! is the only place parties are created or destroyed, and destruction clears
//! every member's reference before the party is dropped.

use std::collections::HashMap;

use log::{debug, info, warn};
use realm_shared::{PlayerId, ServerMessage, PARTY_CLOSE_SENTINEL};

use crate::config::GameContext;
use crate::entities::{Character, MapId};
use crate::network::Transport;
use crate::util::{text_cap, text_width, ucfirst};

pub type PartyId = u32;

pub type Characters = HashMap<PlayerId, Character>;

/// How party experience is split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Everyone gets the same share
    Even,
    /// Shares proportional to level, level 0 counting as 1
    LevelWeighted,
}

impl ShareMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ShareMode::Even),
            2 => Some(ShareMode::LevelWeighted),
            _ => None,
        }
    }
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator - 1) / denominator
}

#[derive(Debug)]
pub struct Party {
    pub id: PartyId,
    pub leader: PlayerId,
    /// In join order, leader first
    pub members: Vec<PlayerId>,
    /// Experience handed out by the last `share_exp`
    pub temp_exp_sum: i32,
}

impl Party {
    pub fn is_member(&self, id: PlayerId) -> bool {
        self.members.contains(&id)
    }

    /// Send the full roster to `recipient`
    pub fn refresh_members(&self, characters: &Characters, out: &mut dyn Transport, recipient: PlayerId) {
        let members = self
            .members
            .iter()
            .filter_map(|id| characters.get(id))
            .map(|c| c.member_info(c.player_id == self.leader))
            .collect();

        out.send(recipient, ServerMessage::PartyCreate { members });
    }

    /// Tell every member about `who`'s current hp
    pub fn update_hp(&self, characters: &Characters, out: &mut dyn Transport, who: PlayerId) {
        let Some(character) = characters.get(&who) else {
            return;
        };
        let hp_percent = character.hp_percent();

        for &member in &self.members {
            out.send(member, ServerMessage::PartyAgree { id: who, hp_percent });
        }
    }

    /// Party chat. The line is capped so that it fits the chat box after the
    /// sender's name; the sender only sees it with `echo`.
    pub fn msg(
        &self,
        ctx: &GameContext,
        characters: &Characters,
        out: &mut dyn Transport,
        from: PlayerId,
        message: &str,
        echo: bool,
    ) {
        let Some(sender) = characters.get(&from) else {
            return;
        };

        let prefix = format!("{}  ", ucfirst(&sender.name));
        let message = text_cap(message, ctx.config.chat_max_width() - text_width(&prefix));

        for &member in &self.members {
            if member == from && !echo {
                continue;
            }
            out.send(member, ServerMessage::TalkParty { sender_id: from, message: message.clone() });
        }
    }

    /// Distribute `exp` among the members standing on `map`. Returns the
    /// total handed out, which may exceed `exp` because shares round up.
    pub fn share_exp(
        &mut self,
        ctx: &GameContext,
        characters: &mut Characters,
        out: &mut dyn Transport,
        exp: i32,
        mode: u8,
        map: MapId,
    ) -> i32 {
        self.temp_exp_sum = 0;

        let Some(mode) = ShareMode::from_u8(mode) else {
            warn!("Unknown party share mode {}, no experience shared", mode);
            return 0;
        };

        let participants: Vec<PlayerId> = self
            .members
            .iter()
            .copied()
            .filter(|id| {
                characters
                    .get(id)
                    .map(|c| c.map == map && !c.nowhere)
                    .unwrap_or(false)
            })
            .collect();

        if participants.is_empty() || exp <= 0 {
            return 0;
        }

        let effective_level = |c: &Character| i64::from(c.level.max(1));
        let level_sum: i64 = participants
            .iter()
            .filter_map(|id| characters.get(id))
            .map(effective_level)
            .sum();
        let count = participants.len() as i64;

        for id in participants {
            let Some(character) = characters.get_mut(&id) else {
                continue;
            };

            let reward = match mode {
                ShareMode::Even => ceil_div(i64::from(exp), count),
                ShareMode::LevelWeighted => {
                    ceil_div(i64::from(exp) * effective_level(character), level_sum)
                }
            };
            let reward = reward.min(i64::from(i32::MAX)) as i32;
            if reward <= 0 {
                continue;
            }

            let level_up = character.gain_exp(ctx, reward);
            self.temp_exp_sum = self.temp_exp_sum.saturating_add(reward);

            out.send(id, ServerMessage::PartyExp { id, reward, level_up });
            if level_up {
                out.send(id, character.stats_update());
            }
        }

        debug!("Party {} shared {} exp ({} handed out)", self.id, exp, self.temp_exp_sum);
        self.temp_exp_sum
    }
}

/// Every live party, by id
#[derive(Debug, Default)]
pub struct PartyRegistry {
    parties: HashMap<PartyId, Party>,
    next_id: PartyId,
}

impl PartyRegistry {
    pub fn get(&self, id: PartyId) -> Option<&Party> {
        self.parties.get(&id)
    }

    pub fn get_mut(&mut self, id: PartyId) -> Option<&mut Party> {
        self.parties.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }

    fn allocate_id(&mut self) -> PartyId {
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            if self.next_id != 0 && !self.parties.contains_key(&self.next_id) {
                return self.next_id;
            }
        }
    }

    /// Form a party of two. Each founder receives the roster, leader first.
    pub fn create(
        &mut self,
        characters: &mut Characters,
        out: &mut dyn Transport,
        leader: PlayerId,
        other: PlayerId,
    ) -> Option<PartyId> {
        if leader == other {
            return None;
        }
        match (characters.get(&leader), characters.get(&other)) {
            (Some(a), Some(b)) if a.party.is_none() && b.party.is_none() => {}
            _ => {
                debug!("Cannot create party of {} and {}", leader, other);
                return None;
            }
        }

        let id = self.allocate_id();
        let party = Party {
            id,
            leader,
            members: vec![leader, other],
            temp_exp_sum: 0,
        };

        for member in &party.members {
            if let Some(c) = characters.get_mut(member) {
                c.party = Some(id);
            }
        }

        party.refresh_members(characters, out, leader);
        party.refresh_members(characters, out, other);

        info!("Party {} created (leader {}, member {})", id, leader, other);
        self.parties.insert(id, party);
        Some(id)
    }

    /// Add `joiner` to the party. Existing members are told first, then the
    /// joiner gets the roster.
    pub fn join(
        &mut self,
        id: PartyId,
        characters: &mut Characters,
        out: &mut dyn Transport,
        joiner: PlayerId,
    ) -> bool {
        let Some(party) = self.parties.get_mut(&id) else {
            return false;
        };
        let Some(character) = characters.get_mut(&joiner) else {
            return false;
        };
        if character.party.is_some() {
            return false;
        }

        character.party = Some(id);
        let member = character.member_info(false);
        party.members.push(joiner);

        for &other in party.members.iter().filter(|&&m| m != joiner) {
            out.send(other, ServerMessage::PartyAdd { member: member.clone() });
        }
        party.refresh_members(characters, out, joiner);

        info!("{} joined party {}", member.name, id);
        true
    }

    /// Remove `who`. The party is destroyed when the leader leaves or when
    /// only one member would remain.
    pub fn leave(
        &mut self,
        id: PartyId,
        characters: &mut Characters,
        out: &mut dyn Transport,
        who: PlayerId,
    ) -> bool {
        let Some(party) = self.parties.get_mut(&id) else {
            return false;
        };
        if !party.is_member(who) {
            return false;
        }

        if party.members.len() > 2 && who != party.leader {
            party.members.retain(|&m| m != who);
            if let Some(c) = characters.get_mut(&who) {
                c.party = None;
            }

            for &member in &party.members {
                out.send(member, ServerMessage::PartyRemove { id: who });
            }
            out.send(who, ServerMessage::PartyClose { sentinel: PARTY_CLOSE_SENTINEL });

            info!("{} left party {}", who, id);
            return true;
        }

        self.destroy(id, characters, out)
    }

    /// Dissolve the party, clearing every member's reference to it
    pub fn destroy(&mut self, id: PartyId, characters: &mut Characters, out: &mut dyn Transport) -> bool {
        let Some(party) = self.parties.remove(&id) else {
            return false;
        };

        for &member in &party.members {
            if let Some(c) = characters.get_mut(&member) {
                if c.party == Some(id) {
                    c.party = None;
                }
            }
            out.send(member, ServerMessage::PartyClose { sentinel: PARTY_CLOSE_SENTINEL });
        }

        info!("Party {} disbanded", id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::network::Outbox;

    fn ctx() -> GameContext {
        GameContext::new(Config::default())
    }

    fn characters(names: &[&str]) -> Characters {
        let ctx = ctx();
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let id = i as PlayerId + 1;
                let mut c = Character::new(id, name.to_string());
                c.calculate_stats(&ctx, true);
                (id, c)
            })
            .collect()
    }

    #[test]
    fn test_create_sends_roster_to_both_founders() {
        let mut chars = characters(&["alice", "bobby"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();

        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        assert_eq!(chars[&1].party, Some(id));
        assert_eq!(chars[&2].party, Some(id));
        assert_eq!(out.recipients(), vec![1, 2]);

        match out.messages_for(2)[0] {
            ServerMessage::PartyCreate { members } => {
                assert_eq!(members.len(), 2);
                assert!(members[0].is_leader);
                assert_eq!(members[0].name, "alice");
                assert!(!members[1].is_leader);
            }
            other => panic!("unexpected {:?}", other),
        }

        // already partied
        let mut chars3 = characters(&["alice", "bobby", "carol"]);
        registry.create(&mut chars3, &mut out, 1, 2).unwrap();
        assert!(registry.create(&mut chars3, &mut out, 3, 1).is_none());
        assert!(registry.create(&mut chars3, &mut out, 3, 3).is_none());
    }

    #[test]
    fn test_join_notifies_others_then_joiner() {
        let mut chars = characters(&["alice", "bobby", "carol"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        out.drain();

        assert!(registry.join(id, &mut chars, &mut out, 3));
        assert_eq!(out.recipients(), vec![1, 2, 3]);
        assert!(matches!(out.messages_for(1)[0], ServerMessage::PartyAdd { member } if member.id == 3));
        assert!(matches!(out.messages_for(3)[0], ServerMessage::PartyCreate { members } if members.len() == 3));

        assert!(!registry.join(id, &mut chars, &mut out, 3));
    }

    #[test]
    fn test_non_leader_leaves_party_of_three() {
        let mut chars = characters(&["alice", "bobby", "carol"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        registry.join(id, &mut chars, &mut out, 3);
        out.drain();

        assert!(registry.leave(id, &mut chars, &mut out, 2));
        let party = registry.get(id).unwrap();
        assert_eq!(party.members, vec![1, 3]);
        assert_eq!(party.leader, 1);
        assert_eq!(chars[&2].party, None);

        assert_eq!(out.messages_for(1), vec![&ServerMessage::PartyRemove { id: 2 }]);
        assert_eq!(out.messages_for(3), vec![&ServerMessage::PartyRemove { id: 2 }]);
        assert_eq!(out.messages_for(2), vec![&ServerMessage::PartyClose { sentinel: 255 }]);

        assert!(!registry.leave(id, &mut chars, &mut out, 2));
    }

    #[test]
    fn test_leaving_party_of_two_destroys_it() {
        let mut chars = characters(&["alice", "bobby"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        out.drain();

        assert!(registry.leave(id, &mut chars, &mut out, 2));
        assert!(registry.get(id).is_none());
        assert!(registry.is_empty());
        assert!(chars.values().all(|c| c.party.is_none()));
        for member in [1, 2] {
            assert_eq!(out.messages_for(member), vec![&ServerMessage::PartyClose { sentinel: 255 }]);
        }
    }

    #[test]
    fn test_leader_leaving_destroys_party() {
        let mut chars = characters(&["alice", "bobby", "carol"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        registry.join(id, &mut chars, &mut out, 3);

        assert!(registry.leave(id, &mut chars, &mut out, 1));
        assert!(registry.get(id).is_none());
        assert!(chars.values().all(|c| c.party.is_none()));
    }

    #[test]
    fn test_update_hp_reaches_every_member() {
        let mut chars = characters(&["alice", "bobby"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        out.drain();

        let bob = chars.get_mut(&2).unwrap();
        bob.max_hp = 40;
        bob.hp = 10;
        registry.get(id).unwrap().update_hp(&chars, &mut out, 2);

        let expected = ServerMessage::PartyAgree { id: 2, hp_percent: 25 };
        assert_eq!(out.messages_for(1), vec![&expected]);
        assert_eq!(out.messages_for(2), vec![&expected]);
    }

    #[test]
    fn test_share_exp_even_split() {
        let ctx = ctx();
        let mut chars = characters(&["alice", "bobby"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        out.drain();

        let total = registry.get_mut(id).unwrap().share_exp(&ctx, &mut chars, &mut out, 100, 1, 1);
        assert_eq!(total, 100);
        assert_eq!(chars[&1].exp, 50);
        assert_eq!(chars[&2].exp, 50);
        assert_eq!(out.messages_for(1), vec![&ServerMessage::PartyExp { id: 1, reward: 50, level_up: false }]);
    }

    #[test]
    fn test_share_exp_weighted_by_level() {
        let ctx = ctx();
        let mut chars = characters(&["alice", "bobby"]);
        chars.get_mut(&2).unwrap().level = 9;
        chars.get_mut(&2).unwrap().exp = ctx.exp_table.threshold(9);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();

        let party = registry.get_mut(id).unwrap();
        party.share_exp(&ctx, &mut chars, &mut out, 100, 2, 1);
        assert_eq!(chars[&1].exp, 10);
        assert_eq!(chars[&2].exp, ctx.exp_table.threshold(9) + 90);
        assert_eq!(party.temp_exp_sum, 100);
    }

    #[test]
    fn test_share_exp_rounds_up() {
        let ctx = ctx();
        let mut chars = characters(&["alice", "bobby", "carol"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        registry.join(id, &mut chars, &mut out, 3);

        let total = registry.get_mut(id).unwrap().share_exp(&ctx, &mut chars, &mut out, 100, 1, 1);
        assert_eq!(total, 102);
        assert!(chars.values().all(|c| c.exp == 34));
    }

    #[test]
    fn test_share_exp_skips_absent_members() {
        let ctx = ctx();
        let mut chars = characters(&["alice", "bobby", "carol"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        registry.join(id, &mut chars, &mut out, 3);
        chars.get_mut(&2).unwrap().map = 7;
        chars.get_mut(&3).unwrap().nowhere = true;

        registry.get_mut(id).unwrap().share_exp(&ctx, &mut chars, &mut out, 100, 1, 1);
        assert_eq!(chars[&1].exp, 100);
        assert_eq!(chars[&2].exp, 0);
        assert_eq!(chars[&3].exp, 0);
    }

    #[test]
    fn test_share_exp_level_up_recomputes_stats_first() {
        let ctx = ctx();
        let mut chars = characters(&["alice", "bobby"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        out.drain();

        registry.get_mut(id).unwrap().share_exp(&ctx, &mut chars, &mut out, 10_000, 1, 1);
        let alice = &chars[&1];
        assert_eq!(alice.level, 1);
        assert_eq!(alice.stat_points, 3);
        assert_eq!(alice.max_hp, 15);

        let messages = out.messages_for(1);
        assert_eq!(messages[0], &ServerMessage::PartyExp { id: 1, reward: 5000, level_up: true });
        assert!(matches!(messages[1], ServerMessage::StatsUpdate { level: 1, max_hp: 15, .. }));
    }

    #[test]
    fn test_unknown_share_mode_distributes_nothing() {
        let ctx = ctx();
        let mut chars = characters(&["alice", "bobby"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        out.drain();

        assert_eq!(registry.get_mut(id).unwrap().share_exp(&ctx, &mut chars, &mut out, 100, 3, 1), 0);
        assert!(out.is_empty());
        assert!(chars.values().all(|c| c.exp == 0));
    }

    #[test]
    fn test_msg_skips_sender_without_echo() {
        let ctx = ctx();
        let mut chars = characters(&["alice", "bobby", "carol"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        registry.join(id, &mut chars, &mut out, 3);
        out.drain();

        let party = registry.get(id).unwrap();
        party.msg(&ctx, &chars, &mut out, 2, "hello", false);
        assert_eq!(out.recipients(), vec![1, 3]);
        out.drain();

        party.msg(&ctx, &chars, &mut out, 2, "hello", true);
        assert_eq!(out.recipients(), vec![1, 2, 3]);
        assert_eq!(
            out.messages_for(2),
            vec![&ServerMessage::TalkParty { sender_id: 2, message: "hello".into() }]
        );
    }

    #[test]
    fn test_msg_is_capped_to_chat_width() {
        let mut config = Config::default();
        config.set("ChatMaxWidth", 100.0);
        let ctx = GameContext::new(config);
        let mut chars = characters(&["alice", "bobby"]);
        let mut out = Outbox::default();
        let mut registry = PartyRegistry::default();
        let id = registry.create(&mut chars, &mut out, 1, 2).unwrap();
        out.drain();

        registry.get(id).unwrap().msg(&ctx, &chars, &mut out, 1, &"a".repeat(50), false);
        match out.messages_for(2)[0] {
            ServerMessage::TalkParty { message, .. } => {
                let budget = 100 - text_width("Alice  ");
                assert!(message.ends_with("..."));
                assert!(text_width(message) <= budget);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
