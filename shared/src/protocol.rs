//! Network protocol definitions shared between client and server.

use serde::{Deserialize, Serialize};

use crate::{InventoryEntry, Paperdoll, PartyRequestKind, SpellEntry, SpellTarget};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Server tick rate in Hz
pub const SERVER_TICK_RATE: u32 = 20;

/// Default server port
pub const DEFAULT_PORT: u16 = 8078;

/// Value carried by every PARTY CLOSE notice
pub const PARTY_CLOSE_SENTINEL: u8 = 255;

/// Runtime id of an in-game character (session id, used on the wire)
pub type PlayerId = u16;

/// One row of a party roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMemberInfo {
    pub id: PlayerId,
    pub is_leader: bool,
    pub level: u8,
    /// 0-100
    pub hp_percent: u8,
    pub name: String,
}

// =============================================================================
// Client -> Server Messages
// =============================================================================

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Enter the world with a stored character, or a fresh one named `name`
    EnterGame {
        protocol_version: u32,
        character_id: i64,
        name: String,
    },

    /// Disconnect gracefully
    Disconnect,

    /// Ask to join `target_id`'s party, or invite them into ours
    PartyRequest {
        target_id: PlayerId,
        kind: PartyRequestKind,
    },

    /// Accept a pending party request
    PartyAccept {
        requester_id: PlayerId,
        kind: PartyRequestKind,
    },

    /// Leave the party (own id) or, as leader, remove another member
    PartyRemove {
        player_id: PlayerId,
    },

    /// Request a fresh roster
    PartyList,

    /// Party chat
    PartyChat {
        message: String,
    },

    /// Ask another character to trade
    TradeRequest {
        target_id: PlayerId,
    },

    /// Accept a pending trade request
    TradeAccept {
        requester_id: PlayerId,
    },

    /// Offer items in the open trade
    TradeAdd {
        item_id: i16,
        amount: i32,
    },

    /// Withdraw an offered item
    TradeRemove {
        item_id: i16,
    },

    /// Set or clear our agreement to the current offers
    TradeAgree {
        agree: bool,
    },

    /// Cancel the open trade
    TradeClose,

    /// Begin casting a spell
    SpellRequest {
        spell_id: i16,
        target: SpellTarget,
        target_id: u16,
    },

    /// Resolve a ready spell
    SpellAct,

    /// Abort the current cast
    SpellCancel,

    /// Equip an item from the inventory
    Equip {
        item_id: i16,
        subloc: u8,
    },

    /// Return an equipped item to the inventory
    Unequip {
        item_id: i16,
        subloc: u8,
    },
}

// =============================================================================
// Server -> Client Messages
// =============================================================================

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Character is in the world
    EnterGameSuccess {
        player_id: PlayerId,
        name: String,
        level: u8,
        experience: i32,
        map_id: i16,
        hp: i16,
        max_hp: i16,
        tp: i16,
        max_tp: i16,
        inventory: Vec<InventoryEntry>,
        paperdoll: Paperdoll,
        spells: Vec<SpellEntry>,
    },

    /// Could not enter the world
    EnterGameFailed {
        reason: String,
    },

    /// Someone wants to party with us (PARTY REQUEST)
    PartyRequest {
        requester_id: PlayerId,
        name: String,
        kind: PartyRequestKind,
    },

    /// Full roster (PARTY CREATE)
    PartyCreate {
        members: Vec<PartyMemberInfo>,
    },

    /// A member joined (PARTY ADD)
    PartyAdd {
        member: PartyMemberInfo,
    },

    /// A member left (PARTY REMOVE)
    PartyRemove {
        id: PlayerId,
    },

    /// The party is gone for the recipient (PARTY CLOSE)
    PartyClose {
        sentinel: u8,
    },

    /// Member hp changed (PARTY AGREE)
    PartyAgree {
        id: PlayerId,
        hp_percent: u8,
    },

    /// Shared experience reward (PARTY EXP)
    PartyExp {
        id: PlayerId,
        reward: i32,
        level_up: bool,
    },

    /// Party chat line (TALK OPEN)
    TalkParty {
        sender_id: PlayerId,
        message: String,
    },

    /// Someone wants to trade with us
    TradeRequest {
        requester_id: PlayerId,
        name: String,
    },

    /// Trade window opened
    TradeOpen {
        partner_id: PlayerId,
        partner_name: String,
    },

    /// Current offers of both sides
    TradeReply {
        first_id: PlayerId,
        first: Vec<InventoryEntry>,
        second_id: PlayerId,
        second: Vec<InventoryEntry>,
    },

    /// A side changed its agreement
    TradeAgree {
        id: PlayerId,
        agree: bool,
    },

    /// Trade committed with these offers
    TradeUse {
        first_id: PlayerId,
        first: Vec<InventoryEntry>,
        second_id: PlayerId,
        second: Vec<InventoryEntry>,
    },

    /// Trade cancelled
    TradeClose {
        partner_id: PlayerId,
    },

    /// A cast started
    SpellRequest {
        caster_id: PlayerId,
        spell_id: i16,
    },

    /// A heal resolved on a character
    SpellHeal {
        caster_id: PlayerId,
        spell_id: i16,
        target_id: PlayerId,
        amount: i16,
        hp_percent: u8,
    },

    /// A damage spell hit an NPC
    SpellDamage {
        caster_id: PlayerId,
        spell_id: i16,
        npc_index: u16,
        damage: i16,
        hp_percent: u8,
        killed: bool,
    },

    /// A cast was cancelled or fizzled
    SpellCancel {
        caster_id: PlayerId,
        spell_id: i16,
    },

    /// Own stats after a change
    StatsUpdate {
        level: u8,
        experience: i32,
        stat_points: i16,
        skill_points: i16,
        hp: i16,
        max_hp: i16,
        tp: i16,
        max_tp: i16,
    },

    /// Own inventory and paperdoll after a change
    InventoryUpdate {
        inventory: Vec<InventoryEntry>,
        paperdoll: Paperdoll,
    },
}

// =============================================================================
// Serialization helpers
// =============================================================================

impl ClientMessage {
    pub fn serialize(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Failed to serialize ClientMessage")
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl ServerMessage {
    pub fn serialize(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Failed to serialize ServerMessage")
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
