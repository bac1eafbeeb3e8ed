//! Shared character-side data definitions.

use serde::{Deserialize, Serialize};

/// Number of equipment slots on a paperdoll
pub const PAPERDOLL_SLOTS: usize = 15;

/// One type of item held by a character, one entry per distinct item id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub id: i16,
    pub amount: i32,
}

impl InventoryEntry {
    pub fn new(id: i16, amount: i32) -> Self {
        Self { id, amount }
    }
}

/// One spell known by a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellEntry {
    pub id: i16,
    pub level: u8,
}

impl SpellEntry {
    pub fn new(id: i16, level: u8) -> Self {
        Self { id, level }
    }
}

/// Equipment slots, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EquipLocation {
    Boots = 0,
    Accessory = 1,
    Gloves = 2,
    Belt = 3,
    Armor = 4,
    Necklace = 5,
    Hat = 6,
    Shield = 7,
    Weapon = 8,
    Ring1 = 9,
    Ring2 = 10,
    Armlet1 = 11,
    Armlet2 = 12,
    Bracer1 = 13,
    Bracer2 = 14,
}

impl EquipLocation {
    pub const ALL: [EquipLocation; PAPERDOLL_SLOTS] = [
        EquipLocation::Boots,
        EquipLocation::Accessory,
        EquipLocation::Gloves,
        EquipLocation::Belt,
        EquipLocation::Armor,
        EquipLocation::Necklace,
        EquipLocation::Hat,
        EquipLocation::Shield,
        EquipLocation::Weapon,
        EquipLocation::Ring1,
        EquipLocation::Ring2,
        EquipLocation::Armlet1,
        EquipLocation::Armlet2,
        EquipLocation::Bracer1,
        EquipLocation::Bracer2,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// The fixed 15-slot equipped-item layout. Empty slots hold 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Paperdoll {
    slots: [i16; PAPERDOLL_SLOTS],
}

impl Paperdoll {
    pub fn from_slots(slots: [i16; PAPERDOLL_SLOTS]) -> Self {
        Self { slots }
    }

    pub fn get(&self, location: EquipLocation) -> i16 {
        self.slots[location.index()]
    }

    pub fn set(&mut self, location: EquipLocation, item_id: i16) {
        self.slots[location.index()] = item_id;
    }

    pub fn clear(&mut self, location: EquipLocation) {
        self.slots[location.index()] = 0;
    }

    pub fn slots(&self) -> &[i16; PAPERDOLL_SLOTS] {
        &self.slots
    }

    /// Equipped item ids, skipping empty slots
    pub fn equipped(&self) -> impl Iterator<Item = i16> + '_ {
        self.slots.iter().copied().filter(|&id| id != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|&id| id == 0)
    }
}

/// Kind of target a spell was cast at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SpellTarget {
    Invalid = 0,
    SelfOnly = 1,
    Npc = 2,
    Player = 3,
    Group = 4,
}

impl SpellTarget {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::SelfOnly,
            2 => Self::Npc,
            3 => Self::Player,
            4 => Self::Group,
            _ => Self::Invalid,
        }
    }
}

/// Direction of a party request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PartyRequestKind {
    /// Sender asks to join the target's party
    Join = 0,
    /// Sender invites the target into their party
    Invite = 1,
}

impl PartyRequestKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Join),
            1 => Some(Self::Invite),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equip_location_wire_order() {
        assert_eq!(EquipLocation::from_u8(0), Some(EquipLocation::Boots));
        assert_eq!(EquipLocation::from_u8(8), Some(EquipLocation::Weapon));
        assert_eq!(EquipLocation::from_u8(14), Some(EquipLocation::Bracer2));
        assert_eq!(EquipLocation::from_u8(15), None);

        for (i, location) in EquipLocation::ALL.iter().enumerate() {
            assert_eq!(location.index(), i);
        }
    }

    #[test]
    fn test_paperdoll_set_and_clear() {
        let mut doll = Paperdoll::default();
        assert!(doll.is_empty());

        doll.set(EquipLocation::Ring2, 9);
        assert_eq!(doll.get(EquipLocation::Ring2), 9);
        assert_eq!(doll.slots()[10], 9);
        assert_eq!(doll.equipped().collect::<Vec<_>>(), vec![9]);

        doll.clear(EquipLocation::Ring2);
        assert!(doll.is_empty());
    }
}
