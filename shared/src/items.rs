//! Item definitions shared between client and server.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::EquipLocation;

/// Item id of the currency item
pub const GOLD_ITEM_ID: i16 = 1;

/// Item definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: i16,
    pub name: String,
    pub item_type: ItemType,
    /// Minimum character level to equip
    pub level_requirement: u8,
    /// Weight of a single unit
    pub weight: u8,
    pub stats: ItemStats,
}

/// Item types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    General,
    Currency,
    Heal,
    Weapon,
    Shield,
    Armor,
    Hat,
    Boots,
    Gloves,
    Accessory,
    Belt,
    Necklace,
    Ring,
    Armlet,
    Bracer,
}

impl ItemType {
    /// Paperdoll slot this item goes into. Rings, armlets and bracers come in
    /// pairs and use `subloc` (0 or 1) to pick one; everything else ignores it.
    pub fn equip_location(&self, subloc: u8) -> Option<EquipLocation> {
        let paired = |first, second| match subloc {
            0 => Some(first),
            1 => Some(second),
            _ => None,
        };

        match self {
            Self::Weapon => Some(EquipLocation::Weapon),
            Self::Shield => Some(EquipLocation::Shield),
            Self::Armor => Some(EquipLocation::Armor),
            Self::Hat => Some(EquipLocation::Hat),
            Self::Boots => Some(EquipLocation::Boots),
            Self::Gloves => Some(EquipLocation::Gloves),
            Self::Accessory => Some(EquipLocation::Accessory),
            Self::Belt => Some(EquipLocation::Belt),
            Self::Necklace => Some(EquipLocation::Necklace),
            Self::Ring => paired(EquipLocation::Ring1, EquipLocation::Ring2),
            Self::Armlet => paired(EquipLocation::Armlet1, EquipLocation::Armlet2),
            Self::Bracer => paired(EquipLocation::Bracer1, EquipLocation::Bracer2),
            Self::General | Self::Currency | Self::Heal => None,
        }
    }
}

/// Stat bonuses granted while an item is equipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemStats {
    pub hp: i16,
    pub tp: i16,
    pub str: i16,
    pub intl: i16,
    pub wis: i16,
    pub agi: i16,
    pub con: i16,
    pub cha: i16,
    pub min_damage: i16,
    pub max_damage: i16,
    pub accuracy: i16,
    pub evade: i16,
    pub armor: i16,
}

impl AddAssign for ItemStats {
    fn add_assign(&mut self, rhs: Self) {
        self.hp = self.hp.saturating_add(rhs.hp);
        self.tp = self.tp.saturating_add(rhs.tp);
        self.str = self.str.saturating_add(rhs.str);
        self.intl = self.intl.saturating_add(rhs.intl);
        self.wis = self.wis.saturating_add(rhs.wis);
        self.agi = self.agi.saturating_add(rhs.agi);
        self.con = self.con.saturating_add(rhs.con);
        self.cha = self.cha.saturating_add(rhs.cha);
        self.min_damage = self.min_damage.saturating_add(rhs.min_damage);
        self.max_damage = self.max_damage.saturating_add(rhs.max_damage);
        self.accuracy = self.accuracy.saturating_add(rhs.accuracy);
        self.evade = self.evade.saturating_add(rhs.evade);
        self.armor = self.armor.saturating_add(rhs.armor);
    }
}

/// Built-in item definitions for the prototype
pub fn get_item_definitions() -> Vec<ItemDef> {
    vec![
        ItemDef {
            id: GOLD_ITEM_ID,
            name: "Gold".into(),
            item_type: ItemType::Currency,
            level_requirement: 0,
            weight: 0,
            stats: ItemStats::default(),
        },
        ItemDef {
            id: 2,
            name: "Red Potion".into(),
            item_type: ItemType::Heal,
            level_requirement: 0,
            weight: 1,
            stats: ItemStats { hp: 30, ..Default::default() },
        },
        ItemDef {
            id: 3,
            name: "Wooden Sword".into(),
            item_type: ItemType::Weapon,
            level_requirement: 0,
            weight: 5,
            stats: ItemStats { min_damage: 2, max_damage: 5, accuracy: 1, ..Default::default() },
        },
        ItemDef {
            id: 4,
            name: "Leather Armor".into(),
            item_type: ItemType::Armor,
            level_requirement: 0,
            weight: 8,
            stats: ItemStats { hp: 5, armor: 4, ..Default::default() },
        },
        ItemDef {
            id: 5,
            name: "Wooden Shield".into(),
            item_type: ItemType::Shield,
            level_requirement: 0,
            weight: 4,
            stats: ItemStats { armor: 2, evade: 1, ..Default::default() },
        },
        ItemDef {
            id: 6,
            name: "Straw Hat".into(),
            item_type: ItemType::Hat,
            level_requirement: 0,
            weight: 1,
            stats: ItemStats { cha: 1, ..Default::default() },
        },
        ItemDef {
            id: 7,
            name: "Leather Boots".into(),
            item_type: ItemType::Boots,
            level_requirement: 0,
            weight: 2,
            stats: ItemStats { agi: 1, evade: 1, ..Default::default() },
        },
        ItemDef {
            id: 8,
            name: "Cloth Gloves".into(),
            item_type: ItemType::Gloves,
            level_requirement: 0,
            weight: 1,
            stats: ItemStats { accuracy: 2, ..Default::default() },
        },
        ItemDef {
            id: 9,
            name: "Silver Ring".into(),
            item_type: ItemType::Ring,
            level_requirement: 5,
            weight: 1,
            stats: ItemStats { str: 1, intl: 1, ..Default::default() },
        },
        ItemDef {
            id: 10,
            name: "Copper Armlet".into(),
            item_type: ItemType::Armlet,
            level_requirement: 0,
            weight: 1,
            stats: ItemStats { con: 2, ..Default::default() },
        },
        ItemDef {
            id: 11,
            name: "Iron Bracer".into(),
            item_type: ItemType::Bracer,
            level_requirement: 0,
            weight: 2,
            stats: ItemStats { armor: 1, str: 1, ..Default::default() },
        },
        ItemDef {
            id: 12,
            name: "Bone Necklace".into(),
            item_type: ItemType::Necklace,
            level_requirement: 0,
            weight: 1,
            stats: ItemStats { wis: 2, tp: 5, ..Default::default() },
        },
        ItemDef {
            id: 13,
            name: "Rope Belt".into(),
            item_type: ItemType::Belt,
            level_requirement: 0,
            weight: 1,
            stats: ItemStats::default(),
        },
        ItemDef {
            id: 14,
            name: "Lucky Charm".into(),
            item_type: ItemType::Accessory,
            level_requirement: 0,
            weight: 0,
            stats: ItemStats { cha: 3, ..Default::default() },
        },
        ItemDef {
            id: 15,
            name: "Goblin Ear".into(),
            item_type: ItemType::General,
            level_requirement: 0,
            weight: 1,
            stats: ItemStats::default(),
        },
        ItemDef {
            id: 16,
            name: "Greatsword".into(),
            item_type: ItemType::Weapon,
            level_requirement: 20,
            weight: 30,
            stats: ItemStats { str: 3, min_damage: 12, max_damage: 20, ..Default::default() },
        },
    ]
}
