//! Text encoding of inventories, spell books and paperdolls as stored in the
//! character table.
//!
//! Items are `id,amount;` records, spells are `id,level;` records and a
//! paperdoll is exactly fifteen `id,` fields in slot order. Changing either
//! delimiter or the field order breaks every stored character.
//!
//! Item and spell lists are decoded best-effort: a malformed record is logged
//! and skipped so one damaged entry does not cost a player the rest of their
//! inventory. A repeated id keeps its first record. A paperdoll is
//! all-or-nothing since a partial doll would shift items into the wrong slots.

use std::collections::HashSet;

use log::warn;
use realm_shared::{InventoryEntry, Paperdoll, SpellEntry, PAPERDOLL_SLOTS};

const RECORD_DELIMITER: char = ';';
const FIELD_DELIMITER: char = ',';

/// Paperdoll decoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    WrongSlotCount(usize),
    BadSlot { slot: usize, value: String },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongSlotCount(n) => write!(f, "Paperdoll has {} slots, expected {}", n, PAPERDOLL_SLOTS),
            Self::BadSlot { slot, value } => write!(f, "Paperdoll slot {} holds '{}'", slot, value),
        }
    }
}

impl std::error::Error for CodecError {}

/// Split into `id,value` records, skipping empty trailing records
fn records(serialized: &str) -> impl Iterator<Item = &str> {
    serialized
        .split(RECORD_DELIMITER)
        .map(str::trim)
        .filter(|r| !r.is_empty())
}

/// Parse one `a,b` record
fn pair<A: std::str::FromStr, B: std::str::FromStr>(record: &str) -> Option<(A, B)> {
    let mut fields = record.split(FIELD_DELIMITER);
    let a = fields.next()?.trim().parse().ok()?;
    let b = fields.next()?.trim().parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((a, b))
}

pub fn serialize_items(items: &[InventoryEntry]) -> String {
    items
        .iter()
        .map(|item| format!("{}{}{}{}", item.id, FIELD_DELIMITER, item.amount, RECORD_DELIMITER))
        .collect()
}

pub fn deserialize_items(serialized: &str) -> Vec<InventoryEntry> {
    let mut seen = HashSet::new();
    records(serialized)
        .filter_map(|record| match pair::<i16, i32>(record) {
            Some((id, amount)) if id > 0 && amount >= 0 => {
                if seen.insert(id) {
                    Some(InventoryEntry::new(id, amount))
                } else {
                    warn!("Skipping repeated item record '{}'", record);
                    None
                }
            }
            _ => {
                warn!("Skipping malformed item record '{}'", record);
                None
            }
        })
        .collect()
}

pub fn serialize_spells(spells: &[SpellEntry]) -> String {
    spells
        .iter()
        .map(|spell| format!("{}{}{}{}", spell.id, FIELD_DELIMITER, spell.level, RECORD_DELIMITER))
        .collect()
}

pub fn deserialize_spells(serialized: &str) -> Vec<SpellEntry> {
    let mut seen = HashSet::new();
    records(serialized)
        .filter_map(|record| match pair::<i16, u8>(record) {
            Some((id, level)) if id > 0 => {
                if seen.insert(id) {
                    Some(SpellEntry::new(id, level))
                } else {
                    warn!("Skipping repeated spell record '{}'", record);
                    None
                }
            }
            _ => {
                warn!("Skipping malformed spell record '{}'", record);
                None
            }
        })
        .collect()
}

pub fn serialize_doll(doll: &Paperdoll) -> String {
    doll.slots()
        .iter()
        .map(|id| format!("{}{}", id, FIELD_DELIMITER))
        .collect()
}

pub fn deserialize_doll(serialized: &str) -> Result<Paperdoll, CodecError> {
    let fields: Vec<&str> = serialized
        .trim()
        .strip_suffix(FIELD_DELIMITER)
        .unwrap_or(serialized.trim())
        .split(FIELD_DELIMITER)
        .collect();

    if fields.len() != PAPERDOLL_SLOTS {
        return Err(CodecError::WrongSlotCount(fields.len()));
    }

    let mut slots = [0i16; PAPERDOLL_SLOTS];
    for (slot, field) in fields.iter().enumerate() {
        slots[slot] = match field.trim().parse::<i16>() {
            Ok(id) if id >= 0 => id,
            _ => {
                return Err(CodecError::BadSlot { slot, value: field.to_string() });
            }
        };
    }

    Ok(Paperdoll::from_slots(slots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_shared::EquipLocation;

    #[test]
    fn test_items_round_trip() {
        let items = vec![
            InventoryEntry::new(1, 500),
            InventoryEntry::new(3, 1),
            InventoryEntry::new(15, 0),
        ];
        let text = serialize_items(&items);
        assert_eq!(text, "1,500;3,1;15,0;");
        assert_eq!(deserialize_items(&text), items);
        assert!(deserialize_items("").is_empty());
    }

    #[test]
    fn test_malformed_item_records_are_skipped() {
        let items = deserialize_items("1,500;garbage;2,x;3,1,9;4,-5;0,3;7,2;");
        assert_eq!(items, vec![InventoryEntry::new(1, 500), InventoryEntry::new(7, 2)]);
    }

    #[test]
    fn test_repeated_item_id_keeps_first_record() {
        let items = deserialize_items("2,5;2,3;4,1;");
        assert_eq!(items, vec![InventoryEntry::new(2, 5), InventoryEntry::new(4, 1)]);
    }

    #[test]
    fn test_repeated_spell_id_keeps_first_record() {
        let spells = deserialize_spells("1,2;3,0;1,7;");
        assert_eq!(spells, vec![SpellEntry::new(1, 2), SpellEntry::new(3, 0)]);
    }

    #[test]
    fn test_spells_round_trip() {
        let spells = vec![SpellEntry::new(1, 0), SpellEntry::new(3, 12)];
        let text = serialize_spells(&spells);
        assert_eq!(text, "1,0;3,12;");
        assert_eq!(deserialize_spells(&text), spells);
        // level does not fit in a byte
        assert_eq!(deserialize_spells("1,0;2,300;"), vec![SpellEntry::new(1, 0)]);
    }

    #[test]
    fn test_doll_round_trip_keeps_slot_order() {
        let mut doll = Paperdoll::default();
        doll.set(EquipLocation::Boots, 7);
        doll.set(EquipLocation::Weapon, 3);
        doll.set(EquipLocation::Bracer2, 11);

        let text = serialize_doll(&doll);
        assert_eq!(text, "7,0,0,0,0,0,0,0,3,0,0,0,0,0,11,");
        assert_eq!(deserialize_doll(&text), Ok(doll));
    }

    #[test]
    fn test_doll_rejects_wrong_shape() {
        assert_eq!(deserialize_doll("1,2,3,"), Err(CodecError::WrongSlotCount(3)));
        assert!(deserialize_doll("").is_err());
        assert!(deserialize_doll(&"0,".repeat(16)).is_err());

        let bad = "0,0,0,0,0,0,0,0,x,0,0,0,0,0,0,";
        assert_eq!(
            deserialize_doll(bad),
            Err(CodecError::BadSlot { slot: 8, value: "x".into() })
        );
    }
}
