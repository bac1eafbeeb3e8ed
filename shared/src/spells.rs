//! Spell definitions shared between client and server.

use serde::{Deserialize, Serialize};

use crate::SpellTarget;

/// Effect applied when a spell resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpellEffect {
    /// Restore a fixed amount of hp
    Heal(i16),
    /// Deal a random amount of damage in `min..=max`
    Damage { min: i16, max: i16 },
}

/// Spell definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellDef {
    pub id: i16,
    pub name: String,
    /// Cast time in centiseconds
    pub cast_time: i32,
    /// TP consumed on resolution
    pub tp_cost: i16,
    /// Target kinds this spell may be resolved against
    pub targets: Vec<SpellTarget>,
    pub effect: SpellEffect,
}

impl SpellDef {
    pub fn allows(&self, target: SpellTarget) -> bool {
        target != SpellTarget::Invalid && self.targets.contains(&target)
    }
}

/// Built-in spell definitions for the prototype
pub fn get_spell_definitions() -> Vec<SpellDef> {
    vec![
        SpellDef {
            id: 1,
            name: "Heal".into(),
            cast_time: 50,
            tp_cost: 5,
            targets: vec![SpellTarget::SelfOnly, SpellTarget::Player],
            effect: SpellEffect::Heal(20),
        },
        SpellDef {
            id: 2,
            name: "Group Heal".into(),
            cast_time: 150,
            tp_cost: 20,
            targets: vec![SpellTarget::Group],
            effect: SpellEffect::Heal(15),
        },
        SpellDef {
            id: 3,
            name: "Fire Bolt".into(),
            cast_time: 80,
            tp_cost: 8,
            targets: vec![SpellTarget::Npc],
            effect: SpellEffect::Damage { min: 8, max: 14 },
        },
        SpellDef {
            id: 4,
            name: "Spark".into(),
            cast_time: 0,
            tp_cost: 2,
            targets: vec![SpellTarget::Npc],
            effect: SpellEffect::Damage { min: 3, max: 3 },
        },
    ]
}
