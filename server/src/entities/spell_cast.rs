//! Spell-cast state of a character.
//!
//! `Idle -> Casting -> Ready -> Idle`. Starting a cast arms a single timer;
//! the world tick fires it, which makes the spell ready. Resolving or
//! cancelling a spell always returns to `Idle`.

use realm_shared::SpellTarget;

use crate::timestamp::Timestamp;

/// A spell between being started and being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSpell {
    pub spell_id: i16,
    pub target: SpellTarget,
    pub target_id: u16,
    /// When the timer was armed
    pub armed_at: Timestamp,
    /// Cast time in centiseconds
    pub delay: i32,
}

impl PendingSpell {
    /// When the timer is due to fire
    pub fn ready_at(&self) -> Timestamp {
        self.armed_at.add(self.delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpellCast {
    #[default]
    Idle,
    Casting(PendingSpell),
    Ready(PendingSpell),
}

impl SpellCast {
    /// Arm the timer. Any spell already in flight is discarded.
    pub fn begin(&mut self, spell: PendingSpell) {
        *self = SpellCast::Casting(spell);
    }

    /// Fire the timer if its delay has elapsed at `now`
    pub fn fire_if_due(&mut self, now: Timestamp) -> bool {
        if let SpellCast::Casting(spell) = *self {
            if now - spell.armed_at >= spell.delay {
                *self = SpellCast::Ready(spell);
                return true;
            }
        }
        false
    }

    /// Take a ready spell for resolution, leaving `Idle`
    pub fn take_ready(&mut self) -> Option<PendingSpell> {
        match *self {
            SpellCast::Ready(spell) => {
                *self = SpellCast::Idle;
                Some(spell)
            }
            _ => None,
        }
    }

    /// Abort a cast in flight. Returns the discarded spell.
    pub fn cancel(&mut self) -> Option<PendingSpell> {
        match std::mem::take(self) {
            SpellCast::Casting(spell) | SpellCast::Ready(spell) => Some(spell),
            SpellCast::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SpellCast::Idle)
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        matches!(self, SpellCast::Ready(_))
    }

    pub fn pending(&self) -> Option<&PendingSpell> {
        match self {
            SpellCast::Casting(spell) | SpellCast::Ready(spell) => Some(spell),
            SpellCast::Idle => None,
        }
    }
}
