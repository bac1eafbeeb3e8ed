//! Server-side NPC that spells can target.

use super::character::MapId;

/// Server-side NPC state
#[derive(Debug)]
pub struct ServerNpc {
    /// Index of this NPC in the world
    pub index: u16,
    pub map: MapId,
    pub hp: i16,
    pub max_hp: i16,
    /// Experience awarded to whoever kills it
    pub experience_reward: i32,
    pub alive: bool,
}

impl ServerNpc {
    pub fn new(index: u16, map: MapId, max_hp: i16, experience_reward: i32) -> Self {
        Self {
            index,
            map,
            hp: max_hp,
            max_hp,
            experience_reward,
            alive: true,
        }
    }

    /// Take damage. Returns true if this hit killed it.
    pub fn take_damage(&mut self, damage: i16) -> bool {
        if !self.alive {
            return false;
        }
        self.hp = self.hp.saturating_sub(damage.max(0)).max(0);
        if self.hp == 0 {
            self.alive = false;
            return true;
        }
        false
    }

    pub fn hp_percent(&self) -> u8 {
        super::character::percent(self.hp, self.max_hp)
    }
}
