//! Server-side character aggregate.
//!
//! A character owns its inventory, paperdoll, spell book and quest log.
//! Relations to other entities (party, trade partner, pending requests) are
//! stored as ids and resolved through the world.

use log::{debug, info, warn};
use realm_shared::{
    InventoryEntry, ItemStats, Paperdoll, PartyMemberInfo, PartyRequestKind, PlayerId,
    ServerMessage, SpellEntry,
};

use crate::config::GameContext;
use crate::persistence::{codec, CharacterRecord};
use crate::timestamp::Timestamp;
use crate::world::PartyId;

use super::hidden::HiddenFlags;
use super::quest::{QuestHandle, QuestId, QuestLog};
use super::spell_cast::{PendingSpell, SpellCast};

pub type MapId = i16;

/// Map new characters start on
pub const SPAWN_MAP: MapId = 1;

/// Hard ceiling on carry weight
const WEIGHT_CAP: i32 = 250;

/// `value / max` as a whole percentage in `0..=100`
pub fn percent(value: i16, max: i16) -> u8 {
    if max <= 0 {
        return 0;
    }
    (f64::from(value) / f64::from(max) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// The six primary stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoreStats {
    pub str: i16,
    pub intl: i16,
    pub wis: i16,
    pub agi: i16,
    pub con: i16,
    pub cha: i16,
}

impl CoreStats {
    fn combined(&self, other: &CoreStats) -> CoreStats {
        CoreStats {
            str: self.str.saturating_add(other.str),
            intl: self.intl.saturating_add(other.intl),
            wis: self.wis.saturating_add(other.wis),
            agi: self.agi.saturating_add(other.agi),
            con: self.con.saturating_add(other.con),
            cha: self.cha.saturating_add(other.cha),
        }
    }
}

/// Our side of an open trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeLink {
    pub partner: PlayerId,
    pub agreed: bool,
}

/// A party invitation waiting for this character's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartyRequest {
    pub from: PlayerId,
    pub kind: PartyRequestKind,
}

/// Server-side character state
#[derive(Debug)]
pub struct Character {
    pub player_id: PlayerId,
    /// Database id, 0 for characters never saved
    pub db_id: i64,
    pub name: String,
    pub map: MapId,
    /// Not placed on any map (warping, loading)
    pub nowhere: bool,
    pub level: u8,
    pub exp: i32,
    pub hp: i16,
    pub tp: i16,
    pub base: CoreStats,
    /// Bonuses from equipment and quests, rebuilt by `calculate_stats`
    pub adjusted: CoreStats,
    pub stat_points: i16,
    pub skill_points: i16,
    pub max_hp: i16,
    pub max_tp: i16,
    pub max_sp: i16,
    pub min_damage: i16,
    pub max_damage: i16,
    pub accuracy: i16,
    pub evade: i16,
    pub armor: i16,
    pub weight: i16,
    pub max_weight: i16,
    pub hidden: HiddenFlags,
    /// Time of the last action
    pub timestamp: Timestamp,
    pub inventory: Vec<InventoryEntry>,
    pub paperdoll: Paperdoll,
    pub spells: Vec<SpellEntry>,
    pub trade: Option<TradeLink>,
    /// Items offered in the open trade
    pub trade_inventory: Vec<InventoryEntry>,
    pub trade_request_from: Option<PlayerId>,
    pub party: Option<PartyId>,
    pub party_request: Option<PartyRequest>,
    pub spell: SpellCast,
    pub quests: QuestLog,
}

impl Character {
    pub fn new(player_id: PlayerId, name: String) -> Self {
        Self {
            player_id,
            db_id: 0,
            name,
            map: SPAWN_MAP,
            nowhere: false,
            level: 0,
            exp: 0,
            hp: 10,
            tp: 10,
            base: CoreStats::default(),
            adjusted: CoreStats::default(),
            stat_points: 0,
            skill_points: 0,
            max_hp: 10,
            max_tp: 10,
            max_sp: 20,
            min_damage: 1,
            max_damage: 2,
            accuracy: 0,
            evade: 0,
            armor: 0,
            weight: 0,
            max_weight: 70,
            hidden: HiddenFlags::NONE,
            timestamp: Timestamp::UNSET,
            inventory: Vec::new(),
            paperdoll: Paperdoll::default(),
            spells: Vec::new(),
            trade: None,
            trade_inventory: Vec::new(),
            trade_request_from: None,
            party: None,
            party_request: None,
            spell: SpellCast::Idle,
            quests: QuestLog::default(),
        }
    }

    /// 4-12 lowercase ASCII letters
    pub fn valid_name(name: &str) -> bool {
        (4..=12).contains(&name.len()) && name.bytes().all(|b| b.is_ascii_lowercase())
    }

    /// Base plus adjusted stats
    pub fn display(&self) -> CoreStats {
        self.base.combined(&self.adjusted)
    }

    pub fn hp_percent(&self) -> u8 {
        percent(self.hp, self.max_hp)
    }

    pub fn member_info(&self, is_leader: bool) -> PartyMemberInfo {
        PartyMemberInfo {
            id: self.player_id,
            is_leader,
            level: self.level,
            hp_percent: self.hp_percent(),
            name: self.name.clone(),
        }
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Units of `item` held. While trading, units on offer are not counted
    /// unless `include_trade` is set.
    pub fn has_item(&self, item: i16, include_trade: bool) -> i32 {
        let held = self
            .inventory
            .iter()
            .find(|e| e.id == item)
            .map(|e| e.amount)
            .unwrap_or(0);

        if include_trade || !self.is_trading() {
            return held;
        }

        let offered = self
            .trade_inventory
            .iter()
            .find(|e| e.id == item)
            .map(|e| e.amount)
            .unwrap_or(0);
        (held - offered).max(0)
    }

    /// Add to an existing stack or start a new one. Fails on non-positive
    /// amounts, unknown items and stacks that would pass `MaxItem`.
    pub fn add_item(&mut self, ctx: &GameContext, item: i16, amount: i32) -> bool {
        if amount <= 0 || ctx.item(item).is_none() {
            return false;
        }
        let max_item = i64::from(ctx.config.max_item());

        if let Some(entry) = self.inventory.iter_mut().find(|e| e.id == item) {
            let total = i64::from(entry.amount) + i64::from(amount);
            if total > max_item {
                debug!("{} cannot stack {} more of item {}", self.name, amount, item);
                return false;
            }
            entry.amount = total as i32;
            self.recalc_weight(ctx);
            return true;
        }

        if i64::from(amount) > max_item {
            return false;
        }
        self.inventory.push(InventoryEntry::new(item, amount));
        self.recalc_weight(ctx);
        true
    }

    /// Remove units of `item`. Removing the whole stack or more deletes the
    /// entry.
    pub fn del_item(&mut self, ctx: &GameContext, item: i16, amount: i32) -> bool {
        if amount <= 0 {
            return false;
        }
        match self.inventory.iter().position(|e| e.id == item) {
            Some(index) => {
                self.del_item_at(ctx, index, amount);
                true
            }
            None => false,
        }
    }

    /// Remove units from the entry at `index`. Returns the index of the next
    /// entry to visit, so callers can walk the inventory while deleting.
    pub fn del_item_at(&mut self, ctx: &GameContext, index: usize, amount: i32) -> usize {
        let Some(entry) = self.inventory.get_mut(index) else {
            return self.inventory.len();
        };
        if amount <= 0 {
            return index + 1;
        }

        let next = if entry.amount - amount <= 0 {
            self.inventory.remove(index);
            index
        } else {
            entry.amount -= amount;
            index + 1
        };
        self.recalc_weight(ctx);
        next
    }

    /// How many more units of `item` fit before the stack reaches
    /// `max_amount` (and never past `MaxItem`)
    pub fn can_hold_item(&self, ctx: &GameContext, item: i16, max_amount: i32) -> i32 {
        let cap = max_amount.min(ctx.config.max_item());
        (cap - self.has_item(item, true)).max(0)
    }

    /// Remove every inventory entry, returning what was removed
    pub fn drop_all(&mut self, ctx: &GameContext) -> Vec<InventoryEntry> {
        let mut dropped = Vec::with_capacity(self.inventory.len());
        let mut index = 0;
        while index < self.inventory.len() {
            let entry = self.inventory[index];
            dropped.push(entry);
            index = self.del_item_at(ctx, index, entry.amount);
        }
        dropped
    }

    // =========================================================================
    // Trade snapshot
    // =========================================================================

    pub fn is_trading(&self) -> bool {
        self.trade.is_some()
    }

    pub fn trade_partner(&self) -> Option<PlayerId> {
        self.trade.map(|t| t.partner)
    }

    pub fn trade_agreed(&self) -> bool {
        self.trade.map(|t| t.agreed).unwrap_or(false)
    }

    /// Offer `amount` of `item`, replacing an earlier offer of the same item.
    /// The offer is clamped to what is held.
    pub fn add_trade_item(&mut self, ctx: &GameContext, item: i16, amount: i32) -> bool {
        if !self.is_trading() || amount <= 0 || amount > ctx.config.max_trade() || ctx.item(item).is_none() {
            return false;
        }

        let held = self.has_item(item, true);
        if held <= 0 {
            return false;
        }
        let amount = amount.min(held);

        match self.trade_inventory.iter_mut().find(|e| e.id == item) {
            Some(entry) => entry.amount = amount,
            None => self.trade_inventory.push(InventoryEntry::new(item, amount)),
        }
        true
    }

    pub fn del_trade_item(&mut self, item: i16) -> bool {
        let before = self.trade_inventory.len();
        self.trade_inventory.retain(|e| e.id != item);
        self.trade_inventory.len() != before
    }

    /// Forget our side of the trade
    pub fn clear_trade(&mut self) {
        self.trade = None;
        self.trade_inventory.clear();
    }

    // =========================================================================
    // Spells
    // =========================================================================

    pub fn has_spell(&self, spell: i16) -> bool {
        self.spells.iter().any(|s| s.id == spell)
    }

    pub fn spell_level(&self, spell: i16) -> u8 {
        self.spells
            .iter()
            .find(|s| s.id == spell)
            .map(|s| s.level)
            .unwrap_or(0)
    }

    pub fn add_spell(&mut self, spell: i16) -> bool {
        if spell <= 0 || self.has_spell(spell) {
            return false;
        }
        self.spells.push(SpellEntry::new(spell, 0));
        true
    }

    pub fn del_spell(&mut self, spell: i16) -> bool {
        let before = self.spells.len();
        self.spells.retain(|s| s.id != spell);
        self.spells.len() != before
    }

    /// Drop a cast in flight, discarding its timer
    pub fn cancel_spell(&mut self) -> Option<PendingSpell> {
        self.spell.cancel()
    }

    // =========================================================================
    // Equipment
    // =========================================================================

    /// Move one `item` from the inventory into its paperdoll slot
    pub fn equip(&mut self, ctx: &GameContext, item: i16, subloc: u8) -> bool {
        let Some(def) = ctx.item(item) else {
            return false;
        };
        let Some(location) = def.item_type.equip_location(subloc) else {
            debug!("{} tried to equip unequippable item {}", self.name, item);
            return false;
        };

        if self.has_item(item, false) < 1
            || self.paperdoll.get(location) != 0
            || self.level < def.level_requirement
        {
            return false;
        }

        self.del_item(ctx, item, 1);
        self.paperdoll.set(location, item);
        self.calculate_stats(ctx, true);
        true
    }

    /// Move an equipped `item` back into the inventory
    pub fn unequip(&mut self, ctx: &GameContext, item: i16, subloc: u8) -> bool {
        if item == 0 {
            return false;
        }
        let Some(location) = ctx.item(item).and_then(|def| def.item_type.equip_location(subloc)) else {
            return false;
        };
        if self.paperdoll.get(location) != item {
            return false;
        }

        if !self.add_item(ctx, item, 1) {
            return false;
        }
        self.paperdoll.clear(location);
        self.calculate_stats(ctx, true);
        true
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// Rebuild adjusted and derived stats from base stats, equipment and,
    /// when `trigger_quests` is set, active quest modifiers.
    pub fn calculate_stats(&mut self, ctx: &GameContext, trigger_quests: bool) {
        let mut bonus = ItemStats::default();
        for id in self.paperdoll.equipped() {
            if let Some(def) = ctx.item(id) {
                bonus += def.stats;
            }
        }
        if trigger_quests {
            bonus += self.quests.modifiers();
        }

        self.adjusted = CoreStats {
            str: bonus.str,
            intl: bonus.intl,
            wis: bonus.wis,
            agi: bonus.agi,
            con: bonus.con,
            cha: bonus.cha,
        };

        let stats = self.display();
        let level = i32::from(self.level);
        let (str, intl, wis, agi, con) = (
            i32::from(stats.str),
            i32::from(stats.intl),
            i32::from(stats.wis),
            i32::from(stats.agi),
            i32::from(stats.con),
        );

        self.max_hp = clamp_i16(10 + level * 5 + con * 2 + i32::from(bonus.hp)).max(1);
        self.max_tp = clamp_i16(10 + level * 3 + intl * 2 + wis + i32::from(bonus.tp)).max(0);
        self.max_sp = clamp_i16(20 + level * 2);
        self.min_damage = clamp_i16(1 + str / 2 + i32::from(bonus.min_damage));
        self.max_damage = clamp_i16(2 + str / 2 + i32::from(bonus.max_damage)).max(self.min_damage);
        self.accuracy = clamp_i16(agi / 2 + i32::from(bonus.accuracy));
        self.evade = clamp_i16(agi / 2 + i32::from(bonus.evade));
        self.armor = clamp_i16(con / 2 + i32::from(bonus.armor));
        self.max_weight = clamp_i16((70 + str).min(WEIGHT_CAP));
        self.recalc_weight(ctx);

        self.hp = self.hp.min(self.max_hp);
        self.tp = self.tp.min(self.max_tp);
    }

    /// Carried weight of inventory plus equipment, capped at `WEIGHT_CAP`
    fn recalc_weight(&mut self, ctx: &GameContext) {
        let carried: i64 = self
            .inventory
            .iter()
            .map(|e| (e.id, i64::from(e.amount)))
            .chain(self.paperdoll.equipped().map(|id| (id, 1)))
            .filter_map(|(id, amount)| ctx.item(id).map(|def| i64::from(def.weight) * amount))
            .sum();
        self.weight = carried.min(WEIGHT_CAP as i64) as i16;
    }

    /// Add experience. At most one level is gained per call, even if several
    /// thresholds were crossed. Returns whether a level was gained.
    pub fn gain_exp(&mut self, ctx: &GameContext, amount: i32) -> bool {
        self.exp = self.exp.saturating_add(amount);

        let next = usize::from(self.level) + 1;
        if self.level >= ctx.config.max_level() || self.exp < ctx.exp_table.threshold(next) {
            return false;
        }

        self.level += 1;
        self.stat_points = self.stat_points.saturating_add(ctx.config.stat_per_level());
        self.skill_points = self.skill_points.saturating_add(ctx.config.skill_per_level());
        self.calculate_stats(ctx, true);
        info!("{} reached level {}", self.name, self.level);
        true
    }

    // =========================================================================
    // Quests
    // =========================================================================

    /// Active context for `quest`, created on first access
    pub fn get_quest(&mut self, quest: QuestId) -> QuestHandle {
        if !self.quests.is_active(quest) {
            debug!("{} starts quest {}", self.name, quest);
        }
        self.quests.get_or_create(quest)
    }

    /// Deactivate `quest`, keeping a snapshot of where it stood. Its stat
    /// modifiers stop applying immediately.
    pub fn reset_quest(&mut self, ctx: &GameContext, quest: QuestId) -> bool {
        if !self.quests.reset(quest) {
            return false;
        }
        if let Some(snapshot) = self.quests.inactive().find(|s| s.quest_id == quest) {
            debug!(
                "{} parked quest {} at state '{}' ({})",
                self.name, quest, snapshot.state, snapshot.progress
            );
        }
        self.calculate_stats(ctx, true);
        true
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    pub fn hide(&mut self, flags: HiddenFlags) {
        self.hidden.insert(flags);
    }

    pub fn unhide(&mut self, flags: HiddenFlags) {
        self.hidden.remove(flags);
    }

    pub fn is_hide_invisible(&self) -> bool {
        self.hidden.is_invisible()
    }

    pub fn is_hide_online(&self) -> bool {
        self.hidden.is_online()
    }

    pub fn is_hide_npc(&self) -> bool {
        self.hidden.is_npc()
    }

    pub fn is_hide_admin(&self) -> bool {
        self.hidden.is_admin()
    }

    pub fn is_hide_warp(&self) -> bool {
        self.hidden.is_warp()
    }

    // =========================================================================
    // Messages and persistence
    // =========================================================================

    pub fn stats_update(&self) -> ServerMessage {
        ServerMessage::StatsUpdate {
            level: self.level,
            experience: self.exp,
            stat_points: self.stat_points,
            skill_points: self.skill_points,
            hp: self.hp,
            max_hp: self.max_hp,
            tp: self.tp,
            max_tp: self.max_tp,
        }
    }

    pub fn inventory_update(&self) -> ServerMessage {
        ServerMessage::InventoryUpdate {
            inventory: self.inventory.clone(),
            paperdoll: self.paperdoll,
        }
    }

    pub fn to_record(&self) -> CharacterRecord {
        CharacterRecord {
            id: self.db_id,
            name: self.name.clone(),
            map_id: self.map,
            level: self.level as i16,
            experience: self.exp,
            hp: self.hp,
            tp: self.tp,
            str: self.base.str,
            intl: self.base.intl,
            wis: self.base.wis,
            agi: self.base.agi,
            con: self.base.con,
            cha: self.base.cha,
            stat_points: self.stat_points,
            skill_points: self.skill_points,
            hidden: self.hidden.bits() as i32,
            inventory: codec::serialize_items(&self.inventory),
            spells: codec::serialize_spells(&self.spells),
            paperdoll: codec::serialize_doll(&self.paperdoll),
        }
    }

    /// Rebuild a character from storage. Derived stats still need
    /// `calculate_stats`.
    pub fn from_record(player_id: PlayerId, record: &CharacterRecord) -> Self {
        let mut character = Character::new(player_id, record.name.clone());
        character.db_id = record.id;
        character.map = record.map_id;
        character.level = record.level.clamp(0, u8::MAX as i16) as u8;
        character.exp = record.experience;
        character.hp = record.hp;
        character.tp = record.tp;
        character.base = CoreStats {
            str: record.str,
            intl: record.intl,
            wis: record.wis,
            agi: record.agi,
            con: record.con,
            cha: record.cha,
        };
        character.stat_points = record.stat_points;
        character.skill_points = record.skill_points;
        character.hidden = HiddenFlags::from_bits(record.hidden as u32);
        character.inventory = codec::deserialize_items(&record.inventory);
        character.spells = codec::deserialize_spells(&record.spells);
        character.paperdoll = codec::deserialize_doll(&record.paperdoll).unwrap_or_else(|e| {
            warn!("Character {} has a damaged paperdoll ({}), unequipping all", record.id, e);
            Paperdoll::default()
        });
        // raise max hp/tp so stored hp survives until stats are recalculated
        character.max_hp = character.hp.max(character.max_hp);
        character.max_tp = character.tp.max(character.max_tp);
        character
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, GameContext};
    use realm_shared::EquipLocation;

    fn ctx() -> GameContext {
        GameContext::new(Config::default())
    }

    fn character() -> Character {
        let mut c = Character::new(1, "alice".into());
        c.calculate_stats(&ctx(), true);
        c
    }

    #[test]
    fn test_add_item_merges_stacks() {
        let ctx = ctx();
        let mut c = character();
        assert!(c.add_item(&ctx, 2, 5));
        assert!(c.add_item(&ctx, 2, 3));
        assert!(c.add_item(&ctx, 15, 1));
        assert_eq!(c.inventory, vec![InventoryEntry::new(2, 8), InventoryEntry::new(15, 1)]);

        assert!(!c.add_item(&ctx, 2, 0));
        assert!(!c.add_item(&ctx, 2, -4));
        assert!(!c.add_item(&ctx, 999, 1));
    }

    #[test]
    fn test_add_item_respects_max_item() {
        let mut config = Config::default();
        config.set("MaxItem", 10.0);
        let ctx = GameContext::new(config);
        let mut c = character();

        assert!(c.add_item(&ctx, 1, 8));
        assert!(!c.add_item(&ctx, 1, 3));
        assert_eq!(c.has_item(1, false), 8);
        assert!(c.add_item(&ctx, 1, 2));
        assert!(!c.add_item(&ctx, 2, 11));
    }

    #[test]
    fn test_del_item_never_goes_negative() {
        let ctx = ctx();
        let mut c = character();
        c.add_item(&ctx, 2, 5);

        assert!(c.del_item(&ctx, 2, 2));
        assert_eq!(c.has_item(2, false), 3);

        // more than held clamps and removes the entry
        assert!(c.del_item(&ctx, 2, 10));
        assert_eq!(c.has_item(2, false), 0);
        assert!(c.inventory.is_empty());

        assert!(!c.del_item(&ctx, 2, 1));
        c.add_item(&ctx, 2, 1);
        assert!(!c.del_item(&ctx, 2, 0));
    }

    #[test]
    fn test_drop_all_walks_with_positional_delete() {
        let ctx = ctx();
        let mut c = character();
        c.add_item(&ctx, 1, 100);
        c.add_item(&ctx, 2, 3);
        c.add_item(&ctx, 15, 7);

        let dropped = c.drop_all(&ctx);
        assert_eq!(dropped.len(), 3);
        assert_eq!(dropped[2], InventoryEntry::new(15, 7));
        assert!(c.inventory.is_empty());
        assert_eq!(c.weight, 0);
        assert_eq!(c.del_item_at(&ctx, 5, 1), 0);
    }

    #[test]
    fn test_can_hold_item_accounts_for_stack() {
        let ctx = ctx();
        let mut c = character();
        assert_eq!(c.can_hold_item(&ctx, 2, 10), 10);
        c.add_item(&ctx, 2, 4);
        assert_eq!(c.can_hold_item(&ctx, 2, 10), 6);
        assert_eq!(c.can_hold_item(&ctx, 2, 3), 0);
        // pure query
        assert_eq!(c.has_item(2, false), 4);
    }

    #[test]
    fn test_trade_snapshot_hides_offered_units() {
        let ctx = ctx();
        let mut c = character();
        c.add_item(&ctx, 2, 5);

        // no open trade
        assert!(!c.add_trade_item(&ctx, 2, 1));

        c.trade = Some(TradeLink { partner: 2, agreed: false });
        assert!(c.add_trade_item(&ctx, 2, 3));
        assert_eq!(c.has_item(2, false), 2);
        assert_eq!(c.has_item(2, true), 5);

        // re-offering replaces and clamps to what is held
        assert!(c.add_trade_item(&ctx, 2, 50));
        assert_eq!(c.trade_inventory, vec![InventoryEntry::new(2, 5)]);

        assert!(!c.add_trade_item(&ctx, 15, 1));
        assert!(!c.add_trade_item(&ctx, 2, 0));

        assert!(c.del_trade_item(2));
        assert!(!c.del_trade_item(2));

        c.add_trade_item(&ctx, 2, 1);
        c.clear_trade();
        assert!(!c.is_trading());
        assert!(c.trade_inventory.is_empty());
    }

    #[test]
    fn test_spells_are_unique() {
        let mut c = character();
        assert!(c.add_spell(1));
        assert!(!c.add_spell(1));
        assert!(c.has_spell(1));
        assert_eq!(c.spell_level(1), 0);
        assert_eq!(c.spell_level(7), 0);

        c.spells[0].level = 4;
        assert_eq!(c.spell_level(1), 4);

        assert!(c.del_spell(1));
        assert!(!c.del_spell(1));
        assert!(!c.has_spell(1));
    }

    #[test]
    fn test_equip_and_unequip_move_items() {
        let ctx = ctx();
        let mut c = character();
        c.add_item(&ctx, 3, 1);
        let base_max_damage = c.max_damage;

        assert!(c.equip(&ctx, 3, 0));
        assert_eq!(c.paperdoll.get(EquipLocation::Weapon), 3);
        assert_eq!(c.has_item(3, false), 0);
        assert_eq!(c.max_damage, base_max_damage + 5);

        // nothing left to equip
        assert!(!c.equip(&ctx, 3, 0));

        assert!(c.unequip(&ctx, 3, 0));
        assert_eq!(c.paperdoll.get(EquipLocation::Weapon), 0);
        assert_eq!(c.has_item(3, false), 1);
        assert_eq!(c.max_damage, base_max_damage);

        assert!(!c.unequip(&ctx, 3, 0));
    }

    #[test]
    fn test_equip_rejects_invalid_requests() {
        let ctx = ctx();
        let mut c = character();
        c.add_item(&ctx, 2, 1);
        c.add_item(&ctx, 9, 2);
        c.add_item(&ctx, 10, 2);

        // not equippable
        assert!(!c.equip(&ctx, 2, 0));
        // unknown item
        assert!(!c.equip(&ctx, 999, 0));
        // level requirement
        assert!(!c.equip(&ctx, 9, 0));
        // bad subloc
        assert!(!c.equip(&ctx, 10, 2));

        assert!(c.equip(&ctx, 10, 0));
        assert!(!c.equip(&ctx, 10, 0));
        assert!(c.equip(&ctx, 10, 1));
        assert_eq!(c.paperdoll.get(EquipLocation::Armlet1), 10);
        assert_eq!(c.paperdoll.get(EquipLocation::Armlet2), 10);
        assert_eq!(c.display().con, 4);

        // the armlet is in slot 1, not in the ring slot
        assert!(!c.unequip(&ctx, 9, 0));
    }

    #[test]
    fn test_quest_modifiers_only_with_trigger() {
        let ctx = ctx();
        let mut c = character();
        c.get_quest(1).borrow_mut().modifiers.agi = 4;

        c.calculate_stats(&ctx, false);
        assert_eq!(c.display().agi, 0);

        c.calculate_stats(&ctx, true);
        assert_eq!(c.display().agi, 4);
        assert_eq!(c.evade, 2);

        assert!(c.reset_quest(&ctx, 1));
        assert_eq!(c.display().agi, 0);
        assert_eq!(c.evade, 0);
        assert!(!c.reset_quest(&ctx, 1));
    }

    #[test]
    fn test_weight_follows_inventory_changes() {
        let ctx = ctx();
        let mut c = character();
        let sword = i32::from(ctx.item(3).unwrap().weight);

        assert!(c.add_item(&ctx, 3, 10));
        assert_eq!(i32::from(c.weight), sword * 10);

        assert!(c.del_item(&ctx, 3, 4));
        assert_eq!(i32::from(c.weight), sword * 6);

        c.drop_all(&ctx);
        assert_eq!(c.weight, 0);
    }

    #[test]
    fn test_undefined_item_cannot_be_offered() {
        let ctx = ctx();
        let mut c = character();
        c.inventory.push(InventoryEntry::new(500, 3));
        c.trade = Some(TradeLink { partner: 2, agreed: false });

        assert!(!c.add_trade_item(&ctx, 500, 3));
        assert!(c.trade_inventory.is_empty());
    }

    #[test]
    fn test_hp_is_clamped_after_unequip() {
        let ctx = ctx();
        let mut c = character();
        c.add_item(&ctx, 4, 1);
        assert!(c.equip(&ctx, 4, 0));
        c.hp = c.max_hp;
        let boosted = c.max_hp;

        assert!(c.unequip(&ctx, 4, 0));
        assert_eq!(c.max_hp, boosted - 5);
        assert_eq!(c.hp, c.max_hp);
    }

    #[test]
    fn test_gain_exp_levels_once_per_call() {
        let ctx = ctx();
        let mut c = character();

        // enough for several levels at once
        assert!(c.gain_exp(&ctx, 10_000));
        assert_eq!(c.level, 1);
        assert_eq!(c.stat_points, 3);
        assert_eq!(c.skill_points, 3);
        assert_eq!(c.max_hp, 15);

        assert!(c.gain_exp(&ctx, 0));
        assert_eq!(c.level, 2);

        let mut capped = Config::default();
        capped.set("MaxLevel", 2.0);
        let capped = GameContext::new(capped);
        assert!(!c.gain_exp(&capped, 1_000_000));
        assert_eq!(c.level, 2);
    }

    #[test]
    fn test_hp_percent_rounds() {
        let mut c = character();
        c.max_hp = 3;
        c.hp = 2;
        assert_eq!(c.hp_percent(), 67);
        c.max_hp = 0;
        assert_eq!(c.hp_percent(), 0);
    }

    #[test]
    fn test_valid_name() {
        assert!(Character::valid_name("alice"));
        assert!(!Character::valid_name("bob"));
        assert!(!Character::valid_name("Alice"));
        assert!(!Character::valid_name("averyveryverylongname"));
    }

    #[test]
    fn test_record_round_trip() {
        let ctx = ctx();
        let mut c = character();
        c.db_id = 42;
        c.level = 7;
        c.base.str = 12;
        c.add_item(&ctx, 1, 250);
        c.add_item(&ctx, 7, 1);
        c.equip(&ctx, 7, 0);
        c.add_spell(3);
        c.hide(HiddenFlags::INVISIBLE);

        let record = c.to_record();
        assert_eq!(record.inventory, "1,250;");
        assert_eq!(record.paperdoll, "7,0,0,0,0,0,0,0,0,0,0,0,0,0,0,");

        let mut restored = Character::from_record(9, &record);
        restored.calculate_stats(&ctx, true);
        assert_eq!(restored.player_id, 9);
        assert_eq!(restored.db_id, 42);
        assert_eq!(restored.inventory, c.inventory);
        assert_eq!(restored.paperdoll, c.paperdoll);
        assert_eq!(restored.spells, c.spells);
        assert_eq!(restored.display(), c.display());
        assert!(restored.is_hide_invisible());
    }

    #[test]
    fn test_damaged_doll_loads_empty() {
        let mut record = character().to_record();
        record.paperdoll = "3,0,".into();
        record.inventory = "2,5;oops;".into();
        let restored = Character::from_record(1, &record);
        assert!(restored.paperdoll.is_empty());
        assert_eq!(restored.inventory, vec![InventoryEntry::new(2, 5)]);
    }
}
