//! Per-character quest progress.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use realm_shared::ItemStats;

pub type QuestId = i16;

/// State every quest starts in
pub const QUEST_BEGIN_STATE: &str = "begin";

/// Live state of one quest as the character is experiencing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestContext {
    pub quest_id: QuestId,
    pub state: String,
    pub progress: String,
    /// Stat modifiers the quest currently grants
    pub modifiers: ItemStats,
}

impl QuestContext {
    pub fn new(quest_id: QuestId) -> Self {
        Self {
            quest_id,
            state: QUEST_BEGIN_STATE.to_string(),
            progress: String::new(),
            modifiers: ItemStats::default(),
        }
    }
}

/// Shared handle to a quest context. The character holds one; a quest engine
/// may hold more. The context is dropped with the last handle.
pub type QuestHandle = Rc<RefCell<QuestContext>>;

/// Snapshot of a quest that is no longer active
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestSnapshot {
    pub quest_id: QuestId,
    pub state: String,
    pub progress: String,
}

/// Active quest contexts plus snapshots of inactive ones
#[derive(Debug, Default)]
pub struct QuestLog {
    active: HashMap<QuestId, QuestHandle>,
    inactive: BTreeMap<QuestId, QuestSnapshot>,
}

impl QuestLog {
    /// Handle to the active context, created on first access
    pub fn get_or_create(&mut self, quest_id: QuestId) -> QuestHandle {
        self.active
            .entry(quest_id)
            .or_insert_with(|| Rc::new(RefCell::new(QuestContext::new(quest_id))))
            .clone()
    }

    /// Drop the active context and keep a snapshot of it. An earlier
    /// snapshot of the same quest is replaced.
    pub fn reset(&mut self, quest_id: QuestId) -> bool {
        let Some(handle) = self.active.remove(&quest_id) else {
            return false;
        };

        let context = handle.borrow();
        self.inactive.insert(
            quest_id,
            QuestSnapshot {
                quest_id,
                state: context.state.clone(),
                progress: context.progress.clone(),
            },
        );
        true
    }

    pub fn is_active(&self, quest_id: QuestId) -> bool {
        self.active.contains_key(&quest_id)
    }

    /// Inactive snapshots in quest id order
    pub fn inactive(&self) -> impl Iterator<Item = &QuestSnapshot> {
        self.inactive.values()
    }

    /// Sum of modifiers granted by active quests
    pub fn modifiers(&self) -> ItemStats {
        let mut total = ItemStats::default();
        for handle in self.active.values() {
            total += handle.borrow().modifiers;
        }
        total
    }
}
