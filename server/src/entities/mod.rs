//! Server-side entity definitions.

pub mod character;
mod hidden;
mod npc;
pub mod quest;
mod spell_cast;

pub use character::{Character, CoreStats, MapId, PartyRequest, TradeLink};
pub use hidden::HiddenFlags;
pub use npc::ServerNpc;
pub use quest::{QuestContext, QuestHandle, QuestId, QuestLog};
pub use spell_cast::{PendingSpell, SpellCast};
