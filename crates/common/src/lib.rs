//! Shared types: player identity, skills, and the persisted player record.
//!
//! # Invariants
//! - `PlayerRecord::new_player()` is deterministic; two calls always compare equal.
//! - Skill arrays are always indexed in canonical `Skill::ALL` order.

pub mod record;
pub mod types;

pub use record::{Inventory, ItemStack, PlayerRecord};
pub use types::{ChatModes, IdError, PlayerId, Skill, SkillState, SKILL_COUNT};

pub fn crate_info() -> &'static str {
    "keepsake-common v0.1.0"
}
