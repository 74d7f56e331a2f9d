//! Progression engine - streaks, weighted reward rolls, inventory
//!
//! Leaf component with no audio dependencies. All randomness is injected
//! via `rand::Rng` so distributions are testable; all persistence goes
//! through the [crate::storage::ProfileRepository] trait.

pub mod engine;
pub mod inventory;
pub mod rarity;
pub mod rewards;
pub mod streak;

pub use engine::{ProgressionEngine, StreakOutcome};
pub use inventory::{InventoryStats, ProfileData};
pub use rarity::{
    badge_info, get_streak_bonus, roll_rarity, BadgeInfo, Rarity, StreakBonus, BADGES,
    STREAK_BONUSES,
};
pub use rewards::{draw_reward, CatalogItem, RewardItem};
pub use streak::StreakRecord;
