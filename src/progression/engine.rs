//! ProgressionEngine: streaks, rewards, and equipment over a repository
//!
//! The engine owns the in-memory profile, which stays authoritative for
//! the session; every mutation is followed by a synchronous save. A failed
//! save is logged and the session continues (the update is simply not
//! durable). A failed load falls back to an empty profile rather than
//! failing the caller.

use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use rand::Rng;

use crate::error::{log_progression_error, ProgressionError};
use crate::progression::inventory::{InventoryStats, ProfileData};
use crate::progression::rarity::{get_streak_bonus, StreakBonus, STREAK_BONUSES};
use crate::progression::rewards::{draw_reward, CatalogItem, RewardItem};
use crate::storage::ProfileRepository;

/// Result of a streak update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakOutcome {
    /// Streak value after the update
    pub streak: u32,
    /// Badges earned by this update, in threshold order
    pub newly_earned_badges: Vec<String>,
}

/// Progression state machine for one profile
pub struct ProgressionEngine {
    repository: Box<dyn ProfileRepository>,
    profile_id: String,
    profile: ProfileData,
}

impl ProgressionEngine {
    /// Open a profile, creating it lazily on first access
    ///
    /// A storage read failure is logged and degrades to an empty profile;
    /// it never fails the caller.
    pub fn open(repository: Box<dyn ProfileRepository>, profile_id: impl Into<String>) -> Self {
        let profile_id = profile_id.into();
        let profile = match repository.load(&profile_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => ProfileData::default(),
            Err(err) => {
                log_progression_error(&err, "open_profile");
                warn!(
                    "[Progression] Profile '{}' unreadable, starting empty",
                    profile_id
                );
                ProfileData::default()
            }
        };

        Self {
            repository,
            profile_id,
            profile,
        }
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn profile(&self) -> &ProfileData {
        &self.profile
    }

    pub fn streak(&self) -> u32 {
        self.profile.streak.current_streak
    }

    /// Bonus applicable at the current streak
    pub fn current_bonus(&self) -> Option<&'static StreakBonus> {
        get_streak_bonus(self.profile.streak.current_streak)
    }

    /// Advance the streak for a practice completed on `today`
    ///
    /// Idempotent per calendar day. Newly crossed badge thresholds are
    /// awarded (every threshold at or below the new streak that has not
    /// been earned yet). State is persisted before returning.
    pub fn update_streak(&mut self, today: NaiveDate) -> StreakOutcome {
        if self.profile.streak.last_practice_date == Some(today) {
            return StreakOutcome {
                streak: self.profile.streak.current_streak,
                newly_earned_badges: Vec::new(),
            };
        }

        let streak = self.profile.streak.advance(today);

        let mut newly_earned_badges = Vec::new();
        for bonus in STREAK_BONUSES.iter() {
            if bonus.threshold_days > streak {
                continue;
            }
            if let Some(badge_id) = bonus.badge_id {
                if self.profile.earn_badge(badge_id) {
                    newly_earned_badges.push(badge_id.to_string());
                }
            }
        }

        self.persist("update_streak");
        StreakOutcome {
            streak,
            newly_earned_badges,
        }
    }

    /// Draw a reward under the current streak's odds and add it to the
    /// inventory
    pub fn grant_reward<R: Rng + ?Sized>(
        &mut self,
        catalog: &[CatalogItem],
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<RewardItem, ProgressionError> {
        let item = draw_reward(catalog, self.profile.streak.current_streak, rng, now)?;
        self.profile.push_reward(item.clone());
        self.persist("grant_reward");
        Ok(item)
    }

    /// Append an already-drawn reward to the inventory
    pub fn add_to_inventory(&mut self, item: RewardItem) {
        self.profile.push_reward(item);
        self.persist("add_to_inventory");
    }

    /// Equip or unequip an item, persisting the result
    pub fn toggle_equip(&mut self, item: &RewardItem) {
        self.profile.toggle_equip(item);
        self.persist("toggle_equip");
    }

    /// Inventory totals by rarity
    pub fn stats(&self) -> InventoryStats {
        self.profile.stats()
    }

    /// Synchronous save; on failure the in-memory state stays authoritative
    fn persist(&self, context: &str) {
        if let Err(err) = self.repository.save(&self.profile_id, &self.profile) {
            log_progression_error(&err, context);
            warn!(
                "[Progression] Profile '{}' not durable after {}, continuing in memory",
                self.profile_id, context
            );
        }
    }
}
