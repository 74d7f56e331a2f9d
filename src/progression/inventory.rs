//! Profile data: inventory, equipped items, badges
//!
//! The inventory is an append-only sequence (duplicates allowed). Equipped
//! items form a sparse slot map holding at most one item per slot; an item
//! can be equipped only because it was drawn into the inventory first.
//!
//! The serialized layout keeps the original record keys
//! (`lastPracticeDate`, `equippedItems`, ...) and tolerates missing fields
//! by defaulting, so older records load cleanly.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::progression::rarity::Rarity;
use crate::progression::rewards::RewardItem;
use crate::progression::streak::StreakRecord;

/// Everything persisted for one profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(default)]
    pub inventory: Vec<RewardItem>,
    #[serde(flatten)]
    pub streak: StreakRecord,
    #[serde(rename = "earnedBadges", default)]
    pub earned_badges: Vec<String>,
    #[serde(rename = "equippedItems", default)]
    pub equipped_items: HashMap<String, RewardItem>,
}

/// Inventory counts per rarity tier
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryStats {
    pub total: usize,
    pub by_rarity: BTreeMap<Rarity, usize>,
}

impl ProfileData {
    /// Append a drawn reward; duplicates are valid and expected
    pub fn push_reward(&mut self, item: RewardItem) {
        self.inventory.push(item);
    }

    /// Equip or unequip an item
    ///
    /// No-op for items without a slot. If the slot currently holds this
    /// exact item (by id), it is unequipped; otherwise the item takes the
    /// slot, silently replacing any previous occupant.
    pub fn toggle_equip(&mut self, item: &RewardItem) {
        let Some(slot) = item.equip_slot.clone() else {
            return;
        };

        match self.equipped_items.get(&slot) {
            Some(current) if current.id == item.id => {
                self.equipped_items.remove(&slot);
            }
            _ => {
                self.equipped_items.insert(slot, item.clone());
            }
        }
    }

    /// Record a badge as earned; badges accumulate and are never removed
    ///
    /// Returns true when the badge was newly earned.
    pub fn earn_badge(&mut self, badge_id: &str) -> bool {
        if self.earned_badges.iter().any(|b| b == badge_id) {
            return false;
        }
        self.earned_badges.push(badge_id.to_string());
        true
    }

    /// Inventory totals by rarity
    pub fn stats(&self) -> InventoryStats {
        let mut by_rarity = BTreeMap::new();
        for item in &self.inventory {
            *by_rarity.entry(item.rarity).or_insert(0) += 1;
        }
        InventoryStats {
            total: self.inventory.len(),
            by_rarity,
        }
    }
}
