//! Reward catalogs and the reward draw
//!
//! A catalog is external, read-only input: an ordered list of items per
//! theme. Drawing a reward rolls a rarity, picks uniformly within that
//! tier, and stamps the acquisition time. When the drawn tier has no
//! catalog items at all, the draw falls back to the highest non-empty
//! tier, scanning legendary down to common.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ProgressionError;
use crate::progression::rarity::{roll_rarity, Rarity};

/// One entry of a theme's reward catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    /// Avatar slot this item can occupy, if any
    #[serde(rename = "slot", default, skip_serializing_if = "Option::is_none")]
    pub equip_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// A drawn reward, immutable once created and owned by the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardItem {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    #[serde(rename = "slot", default, skip_serializing_if = "Option::is_none")]
    pub equip_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(rename = "obtainedAt")]
    pub obtained_at: DateTime<Utc>,
}

impl RewardItem {
    pub fn from_catalog(item: &CatalogItem, obtained_at: DateTime<Utc>) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            rarity: item.rarity,
            equip_slot: item.equip_slot.clone(),
            emoji: item.emoji.clone(),
            obtained_at,
        }
    }
}

/// Draw a random reward from `catalog` under the current streak's odds
///
/// The fallback triggers precisely when the catalog holds zero items at
/// the drawn rarity; it scans legendary down to common and picks uniformly
/// in the first non-empty tier.
///
/// # Errors
/// [`ProgressionError::EmptyCatalog`] when the catalog holds no items at
/// all: a data-setup bug, not a runtime condition to recover from.
pub fn draw_reward<R: Rng + ?Sized>(
    catalog: &[CatalogItem],
    streak: u32,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<RewardItem, ProgressionError> {
    if catalog.is_empty() {
        return Err(ProgressionError::EmptyCatalog);
    }

    let rolled = roll_rarity(streak, rng);
    let eligible: Vec<&CatalogItem> = catalog.iter().filter(|i| i.rarity == rolled).collect();

    let pool = if !eligible.is_empty() {
        eligible
    } else {
        fallback_pool(catalog)
    };

    let pick = pool[rng.gen_range(0..pool.len())];
    Ok(RewardItem::from_catalog(pick, now))
}

/// Highest-first fallback: first non-empty tier from legendary downward
fn fallback_pool(catalog: &[CatalogItem]) -> Vec<&CatalogItem> {
    for &tier in Rarity::ORDER.iter().rev() {
        let hits: Vec<&CatalogItem> = catalog.iter().filter(|i| i.rarity == tier).collect();
        if !hits.is_empty() {
            return hits;
        }
    }
    Vec::new()
}
