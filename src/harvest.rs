/******************************************************************************
 *                                                                            *
 * Harvesting. A HARVEST_READY plant is scored once against a joint           *
 * (health, size) quality table, pays out coins/gems/harvest tokens, and      *
 * mints a permanent harvest-card snapshot - stored on the plant and as a     *
 * DECORATION trophy item. The plant is retained, immutable, afterwards.      *
 *                                                                            *
 ******************************************************************************/

use spacetimedb::{ReducerContext, Table};
use log;
use serde_json::json;

use crate::plant::plant as PlantTableTrait;
use crate::grow_account::{self, Currency};
use crate::models::{GrowthStage, ItemSource, ItemType, Rarity};

// --- Constants ---

pub const HARVEST_BASE_COINS: f64 = 300.0;
pub const HARVEST_BASE_GEMS: f64 = 10.0;
pub const HARVEST_TOKENS_PER_HARVEST: u64 = 1;

/// Joint quality thresholds, best tier first. A tier applies only when
/// BOTH its health and size floors are met.
pub const QUALITY_TIERS: [(f32, f32, &str, Rarity, f64); 4] = [
    (90.0, 5.0, "Perfect", Rarity::Legendary, 3.0),
    (75.0, 4.0, "Excellent", Rarity::Epic, 2.5),
    (60.0, 3.0, "Good", Rarity::Rare, 2.0),
    (45.0, 2.0, "Fair", Rarity::Uncommon, 1.5),
];

// --- Quality scoring ---

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HarvestQuality {
    pub quality: &'static str,
    pub rarity: Rarity,
    pub multiplier: f64,
}

/// Score a harvest from final health and size. Anything missing the Fair
/// floors lands at Poor.
pub fn score_harvest(health: f32, size_grams: f32) -> HarvestQuality {
    for (health_floor, size_floor, quality, rarity, multiplier) in QUALITY_TIERS {
        if health >= health_floor && size_grams >= size_floor {
            return HarvestQuality { quality, rarity, multiplier };
        }
    }
    HarvestQuality { quality: "Poor", rarity: Rarity::Common, multiplier: 1.0 }
}

pub fn harvest_coins(multiplier: f64) -> u64 {
    (HARVEST_BASE_COINS * multiplier).floor() as u64
}

pub fn harvest_gems(multiplier: f64) -> u64 {
    (HARVEST_BASE_GEMS * multiplier).floor() as u64
}

/// One-time harvest gate on a plant snapshot. The already-harvested check
/// runs first so a repeat attempt on a finished plant reports the right
/// reason rather than "not ready".
pub fn verify_harvestable(name: &str, stage: GrowthStage, already_harvested: bool) -> Result<(), String> {
    if already_harvested {
        return Err(format!("Plant '{}' has already been harvested", name));
    }
    if stage != GrowthStage::HarvestReady {
        return Err(format!(
            "Plant '{}' is not ready to harvest (currently {})",
            name,
            stage.display_name()
        ));
    }
    Ok(())
}

// --- Reducer ---

/// Harvest a ready plant exactly once.
#[spacetimedb::reducer]
pub fn harvest_plant(ctx: &ReducerContext, plant_id: u64) -> Result<(), String> {
    let owner_id = ctx.sender();
    let mut plant = crate::plant::find_owned_plant(ctx, owner_id, plant_id)?;

    verify_harvestable(&plant.name, plant.stage, plant.harvested_at.is_some())?;

    let quality = score_harvest(plant.health, plant.size_grams);
    let coins = harvest_coins(quality.multiplier);
    let gems = harvest_gems(quality.multiplier);

    let card_data = json!({
        "name": plant.name,
        "strain": plant.strain.display_name(),
        "quality": quality.quality,
        "rarity": quality.rarity.display_name(),
        "yield_grams": plant.size_grams,
        "grow_time_days": plant.days_growing,
        "final_health": plant.health,
        "genetics": plant.genetics,
        "harvested_at_micros": ctx.timestamp.to_micros_since_unix_epoch(),
    })
    .to_string();

    // Payout, trophy card, and the one-time harvest stamp - all in the
    // same reducer transaction, so a failure leaves no partial effect.
    let mut account = grow_account::get_or_create_account(ctx, owner_id);
    grow_account::credit(ctx, &mut account, Currency::Coins, coins);
    grow_account::credit(ctx, &mut account, Currency::Gems, gems);
    grow_account::credit(ctx, &mut account, Currency::HarvestTokens, HARVEST_TOKENS_PER_HARVEST);
    grow_account::award_xp(ctx, &mut account, grow_account::XP_HARVEST);

    crate::inventory::grant_item(
        ctx,
        owner_id,
        ItemType::Decoration,
        quality.rarity,
        format!("{} Harvest Card", plant.name),
        "harvest_card.png".to_string(),
        Vec::new(),
        Some(plant.strain),
        ItemSource::Harvest,
        Some(plant.id.to_string()),
    )?;

    plant.harvested_at = Some(ctx.timestamp);
    plant.card_generated = true;
    plant.card_data = Some(card_data);
    ctx.db.plant().id().update(plant.clone());

    log::info!("Harvested plant {} ('{}'): {} quality ({:?}) - {} coins, {} gems, +{} token",
              plant.id, plant.name, quality.quality, quality.rarity, coins, gems,
              HARVEST_TOKENS_PER_HARVEST);
    Ok(())
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_harvest_scores_legendary() {
        // Scenario: health 95, size 6.0 grams
        let quality = score_harvest(95.0, 6.0);
        assert_eq!(quality.quality, "Perfect");
        assert_eq!(quality.rarity, Rarity::Legendary);
        assert_eq!(harvest_coins(quality.multiplier), 900);
        assert_eq!(harvest_gems(quality.multiplier), 30);
    }

    #[test]
    fn both_floors_must_be_met() {
        // High health but undersized drops past Perfect and Excellent
        let quality = score_harvest(95.0, 3.5);
        assert_eq!(quality.quality, "Good");
        assert_eq!(quality.rarity, Rarity::Rare);

        // Big but battered likewise
        let quality = score_harvest(50.0, 6.0);
        assert_eq!(quality.quality, "Fair");
        assert_eq!(quality.rarity, Rarity::Uncommon);
    }

    #[test]
    fn poor_harvest_is_the_floor() {
        let quality = score_harvest(10.0, 0.5);
        assert_eq!(quality.quality, "Poor");
        assert_eq!(quality.rarity, Rarity::Common);
        assert_eq!(harvest_coins(quality.multiplier), 300);
        assert_eq!(harvest_gems(quality.multiplier), 10);
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        let quality = score_harvest(90.0, 5.0);
        assert_eq!(quality.quality, "Perfect");

        let quality = score_harvest(89.9, 5.0);
        assert_eq!(quality.quality, "Excellent");

        let quality = score_harvest(45.0, 2.0);
        assert_eq!(quality.quality, "Fair");
    }

    #[test]
    fn harvest_succeeds_once_then_rejects_the_second_attempt() {
        // First pass: ready and untouched
        assert!(verify_harvestable("Northern Haze", GrowthStage::HarvestReady, false).is_ok());

        // Second pass on the now-harvested plant fails with the
        // already-harvested reason even though the stage still reads ready
        let err = verify_harvestable("Northern Haze", GrowthStage::HarvestReady, true).unwrap_err();
        assert!(err.contains("already been harvested"));
    }

    #[test]
    fn immature_plants_are_not_harvestable() {
        let err = verify_harvestable("Northern Haze", GrowthStage::Flowering, false).unwrap_err();
        assert!(err.contains("not ready to harvest"));
        assert!(err.contains("Flowering"));

        let err = verify_harvestable("Northern Haze", GrowthStage::Seed, false).unwrap_err();
        assert!(err.contains("not ready"));
    }

    #[test]
    fn fractional_multipliers_floor_the_payout() {
        // Excellent: 300 * 2.5 = 750, 10 * 2.5 = 25
        let quality = score_harvest(80.0, 4.5);
        assert_eq!(quality.multiplier, 2.5);
        assert_eq!(harvest_coins(quality.multiplier), 750);
        assert_eq!(harvest_gems(quality.multiplier), 25);

        // Fair: 300 * 1.5 = 450, 10 * 1.5 = 15
        assert_eq!(harvest_coins(1.5), 450);
        assert_eq!(harvest_gems(1.5), 15);
    }
}
