/******************************************************************************
 *                                                                            *
 * Virtual plants owned by a grow account. Plants are created by consuming    *
 * a GENETICS inventory item, mutated by care actions (water, climate,        *
 * light, nutrients) and by lazy growth recomputation, and become immutable   *
 * trophies once harvested.                                                   *
 *                                                                            *
 ******************************************************************************/

use spacetimedb::{Identity, ReducerContext, Table, Timestamp};
use log;

use crate::plant::plant as PlantTableTrait;
use crate::plant::plant_care_log as PlantCareLogTableTrait;
use crate::inventory::inventory_item as InventoryItemTableTrait;
use crate::grow_account;
use crate::models::{CareType, GrowthStage, ItemType, Strain};

// --- Constants ---

/// Coin costs for the two paid care actions. Water and light are free.
pub const CLIMATE_CARE_COST: u64 = 10;
pub const NUTRIENT_CARE_COST: u64 = 15;

pub const DEFAULT_WATER_AMOUNT: f32 = 50.0;
pub const DEFAULT_VPD: f32 = 1.2;
pub const DEFAULT_LIGHT_HOURS: f32 = 18.0;
pub const DEFAULT_NUTRIENT_AMOUNT: f32 = 10.0;

pub const MIN_LIGHT_HOURS: f32 = 12.0;
pub const MAX_LIGHT_HOURS: f32 = 24.0;

/// Newly planted seeds start watered-in with a trace of mass.
const INITIAL_WATER_LEVEL: f32 = 100.0;
const INITIAL_SIZE_GRAMS: f32 = 0.1;

// --- Tables ---

#[spacetimedb::table(
    accessor = plant,
    public,
    index(accessor = idx_plant_owner, btree(columns = [owner_id]))
)]
#[derive(Clone, Debug)]
pub struct Plant {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    pub owner_id: Identity,
    pub name: String,
    pub strain: Strain,
    pub stage: GrowthStage,
    /// 0-100
    pub health: f32,
    /// Grams-equivalent, never decreases
    pub size_grams: f32,
    /// 0-100, decays 2 points per hour between care actions
    pub water_level: f32,
    /// Vapor pressure deficit, nominal band 0.8-1.6
    pub vpd: f32,
    /// 12-24
    pub light_hours: f32,
    /// Cumulative since planting; accrues fractionally, frozen at HarvestReady
    pub days_growing: f32,
    /// Progress fraction toward the next stage, refreshed on recompute
    pub stage_progress: f32,
    /// Free-form genetics tags carried over from the seed item
    pub genetics: Vec<String>,
    pub last_care_at: Timestamp,
    pub harvested_at: Option<Timestamp>,
    pub card_generated: bool,
    /// JSON harvest-card snapshot, set exactly once at harvest
    pub card_data: Option<String>,
    pub created_at: Timestamp,
}

/// Audit trail of successful care actions.
#[spacetimedb::table(
    accessor = plant_care_log,
    public,
    index(accessor = idx_care_plant, btree(columns = [plant_id]))
)]
#[derive(Clone, Debug)]
pub struct PlantCareLog {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    pub plant_id: u64,
    pub owner_id: Identity,
    pub care_type: CareType,
    pub value_applied: f32,
    pub coins_cost: u64,
    pub note: String,
    pub applied_at: Timestamp,
}

// --- Pure care application ---

/// The four care-adjustable levels of a plant, separated from the row so
/// the mutation rules can be exercised directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CareLevels {
    pub water_level: f32,
    pub vpd: f32,
    pub light_hours: f32,
    pub health: f32,
}

pub fn care_cost(care_type: CareType) -> u64 {
    match care_type {
        CareType::Climate => CLIMATE_CARE_COST,
        CareType::Nutrient => NUTRIENT_CARE_COST,
        CareType::Water | CareType::Light => 0,
    }
}

/// Apply one care action to the levels. Non-finite values are rejected
/// before anything changes; health and water always land in [0, 100] and
/// light hours in [12, 24] regardless of the requested value.
pub fn apply_care(
    levels: CareLevels,
    care_type: CareType,
    value: Option<f32>,
) -> Result<(CareLevels, f32), String> {
    if let Some(v) = value {
        if !v.is_finite() {
            return Err(format!("Invalid care value: {}", v));
        }
    }

    let mut updated = levels;
    let value_applied = match care_type {
        CareType::Water => {
            let amount = value.unwrap_or(DEFAULT_WATER_AMOUNT);
            updated.water_level = (updated.water_level + amount).clamp(0.0, 100.0);
            amount
        }
        CareType::Climate => {
            let target = value.unwrap_or(DEFAULT_VPD);
            updated.vpd = target;
            target
        }
        CareType::Light => {
            let hours = value.unwrap_or(DEFAULT_LIGHT_HOURS).clamp(MIN_LIGHT_HOURS, MAX_LIGHT_HOURS);
            updated.light_hours = hours;
            hours
        }
        CareType::Nutrient => {
            let amount = value.unwrap_or(DEFAULT_NUTRIENT_AMOUNT);
            updated.health = (updated.health + amount).clamp(0.0, 100.0);
            amount
        }
    };

    Ok((updated, value_applied))
}

// --- Helpers ---

/// Look up a plant and verify the plant -> account -> identity ownership
/// chain. A plant owned by someone else reads as not-found so plant ids
/// don't leak existence.
pub fn find_owned_plant(ctx: &ReducerContext, owner_id: Identity, plant_id: u64) -> Result<Plant, String> {
    ctx.db.plant().id().find(&plant_id)
        .filter(|plant| plant.owner_id == owner_id)
        .ok_or_else(|| format!("Plant {} not found", plant_id))
}

fn append_care_log(ctx: &ReducerContext, plant: &Plant, care_type: CareType, value: f32, cost: u64, note: String) {
    let entry = PlantCareLog {
        id: 0, // Auto-inc
        plant_id: plant.id,
        owner_id: plant.owner_id,
        care_type,
        value_applied: value,
        coins_cost: cost,
        note,
        applied_at: ctx.timestamp,
    };
    if let Err(e) = ctx.db.plant_care_log().try_insert(entry) {
        log::error!("Failed to insert care log for plant {}: {}", plant.id, e);
    }
}

// --- Reducers ---

/// Consume a GENETICS inventory item to create a new plant at stage SEED.
#[spacetimedb::reducer]
pub fn plant_seed(ctx: &ReducerContext, seed_item_id: u64, plant_name: Option<String>) -> Result<(), String> {
    let owner_id = ctx.sender();
    grow_account::get_or_create_account(ctx, owner_id);

    let seed_item = crate::inventory::find_owned_item(ctx, owner_id, seed_item_id)?;
    if seed_item.item_type != ItemType::Genetics {
        return Err(format!("'{}' is not a plantable genetics item", seed_item.name));
    }

    let strain = seed_item.strain.unwrap_or(Strain::Hybrid);
    let name = plant_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("{} #{}", strain.display_name(), seed_item_id));

    // Carry the seed's provenance into the plant's genetics tags
    let genetics = vec![
        seed_item.name.clone(),
        format!("rarity:{}", seed_item.rarity.display_name()),
        format!("strain:{}", strain.display_name()),
    ];

    let plant = Plant {
        id: 0, // Auto-inc
        owner_id,
        name: name.clone(),
        strain,
        stage: GrowthStage::Seed,
        health: 100.0,
        size_grams: INITIAL_SIZE_GRAMS,
        water_level: INITIAL_WATER_LEVEL,
        vpd: DEFAULT_VPD,
        light_hours: DEFAULT_LIGHT_HOURS,
        days_growing: 0.0,
        stage_progress: 0.0,
        genetics,
        last_care_at: ctx.timestamp,
        harvested_at: None,
        card_generated: false,
        card_data: None,
        created_at: ctx.timestamp,
    };

    let inserted = match ctx.db.plant().try_insert(plant) {
        Ok(inserted) => inserted,
        Err(e) => {
            log::error!("Failed to insert plant for {:?}: {}", owner_id, e);
            return Err(format!("Failed to plant seed: {}", e));
        }
    };

    // The seed is consumed by planting
    ctx.db.inventory_item().id().delete(seed_item_id);

    log::info!("Planted '{}' ({:?}) for {:?} from seed item {} - plant id {}",
              name, strain, owner_id, seed_item_id, inserted.id);
    Ok(())
}

/// Apply one care action to a living plant. Paid actions (climate,
/// nutrients) check the coin balance before touching anything; a short
/// balance rejects the whole action.
#[spacetimedb::reducer]
pub fn apply_plant_care(
    ctx: &ReducerContext,
    plant_id: u64,
    care_type: CareType,
    value: Option<f32>,
) -> Result<(), String> {
    let owner_id = ctx.sender();
    let mut plant = find_owned_plant(ctx, owner_id, plant_id)?;

    if plant.harvested_at.is_some() {
        return Err(format!("Plant '{}' has been harvested and can no longer be tended", plant.name));
    }

    // Validate the requested value before the debit so a rejected action
    // mutates nothing at all, then check-then-act on the coin balance
    // before touching the plant.
    let (updated, value_applied) = apply_care(
        CareLevels {
            water_level: plant.water_level,
            vpd: plant.vpd,
            light_hours: plant.light_hours,
            health: plant.health,
        },
        care_type,
        value,
    )?;

    let cost = care_cost(care_type);
    let mut account = grow_account::get_or_create_account(ctx, owner_id);
    if cost > 0 {
        grow_account::try_debit_coins(ctx, &mut account, cost)?;
    }

    plant.water_level = updated.water_level;
    plant.vpd = updated.vpd;
    plant.light_hours = updated.light_hours;
    plant.health = updated.health;

    let note = match care_type {
        CareType::Water => format!("Watered - level now {:.0}", plant.water_level),
        CareType::Climate => format!("Climate adjusted - VPD set to {:.2}", plant.vpd),
        CareType::Light => format!("Light schedule set to {:.1}h/day", plant.light_hours),
        CareType::Nutrient => format!("Nutrients applied - health now {:.0}", plant.health),
    };

    plant.last_care_at = ctx.timestamp;
    ctx.db.plant().id().update(plant.clone());

    append_care_log(ctx, &plant, care_type, value_applied, cost, note);
    grow_account::award_xp(ctx, &mut account, grow_account::XP_CARE_ACTION);

    log::info!("Care {:?} applied to plant {} ('{}') by {:?} - cost {} coins",
              care_type, plant.id, plant.name, owner_id, cost);
    Ok(())
}

// --- Tests ---
