use spacetimedb::SpacetimeType;
use serde::{Serialize, Deserialize};

/// Ordinal quality tier for virtual items. Ordering matters: derived
/// PartialOrd/Ord treats later variants as higher-value tiers.
#[derive(SpacetimeType, Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Display name matching the client-side asset naming convention.
    pub fn display_name(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        }
    }
}

/// Categories of virtual inventory items.
#[derive(SpacetimeType, Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemType {
    Genetics,   // Consumed to create a plant
    Booster,    // Chest drops, carry a BonusCoins effect
    Nutrient,
    Decoration, // Harvest trophy cards
    Special,    // Guaranteed streak-milestone drops
}

/// How an inventory item was obtained.
#[derive(SpacetimeType, Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ItemSource {
    Purchase,    // Redeemed from a marketplace order
    DailyReward,
    Harvest,
    Prestige,
}

/// Typed item effect, replacing the legacy free-form numeric map.
/// Keeps effect keys exhaustive so handlers can't silently drop a typo.
#[derive(SpacetimeType, Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
pub enum EffectKind {
    GrowthSpeed,
    YieldMultiplier,
    BonusCoins,
    HealthBoost,
}

#[derive(SpacetimeType, Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
pub struct ItemEffect {
    pub kind: EffectKind,
    pub value: f64,
}

/// The four fixed strain variants a GENETICS item can carry.
#[derive(SpacetimeType, Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Strain {
    Indica,
    Sativa,
    Hybrid,
    Autoflower,
}

impl Strain {
    pub fn display_name(&self) -> &'static str {
        match self {
            Strain::Indica => "Indica",
            Strain::Sativa => "Sativa",
            Strain::Hybrid => "Hybrid",
            Strain::Autoflower => "Autoflower",
        }
    }
}

/// The six ordered growth phases. Stage only ever moves forward through
/// this ordering, one step at a time; HarvestReady is terminal.
#[derive(SpacetimeType, Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrowthStage {
    Seed,
    Seedling,
    Vegetative,
    PreFlower,
    Flowering,
    HarvestReady,
}

impl GrowthStage {
    /// The stage that follows this one, or None at the terminal stage.
    pub fn next(&self) -> Option<GrowthStage> {
        match self {
            GrowthStage::Seed => Some(GrowthStage::Seedling),
            GrowthStage::Seedling => Some(GrowthStage::Vegetative),
            GrowthStage::Vegetative => Some(GrowthStage::PreFlower),
            GrowthStage::PreFlower => Some(GrowthStage::Flowering),
            GrowthStage::Flowering => Some(GrowthStage::HarvestReady),
            GrowthStage::HarvestReady => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GrowthStage::Seed => "Seed",
            GrowthStage::Seedling => "Seedling",
            GrowthStage::Vegetative => "Vegetative",
            GrowthStage::PreFlower => "Pre-Flower",
            GrowthStage::Flowering => "Flowering",
            GrowthStage::HarvestReady => "Harvest Ready",
        }
    }
}

/// Care actions a player can apply to a living plant.
#[derive(SpacetimeType, Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum CareType {
    Water,    // Free: +value (default +50) water, clamped to 100
    Climate,  // 10 coins: set VPD to value (default 1.2)
    Light,    // Free: set light hours, clamped to [12, 24]
    Nutrient, // 15 coins: +value (default +10) health, clamped to 100
}
