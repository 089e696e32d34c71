/******************************************************************************
 *                                                                            *
 * Virtual inventory items owned by a grow account: genetics (plantable),     *
 * boosters, nutrients, decorations (harvest trophy cards) and milestone      *
 * specials. Items arrive from the daily reward roller, from harvesting,      *
 * or by redeeming a marketplace purchase.                                    *
 *                                                                            *
 ******************************************************************************/

use spacetimedb::{Identity, ReducerContext, Table, Timestamp};
use log;

use crate::inventory::inventory_item as InventoryItemTableTrait;
use crate::models::{ItemEffect, ItemSource, ItemType, Rarity, Strain};

// --- Table ---

#[spacetimedb::table(
    accessor = inventory_item,
    public,
    index(accessor = idx_item_owner, btree(columns = [owner_id]))
)]
#[derive(Clone, Debug)]
pub struct InventoryItem {
    #[primary_key]
    #[auto_inc]
    pub id: u64,
    pub owner_id: Identity,
    pub item_type: ItemType,
    pub rarity: Rarity,
    pub name: String,
    /// Client asset reference, e.g. "booster_rare.png"
    pub icon_asset_name: String,
    /// Typed effect payloads (empty for purely cosmetic items)
    pub effects: Vec<ItemEffect>,
    /// Only meaningful for Genetics items
    pub strain: Option<Strain>,
    pub source: ItemSource,
    /// Opaque reference to the originating record (order id, reward log
    /// id, plant id) when one exists.
    pub source_id: Option<String>,
    pub equipped: bool,
    pub created_at: Timestamp,
}

// --- Helpers ---

/// Insert a new item into an account's inventory. Rows are auto-keyed;
/// returns the inserted row so callers can log or reference its id.
pub fn grant_item(
    ctx: &ReducerContext,
    owner_id: Identity,
    item_type: ItemType,
    rarity: Rarity,
    name: String,
    icon_asset_name: String,
    effects: Vec<ItemEffect>,
    strain: Option<Strain>,
    source: ItemSource,
    source_id: Option<String>,
) -> Result<InventoryItem, String> {
    let item = InventoryItem {
        id: 0, // Auto-inc
        owner_id,
        item_type,
        rarity,
        name,
        icon_asset_name,
        effects,
        strain,
        source,
        source_id,
        equipped: false,
        created_at: ctx.timestamp,
    };

    match ctx.db.inventory_item().try_insert(item) {
        Ok(inserted) => {
            log::info!("Granted {:?} item '{}' ({:?}) to {:?} - id {}",
                      inserted.item_type, inserted.name, inserted.rarity, owner_id, inserted.id);
            Ok(inserted)
        }
        Err(e) => {
            log::error!("Failed to insert inventory item for {:?}: {}", owner_id, e);
            Err(format!("Failed to grant item: {}", e))
        }
    }
}

/// Find an item by id, verifying the caller owns it. A wrong owner is
/// reported as not-found so item ids don't leak existence.
pub fn find_owned_item(ctx: &ReducerContext, owner_id: Identity, item_id: u64) -> Result<InventoryItem, String> {
    let item = ctx.db.inventory_item().id().find(&item_id)
        .filter(|item| item.owner_id == owner_id)
        .ok_or_else(|| format!("Item {} not found in your inventory", item_id))?;
    Ok(item)
}

// --- Reducers ---

/// Marketplace glue: called by the storefront backend after checkout to
/// convert a purchased listing into a virtual item. The order id is opaque
/// to this module; it is recorded for support lookups only.
#[spacetimedb::reducer]
pub fn redeem_purchase_item(
    ctx: &ReducerContext,
    item_type: ItemType,
    rarity: Rarity,
    name: String,
    icon_asset_name: String,
    strain: Option<Strain>,
    order_id: String,
) -> Result<(), String> {
    let owner_id = ctx.sender();

    if item_type == ItemType::Decoration {
        return Err("Decoration items can only be earned by harvesting".to_string());
    }
    if item_type == ItemType::Genetics && strain.is_none() {
        return Err("Genetics items must specify a strain".to_string());
    }

    // Touch the aggregate so the account exists before its first item
    crate::grow_account::get_or_create_account(ctx, owner_id);

    grant_item(
        ctx,
        owner_id,
        item_type,
        rarity,
        name.clone(),
        icon_asset_name,
        Vec::new(),
        strain,
        ItemSource::Purchase,
        Some(order_id.clone()),
    )?;

    log::info!("Redeemed order {} into item '{}' for {:?}", order_id, name, owner_id);
    Ok(())
}

/// Toggle the equipped flag on an owned item.
#[spacetimedb::reducer]
pub fn set_item_equipped(ctx: &ReducerContext, item_id: u64, equipped: bool) -> Result<(), String> {
    let mut item = find_owned_item(ctx, ctx.sender(), item_id)?;
    item.equipped = equipped;
    ctx.db.inventory_item().id().update(item);
    Ok(())
}
