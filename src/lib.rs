/******************************************************************************
 *                                                                            *
 * Virtual Grow meta-game server module. Owns the per-user grow aggregate     *
 * (currencies, XP, prestige, plants, inventory) behind the secondhand        *
 * grow-equipment marketplace: daily login rewards with streak scaling,       *
 * lazily simulated plant growth, care actions, and one-time harvests.        *
 *                                                                            *
 * Every operation is a reducer - a serialized transaction - so currency      *
 * debits, claim cooldowns and growth recomputation cannot race, and a        *
 * returned error rolls back all partial writes.                              *
 *                                                                            *
 ******************************************************************************/

use spacetimedb::ReducerContext;
use log;

// Shared enums and value objects
mod models;
// Per-user aggregate root: currencies, XP, prestige
mod grow_account;
// Virtual items: genetics, boosters, decorations, specials
mod inventory;
// Daily login reward roller and claim log
mod daily_reward;
// Plants, planting, and care actions
mod plant;
// Lazy growth simulation and stage advancement
mod growth;
// Harvest scoring, payout, and trophy cards
mod harvest;

#[spacetimedb::reducer(init)]
pub fn init_module(ctx: &ReducerContext) -> Result<(), String> {
    log::info!("Initializing virtual grow module (identity: {:?})", ctx.identity());
    // All state is per-account and created lazily; nothing to seed.
    Ok(())
}

/// Touch the caller's aggregate on connect so the client's subscriptions
/// have rows to land on from the first frame.
#[spacetimedb::reducer(client_connected)]
pub fn identity_connected(ctx: &ReducerContext) -> Result<(), String> {
    let account = crate::grow_account::get_or_create_account(ctx, ctx.sender());
    log::info!("Client connected: {:?} (prestige {}, {} coins)",
              ctx.sender(), account.prestige_level, account.coins);
    crate::daily_reward::upsert_status(ctx, ctx.sender());
    Ok(())
}
