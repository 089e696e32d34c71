/******************************************************************************
 *                                                                            *
 * Virtual grow account - the per-user aggregate root owning currency         *
 * balances (coins, gems, harvest tokens), experience points and prestige.    *
 * Created lazily on first access; never deleted while the user exists.       *
 *                                                                            *
 ******************************************************************************/

use spacetimedb::{Identity, ReducerContext, Table, Timestamp};
use log;

use crate::grow_account::grow_account as GrowAccountTableTrait;

// --- Constants ---

/// XP thresholds are linear: every 1000 XP is one prestige level.
pub const XP_PER_PRESTIGE_LEVEL: u64 = 1000;

pub const XP_DAILY_CLAIM: u64 = 10;
pub const XP_CARE_ACTION: u64 = 5;
pub const XP_HARVEST: u64 = 50;

// --- Table ---

/// One per user. Currency balances are unsigned so they can never go
/// negative; every debit is a check-then-act against the live row.
#[spacetimedb::table(accessor = grow_account, public)]
#[derive(Clone, Debug)]
pub struct GrowAccount {
    #[primary_key]
    pub owner_id: Identity,
    /// Primary soft currency
    pub coins: u64,
    /// Premium currency
    pub gems: u64,
    /// Earned one per harvest
    pub harvest_tokens: u64,
    /// Lifetime experience points
    pub xp: u64,
    /// Derived from xp, recomputed on every grant
    pub prestige_level: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// --- Currency kinds for credit bookkeeping ---

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Currency {
    Coins,
    Gems,
    HarvestTokens,
}

// --- Helpers ---

/// Fetch the caller's grow account, creating it on first access.
pub fn get_or_create_account(ctx: &ReducerContext, owner_id: Identity) -> GrowAccount {
    if let Some(account) = ctx.db.grow_account().owner_id().find(&owner_id) {
        return account;
    }

    let account = GrowAccount {
        owner_id,
        coins: 0,
        gems: 0,
        harvest_tokens: 0,
        xp: 0,
        prestige_level: 1,
        created_at: ctx.timestamp,
        updated_at: ctx.timestamp,
    };

    match ctx.db.grow_account().try_insert(account.clone()) {
        Ok(inserted) => {
            log::info!("Created grow account for {:?}", owner_id);
            inserted
        }
        Err(e) => {
            // Insert can only collide with a row created earlier in this same
            // transaction, so fall back to the freshly built value.
            log::error!("Failed to insert grow account for {:?}: {}", owner_id, e);
            account
        }
    }
}

/// Credit a currency balance and persist the account row.
pub fn credit(ctx: &ReducerContext, account: &mut GrowAccount, currency: Currency, amount: u64) {
    match currency {
        Currency::Coins => account.coins += amount,
        Currency::Gems => account.gems += amount,
        Currency::HarvestTokens => account.harvest_tokens += amount,
    }
    account.updated_at = ctx.timestamp;
    ctx.db.grow_account().owner_id().update(account.clone());
    log::debug!("Credited {} {:?} to {:?} (coins={}, gems={}, tokens={})",
               amount, currency, account.owner_id, account.coins, account.gems, account.harvest_tokens);
}

/// Pure balance check-and-decrement: the remaining balance on success,
/// an insufficient-funds reason on a short balance. Unsigned arithmetic
/// never runs because the check precedes the subtraction.
pub fn debit_coins(balance: u64, cost: u64) -> Result<u64, String> {
    if balance < cost {
        return Err(format!(
            "Insufficient coins: this action costs {} but you have {}",
            cost, balance
        ));
    }
    Ok(balance - cost)
}

/// Debit coins with a balance check first. On a short balance this fails
/// with a human-readable reason and mutates nothing.
pub fn try_debit_coins(ctx: &ReducerContext, account: &mut GrowAccount, cost: u64) -> Result<(), String> {
    account.coins = debit_coins(account.coins, cost)?;
    account.updated_at = ctx.timestamp;
    ctx.db.grow_account().owner_id().update(account.clone());
    log::debug!("Debited {} coins from {:?} (remaining: {})", cost, account.owner_id, account.coins);
    Ok(())
}

/// Grant XP and recompute the prestige level.
pub fn award_xp(ctx: &ReducerContext, account: &mut GrowAccount, amount: u64) {
    account.xp += amount;
    let new_level = (account.xp / XP_PER_PRESTIGE_LEVEL) as u32 + 1;
    if new_level > account.prestige_level {
        log::info!("Account {:?} reached prestige level {}", account.owner_id, new_level);
        account.prestige_level = new_level;
    }
    account.updated_at = ctx.timestamp;
    ctx.db.grow_account().owner_id().update(account.clone());
}

// --- Tests ---
