// SPDX-License-Identifier: MIT
//! Shop ledger — validates a purchase, debits the wallet, credits inventory.
//!
//! The catalog currently holds a single item: a streak-freeze charge. The
//! funds check and the debit are one conditional UPDATE, so two concurrent
//! purchases by the same user cannot both pass validation and overdraw the
//! wallet.

use anyhow::Result;
use tracing::info;

use crate::storage::Storage;

/// Catalog item id for one streak-freeze charge.
pub const STREAK_FREEZE: &str = "streak_freeze";

/// Errors a purchase can fail with. `Store` wraps persistence failures; the
/// other variants are caller mistakes surfaced as 400s.
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("invalid price: {0}")]
    InvalidPrice(i64),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Purchase `item_id` at the client-displayed price.
///
/// Returns the new wallet balance for UI display. On `InsufficientFunds`
/// nothing has been mutated.
pub async fn purchase(
    storage: &Storage,
    user_id: &str,
    item_id: &str,
    price: i64,
) -> Result<i64, ShopError> {
    if item_id != STREAK_FREEZE {
        return Err(ShopError::UnknownItem(item_id.to_string()));
    }
    // A non-positive price would turn the debit into a credit.
    if price <= 0 {
        return Err(ShopError::InvalidPrice(price));
    }

    if !storage.debit_wallet(user_id, price).await? {
        return Err(ShopError::InsufficientFunds);
    }

    // The freeze credit is a separate statement; a crash between debit and
    // credit loses one charge for this user only.
    storage.credit_freeze(user_id).await?;

    let new_balance = storage
        .wallet_balance(user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("wallet row missing after debit"))?;

    info!(user_id, item_id, price, new_balance, "purchase completed");
    Ok(new_balance)
}
