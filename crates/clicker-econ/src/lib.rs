#![deny(warnings)]

//! Economic rules: pricing and purchase resolution for catalog items.
//!
//! This module provides:
//! - Exponential price scaling, `ceil(base_cost * 1.5^owned)`, the single
//!   price source for the shop and the quick-upgrade panel
//! - Affordability and ownership-cap checks
//! - Purchase application producing the next progress state and item
//! - Shop listings built on the same price function

use clicker_core::{Catalog, CatalogItem, Category, EffectKind, ProgressState};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Number of slots in the quick-upgrade panel.
pub const QUICK_UPGRADE_SLOTS: usize = 3;

/// Errors produced when resolving a purchase.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PurchaseError {
    /// Currency is below the current price; nothing changes.
    #[error("insufficient funds: price {price}, available {available}")]
    InsufficientFunds { price: u64, available: u64 },
    /// The item already reached its ownership cap; nothing changes.
    #[error("ownership cap reached for {id} (max {max_owned})")]
    OwnershipCapReached { id: String, max_owned: u32 },
}

/// Current price of an item given its ownership count.
///
/// Example:
/// let mut item = Catalog::standard().get("auto-clicker").unwrap().clone();
/// item.owned_count = 2;
/// assert_eq!(current_price(&item), 113); // ceil(50 * 2.25)
pub fn current_price(item: &CatalogItem) -> u64 {
    price_at(item.base_cost, item.owned_count)
}

/// `ceil(base_cost * 1.5^owned)`, saturating at `u64::MAX`.
pub fn price_at(base_cost: u64, owned: u32) -> u64 {
    exact_price(base_cost, owned).unwrap_or_else(|| approx_price(base_cost, owned))
}

// ceil(base * 3^n / 2^n) in integers; None once the numerator overflows u128.
fn exact_price(base_cost: u64, owned: u32) -> Option<u64> {
    if owned >= 128 {
        return None;
    }
    let numerator = u128::from(base_cost).checked_mul(3u128.checked_pow(owned)?)?;
    let denominator = 1u128 << owned;
    let price = numerator / denominator + u128::from(numerator % denominator != 0);
    Some(u64::try_from(price).unwrap_or(u64::MAX))
}

fn approx_price(base_cost: u64, owned: u32) -> u64 {
    let growth = Decimal::new(15, 1);
    let ceiling = Decimal::from(u64::MAX);
    let mut price = Decimal::from(base_cost);
    for _ in 0..owned {
        price = match price.checked_mul(growth) {
            Some(p) if p <= ceiling => p,
            _ => return u64::MAX,
        };
    }
    price.ceil().to_u64().unwrap_or(u64::MAX)
}

/// True iff the item is under its cap and the balance covers its price.
pub fn can_purchase(state: &ProgressState, item: &CatalogItem) -> bool {
    !item.is_capped() && state.currency >= current_price(item)
}

/// Passive rate gained from one unit of a rate item.
pub fn rate_increase(item: &CatalogItem) -> u64 {
    if !item.effect_kind.affects_rate() {
        return 0;
    }
    item.effect_magnitude
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .unwrap_or(0)
}

/// Resolve a purchase of one unit of `item`.
///
/// The cap is checked first, so a capped item reports
/// `OwnershipCapReached` whatever the balance. The price charged is the one
/// computed from the pre-purchase ownership count.
pub fn apply_purchase(
    state: &ProgressState,
    item: &CatalogItem,
) -> Result<(ProgressState, CatalogItem), PurchaseError> {
    if let Some(max_owned) = item.max_owned {
        if item.owned_count >= max_owned {
            return Err(PurchaseError::OwnershipCapReached {
                id: item.id.clone(),
                max_owned,
            });
        }
    }
    let price = current_price(item);
    if state.currency < price {
        return Err(PurchaseError::InsufficientFunds {
            price,
            available: state.currency,
        });
    }

    let mut next = state.clone();
    next.currency -= price;
    match item.effect_kind {
        EffectKind::AdditiveRate | EffectKind::RateBoost => {
            next.passive_rate = next.passive_rate.saturating_add(rate_increase(item));
        }
        EffectKind::Multiplicative => {
            next.multiplier = next
                .multiplier
                .checked_mul(item.effect_magnitude)
                .unwrap_or(Decimal::MAX);
        }
    }

    let mut bought = item.clone();
    bought.owned_count = bought.owned_count.saturating_add(1);

    debug!(
        item = %item.id,
        price,
        currency = next.currency,
        passive_rate = next.passive_rate,
        multiplier = %next.multiplier,
        owned = bought.owned_count,
        "purchase resolved"
    );
    Ok((next, bought))
}

/// One row of the shop as any view renders it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub effect: String,
    pub price: u64,
    pub owned: u32,
    pub max_owned: Option<u32>,
    /// Balance covers the price.
    pub affordable: bool,
    /// Ownership cap reached.
    pub max_reached: bool,
}

impl Listing {
    pub fn purchasable(&self) -> bool {
        self.affordable && !self.max_reached
    }
}

/// Build the listing for one item.
pub fn listing(state: &ProgressState, item: &CatalogItem) -> Listing {
    let price = current_price(item);
    Listing {
        id: item.id.clone(),
        name: item.name.clone(),
        category: item.category,
        effect: item.effect_label(),
        price,
        owned: item.owned_count,
        max_owned: item.max_owned,
        affordable: state.currency >= price,
        max_reached: item.is_capped(),
    }
}

/// Shop rows in catalog order, optionally restricted to one category.
pub fn shop_listings(
    state: &ProgressState,
    catalog: &Catalog,
    filter: Option<Category>,
) -> Vec<Listing> {
    catalog
        .iter()
        .filter(|item| filter.map_or(true, |c| item.category == c))
        .map(|item| listing(state, item))
        .collect()
}

/// The quick-upgrade panel: the first basic items, priced like the shop.
pub fn quick_upgrades(state: &ProgressState, catalog: &Catalog) -> Vec<Listing> {
    let mut rows = shop_listings(state, catalog, Some(Category::Basic));
    rows.truncate(QUICK_UPGRADE_SLOTS);
    rows
}
