#![deny(warnings)]

//! Core domain models and invariants for the clicker economy.
//!
//! This crate defines the serializable progress state, the upgrade catalog,
//! the profile and settings records, and the two accrual rules (manual click
//! and passive tick). Everything here is pure; persisting the results is the
//! caller's responsibility.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Lifetime currency required per player level.
pub const CURRENCY_PER_LEVEL: u64 = 1_000;

/// Per-user progression singleton.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Spendable balance.
    pub currency: u64,
    /// Total ever earned; never decreases, not even on spend.
    pub lifetime_currency: u64,
    /// Currency gained per whole second with no user action.
    pub passive_rate: u64,
    /// Scales the value of each manual click (>= 1).
    pub multiplier: Decimal,
    /// Advisory prestige counter (displayed only).
    pub prestige_tier: u32,
    /// Advisory ascension counter (displayed only).
    pub ascension_tier: u32,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            currency: 0,
            lifetime_currency: 0,
            passive_rate: 0,
            multiplier: Decimal::ONE,
            prestige_tier: 0,
            ascension_tier: 0,
        }
    }
}

impl ProgressState {
    /// Currency credited by one manual click: the multiplier rounded half
    /// away from zero, never less than one.
    pub fn click_value(&self) -> u64 {
        let rounded = self
            .multiplier
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        if rounded < Decimal::ONE {
            return 1;
        }
        rounded.to_u64().unwrap_or(u64::MAX)
    }

    /// Player level derived from lifetime currency, starting at 1.
    pub fn level(&self) -> u64 {
        self.lifetime_currency / CURRENCY_PER_LEVEL + 1
    }

    /// Progress towards the next level in whole percent (0..=99).
    pub fn level_progress_percent(&self) -> u8 {
        ((self.lifetime_currency % CURRENCY_PER_LEVEL) / 10) as u8
    }

    // Both counters saturate, so lifetime >= currency survives overflow.
    fn credited(&self, amount: u64) -> Self {
        Self {
            currency: self.currency.saturating_add(amount),
            lifetime_currency: self.lifetime_currency.saturating_add(amount),
            ..self.clone()
        }
    }
}

/// Apply one manual click.
pub fn apply_click(state: &ProgressState) -> ProgressState {
    state.credited(state.click_value())
}

/// Apply `elapsed_secs` whole seconds of passive accrual.
pub fn apply_tick(state: &ProgressState, elapsed_secs: u64) -> ProgressState {
    if state.passive_rate == 0 || elapsed_secs == 0 {
        return state.clone();
    }
    state.credited(state.passive_rate.saturating_mul(elapsed_secs))
}

/// Shop tier of a catalog item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Basic,
    Advanced,
    Premium,
}

impl Category {
    /// All categories in display order.
    pub fn all() -> &'static [Category] {
        &[Category::Basic, Category::Advanced, Category::Premium]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Basic => "basic",
            Category::Advanced => "advanced",
            Category::Premium => "premium",
        }
    }

    /// Parse a category name as typed by a user (case-insensitive).
    pub fn parse(s: &str) -> Option<Category> {
        Category::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// How a purchase changes progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    /// Adds the magnitude to the passive rate.
    AdditiveRate,
    /// Large passive rate increase; same arithmetic as `AdditiveRate`.
    RateBoost,
    /// Multiplies the click multiplier by the magnitude.
    Multiplicative,
}

impl EffectKind {
    pub fn affects_rate(&self) -> bool {
        matches!(self, EffectKind::AdditiveRate | EffectKind::RateBoost)
    }
}

/// A purchasable upgrade and its current ownership.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable key, also used in the persisted ownership record.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Price of the first unit (> 0).
    pub base_cost: u64,
    pub category: Category,
    pub effect_kind: EffectKind,
    pub effect_magnitude: Decimal,
    pub owned_count: u32,
    /// Ownership cap; `None` means unbounded.
    pub max_owned: Option<u32>,
}

impl CatalogItem {
    fn new(
        id: &str,
        name: &str,
        base_cost: u64,
        category: Category,
        effect_kind: EffectKind,
        effect_magnitude: i64,
        max_owned: Option<u32>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            base_cost,
            category,
            effect_kind,
            effect_magnitude: Decimal::from(effect_magnitude),
            owned_count: 0,
            max_owned,
        }
    }

    /// True when the ownership cap has been reached.
    pub fn is_capped(&self) -> bool {
        self.max_owned.map_or(false, |max| self.owned_count >= max)
    }

    /// Short human-readable effect, e.g. "+5/s" or "x2 per click".
    pub fn effect_label(&self) -> String {
        match self.effect_kind {
            EffectKind::AdditiveRate | EffectKind::RateBoost => {
                format!("+{}/s", self.effect_magnitude.normalize())
            }
            EffectKind::Multiplicative => format!("x{} per click", self.effect_magnitude.normalize()),
        }
    }
}

/// Owned count per item id, as persisted in the shop record.
pub type Ownership = BTreeMap<String, u32>;

/// Repairs made while applying a persisted ownership record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnershipReport {
    /// Ids present in the record but absent from the catalog.
    pub unknown: Vec<String>,
    /// Ids whose count exceeded the cap and was clamped.
    pub clamped: Vec<String>,
}

impl OwnershipReport {
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty() && self.clamped.is_empty()
    }
}

/// The fixed set of purchasable items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub items: Vec<CatalogItem>,
}

impl Catalog {
    /// The statically defined catalog with nothing owned.
    pub fn standard() -> Self {
        use Category::*;
        use EffectKind::*;
        Self {
            items: vec![
                CatalogItem::new("auto-clicker", "Auto Clicker", 50, Basic, AdditiveRate, 1, None),
                CatalogItem::new("power-boost", "Power Boost", 200, Basic, Multiplicative, 2, Some(10)),
                CatalogItem::new("combo-master", "Combo Master", 1_000, Basic, AdditiveRate, 5, None),
                CatalogItem::new("turbo-engine", "Turbo Engine", 5_000, Advanced, RateBoost, 25, None),
                CatalogItem::new(
                    "mega-multiplier",
                    "Mega Multiplier",
                    10_000,
                    Advanced,
                    Multiplicative,
                    5,
                    Some(5),
                ),
                CatalogItem::new(
                    "golden-clicker",
                    "Golden Clicker",
                    50_000,
                    Premium,
                    RateBoost,
                    100,
                    Some(1),
                ),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CatalogItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter()
    }

    /// Snapshot of owned counts keyed by item id (every item included).
    pub fn ownership(&self) -> Ownership {
        self.items
            .iter()
            .map(|i| (i.id.clone(), i.owned_count))
            .collect()
    }

    /// Replace owned counts from a persisted record. Items missing from the
    /// record are reset to zero; unknown ids are ignored; counts above a cap
    /// are clamped.
    pub fn apply_ownership(&mut self, ownership: &Ownership) -> OwnershipReport {
        let mut report = OwnershipReport::default();
        for item in &mut self.items {
            let count = ownership.get(&item.id).copied().unwrap_or(0);
            item.owned_count = match item.max_owned {
                Some(max) if count > max => {
                    report.clamped.push(item.id.clone());
                    max
                }
                _ => count,
            };
        }
        report.unknown = ownership
            .keys()
            .filter(|id| self.get(id).is_none())
            .cloned()
            .collect();
        report
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("currency {currency} exceeds lifetime currency {lifetime}")]
    CurrencyExceedsLifetime { currency: u64, lifetime: u64 },
    #[error("multiplier {0} is below 1")]
    MultiplierBelowOne(Decimal),
    #[error("item {0} has zero base cost")]
    ZeroBaseCost(String),
    #[error("item {0} has a zero ownership cap")]
    ZeroCap(String),
    #[error("item {0} has an invalid effect magnitude")]
    InvalidMagnitude(String),
    #[error("item {id} owns {owned} but is capped at {max}")]
    OwnershipExceedsCap { id: String, owned: u32, max: u32 },
    #[error("duplicate item id: {0}")]
    DuplicateItem(String),
}

/// Validate the progress invariants.
pub fn validate_progress(state: &ProgressState) -> Result<(), ValidationError> {
    if state.currency > state.lifetime_currency {
        return Err(ValidationError::CurrencyExceedsLifetime {
            currency: state.currency,
            lifetime: state.lifetime_currency,
        });
    }
    if state.multiplier < Decimal::ONE {
        return Err(ValidationError::MultiplierBelowOne(state.multiplier));
    }
    Ok(())
}

/// Validate a single catalog item.
pub fn validate_item(item: &CatalogItem) -> Result<(), ValidationError> {
    if item.base_cost == 0 {
        return Err(ValidationError::ZeroBaseCost(item.id.clone()));
    }
    if item.max_owned == Some(0) {
        return Err(ValidationError::ZeroCap(item.id.clone()));
    }
    // Multiplicative magnitudes below one would push the multiplier under 1.
    // The passive rate is a whole number per second, so rate magnitudes are too.
    let magnitude_ok = match item.effect_kind {
        EffectKind::Multiplicative => item.effect_magnitude >= Decimal::ONE,
        EffectKind::AdditiveRate | EffectKind::RateBoost => {
            item.effect_magnitude > Decimal::ZERO && item.effect_magnitude.fract().is_zero()
        }
    };
    if !magnitude_ok {
        return Err(ValidationError::InvalidMagnitude(item.id.clone()));
    }
    if let Some(max) = item.max_owned {
        if item.owned_count > max {
            return Err(ValidationError::OwnershipExceedsCap {
                id: item.id.clone(),
                owned: item.owned_count,
                max,
            });
        }
    }
    Ok(())
}

/// Validate the catalog, including id uniqueness.
pub fn validate_catalog(catalog: &Catalog) -> Result<(), ValidationError> {
    let mut ids: BTreeSet<&str> = BTreeSet::new();
    for item in &catalog.items {
        validate_item(item)?;
        if !ids.insert(item.id.as_str()) {
            return Err(ValidationError::DuplicateItem(item.id.clone()));
        }
    }
    Ok(())
}

/// Player profile record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub avatar_url: String,
    pub join_date: NaiveDate,
}

impl Profile {
    pub const DEFAULT_USERNAME: &'static str = "Clicker Pro";

    pub fn new(join_date: NaiveDate) -> Self {
        Self {
            username: Self::DEFAULT_USERNAME.to_string(),
            avatar_url: String::new(),
            join_date,
        }
    }

    /// Rename the player; a blank name keeps the current one.
    pub fn rename(&mut self, username: &str) {
        let trimmed = username.trim();
        if !trimmed.is_empty() {
            self.username = trimmed.to_string();
        }
    }

    pub fn set_avatar(&mut self, url: &str) {
        self.avatar_url = url.trim().to_string();
    }

    pub fn reset_avatar(&mut self) {
        self.avatar_url.clear();
    }
}

/// User preferences record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sound_enabled: bool,
    /// Percent, 0..=100.
    pub sound_volume: u8,
    pub animations_enabled: bool,
    pub auto_save_enabled: bool,
    /// Seconds, 10..=300.
    pub auto_save_interval_secs: u32,
    pub show_click_numbers: bool,
    pub dark_mode: bool,
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            sound_volume: 50,
            animations_enabled: true,
            auto_save_enabled: true,
            auto_save_interval_secs: 30,
            show_click_numbers: true,
            dark_mode: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    pub const MAX_VOLUME: u8 = 100;
    pub const AUTO_SAVE_INTERVAL_RANGE: (u32, u32) = (10, 300);

    /// Clamp numeric fields into their allowed ranges.
    pub fn clamped(mut self) -> Self {
        let (lo, hi) = Self::AUTO_SAVE_INTERVAL_RANGE;
        self.sound_volume = self.sound_volume.min(Self::MAX_VOLUME);
        self.auto_save_interval_secs = self.auto_save_interval_secs.clamp(lo, hi);
        self
    }
}
