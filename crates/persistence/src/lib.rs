#![deny(warnings)]

//! Persistence layer: record stores, versioned record schemas, the
//! reconciler that keeps progress and shop ownership consistent, and save
//! export/import.
//!
//! Four logical records exist (`progress`, `profile`, `shop`, `settings`).
//! Each is stored as a JSON object carrying a `version` field; records
//! without one are the legacy flat shape and are migrated on load. Loading
//! never fails: missing or malformed data degrades to defaults and is logged.

use chrono::{DateTime, NaiveDate, Utc};
use clicker_core::{Catalog, Ownership, Profile, ProgressState, Settings};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Current schema version written for every record.
pub const SCHEMA_VERSION: u32 = 1;

/// Version assigned to records written before versioning existed.
pub const LEGACY_VERSION: u32 = 0;

/// Logical key of a persisted record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Progress,
    Profile,
    Shop,
    Settings,
}

impl RecordKey {
    pub const ALL: [RecordKey; 4] = [
        RecordKey::Progress,
        RecordKey::Profile,
        RecordKey::Shop,
        RecordKey::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKey::Progress => "progress",
            RecordKey::Profile => "profile",
            RecordKey::Shop => "shop",
            RecordKey::Settings => "settings",
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by stores, record codecs and import.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Unparseable or wrong-shaped record; recovered by substituting defaults.
    #[error("malformed {key} record: {reason}")]
    MalformedPersistedData { key: RecordKey, reason: String },
    /// Import blob could not be parsed; nothing was written.
    #[error("invalid import format: {0}")]
    ImportFormatInvalid(String),
}

impl PersistenceError {
    fn malformed(key: RecordKey, reason: impl fmt::Display) -> Self {
        PersistenceError::MalformedPersistedData {
            key,
            reason: reason.to_string(),
        }
    }
}

/// Raw record storage keyed by `RecordKey`.
///
/// Local files, an in-memory map or a remote per-user table can all satisfy
/// this; the reconciler only needs whole-record reads and writes.
pub trait Store {
    fn read(&self, key: RecordKey) -> Result<Option<String>, PersistenceError>;
    fn write(&mut self, key: RecordKey, value: &str) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: RecordKey) -> Result<(), PersistenceError>;
}

/// Write several records as one unit.
///
/// Previous values are captured first; if any write fails, the records
/// already written are restored (or removed if they did not exist) and the
/// first error is returned.
pub fn write_all<S: Store + ?Sized>(
    store: &mut S,
    records: &[(RecordKey, String)],
) -> Result<(), PersistenceError> {
    let mut previous = Vec::with_capacity(records.len());
    for (key, _) in records {
        previous.push((*key, store.read(*key)?));
    }
    for (idx, (key, value)) in records.iter().enumerate() {
        if let Err(err) = store.write(*key, value) {
            warn!(key = %key, error = %err, "record write failed, rolling back");
            for (written, old) in &previous[..idx] {
                let restored = match old {
                    Some(v) => store.write(*written, v),
                    None => store.remove(*written),
                };
                if let Err(e) = restored {
                    warn!(key = %written, error = %e, "rollback failed");
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

/// In-memory store, used by tests and ephemeral sessions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    records: BTreeMap<RecordKey, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn read(&self, key: RecordKey) -> Result<Option<String>, PersistenceError> {
        Ok(self.records.get(&key).cloned())
    }

    fn write(&mut self, key: RecordKey, value: &str) -> Result<(), PersistenceError> {
        self.records.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: RecordKey) -> Result<(), PersistenceError> {
        self.records.remove(&key);
        Ok(())
    }
}

/// One JSON file per record inside a directory.
///
/// Each write goes to a temporary file that is renamed over the target, so
/// a single record is always either the old or the new version.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a save directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: RecordKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl Store for FileStore {
    fn read(&self, key: RecordKey) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: RecordKey, value: &str) -> Result<(), PersistenceError> {
        let tmp = self.dir.join(format!(".{}.json.tmp", key.as_str()));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path(key))?;
        Ok(())
    }

    fn remove(&mut self, key: RecordKey) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct ProgressRecord {
    version: u32,
    clicks: u64,
    total_clicks: u64,
    clicks_per_second: u64,
    multiplier: Decimal,
    prestige_level: u32,
    ascension_level: u32,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self::from(&ProgressState::default())
    }
}

impl From<&ProgressState> for ProgressRecord {
    fn from(s: &ProgressState) -> Self {
        Self {
            version: SCHEMA_VERSION,
            clicks: s.currency,
            total_clicks: s.lifetime_currency,
            clicks_per_second: s.passive_rate,
            multiplier: s.multiplier,
            prestige_level: s.prestige_tier,
            ascension_level: s.ascension_tier,
        }
    }
}

impl From<ProgressRecord> for ProgressState {
    fn from(r: ProgressRecord) -> Self {
        Self {
            currency: r.clicks,
            lifetime_currency: r.total_clicks,
            passive_rate: r.clicks_per_second,
            multiplier: r.multiplier,
            prestige_tier: r.prestige_level,
            ascension_tier: r.ascension_level,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ShopRecord {
    version: u32,
    items: BTreeMap<String, OwnedEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OwnedEntry {
    owned: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfileRecord {
    version: u32,
    username: String,
    #[serde(default)]
    avatar_url: String,
    join_date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingsRecord {
    version: u32,
    #[serde(flatten)]
    settings: Settings,
}

fn parse_object(key: RecordKey, raw: &str) -> Result<(u32, Map<String, Value>), PersistenceError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| PersistenceError::malformed(key, e))?;
    let Value::Object(fields) = value else {
        return Err(PersistenceError::malformed(key, "expected a JSON object"));
    };
    let version = match fields.get("version") {
        None => LEGACY_VERSION,
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| PersistenceError::malformed(key, "version is not an integer"))?,
    };
    if version > SCHEMA_VERSION {
        return Err(PersistenceError::malformed(
            key,
            format!("unsupported version {version} (current {SCHEMA_VERSION})"),
        ));
    }
    Ok((version, fields))
}

fn typed<T: serde::de::DeserializeOwned>(
    key: RecordKey,
    fields: Map<String, Value>,
) -> Result<T, PersistenceError> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| PersistenceError::malformed(key, e))
}

// Legacy records were written by a loosely typed client: numbers may be
// floats or strings, and anything unusable reads as zero.
fn lenient_f64(v: Option<&Value>) -> Option<f64> {
    let x = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    x.filter(|x| x.is_finite())
}

fn lenient_u64(v: Option<&Value>) -> u64 {
    lenient_f64(v).map_or(0, |x| if x <= 0.0 { 0 } else { x.floor() as u64 })
}

fn lenient_u32(v: Option<&Value>) -> u32 {
    u32::try_from(lenient_u64(v)).unwrap_or(u32::MAX)
}

fn lenient_bool(v: Option<&Value>, default: bool) -> bool {
    v.and_then(Value::as_bool).unwrap_or(default)
}

fn migrate_progress_v0(fields: &Map<String, Value>) -> ProgressState {
    let multiplier = lenient_f64(fields.get("multiplier"))
        .and_then(Decimal::from_f64)
        .filter(|m| !m.is_zero())
        .unwrap_or(Decimal::ONE);
    ProgressState {
        currency: lenient_u64(fields.get("clicks")),
        lifetime_currency: lenient_u64(fields.get("total_clicks")),
        passive_rate: lenient_u64(fields.get("clicks_per_second")),
        multiplier,
        prestige_tier: lenient_u32(fields.get("prestige_level")),
        ascension_tier: lenient_u32(fields.get("ascension_level")),
    }
}

/// Repair load-time invariant violations, logging each repair.
fn normalize_progress(mut state: ProgressState) -> ProgressState {
    if state.currency > state.lifetime_currency {
        warn!(
            currency = state.currency,
            lifetime = state.lifetime_currency,
            "lifetime currency below balance, raising it"
        );
        state.lifetime_currency = state.currency;
    }
    if state.multiplier < Decimal::ONE {
        warn!(multiplier = %state.multiplier, "multiplier below 1, resetting");
        state.multiplier = Decimal::ONE;
    }
    state
}

/// Decode a persisted progress record of any supported version.
pub fn decode_progress(raw: &str) -> Result<ProgressState, PersistenceError> {
    let key = RecordKey::Progress;
    let (version, fields) = parse_object(key, raw)?;
    let state = if version == LEGACY_VERSION {
        debug!(key = %key, "migrating legacy record");
        migrate_progress_v0(&fields)
    } else {
        typed::<ProgressRecord>(key, fields)?.into()
    };
    Ok(normalize_progress(state))
}

/// Encode progress in the current schema.
pub fn encode_progress(state: &ProgressState) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(&ProgressRecord::from(state))?)
}

/// Decode a persisted shop ownership record of any supported version.
pub fn decode_ownership(raw: &str) -> Result<Ownership, PersistenceError> {
    let key = RecordKey::Shop;
    let (version, fields) = parse_object(key, raw)?;
    if version == LEGACY_VERSION {
        // Legacy shape: { "<item id>": { "owned": n } }
        debug!(key = %key, "migrating legacy record");
        return Ok(fields
            .iter()
            .map(|(id, entry)| {
                let owned = match entry {
                    Value::Object(o) => lenient_u32(o.get("owned")),
                    other => lenient_u32(Some(other)),
                };
                (id.clone(), owned)
            })
            .collect());
    }
    let record: ShopRecord = typed(key, fields)?;
    Ok(record
        .items
        .into_iter()
        .map(|(id, entry)| (id, entry.owned))
        .collect())
}

/// Encode shop ownership in the current schema.
pub fn encode_ownership(ownership: &Ownership) -> Result<String, PersistenceError> {
    let record = ShopRecord {
        version: SCHEMA_VERSION,
        items: ownership
            .iter()
            .map(|(id, &owned)| (id.clone(), OwnedEntry { owned }))
            .collect(),
    };
    Ok(serde_json::to_string(&record)?)
}

/// Decode a persisted profile; `today` fills a missing join date.
pub fn decode_profile(raw: &str, today: NaiveDate) -> Result<Profile, PersistenceError> {
    let key = RecordKey::Profile;
    let (version, fields) = parse_object(key, raw)?;
    if version == LEGACY_VERSION {
        // Legacy shape is camelCase with a day.month.year join date.
        debug!(key = %key, "migrating legacy record");
        let mut profile = Profile::new(today);
        if let Some(name) = fields.get("username").and_then(Value::as_str) {
            profile.rename(name);
        }
        if let Some(url) = fields.get("avatarUrl").and_then(Value::as_str) {
            profile.set_avatar(url);
        }
        if let Some(date) = fields
            .get("joinDate")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%d.%m.%Y").ok())
        {
            profile.join_date = date;
        }
        return Ok(profile);
    }
    let record: ProfileRecord = typed(key, fields)?;
    Ok(Profile {
        username: record.username,
        avatar_url: record.avatar_url,
        join_date: record.join_date,
    })
}

/// Encode a profile in the current schema.
pub fn encode_profile(profile: &Profile) -> Result<String, PersistenceError> {
    let record = ProfileRecord {
        version: SCHEMA_VERSION,
        username: profile.username.clone(),
        avatar_url: profile.avatar_url.clone(),
        join_date: profile.join_date,
    };
    Ok(serde_json::to_string(&record)?)
}

/// Decode persisted settings; numeric fields are clamped into range.
pub fn decode_settings(raw: &str) -> Result<Settings, PersistenceError> {
    let key = RecordKey::Settings;
    let (version, fields) = parse_object(key, raw)?;
    let settings = if version == LEGACY_VERSION {
        debug!(key = %key, "migrating legacy record");
        let d = Settings::default();
        Settings {
            sound_enabled: lenient_bool(fields.get("soundEnabled"), d.sound_enabled),
            sound_volume: fields
                .get("soundVolume")
                .map_or(d.sound_volume, |v| lenient_u32(Some(v)).min(255) as u8),
            animations_enabled: lenient_bool(fields.get("animationsEnabled"), d.animations_enabled),
            auto_save_enabled: lenient_bool(fields.get("autoSaveEnabled"), d.auto_save_enabled),
            auto_save_interval_secs: fields
                .get("autoSaveInterval")
                .map_or(d.auto_save_interval_secs, |v| lenient_u32(Some(v))),
            show_click_numbers: lenient_bool(fields.get("showClickNumbers"), d.show_click_numbers),
            dark_mode: lenient_bool(fields.get("darkMode"), d.dark_mode),
            reduced_motion: lenient_bool(fields.get("reducedMotion"), d.reduced_motion),
        }
    } else {
        typed::<SettingsRecord>(key, fields)?.settings
    };
    Ok(settings.clamped())
}

/// Encode settings in the current schema.
pub fn encode_settings(settings: &Settings) -> Result<String, PersistenceError> {
    let record = SettingsRecord {
        version: SCHEMA_VERSION,
        settings: settings.clone(),
    };
    Ok(serde_json::to_string(&record)?)
}

/// Transferable save file: each field holds the raw serialized record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportBundle {
    pub progress: Option<String>,
    pub profile: Option<String>,
    pub shop: Option<String>,
    pub settings: Option<String>,
}

impl ExportBundle {
    fn field(&self, key: RecordKey) -> Option<&String> {
        match key {
            RecordKey::Progress => self.progress.as_ref(),
            RecordKey::Profile => self.profile.as_ref(),
            RecordKey::Shop => self.shop.as_ref(),
            RecordKey::Settings => self.settings.as_ref(),
        }
    }

    fn field_mut(&mut self, key: RecordKey) -> &mut Option<String> {
        match key {
            RecordKey::Progress => &mut self.progress,
            RecordKey::Profile => &mut self.profile,
            RecordKey::Shop => &mut self.shop,
            RecordKey::Settings => &mut self.settings,
        }
    }
}

/// File name for an export made on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("clicker-save-{}.json", date.format("%Y-%m-%d"))
}

/// Canonical access path to persisted progress and shop ownership.
///
/// Every view loads through here and writes back through here right after a
/// local mutation, so the next load from any other view observes it.
#[derive(Debug)]
pub struct Reconciler<S> {
    store: S,
    today: NaiveDate,
}

impl<S: Store> Reconciler<S> {
    /// `today` is used as the join date of a freshly created profile.
    pub fn new(store: S, today: NaiveDate) -> Self {
        Self { store, today }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn load_record<T>(
        &self,
        key: RecordKey,
        decode: impl FnOnce(&str) -> Result<T, PersistenceError>,
        default: impl FnOnce() -> T,
    ) -> T {
        match self.store.read(key) {
            Ok(Some(raw)) => match decode(&raw) {
                Ok(value) => value,
                Err(err) => {
                    warn!(key = %key, error = %err, "discarding unreadable record, using defaults");
                    default()
                }
            },
            Ok(None) => {
                debug!(key = %key, "no saved record, using defaults");
                default()
            }
            Err(err) => {
                warn!(key = %key, error = %err, "record read failed, using defaults");
                default()
            }
        }
    }

    /// Load progress; defaults on missing or malformed data.
    pub fn load(&self) -> ProgressState {
        self.load_record(RecordKey::Progress, decode_progress, ProgressState::default)
    }

    /// Load raw ownership counts keyed by item id.
    pub fn load_ownership(&self) -> Ownership {
        self.load_record(RecordKey::Shop, decode_ownership, Ownership::new)
    }

    /// Load the standard catalog with persisted ownership applied.
    pub fn load_catalog(&self) -> Catalog {
        let mut catalog = Catalog::standard();
        let report = catalog.apply_ownership(&self.load_ownership());
        if !report.is_clean() {
            warn!(
                unknown = ?report.unknown,
                clamped = ?report.clamped,
                "repaired shop ownership record"
            );
        }
        catalog
    }

    pub fn load_profile(&self) -> Profile {
        let today = self.today;
        self.load_record(
            RecordKey::Profile,
            |raw| decode_profile(raw, today),
            || Profile::new(today),
        )
    }

    pub fn load_settings(&self) -> Settings {
        self.load_record(RecordKey::Settings, decode_settings, Settings::default)
    }

    pub fn save(&mut self, state: &ProgressState) -> Result<(), PersistenceError> {
        self.store.write(RecordKey::Progress, &encode_progress(state)?)
    }

    pub fn save_ownership(&mut self, ownership: &Ownership) -> Result<(), PersistenceError> {
        self.store.write(RecordKey::Shop, &encode_ownership(ownership)?)
    }

    pub fn save_profile(&mut self, profile: &Profile) -> Result<(), PersistenceError> {
        self.store.write(RecordKey::Profile, &encode_profile(profile)?)
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<(), PersistenceError> {
        self.store.write(RecordKey::Settings, &encode_settings(settings)?)
    }

    /// Persist the outcome of a purchase: progress and ownership are written
    /// together, and a failure on either leaves both records as they were.
    pub fn commit_purchase(
        &mut self,
        state: &ProgressState,
        ownership: &Ownership,
    ) -> Result<(), PersistenceError> {
        let records = [
            (RecordKey::Progress, encode_progress(state)?),
            (RecordKey::Shop, encode_ownership(ownership)?),
        ];
        write_all(&mut self.store, &records)
    }

    /// Bundle every stored record verbatim into a pretty-printed JSON blob.
    pub fn export_all(&self) -> Result<String, PersistenceError> {
        let mut bundle = ExportBundle::default();
        for key in RecordKey::ALL {
            *bundle.field_mut(key) = self.store.read(key)?;
        }
        let blob = serde_json::to_string_pretty(&bundle)?;
        info!(bytes = blob.len(), "exported save");
        Ok(blob)
    }

    /// Restore records from an exported blob.
    ///
    /// Present, non-empty fields replace the stored record verbatim; absent
    /// ones are left alone. Record contents are not validated here, so an
    /// inconsistent save is only repaired on the next load. A blob that does
    /// not parse writes nothing.
    pub fn import_all(&mut self, blob: &str) -> Result<(), PersistenceError> {
        let invalid = |reason: String| PersistenceError::ImportFormatInvalid(reason);
        let value: Value = serde_json::from_str(blob).map_err(|e| invalid(e.to_string()))?;
        if !value.is_object() {
            return Err(invalid("expected a JSON object".to_string()));
        }
        let bundle: ExportBundle =
            serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
        let records: Vec<(RecordKey, String)> = RecordKey::ALL
            .iter()
            .filter_map(|&key| {
                bundle
                    .field(key)
                    .filter(|raw| !raw.is_empty())
                    .map(|raw| (key, raw.clone()))
            })
            .collect();
        write_all(&mut self.store, &records)?;
        info!(records = records.len(), "imported save");
        Ok(())
    }
}

/// Per-user progress row of a remote table; every numeric column is nullable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProgressRow {
    pub user_id: String,
    pub clicks: Option<i64>,
    pub total_clicks: Option<i64>,
    pub clicks_per_second: Option<i64>,
    pub multiplier: Option<Decimal>,
    pub prestige_level: Option<i64>,
    pub ascension_level: Option<i64>,
    pub offline_time: Option<DateTime<Utc>>,
}

fn column_u64(v: Option<i64>) -> u64 {
    v.and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
}

fn column_u32(v: Option<i64>) -> u32 {
    v.and_then(|n| u32::try_from(n).ok()).unwrap_or(0)
}

fn to_column(v: u64) -> Option<i64> {
    Some(i64::try_from(v).unwrap_or(i64::MAX))
}

impl RemoteProgressRow {
    pub fn from_state(
        user_id: &str,
        state: &ProgressState,
        offline_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            clicks: to_column(state.currency),
            total_clicks: to_column(state.lifetime_currency),
            clicks_per_second: to_column(state.passive_rate),
            multiplier: Some(state.multiplier),
            prestige_level: Some(i64::from(state.prestige_tier)),
            ascension_level: Some(i64::from(state.ascension_tier)),
            offline_time,
        }
    }

    /// Null or negative columns read as defaults.
    pub fn to_state(&self) -> ProgressState {
        normalize_progress(ProgressState {
            currency: column_u64(self.clicks),
            lifetime_currency: column_u64(self.total_clicks),
            passive_rate: column_u64(self.clicks_per_second),
            multiplier: self.multiplier.unwrap_or(Decimal::ONE),
            prestige_tier: column_u32(self.prestige_level),
            ascension_tier: column_u32(self.ascension_level),
        })
    }
}

/// Per-user ownership row of a remote table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOwnershipRow {
    pub user_id: String,
    pub item_id: String,
    pub owned: Option<i64>,
}

pub fn ownership_rows(user_id: &str, ownership: &Ownership) -> Vec<RemoteOwnershipRow> {
    ownership
        .iter()
        .map(|(item_id, &owned)| RemoteOwnershipRow {
            user_id: user_id.to_string(),
            item_id: item_id.clone(),
            owned: Some(i64::from(owned)),
        })
        .collect()
}

pub fn ownership_from_rows(rows: &[RemoteOwnershipRow]) -> Ownership {
    rows.iter()
        .map(|r| (r.item_id.clone(), column_u32(r.owned)))
        .collect()
}
