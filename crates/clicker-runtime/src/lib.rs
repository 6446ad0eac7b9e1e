#![deny(warnings)]

//! Game session runtime: the shared progress store every view reads and
//! writes through, the passive accrual timer, and the autosave loop.

use clicker_core::{apply_click, apply_tick, Catalog, Category, Profile, ProgressState, Settings};
use clicker_econ::{apply_purchase, quick_upgrades, shop_listings, Listing, PurchaseError};
use persistence::{PersistenceError, Reconciler, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Timer cadences for a running session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Period of one passive accrual firing; each firing credits one second.
    pub accrual_interval_ms: u64,
    pub autosave_interval_ms: u64,
    pub autosave_enabled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            accrual_interval_ms: 1_000,
            autosave_interval_ms: 2_000,
            autosave_enabled: true,
        }
    }
}

impl RuntimeConfig {
    pub fn accrual_interval(&self) -> Duration {
        Duration::from_millis(self.accrual_interval_ms.max(1))
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_interval_ms.max(1))
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error(transparent)]
    Purchase(#[from] PurchaseError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Outcome of a successful purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PurchaseReceipt {
    pub id: String,
    pub price: u64,
    pub owned: u32,
    pub currency: u64,
}

/// Everything the main game screen renders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameView {
    pub progress: ProgressState,
    pub click_value: u64,
    pub level: u64,
    pub level_progress_percent: u8,
    pub quick_upgrades: Vec<Listing>,
}

/// The single owned copy of a player's progress and shop ownership.
///
/// Mutations happen here and are published on a watch channel; purchases
/// are committed to storage before the in-memory state changes.
pub struct GameSession<S> {
    reconciler: Reconciler<S>,
    state: ProgressState,
    catalog: Catalog,
    profile: Profile,
    settings: Settings,
    dirty: bool,
    tx: watch::Sender<ProgressState>,
}

/// Session handle shared between views and the driver loop.
pub type SharedSession<S> = Arc<Mutex<GameSession<S>>>;

impl<S: Store> GameSession<S> {
    /// Load every record through the reconciler and start a session.
    pub fn open(reconciler: Reconciler<S>) -> Self {
        let state = reconciler.load();
        let catalog = reconciler.load_catalog();
        let profile = reconciler.load_profile();
        let settings = reconciler.load_settings();
        info!(
            currency = state.currency,
            lifetime = state.lifetime_currency,
            passive_rate = state.passive_rate,
            "session opened"
        );
        let (tx, _) = watch::channel(state.clone());
        Self {
            reconciler,
            state,
            catalog,
            profile,
            settings,
            dirty: false,
            tx,
        }
    }

    pub fn into_shared(self) -> SharedSession<S> {
        Arc::new(Mutex::new(self))
    }

    pub fn progress(&self) -> &ProgressState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    /// True when clicks or ticks have not been written yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Receive every published progress state.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.tx.subscribe()
    }

    fn publish(&self) {
        self.tx.send_replace(self.state.clone());
    }

    /// Apply one manual click; returns the amount credited.
    pub fn click(&mut self) -> u64 {
        let before = self.state.currency;
        self.state = apply_click(&self.state);
        self.dirty = true;
        self.publish();
        self.state.currency - before
    }

    /// Apply passive accrual for `elapsed_secs` whole seconds.
    pub fn tick(&mut self, elapsed_secs: u64) {
        if self.state.passive_rate == 0 || elapsed_secs == 0 {
            return;
        }
        self.state = apply_tick(&self.state, elapsed_secs);
        self.dirty = true;
        self.publish();
    }

    /// Buy one unit of `id`. Progress and ownership are written together
    /// before the session state changes; on any failure nothing changes.
    pub fn purchase(&mut self, id: &str) -> Result<PurchaseReceipt, SessionError> {
        let item = self
            .catalog
            .get(id)
            .ok_or_else(|| SessionError::UnknownItem(id.to_string()))?;
        let price = clicker_econ::current_price(item);
        let (next, bought) = apply_purchase(&self.state, item)?;

        let mut catalog = self.catalog.clone();
        let owned = bought.owned_count;
        if let Some(slot) = catalog.get_mut(id) {
            *slot = bought;
        }
        self.reconciler.commit_purchase(&next, &catalog.ownership())?;

        self.state = next;
        self.catalog = catalog;
        self.dirty = false;
        self.publish();
        info!(item = %id, price, owned, currency = self.state.currency, "purchase committed");
        Ok(PurchaseReceipt {
            id: id.to_string(),
            price,
            owned,
            currency: self.state.currency,
        })
    }

    /// Write progress now.
    pub fn save(&mut self) -> Result<(), SessionError> {
        self.reconciler.save(&self.state)?;
        self.dirty = false;
        debug!(currency = self.state.currency, "progress saved");
        Ok(())
    }

    /// Write progress only if something changed since the last write.
    pub fn flush(&mut self) -> Result<bool, SessionError> {
        if !self.dirty {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Re-read everything from storage, discarding unsaved changes.
    pub fn reload(&mut self) {
        if self.dirty {
            warn!("reload discards unsaved progress");
        }
        self.state = self.reconciler.load();
        self.catalog = self.reconciler.load_catalog();
        self.profile = self.reconciler.load_profile();
        self.settings = self.reconciler.load_settings();
        self.dirty = false;
        self.publish();
    }

    pub fn shop_view(&self, filter: Option<Category>) -> Vec<Listing> {
        shop_listings(&self.state, &self.catalog, filter)
    }

    pub fn game_view(&self) -> GameView {
        GameView {
            progress: self.state.clone(),
            click_value: self.state.click_value(),
            level: self.state.level(),
            level_progress_percent: self.state.level_progress_percent(),
            quick_upgrades: quick_upgrades(&self.state, &self.catalog),
        }
    }

    pub fn update_profile(&mut self, edit: impl FnOnce(&mut Profile)) -> Result<(), SessionError> {
        let mut profile = self.profile.clone();
        edit(&mut profile);
        self.reconciler.save_profile(&profile)?;
        self.profile = profile;
        Ok(())
    }

    /// Edit settings; numeric fields are clamped before saving.
    pub fn update_settings(&mut self, edit: impl FnOnce(&mut Settings)) -> Result<(), SessionError> {
        let mut settings = self.settings.clone();
        edit(&mut settings);
        let settings = settings.clamped();
        self.reconciler.save_settings(&settings)?;
        self.settings = settings;
        Ok(())
    }

    /// Flush pending progress, then bundle every record.
    pub fn export(&mut self) -> Result<String, SessionError> {
        self.flush()?;
        Ok(self.reconciler.export_all()?)
    }

    /// Replace stored records from an export and reload the session.
    pub fn import(&mut self, blob: &str) -> Result<(), SessionError> {
        self.reconciler.import_all(blob)?;
        self.dirty = false;
        self.reload();
        Ok(())
    }
}

/// Passive accrual timer, armed only while the passive rate is positive.
///
/// Missed firings (host suspended, loop starved) are skipped rather than
/// replayed; every firing stands for exactly one second of accrual.
#[derive(Debug)]
pub struct AccrualTimer {
    period: Duration,
    interval: Option<Interval>,
}

impl AccrualTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Arm or disarm for the given passive rate. A timer that stays armed
    /// keeps its phase.
    pub fn sync(&mut self, passive_rate: u64) {
        match (passive_rate > 0, self.interval.is_some()) {
            (true, false) => {
                let mut interval = interval_at(Instant::now() + self.period, self.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.interval = Some(interval);
                debug!(passive_rate, "accrual timer armed");
            }
            (false, true) => {
                self.interval = None;
                debug!("accrual timer disarmed");
            }
            _ => {}
        }
    }

    /// Wait for the next firing; never completes while disarmed.
    pub async fn fire(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Run the accrual and autosave timers for `session` until `shutdown`
/// flips to true (or its sender is dropped), then flush pending progress.
pub async fn drive<S: Store + Send>(
    session: SharedSession<S>,
    config: RuntimeConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), SessionError> {
    let mut progress = session.lock().await.subscribe();

    let mut accrual = AccrualTimer::new(config.accrual_interval());
    accrual.sync(progress.borrow_and_update().passive_rate);

    let period = config.autosave_interval();
    let mut autosave = interval_at(Instant::now() + period, period);
    autosave.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        accrual_ms = config.accrual_interval_ms,
        autosave_ms = config.autosave_interval_ms,
        autosave_enabled = config.autosave_enabled,
        "session driver started"
    );

    while !*shutdown.borrow() {
        tokio::select! {
            _ = accrual.fire() => {
                session.lock().await.tick(1);
            }
            _ = autosave.tick(), if config.autosave_enabled => {
                // The persisted setting can change at any point in a session.
                let mut s = session.lock().await;
                if s.settings().auto_save_enabled {
                    if let Err(e) = s.flush() {
                        warn!(error = %e, "autosave failed");
                    }
                }
            }
            changed = progress.changed() => {
                if changed.is_err() {
                    break;
                }
                let rate = progress.borrow_and_update().passive_rate;
                accrual.sync(rate);
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    let flushed = session.lock().await.flush()?;
    info!(flushed, "session driver stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clicker_core::Ownership;
    use persistence::{MemoryStore, RecordKey};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn session_with(state: ProgressState, settings: Option<Settings>) -> GameSession<MemoryStore> {
        let mut reconciler = Reconciler::new(MemoryStore::new(), today());
        reconciler.save(&state).unwrap();
        if let Some(settings) = settings {
            reconciler.save_settings(&settings).unwrap();
        }
        GameSession::open(reconciler)
    }

    fn funded(currency: u64, rate: u64) -> ProgressState {
        ProgressState {
            currency,
            lifetime_currency: currency,
            passive_rate: rate,
            ..ProgressState::default()
        }
    }

    fn saved_progress(session: &GameSession<MemoryStore>) -> Option<String> {
        session.reconciler().store().read(RecordKey::Progress).unwrap()
    }

    #[test]
    fn default_config_matches_game_cadences() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.accrual_interval(), Duration::from_secs(1));
        assert_eq!(cfg.autosave_interval(), Duration::from_secs(2));
        assert!(cfg.autosave_enabled);
    }

    #[test]
    fn clicks_mark_session_dirty_until_flushed() {
        let mut s = session_with(ProgressState::default(), None);
        assert_eq!(s.click(), 1);
        assert!(s.is_dirty());
        assert!(s.flush().unwrap());
        assert!(!s.flush().unwrap());
        assert_eq!(s.reconciler().load().currency, 1);
    }

    #[test]
    fn purchase_commits_before_swapping_state() {
        let mut s = session_with(funded(1_000, 0), None);
        let receipt = s.purchase("combo-master").unwrap();
        assert_eq!(receipt.price, 1_000);
        assert_eq!(receipt.owned, 1);
        assert_eq!(s.progress().currency, 0);
        assert_eq!(s.progress().passive_rate, 5);

        let stored = s.reconciler().load();
        assert_eq!(&stored, s.progress());
        assert_eq!(s.reconciler().load_ownership()["combo-master"], 1);
    }

    #[test]
    fn failed_purchase_changes_nothing() {
        let mut s = session_with(funded(5, 0), None);
        let err = s.purchase("auto-clicker").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Purchase(PurchaseError::InsufficientFunds { price: 50, available: 5 })
        ));
        assert_eq!(s.progress().currency, 5);
        assert_eq!(s.catalog().get("auto-clicker").unwrap().owned_count, 0);
        assert!(matches!(s.purchase("nope"), Err(SessionError::UnknownItem(_))));
    }

    #[test]
    fn game_view_uses_shop_prices() {
        let mut s = session_with(funded(2_000, 0), None);
        s.purchase("auto-clicker").unwrap();
        let view = s.game_view();
        assert_eq!(view.quick_upgrades.len(), 3);
        let shop = s.shop_view(Some(Category::Basic));
        assert_eq!(view.quick_upgrades, shop);
        assert_eq!(view.quick_upgrades[0].price, 75);
        assert_eq!(view.level, 3);
    }

    #[test]
    fn subscribers_see_every_change() {
        let mut s = session_with(ProgressState::default(), None);
        let mut rx = s.subscribe();
        s.click();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().currency, 1);
        s.tick(3);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn reload_picks_up_external_writes() {
        let mut s = session_with(ProgressState::default(), None);
        let mut other = Reconciler::new(s.reconciler().store().clone(), today());
        other.save(&funded(77, 2)).unwrap();
        let mut own = Ownership::new();
        own.insert("auto-clicker".into(), 2);
        other.save_ownership(&own).unwrap();

        *s.reconciler.store_mut() = other.into_inner();
        s.reload();
        assert_eq!(s.progress().currency, 77);
        assert_eq!(s.catalog().get("auto-clicker").unwrap().owned_count, 2);
    }

    #[test]
    fn settings_are_clamped_and_saved() {
        let mut s = session_with(ProgressState::default(), None);
        s.update_settings(|st| st.sound_volume = 200).unwrap();
        assert_eq!(s.settings().sound_volume, 100);
        assert_eq!(s.reconciler().load_settings().sound_volume, 100);
        s.update_profile(|p| p.rename("   ")).unwrap();
        assert_eq!(s.profile().username, Profile::DEFAULT_USERNAME);
    }

    #[test]
    fn export_then_import_restores_session() {
        let mut s = session_with(ProgressState::default(), None);
        s.click();
        let blob = s.export().unwrap();
        for _ in 0..4 {
            s.click();
        }
        s.import(&blob).unwrap();
        assert_eq!(s.progress().currency, 1);
        assert!(s.import("garbage").is_err());
        assert_eq!(s.progress().currency, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn accrual_timer_arms_only_for_positive_rate() {
        let mut timer = AccrualTimer::new(Duration::from_secs(1));
        timer.sync(0);
        assert!(!timer.is_armed());
        assert!(tokio::time::timeout(Duration::from_secs(5), timer.fire())
            .await
            .is_err());
        timer.sync(3);
        assert!(timer.is_armed());
        timer.fire().await;
        timer.sync(0);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn suspended_firings_are_dropped() {
        let mut timer = AccrualTimer::new(Duration::from_secs(1));
        timer.sync(1);
        tokio::time::advance(Duration::from_secs(5)).await;
        timer.fire().await;
        // The four missed firings are not replayed.
        assert!(tokio::time::timeout(Duration::from_millis(10), timer.fire())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn driver_accrues_once_per_second_and_flushes_on_shutdown() {
        let shared = session_with(funded(0, 5), None).into_shared();
        let (stop, rx) = watch::channel(false);
        let handle = tokio::spawn(drive(shared.clone(), RuntimeConfig::default(), rx));

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(shared.lock().await.progress().currency, 15);

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
        let s = shared.lock().await;
        assert!(!s.is_dirty());
        assert_eq!(s.reconciler().load().currency, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_arms_accrual_after_first_rate_purchase() {
        let shared = session_with(funded(50, 0), None).into_shared();
        let (stop, rx) = watch::channel(false);
        let handle = tokio::spawn(drive(shared.clone(), RuntimeConfig::default(), rx));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(shared.lock().await.progress().currency, 50);

        shared.lock().await.purchase("auto-clicker").unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(shared.lock().await.progress().currency, 2);

        drop(stop);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_flushes_clicks_on_its_own_cadence() {
        let shared = session_with(ProgressState::default(), None).into_shared();
        let (stop, rx) = watch::channel(false);
        let handle = tokio::spawn(drive(shared.clone(), RuntimeConfig::default(), rx));

        shared.lock().await.click();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(shared.lock().await.is_dirty());

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        {
            let s = shared.lock().await;
            assert!(!s.is_dirty());
            assert!(saved_progress(&s).unwrap().contains("\"clicks\":1"));
        }

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_respects_settings_flag() {
        let settings = Settings {
            auto_save_enabled: false,
            ..Settings::default()
        };
        let shared = session_with(ProgressState::default(), Some(settings)).into_shared();
        let (stop, rx) = watch::channel(false);
        let handle = tokio::spawn(drive(shared.clone(), RuntimeConfig::default(), rx));

        shared.lock().await.click();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(shared.lock().await.is_dirty());

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(shared.lock().await.reconciler().load().currency, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_follows_settings_changed_mid_session() {
        let shared = session_with(ProgressState::default(), None).into_shared();
        let (stop, rx) = watch::channel(false);
        let handle = tokio::spawn(drive(shared.clone(), RuntimeConfig::default(), rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        {
            let mut s = shared.lock().await;
            s.update_settings(|st| st.auto_save_enabled = false).unwrap();
            s.click();
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(shared.lock().await.is_dirty());

        shared
            .lock()
            .await
            .update_settings(|st| st.auto_save_enabled = true)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2_100)).await;
        {
            let s = shared.lock().await;
            assert!(!s.is_dirty());
            assert_eq!(s.reconciler().load().currency, 1);
        }

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }
}
