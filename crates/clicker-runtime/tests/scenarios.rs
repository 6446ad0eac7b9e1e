use chrono::NaiveDate;
use clicker_core::{ProgressState, Settings};
use clicker_econ::PurchaseError;
use clicker_runtime::{GameSession, SessionError};
use persistence::{FileStore, Reconciler, RecordKey, Store};
use rust_decimal::Decimal;
use std::path::Path;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
}

fn reconciler(dir: &Path) -> Reconciler<FileStore> {
    Reconciler::new(FileStore::open(dir).unwrap(), today())
}

fn open(dir: &Path) -> GameSession<FileStore> {
    GameSession::open(reconciler(dir))
}

fn seed(dir: &Path, currency: u64) {
    let state = ProgressState {
        currency,
        lifetime_currency: currency,
        ..ProgressState::default()
    };
    reconciler(dir).save(&state).unwrap();
}

#[test]
fn five_clicks_then_unaffordable_auto_clicker() {
    let dir = tempfile::tempdir().unwrap();
    let mut game = open(dir.path());
    assert_eq!(game.progress(), &ProgressState::default());

    for _ in 0..5 {
        game.click();
    }
    assert_eq!(game.progress().currency, 5);
    assert_eq!(game.progress().lifetime_currency, 5);

    let err = game.purchase("auto-clicker").unwrap_err();
    assert!(matches!(
        err,
        SessionError::Purchase(PurchaseError::InsufficientFunds { price: 50, available: 5 })
    ));
    assert_eq!(game.progress().currency, 5);
    assert_eq!(game.catalog().get("auto-clicker").unwrap().owned_count, 0);
}

#[test]
fn combo_master_purchase_then_one_tick() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), 1_000);
    let mut game = open(dir.path());

    let receipt = game.purchase("combo-master").unwrap();
    assert_eq!(receipt.price, 1_000);
    assert_eq!(game.progress().currency, 0);
    assert_eq!(game.progress().passive_rate, 5);
    assert_eq!(game.catalog().get("combo-master").unwrap().owned_count, 1);

    game.tick(1);
    assert_eq!(game.progress().currency, 5);
    assert_eq!(game.progress().lifetime_currency, 1_005);
}

#[test]
fn prices_climb_with_ownership() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), 1_000);
    let mut game = open(dir.path());

    let prices: Vec<u64> = (0..3)
        .map(|_| game.purchase("auto-clicker").unwrap().price)
        .collect();
    assert_eq!(prices, vec![50, 75, 113]);
    assert_eq!(game.progress().currency, 1_000 - 238);
    assert_eq!(game.progress().passive_rate, 3);
}

#[test]
fn capped_item_rejects_regardless_of_funds() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), 1_000_000);
    let mut game = open(dir.path());

    game.purchase("golden-clicker").unwrap();
    let before = game.progress().clone();
    let err = game.purchase("golden-clicker").unwrap_err();
    assert!(matches!(
        err,
        SessionError::Purchase(PurchaseError::OwnershipCapReached { max_owned: 1, .. })
    ));
    assert_eq!(game.progress(), &before);
}

#[test]
fn multiplier_purchase_scales_clicks() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), 200);
    let mut game = open(dir.path());

    game.purchase("power-boost").unwrap();
    assert_eq!(game.progress().multiplier, Decimal::from(2));
    assert_eq!(game.click(), 2);
}

#[test]
fn purchase_in_one_view_is_seen_by_another_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path(), 300);
    let mut shop = open(dir.path());
    let mut game = open(dir.path());

    shop.purchase("auto-clicker").unwrap();
    assert_eq!(game.progress().currency, 300);

    game.reload();
    assert_eq!(game.progress().currency, 250);
    assert_eq!(game.progress().passive_rate, 1);
    assert_eq!(game.catalog().get("auto-clicker").unwrap().owned_count, 1);
    assert_eq!(game.shop_view(None), shop.shop_view(None));
}

#[test]
fn progress_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut game = open(dir.path());
        game.click();
        game.click();
        game.save().unwrap();
    }
    let game = open(dir.path());
    assert_eq!(game.progress().currency, 2);
}

#[test]
fn corrupt_progress_file_starts_a_fresh_game() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("progress.json"), "{\"clicks\": [oops").unwrap();
    let game = open(dir.path());
    assert_eq!(game.progress(), &ProgressState::default());
}

#[test]
fn export_moves_a_save_between_directories() {
    let from = tempfile::tempdir().unwrap();
    let to = tempfile::tempdir().unwrap();
    seed(from.path(), 1_000);

    let mut source = open(from.path());
    source.purchase("combo-master").unwrap();
    source
        .update_settings(|s| *s = Settings { dark_mode: false, ..Settings::default() })
        .unwrap();
    let blob = source.export().unwrap();

    let mut target = open(to.path());
    target.import(&blob).unwrap();
    assert_eq!(target.progress(), source.progress());
    assert_eq!(target.catalog(), source.catalog());
    assert!(!target.settings().dark_mode);

    let store = FileStore::open(to.path()).unwrap();
    for key in RecordKey::ALL {
        assert_eq!(
            store.read(key).unwrap(),
            source.reconciler().store().read(key).unwrap(),
            "{key}"
        );
    }
}
