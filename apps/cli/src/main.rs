#![deny(warnings)]

//! Headless clicker front end: a line-oriented shell over one game session.

use anyhow::{bail, Context, Result};
use chrono::Local;
use clicker_core::{validate_catalog, validate_progress, Category, Settings};
use clicker_runtime::{drive, GameSession, RuntimeConfig, SharedSession};
use persistence::{export_file_name, FileStore, Reconciler, Store};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Args {
    data_dir: PathBuf,
    config: Option<PathBuf>,
    version: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        data_dir: PathBuf::from("saves"),
        config: None,
        version: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--data-dir" => {
                if let Some(dir) = it.next() {
                    args.data_dir = PathBuf::from(dir);
                }
            }
            "--config" => args.config = it.next().map(PathBuf::from),
            "--version" | "-V" => args.version = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    args
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    let Some(path) = path else {
        return Ok(RuntimeConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: RuntimeConfig = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

/// Upper bound for `click <n>`, which runs under the session lock.
const MAX_CLICKS_PER_COMMAND: u32 = 1_000;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Click(u32),
    Buy(String),
    Shop(Option<Category>),
    Status { json: bool },
    Profile(Option<String>),
    Avatar(Option<String>),
    Settings,
    Set(String, String),
    Save,
    Reload,
    Export(Option<PathBuf>),
    Import(PathBuf),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        bail!("empty command");
    };
    let rest: Vec<&str> = words.collect();
    let cmd = match (head, rest.as_slice()) {
        ("click" | "c", []) => Command::Click(1),
        ("click" | "c", [n]) => {
            let n: u32 = n.parse().context("click count")?;
            if n > MAX_CLICKS_PER_COMMAND {
                bail!("at most {MAX_CLICKS_PER_COMMAND} clicks per command");
            }
            Command::Click(n)
        }
        ("buy" | "b", [id]) => Command::Buy(id.to_string()),
        ("shop", []) => Command::Shop(None),
        ("shop", [cat]) => match Category::parse(cat) {
            Some(c) => Command::Shop(Some(c)),
            None => bail!("unknown category {cat}"),
        },
        ("status" | "s", []) => Command::Status { json: false },
        ("status" | "s", ["json"]) => Command::Status { json: true },
        ("profile", []) => Command::Profile(None),
        ("profile", name) => Command::Profile(Some(name.join(" "))),
        ("avatar", ["reset"]) => Command::Avatar(None),
        ("avatar", [url]) => Command::Avatar(Some(url.to_string())),
        ("settings", []) => Command::Settings,
        ("set", [key, value]) => Command::Set(key.to_string(), value.to_string()),
        ("save", []) => Command::Save,
        ("reload", []) => Command::Reload,
        ("export", []) => Command::Export(None),
        ("export", [path]) => Command::Export(Some(PathBuf::from(path))),
        ("import", [path]) => Command::Import(PathBuf::from(path)),
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit" | "q", []) => Command::Quit,
        _ => bail!("unrecognized command: {line} (try `help`)"),
    };
    Ok(cmd)
}

fn parse_switch(value: &str) -> Result<bool> {
    match value {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => bail!("expected on/off, got {value}"),
    }
}

fn apply_setting(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key {
        "sound" => settings.sound_enabled = parse_switch(value)?,
        "volume" => settings.sound_volume = value.parse().context("volume")?,
        "animations" => settings.animations_enabled = parse_switch(value)?,
        "autosave" => settings.auto_save_enabled = parse_switch(value)?,
        "autosave-interval" => {
            settings.auto_save_interval_secs = value.parse().context("autosave interval")?
        }
        "click-numbers" => settings.show_click_numbers = parse_switch(value)?,
        "dark" => settings.dark_mode = parse_switch(value)?,
        "reduced-motion" => settings.reduced_motion = parse_switch(value)?,
        "reset" if value == "all" => *settings = Settings::default(),
        _ => bail!("unknown setting {key}"),
    }
    Ok(())
}

const HELP: &str = "\
commands:
  click [n]            click n times (default 1)
  buy <item>           purchase one unit of an item
  shop [category]      list items (basic, advanced, premium)
  status [json]        balance, rate, level and quick upgrades
  profile [name]       show or rename the profile
  avatar <url|reset>   set or clear the avatar url
  settings             show settings
  set <key> <value>    sound, volume, animations, autosave, autosave-interval,
                       click-numbers, dark, reduced-motion, reset all
  save | reload        write progress now / re-read saved records
  export [path]        write a save bundle
  import <path>        restore a save bundle
  quit";

/// Check the catalog and loaded progress before play starts.
fn validate_session<S: Store>(s: &GameSession<S>) -> Result<()> {
    validate_catalog(s.catalog()).context("invalid catalog")?;
    validate_progress(s.progress()).context("invalid saved progress")?;
    Ok(())
}

/// Run one command; returns false when the shell should exit.
///
/// File I/O happens outside the session lock so the driver keeps ticking.
async fn run_command(session: &SharedSession<FileStore>, cmd: Command) -> Result<bool> {
    match cmd {
        Command::Quit => return Ok(false),
        Command::Export(path) => {
            let path =
                path.unwrap_or_else(|| PathBuf::from(export_file_name(Local::now().date_naive())));
            let blob = session.lock().await.export()?;
            tokio::fs::write(&path, blob)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("exported to {}", path.display());
        }
        Command::Import(path) => {
            let blob = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let mut s = session.lock().await;
            s.import(&blob)?;
            println!("imported | balance {}", s.progress().currency);
        }
        cmd => apply_command(&mut *session.lock().await, cmd)?,
    }
    Ok(true)
}

/// Commands that only touch session state.
fn apply_command<S: Store>(s: &mut GameSession<S>, cmd: Command) -> Result<()> {
    match cmd {
        Command::Click(n) => {
            let gained: u64 = (0..n).map(|_| s.click()).sum();
            println!("+{gained} | balance {}", s.progress().currency);
        }
        Command::Buy(id) => {
            let r = s.purchase(&id)?;
            println!(
                "bought {} for {} (owned {}) | balance {}",
                r.id, r.price, r.owned, r.currency
            );
        }
        Command::Shop(filter) => {
            for l in s.shop_view(filter) {
                let cap = l.max_owned.map_or("-".to_string(), |m| m.to_string());
                let mark = if l.max_reached {
                    "MAX"
                } else if l.affordable {
                    "buy"
                } else {
                    ""
                };
                println!(
                    "{:<16} {:<9} {:<14} price {:>10} owned {:>3}/{:<3} {}",
                    l.id,
                    l.category.as_str(),
                    l.effect,
                    l.price,
                    l.owned,
                    cap,
                    mark
                );
            }
        }
        Command::Status { json } => {
            let view = s.game_view();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                let p = &view.progress;
                println!(
                    "balance {} | lifetime {} | {}/s | x{} per click | level {} ({}%) | prestige {} | ascension {}",
                    p.currency,
                    p.lifetime_currency,
                    p.passive_rate,
                    view.click_value,
                    view.level,
                    view.level_progress_percent,
                    p.prestige_tier,
                    p.ascension_tier
                );
                for l in &view.quick_upgrades {
                    println!("  {:<16} {:>10} {}", l.id, l.price, l.effect);
                }
            }
        }
        Command::Profile(name) => {
            if let Some(name) = name {
                s.update_profile(|p| p.rename(&name))?;
            }
            let p = s.profile();
            let avatar = if p.avatar_url.is_empty() {
                "-"
            } else {
                p.avatar_url.as_str()
            };
            println!(
                "{} | joined {} | avatar {}",
                p.username,
                p.join_date.format("%Y-%m-%d"),
                avatar
            );
        }
        Command::Avatar(url) => {
            s.update_profile(|p| match &url {
                Some(url) => p.set_avatar(url),
                None => p.reset_avatar(),
            })?;
            println!("avatar updated");
        }
        Command::Settings => println!("{}", serde_json::to_string_pretty(s.settings())?),
        Command::Set(key, value) => {
            let mut next = s.settings().clone();
            apply_setting(&mut next, &key, &value)?;
            s.update_settings(|st| *st = next)?;
            println!("{}", serde_json::to_string_pretty(s.settings())?);
        }
        Command::Save => {
            s.save()?;
            println!("saved");
        }
        Command::Reload => {
            s.reload();
            println!("reloaded | balance {}", s.progress().currency);
        }
        Command::Help => println!("{HELP}"),
        // Handled by run_command.
        Command::Export(_) | Command::Import(_) | Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    if args.version {
        println!("clicker {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_SHA"));
        return Ok(());
    }
    let config = load_config(args.config.as_deref())?;
    info!(data_dir = %args.data_dir.display(), ?config, "starting CLI");

    let store = FileStore::open(&args.data_dir)
        .with_context(|| format!("opening save directory {}", args.data_dir.display()))?;
    let session = GameSession::open(Reconciler::new(store, Local::now().date_naive()));
    validate_session(&session)?;
    let session = session.into_shared();

    let (stop, stopped) = watch::channel(false);
    let driver = tokio::spawn(drive(session.clone(), config, stopped));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let keep_going = match parse_command(&line) {
            Ok(cmd) => run_command(&session, cmd).await.unwrap_or_else(|e| {
                println!("error: {e:#}");
                true
            }),
            Err(e) => {
                println!("error: {e:#}");
                true
            }
        };
        if !keep_going {
            break;
        }
    }

    let _ = stop.send(true);
    driver.await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::MemoryStore;

    #[test]
    fn parses_game_commands() {
        assert_eq!(parse_command("click").unwrap(), Command::Click(1));
        assert_eq!(parse_command("c 25").unwrap(), Command::Click(25));
        assert_eq!(
            parse_command("buy auto-clicker").unwrap(),
            Command::Buy("auto-clicker".into())
        );
        assert_eq!(
            parse_command("shop Premium").unwrap(),
            Command::Shop(Some(Category::Premium))
        );
        assert_eq!(
            parse_command("profile Ada Lovelace").unwrap(),
            Command::Profile(Some("Ada Lovelace".into()))
        );
        assert_eq!(parse_command("status json").unwrap(), Command::Status { json: true });
        assert_eq!(parse_command("quit").unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("click many").is_err());
        assert_eq!(parse_command("click 1000").unwrap(), Command::Click(1_000));
        assert!(parse_command("click 1001").is_err());
        assert!(parse_command("shop legendary").is_err());
        assert!(parse_command("buy").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn settings_keys_map_to_fields() {
        let mut s = Settings::default();
        apply_setting(&mut s, "volume", "80").unwrap();
        apply_setting(&mut s, "dark", "off").unwrap();
        apply_setting(&mut s, "autosave-interval", "60").unwrap();
        assert_eq!(s.sound_volume, 80);
        assert!(!s.dark_mode);
        assert_eq!(s.auto_save_interval_secs, 60);
        assert!(apply_setting(&mut s, "volume", "loud").is_err());
        assert!(apply_setting(&mut s, "colour", "red").is_err());
        apply_setting(&mut s, "reset", "all").unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn yaml_config_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clicker.yaml");
        std::fs::write(&path, "autosave_interval_ms: 5000\nautosave_enabled: false\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.accrual_interval_ms, 1_000);
        assert_eq!(cfg.autosave_interval_ms, 5_000);
        assert!(!cfg.autosave_enabled);
        assert_eq!(load_config(None).unwrap(), RuntimeConfig::default());
    }

    fn memory_session() -> GameSession<MemoryStore> {
        let today = chrono::NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        GameSession::open(Reconciler::new(MemoryStore::new(), today))
    }

    #[test]
    fn fresh_session_passes_startup_checks() {
        let mut s = memory_session();
        validate_session(&s).unwrap();
        apply_command(&mut s, Command::Click(3)).unwrap();
        assert_eq!(s.progress().currency, 3);
        validate_session(&s).unwrap();
    }

    #[tokio::test]
    async fn export_and_import_release_the_session_between_steps() {
        let dir = tempfile::tempdir().unwrap();
        let today = chrono::NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let store = FileStore::open(dir.path().join("saves")).unwrap();
        let session = GameSession::open(Reconciler::new(store, today)).into_shared();
        let bundle = dir.path().join("bundle.json");

        run_command(&session, Command::Click(4)).await.unwrap();
        run_command(&session, Command::Export(Some(bundle.clone())))
            .await
            .unwrap();
        assert!(session.try_lock().is_ok());

        run_command(&session, Command::Click(2)).await.unwrap();
        run_command(&session, Command::Import(bundle)).await.unwrap();
        assert!(session.try_lock().is_ok());
        assert_eq!(session.lock().await.progress().currency, 4);
        assert!(!run_command(&session, Command::Quit).await.unwrap());
    }
}
