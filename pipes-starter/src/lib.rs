// Pipes SDK Starter
// Main library entry point

pub mod api;
pub mod builder;
pub mod catalog;
pub mod client;
pub mod database;
pub mod models;
pub mod security;
pub mod settings;
pub mod templates;
pub mod tui;
pub mod utils;
pub mod wizard;

use anyhow::Context;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use catalog::Catalog;
use client::exchange::{ConfigExchange, ExchangeError, HttpConfigExchange, LocalConfigExchange};
use client::metadata::{DisabledMetadataLookup, HttpMetadataLookup, MetadataLookup};
use database::postgres::PostgresConfigStore;
use database::store::MemoryConfigStore;
use settings::Settings;
use wizard::Wizard;

/// Initialize logging system with dual format (JSON + human-readable)
fn init_logging(
    with_console: bool,
    log_dir_override: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let log_dir = utils::path_resolver::resolve_log_folder(log_dir_override)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");

    // JSON log file for structured parsing
    let json_log_file = log_dir.join(format!("pipes-starter-{}.log", timestamp));

    // Human-readable log file (.txt)
    let txt_log_file = log_dir.join(format!("pipes-starter-{}.txt", timestamp));

    // The console sink is off for the TUI so log lines don't land on top of the frame.
    let mut dispatch = fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .level_for("sqlx", log::LevelFilter::Warn)
        .level_for("hyper", log::LevelFilter::Info)
        .level_for("reqwest", log::LevelFilter::Info);

    if with_console {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .level(log::LevelFilter::Info)
                .chain(std::io::stderr()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                        None,
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    log::info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(log_dir)
}

/// `--settings=<path>` when given (must exist), else the per-user default location if present.
fn load_settings(settings_path: Option<&Path>) -> Result<Settings, settings::SettingsError> {
    let fallback = utils::path_resolver::default_settings_path();
    Settings::load(settings_path, fallback.as_deref())
}

/// Pick the config exchange: remote service, then Postgres, then a process-local store.
pub async fn build_exchange(settings: &Settings) -> anyhow::Result<Arc<dyn ConfigExchange>> {
    if let Some(url) = settings.config_service_url()? {
        info!(
            "[PHASE: initialization] [STEP: exchange] Using config service at {}",
            url
        );
        let exchange = HttpConfigExchange::new(url, settings.request_timeout())?;
        return Ok(Arc::new(exchange));
    }

    if let Some(database_url) = settings.database_url.as_deref() {
        info!(
            "[PHASE: initialization] [STEP: exchange] Using Postgres config store at {}",
            utils::logging::mask_database_url(database_url)
        );
        let store = PostgresConfigStore::connect(database_url, settings.request_timeout())
            .await
            .context("Config store unavailable")?;
        return Ok(Arc::new(LocalConfigExchange::new(Arc::new(store))));
    }

    warn!(
        "[PHASE: initialization] [STEP: exchange] No config service or database configured; config ids are only valid while this process runs"
    );
    Ok(Arc::new(LocalConfigExchange::new(Arc::new(
        MemoryConfigStore::new(),
    ))))
}

pub fn build_metadata_lookup(settings: &Settings) -> anyhow::Result<Arc<dyn MetadataLookup>> {
    match settings.metadata_service_url()? {
        Some(url) => {
            info!(
                "[PHASE: initialization] [STEP: metadata] Using contract metadata service at {}",
                url
            );
            Ok(Arc::new(HttpMetadataLookup::new(
                url,
                settings.request_timeout(),
            )?))
        }
        None => {
            info!(
                "[PHASE: initialization] [STEP: metadata] No metadata service configured; custom contracts lookup disabled"
            );
            Ok(Arc::new(DisabledMetadataLookup))
        }
    }
}

fn load_settings_or_exit(settings_path: Option<&Path>) -> Settings {
    match load_settings(settings_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("pipes-starter: {}", e);
            std::process::exit(2);
        }
    }
}

fn start_tui(settings: &Settings) -> anyhow::Result<()> {
    let catalog = Catalog::load(settings.catalog_path.as_deref())?;

    // Multi-threaded so worker threads can drive futures through the handle.
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let exchange = runtime.block_on(build_exchange(settings))?;
    let metadata = build_metadata_lookup(settings)?;

    let (tx, rx) = mpsc::channel();
    let workers = tui::Workers {
        runtime: runtime.handle().clone(),
        exchange,
        metadata,
        tx,
    };

    tui::run(Wizard::new(settings.cli_package.clone()), catalog, workers, rx)
}

pub fn run_tui(settings_path: Option<PathBuf>) {
    let settings = load_settings_or_exit(settings_path.as_deref());

    // Initialize logging (no stdout to avoid corrupting the TUI)
    if let Err(e) = init_logging(false, settings.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] Pipes starter TUI starting at {}",
        chrono::Utc::now()
    );
    settings.log_summary();

    if let Err(e) = start_tui(&settings) {
        error!("[PHASE: tui] [STEP: fatal] TUI wizard failed: {:#}", e);
        eprintln!("pipes-starter: {:#}", e);
        std::process::exit(1);
    }
}

pub fn run_tui_smoke(target: Option<String>, settings_path: Option<PathBuf>) {
    let settings = match load_settings(settings_path.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Ignoring settings for smoke run: {}", e);
            Settings::default()
        }
    };

    // Initialize logging (no stdout to avoid corrupting the terminal)
    if let Err(e) = init_logging(false, settings.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] Headless TUI smoke starting at {}",
        chrono::Utc::now()
    );

    let target = target.as_deref().unwrap_or("project");
    let result = Catalog::load(settings.catalog_path.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|catalog| tui::smoke(catalog, &settings.cli_package, target));

    match result {
        Ok(()) => {
            info!(
                "[PHASE: tui] [STEP: smoke] TUI smoke rendered target={}",
                target
            );
            println!("TUI smoke OK ({})", target);
        }
        Err(e) => {
            error!("[PHASE: tui] [STEP: smoke] TUI smoke failed: {:#}", e);
            eprintln!("TUI smoke failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Print a stored config to stdout. Returns the process exit code.
///
/// 0 found, 1 exchange failure, 2 invalid id or settings, 3 not found. With `verbose`, log lines
/// also go to stderr; stdout only ever carries the config JSON.
pub fn run_print_config(config_id: &str, settings_path: Option<PathBuf>, verbose: bool) -> i32 {
    let settings = match load_settings(settings_path.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("pipes-starter: {}", e);
            return 2;
        }
    };

    if let Err(e) = init_logging(verbose, settings.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    settings.log_summary();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return 1;
        }
    };

    let outcome = runtime.block_on(async {
        let exchange = build_exchange(&settings).await?;
        info!(
            "[PHASE: print_config] [STEP: load] Loading config id={} via {}",
            config_id,
            exchange.describe()
        );
        Ok::<_, anyhow::Error>(exchange.load(config_id).await)
    });

    print_config_outcome(config_id, outcome)
}

fn print_config_outcome(
    config_id: &str,
    outcome: anyhow::Result<Result<String, ExchangeError>>,
) -> i32 {
    match outcome {
        Ok(Ok(json_config)) => {
            println!("{}", json_config);
            0
        }
        Ok(Err(ExchangeError::InvalidId)) => {
            eprintln!("Invalid config id: '{}'", config_id);
            2
        }
        Ok(Err(ExchangeError::NotFound)) => {
            eprintln!("Config not found: {}", config_id);
            3
        }
        Ok(Err(e)) => {
            error!("[PHASE: print_config] [STEP: load] Load failed: {}", e);
            eprintln!("Failed to load config: {}", e);
            1
        }
        Err(e) => {
            error!("[PHASE: print_config] [STEP: exchange] {:#}", e);
            eprintln!("pipes-starter: {:#}", e);
            1
        }
    }
}
