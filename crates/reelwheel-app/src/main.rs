// Reel Wheel entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open database, build the title resolver
// 4. Build the spin engine and list managers
// 5. Create channels and queue the default owner, if configured
// 6. Spawn the app orchestrator
// 7. Run the TUI on the main task until quit

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use reelwheel_app::app::{self, AppState, UiUpdate};
use reelwheel_app::command::UserCommand;
use reelwheel_app::tui;
use reelwheel_core::config;
use reelwheel_core::db::SqliteStore;
use reelwheel_core::{ListKind, ListManager, SpinEngine};
use reelwheel_tmdb::TmdbResolver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Reel Wheel starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: wheel holds {} titles, spins last {} ms",
        config.wheel.max_items, config.spin.duration_ms
    );

    // 3. Open database and resolver
    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let store = Arc::new(SqliteStore::open(&config.db_path).context("failed to open database")?);
    info!("Database opened at {}", config.db_path);

    let resolver = Arc::new(TmdbResolver::from_config(&config));

    // 4. Engine and list managers
    let engine = SpinEngine::new(config.spin.settings());
    let wheel = ListManager::with_capacity(
        ListKind::Wheel,
        Some(config.wheel.max_items),
        store.clone(),
        resolver.clone(),
    );
    let consumed = ListManager::new(ListKind::Consumed, store, resolver.clone());

    // 5. Channels
    let (winner_tx, winner_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::channel::<UserCommand>(64);
    let (ui_tx, ui_rx) = mpsc::channel::<UiUpdate>(256);

    if resolver.is_enabled() {
        info!("TMDB lookups enabled");
    } else {
        info!("TMDB lookups disabled (no API key)");
        let _ = ui_tx
            .send(UiUpdate::Info(
                "No TMDB API key configured; add one to config/credentials.toml to add movies."
                    .into(),
            ))
            .await;
    }

    match config.default_owner.clone() {
        Some(owner) => {
            info!(owner = %owner, "loading default owner");
            cmd_tx
                .send(UserCommand::Owner(owner.as_str().to_string()))
                .await
                .context("failed to queue default owner")?;
        }
        None => {
            let _ = ui_tx
                .send(UiUpdate::Info(
                    "Type `owner <name>` to load your lists, or `help`.".into(),
                ))
                .await;
        }
    }

    let state = AppState::new(engine, wheel, consumed, winner_tx);

    // 6. App orchestrator
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, winner_rx, ui_tx, state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 7. TUI on the main task
    let tui_result = tui::run(ui_rx, cmd_tx).await;
    if let Err(e) = &tui_result {
        error!("TUI error: {:#}", e);
    }

    // The TUI dropped its command sender; give the app time to flush.
    if tokio::time::timeout(Duration::from_secs(5), app_handle)
        .await
        .is_err()
    {
        warn!("App loop did not finish within 5s of quitting");
    }

    info!("Reel Wheel shut down cleanly");
    tui_result
}

/// Initialize tracing to log to a file so the terminal stays readable.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("reelwheel.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reelwheel=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
