//! ftw-server - ForTheWeebs ledger service
//!
//! Zero-config startup: the root folder, database, governance ledger and
//! admin secret are created on first run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use ftw_common::api::load_shared_secret;
use ftw_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV};
use ftw_common::db::init_database;
use ftw_common::ledger::GovernanceLedger;
use ftw_server::scheduler::spawn_drop_scheduler;
use ftw_server::services::{ContentClassifier, HttpClassifier, UnavailableClassifier};
use ftw_server::{build_router, AppState};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "ftw-server", version, about = "ForTheWeebs ledger service")]
struct Cli {
    /// Root folder holding ftw.db and the governance ledger
    #[arg(long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// Config file (defaults: ~/.config/ftw/config.toml, /etc/ftw/config.toml)
    #[arg(long, env = "FTW_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port (overrides config)
    #[arg(long, env = "FTW_PORT")]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(long, env = "FTW_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes up before the config so config problems are reported;
    // the configured level is applied once the config is known
    let (filter, filter_handle) = reload::Layer::new(level_filter(Level::INFO));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match TomlConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };
    match config.logging.level.parse::<Level>() {
        Ok(level) => filter_handle.modify(|filter| *filter = level_filter(level))?,
        Err(_) => warn!("Unknown logging level '{}', using info", config.logging.level),
    }

    // Build identification first, before any slow startup work
    info!(
        "Starting ftw-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(cli.root_folder)
        .with_toml(&config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;
    info!("Root folder: {}", initializer.root().display());

    let db_path = initializer.database_path();
    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database {}: {}", db_path.display(), e);
            return Err(e.into());
        }
    };

    let shared_secret = load_shared_secret(&pool).await?;
    if shared_secret == 0 {
        warn!("Admin authentication disabled (shared_secret = 0)");
    } else {
        info!("Loaded admin shared secret");
    }

    let ledger = GovernanceLedger::load(initializer.governance_ledger_path()).await?;
    match ledger.verify_integrity().tampered {
        None => info!(entries = ledger.len(), "Governance ledger verified"),
        Some(index) => error!(index, "Governance ledger failed verification"),
    }

    let classifier: Arc<dyn ContentClassifier> = match &config.classifier_url {
        Some(url) => {
            info!("Content classifier: {}", url);
            Arc::new(HttpClassifier::new(url.clone())?)
        }
        None => {
            warn!("No classifier_url configured; payments will route to crypto");
            Arc::new(UnavailableClassifier)
        }
    };

    let state = AppState::new(pool, ledger, classifier, shared_secret)
        .with_auth_window(config.auth_window_ms);

    if config.drop_scheduler_interval_secs > 0 {
        spawn_drop_scheduler(
            state.clone(),
            Duration::from_secs(config.drop_scheduler_interval_secs),
        );
    } else {
        info!("In-process drop scheduler disabled; use POST /api/run-drop-scheduler");
    }

    let app = build_router(state);

    let bind = cli.bind.unwrap_or(config.bind_address);
    let port = cli.port.unwrap_or(config.port);
    let listener = tokio::net::TcpListener::bind((bind.as_str(), port)).await?;
    info!("ftw-server listening on http://{}:{}", bind, port);
    info!("Health check: http://{}:{}/health", bind, port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// RUST_LOG directives with `level` as the default
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(level.into())
}
