//! ANGLER: concurrent multi-account Fishing Frenzy session runner
//!
//! Entry point. Loads configuration, initialises structured logging,
//! loads tokens and proxies, and runs rounds until Ctrl+C.

use anyhow::Result;
use tracing::{error, info, warn};

use angler::config;
use angler::proxy;
use angler::engine::{FrenzyWorker, LaunchDelay, Orchestrator};
use angler::storage;
use angler::types::{Account, FrenzyError};

const BANNER: &str = r#"
    _    _   _  ____ _     _____ ____
   / \  | \ | |/ ___| |   | ____|  _ \
  / _ \ |  \| | |  _| |   |  _| | |_) |
 / ___ \| |\  | |_| | |___| |___|  _ <
/_/   \_\_| \_|\____|_____|_____|_| \_\

  Fishing Frenzy multi-account session runner
  v0.1.0
"#;

/// Configuration file, overridable through `ANGLER_CONFIG`.
const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("ANGLER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %config_path,
        intensity = %cfg.agent.intensity,
        energy_cost = cfg.agent.intensity.energy_cost(),
        "ANGLER starting up"
    );

    // -- Credentials & proxies -------------------------------------------

    let tokens = storage::load_lines(&cfg.agent.tokens_file)?;
    if tokens.is_empty() {
        error!(path = %cfg.agent.tokens_file, "No tokens found, nothing to run");
        return Err(FrenzyError::Config(format!("no tokens in {}", cfg.agent.tokens_file)).into());
    }

    let (proxies, rejected) = proxy::partition_supported(storage::load_lines(&cfg.agent.proxies_file)?);
    for entry in &rejected {
        // Scheme only; entries may carry credentials.
        let scheme = entry.split("://").next().unwrap_or_default();
        warn!(scheme, "Skipping proxy with unsupported scheme, only http:// is tunnelled");
    }
    if proxies.is_empty() {
        warn!(path = %cfg.agent.proxies_file, "No proxies found, running without proxy");
    }

    let accounts: Vec<Account> = tokens.into_iter().map(Account::new).collect();
    info!(accounts = accounts.len(), proxies = proxies.len(), "Accounts loaded");

    // -- Main loop -------------------------------------------------------

    let launch_delay = LaunchDelay::from_config(cfg.agent.launch_delay());
    let mut orchestrator = Orchestrator::new(FrenzyWorker::new(&cfg), accounts, proxies)
        .with_launch_delay(launch_delay)
        .with_run_log(&cfg.agent.run_log_file);

    info!(launch_delay = ?launch_delay, "Entering main loop. Press Ctrl+C to stop.");

    tokio::select! {
        _ = orchestrator.run_forever() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    info!(
        rounds = orchestrator.rounds_completed(),
        "ANGLER shut down cleanly."
    );
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("angler=info"));

    let json_logging = std::env::var("ANGLER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
