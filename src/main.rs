//! Binary entry point.
//!
//! Usage: `gateway-presence [tokens-file] [policy-file]`
//!
//! Defaults to `tokens.txt` and `config.json` in the working directory.
//! Runs until interrupted; Ctrl-C stops every connection and exits 0.
//! Startup configuration errors are reported and exit non-zero.

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

use gateway_presence::{ConnectionPool, Error, PresencePolicy, Result, config};

// ============================================================================
// Constants
// ============================================================================

/// Default credential list path.
const DEFAULT_TOKENS_PATH: &str = "tokens.txt";

/// Default presence policy path.
const DEFAULT_POLICY_PATH: &str = "config.json";

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration, starts the pool, and waits for shutdown.
async fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let tokens_path = args.next().unwrap_or_else(|| DEFAULT_TOKENS_PATH.into());
    let policy_path = args.next().unwrap_or_else(|| DEFAULT_POLICY_PATH.into());

    let tokens = config::load_tokens(&tokens_path)?;
    let policy = PresencePolicy::load(&policy_path)?;
    let endpoint = Url::parse(gateway_presence::DEFAULT_GATEWAY_URL)
        .map_err(|e| Error::config(format!("invalid gateway url: {e}")))?;

    info!(accounts = tokens.len(), "starting presence keeper");

    let pool = ConnectionPool::start(tokens, &policy, endpoint).await;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    pool.stop_all();

    Ok(())
}
