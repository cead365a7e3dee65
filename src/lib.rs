//! Gateway presence keeper.
//!
//! Maintains many simultaneous persistent WebSocket connections to a
//! real-time push gateway, each authenticated as a distinct identity and
//! broadcasting a configured presence, kept alive indefinitely.
//!
//! # Architecture
//!
//! One spawned task per credential, no shared state between connections:
//!
//! - **Session state machine**: classifies inbound frames by opcode and
//!   drives the handshake (hello → identify → ready)
//! - **Heartbeat supervisor**: one heartbeat per server-dictated
//!   interval; a missed acknowledgment force-restarts the transport
//! - **Reconnect supervisor**: exponential backoff with jitter, forever
//! - **Connection pool**: staggered startup and fan-out shutdown
//!
//! # Quick Start
//!
//! ```no_run
//! use gateway_presence::{ConnectionPool, PresencePolicy, Result, config};
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let tokens = config::load_tokens("tokens.txt")?;
//!     let policy = PresencePolicy::load("config.json")?;
//!     let endpoint = Url::parse(gateway_presence::DEFAULT_GATEWAY_URL)
//!         .map_err(|e| gateway_presence::Error::config(e.to_string()))?;
//!
//!     let pool = ConnectionPool::start(tokens, &policy, endpoint).await;
//!     tokio::signal::ctrl_c().await?;
//!     pool.stop_all();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Credential list and presence policy loading |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`gateway`] | Connection core: session, heartbeat, backoff |
//! | [`pool`] | Connection pool and staggered startup |
//! | [`presence`] | Presence descriptors |
//! | [`protocol`] | Wire frames, opcodes, intents |
//! | [`token`] | Redacted credential handling |

// ============================================================================
// Modules
// ============================================================================

/// Credential list and presence policy loading.
pub mod config;

/// Error types and result aliases.
pub mod error;

/// Gateway connection core.
pub mod gateway;

/// Connection pool and startup orchestration.
pub mod pool;

/// Presence descriptors.
pub mod presence;

/// Gateway wire protocol.
pub mod protocol;

/// Authentication token handling.
pub mod token;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{PresencePolicy, load_tokens};

// Errors
pub use error::{Error, Result};

// Gateway core
pub use gateway::{
    Action, Beat, ConnectionConfig, ConnectionPhase, ConnectionStatus, DEFAULT_GATEWAY_URL,
    GatewayConnection, Heartbeat, Session, reconnect_delay,
};

// Pool
pub use pool::ConnectionPool;

// Presence
pub use presence::{Activity, ActivityKind, OnlineStatus, Presence};

// Protocol
pub use protocol::{InboundFrame, OpCode, OutboundFrame, intents};

// Token
pub use token::Token;
