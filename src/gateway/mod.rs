//! Gateway connection core.
//!
//! One [`GatewayConnection`] per credential: it owns a WebSocket
//! transport, interprets inbound frames through the [`Session`] state
//! machine, keeps the session alive with the [`Heartbeat`] supervisor,
//! and survives transport loss through the backoff reconnect loop.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────── task ──────────────────────────┐
//! │  connect ─→ drive ──────────────────────────┐            │
//! │     ↑         │ select: frames / heartbeat  │            │
//! │     │         │         identify / stop     │            │
//! │     └── backoff wait ←── transport closed ──┘            │
//! └──────────────────────────────────────────────────────────┘
//!            ↑ stop / status          GatewayConnection handle
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backoff` | Reconnect delay schedule with jitter |
//! | `connection` | Transport ownership and event loop |
//! | `heartbeat` | Heartbeat timer and ack tracking |
//! | `session` | Pure per-connection state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect backoff schedule.
pub mod backoff;

/// Gateway connection and event loop.
pub mod connection;

/// Heartbeat supervision.
pub mod heartbeat;

/// Per-connection session state machine.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::reconnect_delay;
pub use connection::{
    ConnectionConfig, ConnectionStatus, DEFAULT_GATEWAY_URL, GatewayConnection,
};
pub use heartbeat::{Beat, Heartbeat};
pub use session::{Action, ConnectionPhase, Session};
