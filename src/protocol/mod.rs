//! Gateway wire protocol.
//!
//! This module defines the frame format spoken over the WebSocket
//! transport, plus the opcode and intent constant tables.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`InboundFrame`] | Server → Client | Dispatches and protocol control |
//! | [`OutboundFrame`] | Client → Server | Heartbeat and identify |
//!
//! Every frame is a JSON text message. Inbound frames carry
//! `{op, d, s, t}`; outbound frames use only `{op, d}`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Inbound/outbound frame types and payload builders |
//! | `opcode` | Opcode enum and intent bitmask constants |

// ============================================================================
// Submodules
// ============================================================================

/// Frame types and payload builders.
pub mod frame;

/// Opcode and intent constants.
pub mod opcode;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{InboundFrame, OutboundFrame};
pub use opcode::{OpCode, intents};
