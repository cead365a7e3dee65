//! Per-connection session state machine.
//!
//! [`Session`] is the transport-free core of a gateway connection: it
//! classifies inbound frames by opcode and answers with the side effects
//! the owning event loop must perform, expressed as [`Action`] values.
//! Keeping the machine free of sockets and timers makes every transition
//! directly testable.
//!
//! # Lifecycle
//!
//! ```text
//! Opening → AwaitingHello → Identifying → Authenticated
//!     ↑                                        │
//!     └── Reconnecting ← Closed ←──────────────┘   (cycles forever)
//!
//! Terminated — only via explicit external stop
//! ```
//!
//! `session_id` and `sequence` deliberately survive a transport close: no
//! resume is ever attempted with them, and the heartbeat payload re-sends
//! the last-known sequence. `session_id` is cleared at the moment a fresh
//! identify goes out (full re-handshake).

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::protocol::{InboundFrame, OpCode};

// ============================================================================
// Constants
// ============================================================================

/// Lower bound of the randomized re-identify delay after a non-resumable
/// INVALID_SESSION.
const REIDENTIFY_DELAY_MIN_MS: u64 = 2_000;

/// Upper bound (exclusive) of the randomized re-identify delay.
const REIDENTIFY_DELAY_MAX_MS: u64 = 5_000;

// ============================================================================
// ConnectionPhase
// ============================================================================

/// Lifecycle phase of one gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Transport handshake in progress.
    Opening,
    /// Transport open, waiting for the server hello.
    AwaitingHello,
    /// Identify sent (or scheduled), waiting for READY.
    Identifying,
    /// Session established.
    Authenticated,
    /// Transport closed, not yet scheduled for reconnect.
    Closed,
    /// Waiting out the reconnect backoff.
    Reconnecting,
    /// Explicitly stopped; no further reconnection.
    Terminated,
}

// ============================================================================
// Action
// ============================================================================

/// A side effect the event loop must perform after handling a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start (or restart) the heartbeat supervisor at the given interval.
    StartHeartbeat(Duration),
    /// Arm the identify timer to fire after the given delay.
    ScheduleIdentify(Duration),
    /// Send a heartbeat frame carrying the last known sequence.
    SendHeartbeat,
    /// Mark the last heartbeat as acknowledged.
    AckHeartbeat,
    /// Force-close the transport, routing into the reconnect path.
    CloseTransport,
}

// ============================================================================
// Session
// ============================================================================

/// Mutable session state owned by exactly one gateway connection.
#[derive(Debug)]
pub struct Session {
    /// Last-seen non-null dispatch sequence number.
    sequence: Option<u64>,
    /// Session id from the last successful READY.
    session_id: Option<String>,
    /// Display name from the last successful READY.
    username: Option<String>,
    /// Reconnect attempt counter; reset only on READY.
    reconnect_attempts: u32,
    /// Current lifecycle phase.
    phase: ConnectionPhase,
    /// Startup delay before the first identify of each transport.
    identify_delay: Duration,
}

impl Session {
    /// Creates a fresh session with the given identify stagger delay.
    #[must_use]
    pub fn new(identify_delay: Duration) -> Self {
        Self {
            sequence: None,
            session_id: None,
            username: None,
            reconnect_attempts: 0,
            phase: ConnectionPhase::Opening,
            identify_delay,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current lifecycle phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Last-seen sequence number.
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// Session id from the last READY, if any.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Display name from the last READY, if any.
    #[inline]
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Reconnect attempts since the last READY.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    // ========================================================================
    // Frame Handling
    // ========================================================================

    /// Handles one inbound frame, returning the side effects to perform.
    ///
    /// Any frame carrying a non-null sequence number updates the stored
    /// sequence unconditionally, regardless of opcode.
    pub fn handle_frame(&mut self, frame: &InboundFrame) -> Vec<Action> {
        if let Some(seq) = frame.s {
            self.sequence = Some(seq);
        }

        match frame.opcode() {
            Some(OpCode::Hello) => self.on_hello(frame),
            Some(OpCode::Dispatch) => self.on_dispatch(frame),
            Some(OpCode::HeartbeatAck) => vec![Action::AckHeartbeat],
            Some(OpCode::Heartbeat) => {
                // Server-requested heartbeat: answer immediately.
                trace!("server requested heartbeat");
                vec![Action::SendHeartbeat]
            }
            Some(OpCode::Reconnect) => {
                // The protocol requires dropping the transport here; the
                // reconnect supervisor brings up a fresh one.
                info!("server requested reconnect");
                vec![Action::CloseTransport]
            }
            Some(OpCode::InvalidSession) => {
                warn!("op-level invalid session");
                Vec::new()
            }
            Some(other) => {
                trace!(opcode = ?other, "ignoring frame");
                Vec::new()
            }
            None => {
                trace!(op = frame.op, "unknown opcode");
                Vec::new()
            }
        }
    }

    /// Handles the server hello.
    fn on_hello(&mut self, frame: &InboundFrame) -> Vec<Action> {
        let mut actions = Vec::with_capacity(2);

        match frame.heartbeat_interval() {
            Some(ms) => {
                debug!(heartbeat_interval_ms = ms, "hello received");
                actions.push(Action::StartHeartbeat(Duration::from_millis(ms)));
            }
            None => warn!("hello frame without heartbeat_interval"),
        }

        actions.push(Action::ScheduleIdentify(self.identify_delay));
        actions
    }

    /// Handles a dispatch frame by event type.
    fn on_dispatch(&mut self, frame: &InboundFrame) -> Vec<Action> {
        match frame.event_type() {
            Some("READY") => {
                self.session_id = frame.session_id().map(str::to_owned);
                if let Some(name) = frame.username() {
                    self.username = Some(name.to_owned());
                }
                self.reconnect_attempts = 0;
                self.phase = ConnectionPhase::Authenticated;
                info!(
                    session_id = self.session_id.as_deref().unwrap_or("-"),
                    username = self.username.as_deref().unwrap_or("-"),
                    "authenticated"
                );
                Vec::new()
            }
            Some("INVALID_SESSION") => {
                warn!(resumable = frame.is_resumable(), "invalid session");
                if frame.is_resumable() {
                    // Resume is not implemented; drop the transport and
                    // take the fresh-handshake path instead.
                    vec![Action::CloseTransport]
                } else {
                    let delay_ms = rand::thread_rng()
                        .gen_range(REIDENTIFY_DELAY_MIN_MS..REIDENTIFY_DELAY_MAX_MS);
                    vec![Action::ScheduleIdentify(Duration::from_millis(delay_ms))]
                }
            }
            _ => Vec::new(),
        }
    }

    // ========================================================================
    // Lifecycle Transitions
    // ========================================================================

    /// Notes that the transport handshake completed.
    pub fn on_transport_opened(&mut self) {
        self.phase = ConnectionPhase::AwaitingHello;
    }

    /// Notes that the identify timer fired; a fresh handshake starts now.
    ///
    /// Clears the stored session id: a new session is about to be
    /// established from scratch.
    pub fn on_identify_due(&mut self) {
        self.session_id = None;
        self.phase = ConnectionPhase::Identifying;
    }

    /// Notes a transport close and returns the reconnect attempt number.
    ///
    /// The counter only resets on READY, so repeated failures without an
    /// intervening successful handshake keep growing the backoff.
    pub fn on_transport_closed(&mut self) -> u32 {
        self.phase = ConnectionPhase::Closed;
        self.reconnect_attempts += 1;
        self.reconnect_attempts
    }

    /// Notes that the reconnect wait started.
    pub fn on_reconnect_wait(&mut self) {
        self.phase = ConnectionPhase::Reconnecting;
    }

    /// Notes that a new transport attempt is starting.
    pub fn on_reopening(&mut self) {
        self.phase = ConnectionPhase::Opening;
    }

    /// Notes an explicit external stop.
    pub fn on_terminated(&mut self) {
        self.phase = ConnectionPhase::Terminated;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn frame(value: serde_json::Value) -> InboundFrame {
        serde_json::from_value(value).expect("test frame")
    }

    fn ready_frame(seq: u64) -> InboundFrame {
        frame(json!({
            "op": 0,
            "d": { "session_id": "abc", "user": { "username": "x" } },
            "s": seq,
            "t": "READY"
        }))
    }

    #[test]
    fn test_sequence_updates_regardless_of_opcode() {
        let mut session = Session::new(Duration::ZERO);

        session.handle_frame(&frame(json!({ "op": 0, "s": 5, "t": "TYPING_START" })));
        assert_eq!(session.sequence(), Some(5));

        // Unknown opcode still counts its sequence.
        session.handle_frame(&frame(json!({ "op": 42, "s": 6 })));
        assert_eq!(session.sequence(), Some(6));

        // Null sequence leaves the stored value alone.
        session.handle_frame(&frame(json!({ "op": 11, "s": null })));
        assert_eq!(session.sequence(), Some(6));
    }

    #[test]
    fn test_hello_starts_heartbeat_and_schedules_identify() {
        let mut session = Session::new(Duration::from_millis(350));
        let actions = session.handle_frame(&frame(json!({
            "op": 10,
            "d": { "heartbeat_interval": 41_250 }
        })));

        assert_eq!(
            actions,
            vec![
                Action::StartHeartbeat(Duration::from_millis(41_250)),
                Action::ScheduleIdentify(Duration::from_millis(350)),
            ]
        );
    }

    #[test]
    fn test_hello_without_interval_still_schedules_identify() {
        let mut session = Session::new(Duration::ZERO);
        let actions = session.handle_frame(&frame(json!({ "op": 10, "d": {} })));
        assert_eq!(actions, vec![Action::ScheduleIdentify(Duration::ZERO)]);
    }

    #[test]
    fn test_ready_stores_session_and_resets_attempts() {
        let mut session = Session::new(Duration::ZERO);
        session.on_transport_closed();
        session.on_transport_closed();
        assert_eq!(session.reconnect_attempts(), 2);

        let actions = session.handle_frame(&ready_frame(1));
        assert!(actions.is_empty());
        assert_eq!(session.phase(), ConnectionPhase::Authenticated);
        assert_eq!(session.session_id(), Some("abc"));
        assert_eq!(session.username(), Some("x"));
        assert_eq!(session.reconnect_attempts(), 0);
    }

    #[test]
    fn test_attempt_counter_resets_only_on_ready() {
        let mut session = Session::new(Duration::ZERO);

        // Two failures, one success, one more failure: the next attempt
        // number must correspond to attempt 1, not 3.
        session.on_transport_closed();
        session.on_transport_closed();
        session.handle_frame(&ready_frame(1));
        assert_eq!(session.on_transport_closed(), 1);
    }

    #[test]
    fn test_invalid_session_non_resumable_schedules_identify() {
        let mut session = Session::new(Duration::ZERO);
        let actions = session.handle_frame(&frame(json!({
            "op": 0,
            "d": false,
            "t": "INVALID_SESSION"
        })));

        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::ScheduleIdentify(delay) => {
                assert!(delay.as_millis() >= 2_000);
                assert!(delay.as_millis() < 5_000);
            }
            other => panic!("expected ScheduleIdentify, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_session_resumable_closes_transport() {
        let mut session = Session::new(Duration::ZERO);
        let actions = session.handle_frame(&frame(json!({
            "op": 0,
            "d": true,
            "t": "INVALID_SESSION"
        })));
        assert_eq!(actions, vec![Action::CloseTransport]);
    }

    #[test]
    fn test_heartbeat_ack() {
        let mut session = Session::new(Duration::ZERO);
        let actions = session.handle_frame(&frame(json!({ "op": 11 })));
        assert_eq!(actions, vec![Action::AckHeartbeat]);
    }

    #[test]
    fn test_server_requested_heartbeat() {
        let mut session = Session::new(Duration::ZERO);
        let actions = session.handle_frame(&frame(json!({ "op": 1 })));
        assert_eq!(actions, vec![Action::SendHeartbeat]);
    }

    #[test]
    fn test_reconnect_op_closes_transport() {
        let mut session = Session::new(Duration::ZERO);
        let actions = session.handle_frame(&frame(json!({ "op": 7 })));
        assert_eq!(actions, vec![Action::CloseTransport]);
    }

    #[test]
    fn test_op_level_invalid_session_is_passive() {
        let mut session = Session::new(Duration::ZERO);
        let actions = session.handle_frame(&frame(json!({ "op": 9, "d": false })));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_identify_due_clears_session_id() {
        let mut session = Session::new(Duration::ZERO);
        session.handle_frame(&ready_frame(1));
        assert!(session.session_id().is_some());

        session.on_identify_due();
        assert_eq!(session.session_id(), None);
        assert_eq!(session.phase(), ConnectionPhase::Identifying);
    }

    #[test]
    fn test_sequence_survives_transport_close() {
        let mut session = Session::new(Duration::ZERO);
        session.handle_frame(&frame(json!({ "op": 0, "s": 9, "t": "TYPING_START" })));
        session.on_transport_closed();
        assert_eq!(session.sequence(), Some(9));
    }

    #[test]
    fn test_lifecycle_phases() {
        let mut session = Session::new(Duration::ZERO);
        assert_eq!(session.phase(), ConnectionPhase::Opening);

        session.on_transport_opened();
        assert_eq!(session.phase(), ConnectionPhase::AwaitingHello);

        session.on_identify_due();
        assert_eq!(session.phase(), ConnectionPhase::Identifying);

        session.on_transport_closed();
        assert_eq!(session.phase(), ConnectionPhase::Closed);

        session.on_reconnect_wait();
        assert_eq!(session.phase(), ConnectionPhase::Reconnecting);

        session.on_reopening();
        assert_eq!(session.phase(), ConnectionPhase::Opening);

        session.on_terminated();
        assert_eq!(session.phase(), ConnectionPhase::Terminated);
    }
}
