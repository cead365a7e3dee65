//! Gateway frame types.
//!
//! All frames are JSON text messages. Inbound frames carry
//! `{op, d, s, t}`; outbound frames use only `{op, d}`.
//!
//! # Frame Types
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | [`InboundFrame`] | server → client | dispatches and protocol control |
//! | [`OutboundFrame`] | client → server | heartbeat and identify |

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::presence::Presence;
use crate::protocol::opcode::OpCode;
use crate::token::Token;

// ============================================================================
// Constants
// ============================================================================

/// Identify `properties.browser` value.
const CLIENT_BROWSER: &str = "gateway-presence";

/// Identify `properties.device` value.
const CLIENT_DEVICE: &str = "pc";

// ============================================================================
// InboundFrame
// ============================================================================

/// A frame received from the gateway.
///
/// # Format
///
/// ```json
/// { "op": 0, "d": { ... }, "s": 42, "t": "READY" }
/// ```
///
/// `s` and `t` are only non-null on dispatch frames, but the parser accepts
/// their absence on any opcode.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    /// Raw wire opcode.
    pub op: u8,

    /// Opcode-specific payload.
    #[serde(default)]
    pub d: Value,

    /// Monotonic dispatch sequence number.
    #[serde(default)]
    pub s: Option<u64>,

    /// Dispatch event type.
    #[serde(default)]
    pub t: Option<String>,
}

impl InboundFrame {
    /// Returns the parsed opcode, or `None` for codes this client ignores.
    #[inline]
    #[must_use]
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.op)
    }

    /// Returns the dispatch event type, if any.
    #[inline]
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.t.as_deref()
    }

    /// Returns `d.heartbeat_interval` in milliseconds (Hello frames).
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<u64> {
        self.d.get("heartbeat_interval").and_then(Value::as_u64)
    }

    /// Returns `d.session_id` (READY dispatches).
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.d.get("session_id").and_then(Value::as_str)
    }

    /// Returns `d.user.username` (READY dispatches).
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.d
            .get("user")
            .and_then(|user| user.get("username"))
            .and_then(Value::as_str)
    }

    /// Returns `true` if an INVALID_SESSION payload marks the session
    /// resumable (`d` is literally `true`).
    #[inline]
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.d == Value::Bool(true)
    }
}

// ============================================================================
// OutboundFrame
// ============================================================================

/// A frame sent to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundFrame {
    /// Wire opcode.
    pub op: u8,

    /// Opcode-specific payload.
    pub d: Value,
}

impl OutboundFrame {
    /// Builds a heartbeat frame carrying the last known sequence number.
    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat.as_u8(),
            d: match sequence {
                Some(s) => json!(s),
                None => Value::Null,
            },
        }
    }

    /// Builds an identify frame for one credential.
    ///
    /// The presence descriptor is sent verbatim with a `since` timestamp
    /// of the current time and `afk: false`.
    #[must_use]
    pub fn identify(token: &Token, intents: u64, presence: &Presence) -> Self {
        Self {
            op: OpCode::Identify.as_u8(),
            d: json!({
                "token": token.expose(),
                "intents": intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": CLIENT_BROWSER,
                    "device": CLIENT_DEVICE,
                },
                "presence": {
                    "activities": presence.activities,
                    "status": presence.status,
                    "since": now_unix_ms(),
                    "afk": false,
                },
            }),
        }
    }
}

/// Current time as milliseconds since the Unix epoch.
fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::presence::{Activity, ActivityKind, OnlineStatus};
    use crate::protocol::opcode::intents;

    #[test]
    fn test_parse_hello() {
        let frame: InboundFrame =
            serde_json::from_str(r#"{"op":10,"d":{"heartbeat_interval":41250},"s":null,"t":null}"#)
                .expect("parse hello");

        assert_eq!(frame.opcode(), Some(OpCode::Hello));
        assert_eq!(frame.heartbeat_interval(), Some(41_250));
        assert_eq!(frame.s, None);
    }

    #[test]
    fn test_parse_dispatch_ready() {
        let frame: InboundFrame = serde_json::from_str(
            r#"{"op":0,"d":{"session_id":"abc","user":{"username":"x"}},"s":1,"t":"READY"}"#,
        )
        .expect("parse ready");

        assert_eq!(frame.opcode(), Some(OpCode::Dispatch));
        assert_eq!(frame.event_type(), Some("READY"));
        assert_eq!(frame.session_id(), Some("abc"));
        assert_eq!(frame.username(), Some("x"));
        assert_eq!(frame.s, Some(1));
    }

    #[test]
    fn test_parse_tolerates_missing_fields() {
        let frame: InboundFrame =
            serde_json::from_str(r#"{"op":11}"#).expect("parse bare ack");
        assert_eq!(frame.opcode(), Some(OpCode::HeartbeatAck));
        assert_eq!(frame.s, None);
        assert_eq!(frame.t, None);
    }

    #[test]
    fn test_resumable_flag() {
        let resumable: InboundFrame =
            serde_json::from_str(r#"{"op":0,"d":true,"t":"INVALID_SESSION"}"#).unwrap();
        let fresh: InboundFrame =
            serde_json::from_str(r#"{"op":0,"d":false,"t":"INVALID_SESSION"}"#).unwrap();

        assert!(resumable.is_resumable());
        assert!(!fresh.is_resumable());
    }

    #[test]
    fn test_heartbeat_frame_shape() {
        let with_seq = serde_json::to_value(OutboundFrame::heartbeat(Some(42))).unwrap();
        assert_eq!(with_seq["op"], 1);
        assert_eq!(with_seq["d"], 42);

        let without = serde_json::to_value(OutboundFrame::heartbeat(None)).unwrap();
        assert_eq!(without["d"], serde_json::Value::Null);
    }

    #[test]
    fn test_identify_frame_shape() {
        let token = Token::new("tok-123");
        let presence = Presence::new(OnlineStatus::Online)
            .with_activity(Activity::new("Chess", ActivityKind::Game, None));

        let value =
            serde_json::to_value(OutboundFrame::identify(&token, intents::DEFAULT, &presence))
                .unwrap();

        assert_eq!(value["op"], 2);
        assert_eq!(value["d"]["token"], "tok-123");
        assert_eq!(value["d"]["intents"], intents::DEFAULT);
        assert_eq!(value["d"]["presence"]["status"], "online");
        assert_eq!(value["d"]["presence"]["afk"], false);
        assert_eq!(value["d"]["presence"]["activities"][0]["name"], "Chess");
        assert!(value["d"]["presence"]["since"].as_u64().is_some());
        assert!(value["d"]["properties"]["browser"].as_str().is_some());
    }
}
