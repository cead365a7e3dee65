//! Presence descriptors.
//!
//! A [`Presence`] describes one identity's online status and activity list.
//! It is built once at startup (drawn from the presence policy) and re-sent
//! verbatim inside every identify handshake.
//!
//! # Wire Format
//!
//! Statuses serialize as lowercase strings (`"online"`, `"dnd"`, ...).
//! Activity kinds serialize as their numeric gateway code. An activity's
//! `url` field is always `null` unless the kind is [`ActivityKind::Streaming`];
//! [`Activity::new`] enforces this at construction.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

// ============================================================================
// OnlineStatus
// ============================================================================

/// Online status broadcast for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    /// Shown as online.
    Online,
    /// Shown as idle.
    Idle,
    /// Do not disturb.
    Dnd,
    /// Connected but shown offline.
    Invisible,
    /// Offline.
    Offline,
}

impl OnlineStatus {
    /// Returns the wire string for this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Invisible => "invisible",
            Self::Offline => "offline",
        }
    }
}

impl FromStr for OnlineStatus {
    type Err = UnknownName;

    /// Parses a policy-file status name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ONLINE" => Ok(Self::Online),
            "IDLE" => Ok(Self::Idle),
            "DND" => Ok(Self::Dnd),
            "INVISIBLE" => Ok(Self::Invisible),
            "OFFLINE" => Ok(Self::Offline),
            _ => Err(UnknownName(s.to_string())),
        }
    }
}

// ============================================================================
// ActivityKind
// ============================================================================

/// Kind of activity shown next to an identity's name.
///
/// Serializes as the numeric gateway activity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActivityKind {
    /// "Playing ..."
    Game = 0,
    /// "Streaming ..." (the only kind that carries a url).
    Streaming = 1,
    /// "Listening to ..."
    Listening = 2,
    /// "Watching ..."
    Watching = 3,
    /// Custom status text.
    Custom = 4,
    /// "Competing in ..."
    Competing = 5,
}

impl Serialize for ActivityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl FromStr for ActivityKind {
    type Err = UnknownName;

    /// Parses a policy-file kind name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GAME" => Ok(Self::Game),
            "STREAMING" => Ok(Self::Streaming),
            "LISTENING" => Ok(Self::Listening),
            "WATCHING" => Ok(Self::Watching),
            "CUSTOM" => Ok(Self::Custom),
            "COMPETING" => Ok(Self::Competing),
            _ => Err(UnknownName(s.to_string())),
        }
    }
}

// ============================================================================
// UnknownName
// ============================================================================

/// A status or activity-kind name the policy parser does not recognize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownName(pub String);

impl fmt::Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown name: {}", self.0)
    }
}

impl std::error::Error for UnknownName {}

// ============================================================================
// Activity
// ============================================================================

/// One activity entry in a presence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    /// Display name of the activity.
    pub name: String,

    /// Activity kind, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: ActivityKind,

    /// Stream url. Always `null` unless `kind` is streaming.
    pub url: Option<String>,
}

impl Activity {
    /// Creates an activity.
    ///
    /// The url is discarded for every kind other than
    /// [`ActivityKind::Streaming`], so non-streaming activities always
    /// serialize with `url: null`.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ActivityKind, url: Option<String>) -> Self {
        let url = if kind == ActivityKind::Streaming {
            url
        } else {
            None
        };
        Self {
            name: name.into(),
            kind,
            url,
        }
    }
}

// ============================================================================
// Presence
// ============================================================================

/// Immutable-after-construction presence descriptor for one identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presence {
    /// Online status.
    pub status: OnlineStatus,

    /// Ordered activity list.
    pub activities: Vec<Activity>,
}

impl Presence {
    /// Creates a presence with no activities.
    #[inline]
    #[must_use]
    pub fn new(status: OnlineStatus) -> Self {
        Self {
            status,
            activities: Vec::new(),
        }
    }

    /// Adds an activity, returning the presence for chaining.
    #[must_use]
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json, to_value};

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(to_value(OnlineStatus::Online).unwrap(), json!("online"));
        assert_eq!(to_value(OnlineStatus::Dnd).unwrap(), json!("dnd"));
        assert_eq!(to_value(OnlineStatus::Invisible).unwrap(), json!("invisible"));
    }

    #[test]
    fn test_status_from_str_case_insensitive() {
        assert_eq!("ONLINE".parse::<OnlineStatus>(), Ok(OnlineStatus::Online));
        assert_eq!("dnd".parse::<OnlineStatus>(), Ok(OnlineStatus::Dnd));
        assert!("away".parse::<OnlineStatus>().is_err());
    }

    #[test]
    fn test_kind_serializes_as_number() {
        assert_eq!(to_value(ActivityKind::Game).unwrap(), json!(0));
        assert_eq!(to_value(ActivityKind::Streaming).unwrap(), json!(1));
        assert_eq!(to_value(ActivityKind::Competing).unwrap(), json!(5));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("watching".parse::<ActivityKind>(), Ok(ActivityKind::Watching));
        assert!("DANCING".parse::<ActivityKind>().is_err());
    }

    #[test]
    fn test_non_streaming_url_is_null() {
        // A url supplied for a non-streaming kind must not survive.
        let activity = Activity::new(
            "Chess",
            ActivityKind::Game,
            Some("https://twitch.tv/someone".into()),
        );
        assert_eq!(activity.url, None);

        let value = to_value(&activity).unwrap();
        assert_eq!(value.get("url"), Some(&Value::Null));
    }

    #[test]
    fn test_streaming_keeps_url() {
        let activity = Activity::new(
            "Speedruns",
            ActivityKind::Streaming,
            Some("https://twitch.tv/someone".into()),
        );
        assert_eq!(activity.url.as_deref(), Some("https://twitch.tv/someone"));
    }

    #[test]
    fn test_presence_wire_shape() {
        let presence = Presence::new(OnlineStatus::Idle)
            .with_activity(Activity::new("Chess", ActivityKind::Game, None));

        let value = to_value(&presence).unwrap();
        assert_eq!(value["status"], json!("idle"));
        assert_eq!(value["activities"][0]["name"], json!("Chess"));
        assert_eq!(value["activities"][0]["type"], json!(0));
        assert_eq!(value["activities"][0]["url"], Value::Null);
    }
}
