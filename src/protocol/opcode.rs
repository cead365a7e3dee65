//! Gateway opcodes and intent flags.
//!
//! Plain immutable constants local to the protocol module; there is no
//! process-wide registry. Opcode numbers follow gateway protocol v10.

// ============================================================================
// OpCode
// ============================================================================

/// Gateway frame opcode.
///
/// | Code | Name | Direction |
/// |------|------|-----------|
/// | 0 | Dispatch | inbound |
/// | 1 | Heartbeat | both |
/// | 2 | Identify | outbound |
/// | 3 | PresenceUpdate | outbound (unused) |
/// | 4 | VoiceStateUpdate | outbound (unused) |
/// | 6 | Resume | outbound (unused, no resume support) |
/// | 7 | Reconnect | inbound |
/// | 8 | RequestGuildMembers | outbound (unused) |
/// | 9 | InvalidSession | inbound |
/// | 10 | Hello | inbound |
/// | 11 | HeartbeatAck | inbound |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Event-carrying dispatch frame.
    Dispatch = 0,
    /// Liveness ping (either direction).
    Heartbeat = 1,
    /// Authentication handshake.
    Identify = 2,
    /// Presence update (unused).
    PresenceUpdate = 3,
    /// Voice state update (unused).
    VoiceStateUpdate = 4,
    /// Session resume (unused, no resume support).
    Resume = 6,
    /// Server requests a reconnect.
    Reconnect = 7,
    /// Guild member request (unused).
    RequestGuildMembers = 8,
    /// Session invalidated at the op level.
    InvalidSession = 9,
    /// First server frame, carries the heartbeat interval.
    Hello = 10,
    /// Heartbeat acknowledgment.
    HeartbeatAck = 11,
}

impl OpCode {
    /// Parses a wire opcode.
    ///
    /// Returns `None` for codes this client does not know; such frames are
    /// ignored (their sequence number still counts).
    #[must_use]
    pub fn from_u8(op: u8) -> Option<Self> {
        match op {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            3 => Some(Self::PresenceUpdate),
            4 => Some(Self::VoiceStateUpdate),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            8 => Some(Self::RequestGuildMembers),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }

    /// Returns the wire value of this opcode.
    #[inline]
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// ============================================================================
// Intents
// ============================================================================

/// Gateway intent bitmask constants.
pub mod intents {
    /// Guild lifecycle events.
    pub const GUILDS: u64 = 1 << 0;
    /// Guild member events.
    pub const GUILD_MEMBERS: u64 = 1 << 1;
    /// Guild moderation events.
    pub const GUILD_MODERATION: u64 = 1 << 2;
    /// Emoji and sticker events.
    pub const GUILD_EMOJIS_AND_STICKERS: u64 = 1 << 3;
    /// Integration events.
    pub const GUILD_INTEGRATIONS: u64 = 1 << 4;
    /// Webhook events.
    pub const GUILD_WEBHOOKS: u64 = 1 << 5;
    /// Invite events.
    pub const GUILD_INVITES: u64 = 1 << 6;
    /// Voice state events.
    pub const GUILD_VOICE_STATES: u64 = 1 << 7;
    /// Presence events.
    pub const GUILD_PRESENCES: u64 = 1 << 8;
    /// Guild message events.
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    /// Guild message reaction events.
    pub const GUILD_MESSAGE_REACTIONS: u64 = 1 << 10;
    /// Guild typing events.
    pub const GUILD_MESSAGE_TYPING: u64 = 1 << 11;
    /// Direct message events.
    pub const DIRECT_MESSAGES: u64 = 1 << 12;
    /// Direct message reaction events.
    pub const DIRECT_MESSAGE_REACTIONS: u64 = 1 << 13;
    /// Direct message typing events.
    pub const DIRECT_MESSAGE_TYPING: u64 = 1 << 14;
    /// Message content access.
    pub const MESSAGE_CONTENT: u64 = 1 << 15;
    /// Scheduled event updates.
    pub const GUILD_SCHEDULED_EVENTS: u64 = 1 << 16;
    /// Auto-moderation configuration events.
    pub const AUTO_MODERATION_CONFIGURATION: u64 = 1 << 20;
    /// Auto-moderation execution events.
    pub const AUTO_MODERATION_EXECUTION: u64 = 1 << 21;

    /// Default bitmask declared by the identify handshake.
    pub const DEFAULT: u64 = GUILDS | GUILD_MESSAGES;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_opcodes_round_trip() {
        for code in [
            OpCode::Dispatch,
            OpCode::Heartbeat,
            OpCode::Identify,
            OpCode::PresenceUpdate,
            OpCode::VoiceStateUpdate,
            OpCode::Resume,
            OpCode::Reconnect,
            OpCode::RequestGuildMembers,
            OpCode::InvalidSession,
            OpCode::Hello,
            OpCode::HeartbeatAck,
        ] {
            assert_eq!(OpCode::from_u8(code.as_u8()), Some(code));
        }
    }

    #[test]
    fn test_unknown_opcodes() {
        assert_eq!(OpCode::from_u8(5), None);
        assert_eq!(OpCode::from_u8(12), None);
        assert_eq!(OpCode::from_u8(255), None);
    }

    #[test]
    fn test_default_intents() {
        assert_eq!(intents::DEFAULT, (1 << 0) | (1 << 9));
    }
}
