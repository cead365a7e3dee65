//! Authentication token handling.
//!
//! A [`Token`] is the opaque credential one gateway connection authenticates
//! with. It is owned by exactly one connection and never mutated.
//!
//! # Redaction
//!
//! Tokens must never appear in full in logs. Both `Display` and `Debug`
//! render a short prefix followed by an ellipsis; the full value is only
//! reachable through [`Token::expose`], which the identify payload uses.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Number of leading characters shown in redacted output.
const REDACTED_PREFIX_LEN: usize = 6;

// ============================================================================
// Token
// ============================================================================

/// An opaque gateway authentication token.
///
/// Construct via [`Token::new`] or `From<String>`. The inner value is
/// intentionally private; use [`Token::expose`] at the single site that
/// serializes the identify payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Creates a token from a raw string.
    #[inline]
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the full token value.
    ///
    /// Only the identify payload builder should need this.
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the token is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the redacted form used in logs.
    #[must_use]
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(REDACTED_PREFIX_LEN).collect();
        format!("{prefix}\u{2026}")
    }
}

impl From<String> for Token {
    #[inline]
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.redacted()).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_redacted() {
        let token = Token::new("MTA4NjYzOTc0MzQ1.secret.part");
        let shown = token.to_string();
        assert!(shown.starts_with("MTA4Nj"));
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let token = Token::new("MTA4NjYzOTc0MzQ1.secret.part");
        let shown = format!("{token:?}");
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn test_short_token_redaction() {
        let token = Token::new("abc");
        assert_eq!(token.redacted(), "abc\u{2026}");
    }

    #[test]
    fn test_expose_returns_full_value() {
        let token = Token::new("full-value");
        assert_eq!(token.expose(), "full-value");
    }

    #[test]
    fn test_is_empty() {
        assert!(Token::new("").is_empty());
        assert!(!Token::new("x").is_empty());
    }
}
