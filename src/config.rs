//! Startup configuration: credential list and presence policy.
//!
//! Both collaborators sit outside the connection core; they hand each
//! connection a [`Token`] and a [`Presence`] and are never consulted
//! again. Errors here are the only fatal errors in the system: without
//! them no connections can be constructed.
//!
//! # Credential List
//!
//! A newline-separated token file. Surrounding whitespace is trimmed and
//! blank lines are discarded.
//!
//! # Presence Policy
//!
//! A JSON file enumerating candidate online statuses, candidate activity
//! kinds, and per-kind name/url pools:
//!
//! ```json
//! {
//!   "choose_random_activity_type_from": ["GAME", "STREAMING"],
//!   "choose_random_online_status_from": ["ONLINE", "IDLE"],
//!   "game": { "choose_random_game_from": ["Chess"] },
//!   "streaming": {
//!     "choose_random_name_from": ["Speedruns"],
//!     "choose_random_url_from": ["https://twitch.tv/someone"]
//!   }
//! }
//! ```
//!
//! One status/kind/name combination is drawn uniformly at random per
//! connection at startup.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::presence::{Activity, ActivityKind, OnlineStatus, Presence};
use crate::token::Token;

// ============================================================================
// Constants
// ============================================================================

/// Fallback activity name when a kind's pool is empty.
const FALLBACK_ACTIVITY_NAME: &str = "Playing";

// ============================================================================
// Token Loading
// ============================================================================

/// Loads the newline-separated credential list.
///
/// Trims surrounding whitespace and discards blank lines.
///
/// # Errors
///
/// - [`Error::Io`] if the file cannot be read
/// - [`Error::Config`] if no tokens remain after filtering
pub fn load_tokens(path: impl AsRef<Path>) -> Result<Vec<Token>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let tokens: Vec<Token> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Token::new)
        .collect();

    if tokens.is_empty() {
        return Err(Error::config(format!("no tokens in {}", path.display())));
    }

    debug!(count = tokens.len(), path = %path.display(), "tokens loaded");
    Ok(tokens)
}

// ============================================================================
// Raw Policy Shape
// ============================================================================

/// On-disk policy shape, before validation.
#[derive(Debug, Deserialize)]
struct RawPolicy {
    /// Candidate activity kind names.
    choose_random_activity_type_from: Vec<String>,

    /// Candidate online status names.
    choose_random_online_status_from: Vec<String>,

    #[serde(default)]
    game: Pool,
    #[serde(default)]
    streaming: Pool,
    #[serde(default)]
    listening: Pool,
    #[serde(default)]
    watching: Pool,
    #[serde(default)]
    custom: Pool,
    #[serde(default)]
    competing: Pool,
}

/// Per-kind candidate pools.
///
/// The game pool historically uses `choose_random_game_from` for its
/// name list; every other kind uses `choose_random_name_from`.
#[derive(Debug, Clone, Default, Deserialize)]
struct Pool {
    #[serde(
        default,
        rename = "choose_random_name_from",
        alias = "choose_random_game_from"
    )]
    names: Vec<String>,

    #[serde(default, rename = "choose_random_url_from")]
    urls: Vec<String>,
}

// ============================================================================
// PresencePolicy
// ============================================================================

/// Validated presence-generation policy.
#[derive(Debug, Clone)]
pub struct PresencePolicy {
    statuses: Vec<OnlineStatus>,
    kinds: Vec<ActivityKind>,
    game: Pool,
    streaming: Pool,
    listening: Pool,
    watching: Pool,
    custom: Pool,
    competing: Pool,
}

impl PresencePolicy {
    /// Loads and validates a policy file.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be read
    /// - [`Error::Json`] if the file is not valid JSON
    /// - [`Error::Policy`] for unknown kind/status names, empty candidate
    ///   lists, or a listed kind whose name pool is empty
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let raw: RawPolicy = serde_json::from_str(&contents)?;

        let statuses = raw
            .choose_random_online_status_from
            .iter()
            .map(|name| {
                name.parse::<OnlineStatus>()
                    .map_err(|_| Error::policy(path, format!("unknown online status: {name}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let kinds = raw
            .choose_random_activity_type_from
            .iter()
            .map(|name| {
                name.parse::<ActivityKind>()
                    .map_err(|_| Error::policy(path, format!("unknown activity kind: {name}")))
            })
            .collect::<Result<Vec<_>>>()?;

        if statuses.is_empty() {
            return Err(Error::policy(path, "no candidate online statuses"));
        }
        if kinds.is_empty() {
            return Err(Error::policy(path, "no candidate activity kinds"));
        }

        let policy = Self {
            statuses,
            kinds,
            game: raw.game,
            streaming: raw.streaming,
            listening: raw.listening,
            watching: raw.watching,
            custom: raw.custom,
            competing: raw.competing,
        };
        policy.validate_pools(path)?;

        debug!(path = %path.display(), "presence policy loaded");
        Ok(policy)
    }

    /// Checks that every listed kind has candidates to draw from.
    fn validate_pools(&self, path: &Path) -> Result<()> {
        for &kind in &self.kinds {
            let pool = self.pool(kind);
            if pool.names.is_empty() {
                return Err(Error::policy(
                    path,
                    format!("activity kind {kind:?} listed but its name pool is empty"),
                ));
            }
            if kind == ActivityKind::Streaming && pool.urls.is_empty() {
                return Err(Error::policy(path, "streaming listed but no candidate urls"));
            }
        }
        Ok(())
    }

    /// Returns the candidate pool for a kind.
    fn pool(&self, kind: ActivityKind) -> &Pool {
        match kind {
            ActivityKind::Game => &self.game,
            ActivityKind::Streaming => &self.streaming,
            ActivityKind::Listening => &self.listening,
            ActivityKind::Watching => &self.watching,
            ActivityKind::Custom => &self.custom,
            ActivityKind::Competing => &self.competing,
        }
    }

    /// Draws one presence descriptor uniformly at random.
    #[must_use]
    pub fn draw(&self, rng: &mut impl Rng) -> Presence {
        let status = self
            .statuses
            .choose(rng)
            .copied()
            .unwrap_or(OnlineStatus::Online);
        let kind = self.kinds.choose(rng).copied().unwrap_or(ActivityKind::Game);

        let pool = self.pool(kind);
        let name = pool
            .names
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| FALLBACK_ACTIVITY_NAME.to_string());
        let url = if kind == ActivityKind::Streaming {
            pool.urls.choose(rng).cloned()
        } else {
            None
        };

        Presence::new(status).with_activity(Activity::new(name, kind, url))
    }
}

// ============================================================================
// Tests
// ============================================================================
