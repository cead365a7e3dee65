//! Connection pool and startup orchestration.
//!
//! The pool is a thin layer over the connection core: it draws one
//! presence per credential from the policy, spaces the identify
//! handshakes out with a staggered delay, and forwards shutdown to every
//! connection. The connections themselves are fully independent; the
//! pool holds their handles and nothing else.
//!
//! # Stagger
//!
//! Many identities performing their handshake at once looks like a
//! thundering herd to the gateway's anti-abuse heuristics. Connection
//! `i` identifies `i * 1200ms + random(0..500)ms` after its hello, and
//! constructions themselves are spaced ~150ms apart.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rand::{Rng, thread_rng};
use tokio::time::sleep;
use tracing::info;
use url::Url;

use crate::config::PresencePolicy;
use crate::gateway::{ConnectionConfig, ConnectionPhase, ConnectionStatus, GatewayConnection};
use crate::token::Token;

// ============================================================================
// Constants
// ============================================================================

/// Identify stagger per connection index.
const IDENTIFY_STAGGER: Duration = Duration::from_millis(1_200);

/// Upper bound (exclusive) of the per-connection identify jitter.
const IDENTIFY_JITTER_MS: u64 = 500;

/// Pause between consecutive connection constructions.
const CONSTRUCTION_PAUSE: Duration = Duration::from_millis(150);

// ============================================================================
// ConnectionPool
// ============================================================================

/// Owns the handles of every running gateway connection.
pub struct ConnectionPool {
    connections: Vec<GatewayConnection>,
}

impl ConnectionPool {
    /// Starts one connection per credential.
    ///
    /// Each connection gets a presence drawn from the policy and a
    /// staggered identify delay; constructions are paced to avoid a
    /// simultaneous transport-open burst.
    pub async fn start(tokens: Vec<Token>, policy: &PresencePolicy, endpoint: Url) -> Self {
        let mut connections = Vec::with_capacity(tokens.len());
        let total = tokens.len();

        for (index, token) in tokens.into_iter().enumerate() {
            let (presence, jitter_ms) = {
                let mut rng = thread_rng();
                (policy.draw(&mut rng), rng.gen_range(0..IDENTIFY_JITTER_MS))
            };
            let identify_delay =
                IDENTIFY_STAGGER * index as u32 + Duration::from_millis(jitter_ms);

            info!(
                index,
                credential = %token,
                status = presence.status.as_str(),
                identify_delay_ms = identify_delay.as_millis() as u64,
                "starting connection"
            );

            let config = ConnectionConfig::new(endpoint.clone()).identify_delay(identify_delay);
            connections.push(GatewayConnection::spawn(token, presence, config));

            if index + 1 < total {
                sleep(CONSTRUCTION_PAUSE).await;
            }
        }

        info!(count = connections.len(), "connection pool started");
        Self { connections }
    }

    /// Returns the number of connections in the pool.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Returns a status snapshot of every connection.
    #[must_use]
    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.connections
            .iter()
            .map(GatewayConnection::status)
            .collect()
    }

    /// Returns the number of currently authenticated connections.
    #[must_use]
    pub fn authenticated_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|c| c.phase() == ConnectionPhase::Authenticated)
            .count()
    }

    /// Forwards stop to every connection.
    pub fn stop_all(&self) {
        info!(count = self.connections.len(), "stopping all connections");
        for connection in &self.connections {
            connection.stop();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    fn test_policy() -> PresencePolicy {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"{
                "choose_random_activity_type_from": ["GAME"],
                "choose_random_online_status_from": ["ONLINE"],
                "game": { "choose_random_game_from": ["Chess"] }
            }"#,
        )
        .expect("write");
        PresencePolicy::load(file.path()).expect("policy")
    }

    #[tokio::test]
    async fn test_pool_starts_one_connection_per_token() {
        // Unroutable endpoint: connections sit in their backoff cycle.
        let endpoint = Url::parse("ws://127.0.0.1:1/").expect("url");
        let tokens = vec![Token::new("a"), Token::new("b"), Token::new("c")];

        let pool = ConnectionPool::start(tokens, &test_policy(), endpoint).await;
        assert_eq!(pool.connection_count(), 3);
        assert_eq!(pool.statuses().len(), 3);
        assert_eq!(pool.authenticated_count(), 0);

        pool.stop_all();
    }

    #[tokio::test]
    async fn test_stop_all_is_idempotent() {
        let endpoint = Url::parse("ws://127.0.0.1:1/").expect("url");
        let pool = ConnectionPool::start(vec![Token::new("a")], &test_policy(), endpoint).await;

        pool.stop_all();
        pool.stop_all();
    }
}
