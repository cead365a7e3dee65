//! Heartbeat supervision.
//!
//! The gateway dictates a heartbeat interval in its hello frame. The
//! [`Heartbeat`] supervisor owns the recurring timer and the ack flag:
//! every tick either produces a heartbeat send or, when the previous
//! heartbeat was never acknowledged, a restart decision that forces the
//! transport closed.
//!
//! The supervisor lives inside the connection's event loop, so dropping
//! the loop (transport close, stop) also drops the timer; a stale timer
//! can never outlive its connection.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::debug;

// ============================================================================
// Beat
// ============================================================================

/// Decision produced by one heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Previous heartbeat was acknowledged; send the next one.
    Send,
    /// Previous heartbeat was never acknowledged; the connection is dead
    /// and the transport must be restarted. No heartbeat is sent.
    Restart,
}

// ============================================================================
// Heartbeat
// ============================================================================

/// Periodic liveness supervisor for one connection.
#[derive(Debug)]
pub struct Heartbeat {
    /// Recurring timer; `None` until the server hello arrives.
    timer: Option<Interval>,
    /// Whether the last heartbeat was acknowledged.
    acked: bool,
}

impl Heartbeat {
    /// Creates a stopped supervisor.
    ///
    /// The ack flag starts `true` so the first tick after [`start`]
    /// always sends rather than restarting.
    ///
    /// [`start`]: Heartbeat::start
    #[must_use]
    pub fn new() -> Self {
        Self {
            timer: None,
            acked: true,
        }
    }

    /// Starts the heartbeat cycle at the given interval.
    ///
    /// Idempotent: any previous timer is torn down first and the ack flag
    /// is reset, so a restart is never pre-armed with a stale miss. The
    /// first tick fires one full interval from now.
    pub fn start(&mut self, period: Duration) {
        debug!(period_ms = period.as_millis() as u64, "heartbeat started");
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
        self.acked = true;
    }

    /// Stops the cycle and resets the ack flag.
    pub fn stop(&mut self) {
        self.timer = None;
        self.acked = true;
    }

    /// Records an acknowledgment from the server.
    #[inline]
    pub fn acknowledge(&mut self) {
        self.acked = true;
    }

    /// Returns `true` if a timer is armed.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Waits for the next tick and returns the decision.
    ///
    /// Pending forever while stopped, which makes this safe to poll in a
    /// `select!` arm unconditionally. On [`Beat::Send`] the ack flag is
    /// cleared and the caller must send a heartbeat frame; on
    /// [`Beat::Restart`] nothing is sent and the caller must force-close
    /// the transport.
    pub async fn tick(&mut self) -> Beat {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
                if self.acked {
                    self.acked = false;
                    Beat::Send
                } else {
                    Beat::Restart
                }
            }
            None => std::future::pending().await,
        }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::time::{advance, pause};

    #[tokio::test]
    async fn test_first_tick_sends() {
        pause();
        let mut hb = Heartbeat::new();
        hb.start(Duration::from_millis(100));

        advance(Duration::from_millis(100)).await;
        assert_eq!(hb.tick().await, Beat::Send);
    }

    #[tokio::test]
    async fn test_one_heartbeat_per_interval_while_acked() {
        pause();
        let mut hb = Heartbeat::new();
        hb.start(Duration::from_millis(100));

        for _ in 0..5 {
            advance(Duration::from_millis(100)).await;
            assert_eq!(hb.tick().await, Beat::Send);
            hb.acknowledge();
        }
    }

    #[tokio::test]
    async fn test_missed_ack_forces_restart() {
        pause();
        let mut hb = Heartbeat::new();
        hb.start(Duration::from_millis(100));

        advance(Duration::from_millis(100)).await;
        assert_eq!(hb.tick().await, Beat::Send);

        // No acknowledge() between ticks.
        advance(Duration::from_millis(100)).await;
        assert_eq!(hb.tick().await, Beat::Restart);
    }

    #[tokio::test]
    async fn test_restart_after_stop_is_not_prearmed() {
        pause();
        let mut hb = Heartbeat::new();
        hb.start(Duration::from_millis(100));

        advance(Duration::from_millis(100)).await;
        assert_eq!(hb.tick().await, Beat::Send);

        // Stop with the miss outstanding, then start again: the stale
        // miss must not force a spurious restart.
        hb.stop();
        hb.start(Duration::from_millis(100));

        advance(Duration::from_millis(100)).await;
        assert_eq!(hb.tick().await, Beat::Send);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        pause();
        let mut hb = Heartbeat::new();
        hb.start(Duration::from_millis(100));
        hb.start(Duration::from_millis(200));

        // Old 100ms cadence is gone; nothing fires before 200ms.
        advance(Duration::from_millis(150)).await;
        {
            let mut tick = tokio_test::task::spawn(hb.tick());
            tokio_test::assert_pending!(tick.poll());
        }

        advance(Duration::from_millis(50)).await;
        assert_eq!(hb.tick().await, Beat::Send);
    }

    #[tokio::test]
    async fn test_stopped_tick_is_pending() {
        let hb = Heartbeat::new();
        assert!(!hb.is_running());

        let mut task = tokio_test::task::spawn(async move {
            let mut hb = hb;
            hb.tick().await
        });
        tokio_test::assert_pending!(task.poll());
    }
}
