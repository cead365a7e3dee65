//! Gateway connection and event loop.
//!
//! A [`GatewayConnection`] owns one WebSocket transport, drives the
//! [`Session`] state machine and the [`Heartbeat`] supervisor, and
//! recovers from transport closure with backoff, indefinitely.
//!
//! # Event Loop
//!
//! Each connection runs a single spawned task. Per iteration the loop
//! `select!`s over exactly four sources:
//!
//! - the next inbound WebSocket message
//! - the heartbeat timer
//! - the pending identify timer
//! - the stop command channel
//!
//! so frames are handled strictly in arrival order with no locking. On
//! transport closure the task computes the backoff delay, sleeps, and
//! opens a brand-new socket; the old one is never reused. Only an
//! explicit [`GatewayConnection::stop`] ends the task.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rand::thread_rng;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Sleep, sleep};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::gateway::backoff::reconnect_delay;
use crate::gateway::heartbeat::{Beat, Heartbeat};
use crate::gateway::session::{Action, ConnectionPhase, Session};
use crate::presence::Presence;
use crate::protocol::{InboundFrame, OutboundFrame, intents};
use crate::token::Token;

// ============================================================================
// Constants
// ============================================================================

/// Default gateway endpoint (protocol v10, JSON encoding).
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

// ============================================================================
// Types
// ============================================================================

/// The WebSocket transport to the gateway.
type Transport = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a split transport.
type WsSink = SplitSink<Transport, Message>;

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Per-connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Gateway endpoint to connect to.
    pub endpoint: Url,

    /// Startup delay before the identify handshake, used by the pool to
    /// stagger many identities.
    pub identify_delay: Duration,

    /// Intent bitmask declared by the identify handshake.
    pub intents: u64,
}

impl ConnectionConfig {
    /// Creates a configuration for the given endpoint with no identify
    /// delay and the default intents.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            identify_delay: Duration::ZERO,
            intents: intents::DEFAULT,
        }
    }

    /// Sets the identify stagger delay.
    #[inline]
    #[must_use]
    pub fn identify_delay(mut self, delay: Duration) -> Self {
        self.identify_delay = delay;
        self
    }

    /// Sets the intent bitmask.
    #[inline]
    #[must_use]
    pub fn intents(mut self, intents: u64) -> Self {
        self.intents = intents;
        self
    }
}

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Handle-visible snapshot of one connection's state.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    /// Current lifecycle phase.
    pub phase: ConnectionPhase,

    /// Session id from the last READY, if any.
    pub session_id: Option<String>,

    /// Display name learned from the last READY, if any.
    pub username: Option<String>,
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Commands the handle sends to the event loop.
enum ConnectionCommand {
    /// Stop the connection permanently.
    Stop,
}

// ============================================================================
// GatewayConnection
// ============================================================================

/// Handle to one running gateway connection.
///
/// The connection itself runs in a spawned task; the handle only carries
/// the stop channel and a shared status snapshot. Dropping the handle
/// does not stop the connection; call [`GatewayConnection::stop`].
pub struct GatewayConnection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Status snapshot (shared with the event loop).
    status: Arc<Mutex<ConnectionStatus>>,
}

impl GatewayConnection {
    /// Spawns a connection for one credential.
    ///
    /// The presence descriptor is re-sent verbatim on every identify for
    /// the life of the connection.
    #[must_use]
    pub fn spawn(token: Token, presence: Presence, config: ConnectionConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let status = Arc::new(Mutex::new(ConnectionStatus {
            phase: ConnectionPhase::Opening,
            session_id: None,
            username: None,
        }));

        let span = info_span!("connection", credential = %token);
        let identify_delay = config.identify_delay;
        let worker = ConnectionWorker {
            token,
            presence,
            config,
            command_rx,
            status: Arc::clone(&status),
            session: Session::new(identify_delay),
        };

        tokio::spawn(worker.run().instrument(span));

        Self { command_tx, status }
    }

    /// Requests a permanent stop.
    ///
    /// The event loop cancels its heartbeat timer, closes the transport
    /// and exits; no reconnection is attempted afterwards. Idempotent.
    pub fn stop(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Stop);
    }

    /// Returns a snapshot of the connection's current status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.lock().clone()
    }

    /// Returns the connection's current lifecycle phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.status.lock().phase
    }
}

// ============================================================================
// SessionExit
// ============================================================================

/// Why one transport session ended.
enum SessionExit {
    /// Transport closed or errored; reconnect.
    Closed,
    /// Explicit stop; do not reconnect.
    Stopped,
}

// ============================================================================
// ConnectionWorker
// ============================================================================

/// State owned by the connection's event loop task.
struct ConnectionWorker {
    token: Token,
    presence: Presence,
    config: ConnectionConfig,
    command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    status: Arc<Mutex<ConnectionStatus>>,
    session: Session,
}

impl ConnectionWorker {
    /// Outer supervision loop: connect, drive, back off, repeat forever.
    async fn run(mut self) {
        loop {
            self.session.on_reopening();
            self.publish_status();

            match connect_async(self.config.endpoint.as_str()).await {
                Ok((transport, _response)) => {
                    debug!("transport opened");
                    self.session.on_transport_opened();
                    self.publish_status();

                    if let SessionExit::Stopped = self.drive(transport).await {
                        self.session.on_terminated();
                        self.publish_status();
                        info!("connection terminated");
                        return;
                    }
                }
                // A synchronous open failure counts as another failed
                // attempt and goes straight back into the backoff wait.
                Err(e) => warn!(error = %e, "transport open failed"),
            }

            let attempt = self.session.on_transport_closed();
            self.publish_status();

            let delay = reconnect_delay(attempt, &mut thread_rng());
            info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "reconnecting after backoff"
            );
            self.session.on_reconnect_wait();
            self.publish_status();

            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.command_rx.recv() => {
                    self.session.on_terminated();
                    self.publish_status();
                    info!("connection terminated during backoff");
                    return;
                }
            }
        }
    }

    /// Drives one transport session until closure or stop.
    ///
    /// The heartbeat supervisor and identify timer live here, so leaving
    /// this function cancels both; a timer can never outlive the
    /// transport it belongs to.
    async fn drive(&mut self, transport: Transport) -> SessionExit {
        let (mut sink, mut stream) = transport.split();
        let mut heartbeat = Heartbeat::new();
        let mut identify_timer: Option<Pin<Box<Sleep>>> = None;

        loop {
            tokio::select! {
                message = stream.next() => {
                    if let Some(exit) =
                        self.on_message(message, &mut sink, &mut heartbeat, &mut identify_timer).await
                    {
                        return exit;
                    }
                }

                beat = heartbeat.tick() => match beat {
                    Beat::Send => {
                        let frame = OutboundFrame::heartbeat(self.session.sequence());
                        send_frame(&mut sink, &frame).await;
                    }
                    Beat::Restart => {
                        warn!("heartbeat not acknowledged, restarting transport");
                        heartbeat.stop();
                        let _ = sink.close().await;
                        return SessionExit::Closed;
                    }
                },

                _ = identify_due(&mut identify_timer) => {
                    identify_timer = None;
                    self.session.on_identify_due();
                    self.publish_status();

                    debug!("sending identify");
                    let frame =
                        OutboundFrame::identify(&self.token, self.config.intents, &self.presence);
                    send_frame(&mut sink, &frame).await;
                }

                // A closed channel means every handle is gone; treat it
                // like an explicit stop.
                _ = self.command_rx.recv() => {
                    debug!("stop requested");
                    heartbeat.stop();
                    let _ = sink.close().await;
                    return SessionExit::Stopped;
                }
            }
        }
    }

    /// Handles one item from the inbound message stream.
    ///
    /// Returns `Some(exit)` when the transport session is over.
    async fn on_message(
        &mut self,
        message: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
        sink: &mut WsSink,
        heartbeat: &mut Heartbeat,
        identify_timer: &mut Option<Pin<Box<Sleep>>>,
    ) -> Option<SessionExit> {
        match message {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<InboundFrame>(&text) {
                    Ok(frame) => {
                        let actions = self.session.handle_frame(&frame);
                        self.publish_status();
                        if self.apply(actions, sink, heartbeat, identify_timer).await {
                            return Some(SessionExit::Closed);
                        }
                    }
                    // Malformed frame: discard it, keep the connection.
                    Err(e) => warn!(error = %e, "discarding undecodable frame"),
                }
                None
            }

            Some(Ok(Message::Close(frame))) => {
                debug!(close = ?frame, "transport closed by remote");
                Some(SessionExit::Closed)
            }

            // Ping/Pong are answered by the library; Binary is not part
            // of the JSON encoding and is ignored.
            Some(Ok(_)) => None,

            Some(Err(e)) => {
                warn!(error = %e, "transport error");
                Some(SessionExit::Closed)
            }

            None => {
                debug!("transport stream ended");
                Some(SessionExit::Closed)
            }
        }
    }

    /// Applies the session's requested side effects.
    ///
    /// Returns `true` when the transport must close.
    async fn apply(
        &mut self,
        actions: Vec<Action>,
        sink: &mut WsSink,
        heartbeat: &mut Heartbeat,
        identify_timer: &mut Option<Pin<Box<Sleep>>>,
    ) -> bool {
        for action in actions {
            match action {
                Action::StartHeartbeat(period) => heartbeat.start(period),
                Action::ScheduleIdentify(delay) => {
                    debug!(delay_ms = delay.as_millis() as u64, "identify scheduled");
                    *identify_timer = Some(Box::pin(sleep(delay)));
                }
                Action::SendHeartbeat => {
                    let frame = OutboundFrame::heartbeat(self.session.sequence());
                    send_frame(sink, &frame).await;
                }
                Action::AckHeartbeat => heartbeat.acknowledge(),
                Action::CloseTransport => {
                    let _ = sink.close().await;
                    return true;
                }
            }
        }
        false
    }

    /// Publishes the session's phase and identifiers to the handle.
    fn publish_status(&self) {
        let mut status = self.status.lock();
        status.phase = self.session.phase();
        status.session_id = self.session.session_id().map(str::to_owned);
        status.username = self.session.username().map(str::to_owned);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolves when the pending identify timer fires; pending forever when
/// no identify is scheduled.
async fn identify_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Sends one JSON text frame, best effort.
///
/// Sends while the transport is not open are dropped, not queued and not
/// surfaced as errors; callers tolerate lossy delivery during state
/// transitions.
async fn send_frame(sink: &mut WsSink, frame: &OutboundFrame) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            if let Err(e) = sink.send(Message::Text(json.into())).await {
                debug!(error = %e, "outbound frame dropped");
            }
        }
        Err(e) => warn!(error = %e, "failed to encode outbound frame"),
    }
}

// ============================================================================
// Tests
// ============================================================================
