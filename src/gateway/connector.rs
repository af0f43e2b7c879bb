//! Reconnecting gateway connector.
//!
//! [`Connector`] owns the running flag and one supervisor task. The
//! supervisor opens a transport, drives a fresh [`Session`] over it, and
//! after any close or failure waits the fixed reconnect delay before trying
//! again, until [`Connector::stop`] is called.
//!
//! # Example
//!
//! ```no_run
//! use discord_voice_connector::{Connector, ConnectorConfig};
//!
//! # async fn example() -> discord_voice_connector::Result<()> {
//! let config = ConnectorConfig::from_env()?;
//! let connector = Connector::new(config);
//!
//! connector.start();
//! tokio::signal::ctrl_c().await?;
//! connector.stop().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::protocol::GatewayEvent;
use crate::transport::{Connection, Transport, TransportEvent, WebSocketTransport};

use super::heartbeat::{Heartbeat, Sequence};
use super::session::{Session, SessionAction, SessionState};

// ============================================================================
// Connector
// ============================================================================

/// Keeps one account connected to the gateway and joined to a voice channel.
///
/// Dropping the connector aborts its background task without waiting; call
/// [`stop`](Self::stop) for an orderly shutdown.
pub struct Connector {
    inner: Arc<ConnectorInner>,
}

struct ConnectorInner {
    config: ConnectorConfig,
    transport: Arc<dyn Transport>,
    running: Arc<AtomicBool>,
    shutdown: Notify,
    active: Mutex<Option<Connection>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    state_tx: watch::Sender<SessionState>,
    finished_tx: watch::Sender<bool>,
    generation: AtomicU64,
    attempts: AtomicU64,
    id: Uuid,
}

impl Connector {
    /// Creates a connector using the WebSocket transport.
    #[must_use]
    pub fn new(config: ConnectorConfig) -> Self {
        Self::with_transport(config, Arc::new(WebSocketTransport::new()))
    }

    /// Creates a connector over any transport.
    #[must_use]
    pub fn with_transport(config: ConnectorConfig, transport: Arc<dyn Transport>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Closed);
        let (finished_tx, _) = watch::channel(true);

        Self {
            inner: Arc::new(ConnectorInner {
                config,
                transport,
                running: Arc::new(AtomicBool::new(false)),
                shutdown: Notify::new(),
                active: Mutex::new(None),
                supervisor: Mutex::new(None),
                state_tx,
                finished_tx,
                generation: AtomicU64::new(0),
                attempts: AtomicU64::new(0),
                id: Uuid::new_v4(),
            }),
        }
    }

    /// Starts the supervisor task. No-op while already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            debug!("Connector already running");
            return;
        }

        let span = info_span!(
            "connector",
            account = %self.inner.config.token().tag(),
            id = %self.inner.id,
        );
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.finished_tx.send_replace(false);
        let handle = tokio::spawn(
            Arc::clone(&self.inner)
                .supervise(generation)
                .instrument(span),
        );

        if let Some(previous) = self.inner.supervisor.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stops the connector and waits for its background task.
    ///
    /// Closes the active connection and waits up to the configured stop
    /// timeout, aborting the task if it does not exit in time. No connection
    /// attempt begins after this returns. Idempotent.
    pub async fn stop(&self) {
        let was_running = self.inner.running.swap(false, Ordering::SeqCst);
        self.inner.shutdown.notify_waiters();

        let active = self.inner.active.lock().clone();
        if let Some(connection) = active {
            connection.shutdown();
        }

        let handle = self.inner.supervisor.lock().take();
        let Some(mut handle) = handle else {
            debug!(was_running, "Connector not running");
            return;
        };

        let abort = handle.abort_handle();
        match time::timeout(self.inner.config.stop_timeout(), &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Connector task failed"),
            Err(_) => {
                warn!(
                    timeout = ?self.inner.config.stop_timeout(),
                    "Connector task did not stop in time, aborting"
                );
                abort.abort();
            }
        }

        self.inner.set_state(SessionState::Closed);
    }

    /// Returns the current session state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribes to session state changes. Starts at `Closed`.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Resolves once the background task has exited.
    ///
    /// Resolves immediately when the connector is not started. While running
    /// the task only exits through [`stop`](Self::stop), an abort, or a
    /// panic; the last two also clear the running flag.
    pub async fn closed(&self) {
        let mut finished = self.inner.finished_tx.subscribe();
        let _ = finished.wait_for(|finished| *finished).await;
    }

    /// Returns `true` between `start()` and `stop()`.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Returns the connector's instance id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConnectorConfig {
        &self.inner.config
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.shutdown.notify_waiters();
        if let Some(handle) = self.inner.supervisor.lock().take() {
            handle.abort();
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

impl ConnectorInner {
    #[inline]
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = %current, to = %state, "Session state changed");
            *current = state;
            true
        });
    }

    async fn supervise(self: Arc<Self>, generation: u64) {
        let _exit = SupervisorExit {
            inner: &self,
            generation,
        };
        info!(endpoint = %self.config.endpoint(), "Connector started");

        while self.is_running() {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

            match self.run_session(attempt).await {
                Ok(()) => debug!(attempt, "Session ended"),
                Err(e) if e.is_recoverable() => warn!(attempt, error = %e, "Connection lost"),
                Err(e) => error!(attempt, error = %e, "Session failed"),
            }
            self.set_state(SessionState::Closed);

            if !self.wait_before_reconnect().await {
                break;
            }
        }

        info!("Connector stopped");
    }

    /// Sleeps the reconnect delay. Returns `false` if stopped meanwhile.
    async fn wait_before_reconnect(&self) -> bool {
        let notified = self.shutdown.notified();
        if !self.is_running() {
            return false;
        }

        let delay = self.config.reconnect_delay();
        info!(delay_secs = delay.as_secs(), "Reconnecting after delay");

        tokio::select! {
            () = notified => false,
            () = time::sleep(delay) => self.is_running(),
        }
    }

    /// Runs one connection from open to close.
    async fn run_session(&self, attempt: u64) -> Result<()> {
        let notified = self.shutdown.notified();
        tokio::pin!(notified);
        if !self.is_running() {
            return Ok(());
        }

        self.set_state(SessionState::Connecting);
        info!(attempt, "Connecting to gateway");

        let opened = tokio::select! {
            () = &mut notified => return Ok(()),
            opened = self.transport.open(self.config.endpoint()) => opened,
        };
        let (connection, mut events) = opened?;

        *self.active.lock() = Some(connection.clone());
        if !self.is_running() {
            self.release(&connection);
            return Ok(());
        }

        let sequence = Arc::new(Sequence::new());
        let mut session = Session::new(self.config.identify(), self.config.voice_state_update());
        let mut heartbeat: Option<Heartbeat> = None;

        let outcome = loop {
            let event = tokio::select! {
                biased;
                () = &mut notified => None,
                event = events.recv() => Some(event),
            };
            let Some(event) = event else {
                debug!("Stop requested, closing connection");
                break Ok(());
            };

            match event {
                Some(TransportEvent::Open) => {
                    let actions = session.on_open();
                    self.apply(actions, &connection, &sequence, &mut heartbeat);
                }
                Some(TransportEvent::Message(text)) => match GatewayEvent::decode(&text) {
                    Ok(event) => {
                        sequence.observe(event.sequence());
                        let actions = session.handle(event);
                        self.apply(actions, &connection, &sequence, &mut heartbeat);
                    }
                    Err(e) => warn!(error = %e, "Discarding malformed frame"),
                },
                Some(TransportEvent::Close { code, reason }) => {
                    info!(?code, %reason, "Gateway closed the connection");
                    break Ok(());
                }
                Some(TransportEvent::Error(e)) => break Err(e),
                None => break Err(Error::ConnectionClosed),
            }

            self.set_state(session.state());
        };

        session.close();
        if let Some(heartbeat) = heartbeat.take() {
            heartbeat.shutdown(self.config.stop_timeout()).await;
        }
        self.release(&connection);

        outcome
    }

    /// Applies a session transition's actions to the connection.
    fn apply(
        &self,
        actions: Vec<SessionAction>,
        connection: &Connection,
        sequence: &Arc<Sequence>,
        heartbeat: &mut Option<Heartbeat>,
    ) {
        for action in actions {
            match action {
                SessionAction::Send(command) => {
                    if let Err(e) = connection.send(&command) {
                        warn!(command = command.name(), error = %e, "Failed to send command");
                    }
                }
                SessionAction::StartHeartbeat(interval) => {
                    if let Some(mut previous) = heartbeat.take() {
                        previous.stop();
                    }
                    *heartbeat = Some(Heartbeat::start(
                        connection.downgrade(),
                        interval,
                        Arc::clone(sequence),
                        Arc::clone(&self.running),
                    ));
                }
                SessionAction::SendHeartbeat => {
                    if let Err(e) = connection.send(&sequence.heartbeat()) {
                        warn!(error = %e, "Failed to send requested heartbeat");
                    }
                }
            }
        }
    }

    /// Closes the connection and clears the active slot.
    fn release(&self, connection: &Connection) {
        connection.shutdown();
        self.active.lock().take();
    }
}

// ============================================================================
// SupervisorExit
// ============================================================================

/// Publishes the supervisor's exit, however it happens.
struct SupervisorExit<'a> {
    inner: &'a ConnectorInner,
    generation: u64,
}

impl Drop for SupervisorExit<'_> {
    fn drop(&mut self) {
        // A newer start() owns the flags now.
        if self.inner.generation.load(Ordering::SeqCst) != self.generation {
            return;
        }

        if std::thread::panicking() {
            error!("Connector task panicked");
        }
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.set_state(SessionState::Closed);
        self.inner.finished_tx.send_replace(true);
    }
}

// ============================================================================
// Tests
// ============================================================================
