//! Heartbeat scheduler.
//!
//! One task per connection sends `{op: 1, d: <sequence>}` at the interval
//! announced by Hello. The task holds a [`WeakConnection`], so it ends on
//! its own once the connection is released.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, trace, warn};

use crate::protocol::GatewayCommand;
use crate::transport::WeakConnection;

// ============================================================================
// Sequence
// ============================================================================

/// Last dispatch sequence number seen on a connection.
#[derive(Debug, Default)]
pub struct Sequence(Mutex<Option<u64>>);

impl Sequence {
    /// Creates an empty cell.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last observed sequence number.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<u64> {
        *self.0.lock()
    }

    /// Records a frame's sequence number. Frames without one are ignored.
    #[inline]
    pub fn observe(&self, sequence: Option<u64>) {
        if let Some(sequence) = sequence {
            *self.0.lock() = Some(sequence);
        }
    }

    /// Builds a heartbeat carrying the current sequence number.
    #[inline]
    #[must_use]
    pub fn heartbeat(&self) -> GatewayCommand {
        GatewayCommand::Heartbeat {
            sequence: self.get(),
        }
    }
}

// ============================================================================
// Heartbeat
// ============================================================================

/// Handle to a running heartbeat task.
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawns a heartbeat task.
    ///
    /// The first heartbeat is sent immediately. The task ends when stopped,
    /// when `running` is cleared, or when the connection is released.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero. Hello frames with a zero interval are
    /// rejected during decoding.
    #[must_use]
    pub fn start(
        connection: WeakConnection,
        interval: Duration,
        sequence: Arc<Sequence>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let (cancel, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(run(connection, interval, sequence, running, cancel_rx));

        debug!(?interval, "Heartbeat started");

        Self {
            interval,
            cancel: Some(cancel),
            handle,
        }
    }

    /// Returns the interval between heartbeats.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Signals the task to stop. Idempotent.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    /// Stops the task and waits up to `timeout` for it to exit.
    ///
    /// The task is aborted if it does not exit in time.
    pub async fn shutdown(mut self, timeout: Duration) {
        self.stop();

        let abort = self.handle.abort_handle();
        if time::timeout(timeout, &mut self.handle).await.is_err() {
            warn!("Heartbeat did not stop in time, aborting");
            abort.abort();
        }
    }

    /// Returns `true` once the task has exited.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Task
// ============================================================================

async fn run(
    connection: WeakConnection,
    interval: Duration,
    sequence: Arc<Sequence>,
    running: Arc<AtomicBool>,
    mut cancel: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut cancel => break,
            _ = ticker.tick() => {}
        }

        if !running.load(Ordering::SeqCst) {
            break;
        }

        let Some(connection) = connection.upgrade() else {
            debug!("Connection released, heartbeat exiting");
            break;
        };

        let command = sequence.heartbeat();
        match connection.send(&command) {
            Ok(()) => trace!(sequence = ?sequence.get(), "Heartbeat sent"),
            Err(e) => error!(error = %e, "Failed to send heartbeat"),
        }
    }

    debug!("Heartbeat stopped");
}

// ============================================================================
// Tests
// ============================================================================
