//! In-memory transport for tests.
//!
//! Each successful `open` hands the test a [`MockPeer`] that plays the
//! gateway: it injects inbound frames and observes outbound ones.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};

use super::connection::ConnectionCommand;
use super::{Connection, Transport, TransportEvent, TransportEvents};

pub(crate) struct MockTransport {
    peers_tx: mpsc::UnboundedSender<MockPeer>,
    opens: AtomicUsize,
    failures: AtomicUsize,
    panics: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            peers_tx,
            opens: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            panics: AtomicBool::new(false),
        });
        (transport, peers_rx)
    }

    /// Makes the next `count` calls to `open` fail.
    pub(crate) fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Makes the next call to `open` panic.
    pub(crate) fn panic_next(&self) {
        self.panics.store(true, Ordering::SeqCst);
    }

    /// Number of `open` calls so far, failed ones included.
    pub(crate) fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, _endpoint: &Url) -> Result<(Connection, TransportEvents)> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if self.panics.swap(false, Ordering::SeqCst) {
            panic!("transport exploded");
        }

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::connection("connection refused"));
        }

        let (connection, commands) = Connection::channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let _ = events.send(TransportEvent::Open);
        let _ = self.peers_tx.send(MockPeer { events, commands });

        Ok((connection, events_rx))
    }
}

pub(crate) struct MockPeer {
    events: mpsc::UnboundedSender<TransportEvent>,
    commands: mpsc::UnboundedReceiver<ConnectionCommand>,
}

impl MockPeer {
    pub(crate) fn push(&self, frame: Value) {
        self.push_text(frame.to_string());
    }

    pub(crate) fn push_text(&self, text: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Message(text.into()));
    }

    pub(crate) fn close(&self, code: u16, reason: &str) {
        let _ = self.events.send(TransportEvent::Close {
            code: Some(code),
            reason: reason.to_string(),
        });
    }

    /// Next command the connector queued, `None` once every handle is gone.
    pub(crate) async fn next_command(&mut self) -> Option<ConnectionCommand> {
        self.commands.recv().await
    }

    /// Next outbound frame, skipping shutdown requests.
    pub(crate) async fn next_frame(&mut self) -> Option<Value> {
        loop {
            match self.commands.recv().await? {
                ConnectionCommand::Send(text) => {
                    return Some(serde_json::from_str(&text).expect("outbound frame is JSON"));
                }
                ConnectionCommand::Shutdown => continue,
            }
        }
    }

    /// Next outbound frame that is not a heartbeat.
    pub(crate) async fn next_non_heartbeat(&mut self) -> Option<Value> {
        loop {
            let frame = self.next_frame().await?;
            if frame["op"] != 1 {
                return Some(frame);
            }
        }
    }

    /// Next outbound heartbeat frame.
    pub(crate) async fn next_heartbeat(&mut self) -> Option<Value> {
        loop {
            let frame = self.next_frame().await?;
            if frame["op"] == 1 {
                return Some(frame);
            }
        }
    }
}
