//! Bounded message pipeline between ingestion and the console.
//!
//! ```text
//! ┌───────────┐  try_enqueue  ┌──────────────────┐  receive  ┌──────────┐
//! │  Ingest   │──────────────▶│ Channel (cap 10) │──────────▶│ Consumer │──▶ OutputSink
//! │  Watchdog │──────────────▶│                  │           │ (thread) │
//! └───────────┘   never waits └──────────────────┘  waits    └──────────┘
//! ```
//!
//! Producers never block: a full queue drops the message and bumps a
//! counter.  Alerts and data compete for the same capacity.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};
use serde::Serialize;

use crate::app::ports::OutputSink;
use crate::config::bounded;

use super::registry::{Address, LostNode};

/// Queue depth.
pub const PIPELINE_CAPACITY: usize = 10;

/// Payload text, ≤ 255 bytes.
pub type Payload = heapless::String<255>;

/// One queued message.  Owned by the queue until dequeued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub payload: Payload,
    pub source: Address,
}

impl OutgoingMessage {
    pub fn new(payload: &str, source: &str) -> Self {
        Self {
            payload: bounded(payload),
            source: bounded(source),
        }
    }

    /// Liveness alert for a node the watchdog declared lost.
    pub fn node_lost(node: &LostNode) -> Self {
        let alert = NodeLostAlert {
            event: "node_lost",
            room: &node.label,
            ip: &node.address,
        };
        let payload = serde_json::to_string(&alert).unwrap_or_default();
        Self::new(&payload, &node.address)
    }
}

#[derive(Serialize)]
struct NodeLostAlert<'a> {
    event: &'static str,
    room: &'a str,
    ip: &'a str,
}

pub struct MessagePipeline {
    channel: Channel<CriticalSectionRawMutex, OutgoingMessage, PIPELINE_CAPACITY>,
    dropped: AtomicU32,
}

impl Default for MessagePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagePipeline {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Non-blocking push.  Returns `false` (and logs) when the queue is full.
    pub fn try_enqueue(&self, msg: OutgoingMessage) -> bool {
        match self.channel.try_send(msg) {
            Ok(()) => true,
            Err(embassy_sync::channel::TrySendError::Full(msg)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "PIPELINE | queue full, dropping message from {} ({} dropped so far)",
                    msg.source, total
                );
                false
            }
        }
    }

    /// Wait for the next message.
    pub async fn next(&self) -> OutgoingMessage {
        self.channel.receive().await
    }

    pub fn try_next(&self) -> Option<OutgoingMessage> {
        self.channel.try_receive().ok()
    }

    /// Block until one message is available, then hand it to `sink`.
    pub fn forward_one<S: OutputSink + ?Sized>(&self, sink: &mut S) {
        let msg = futures_lite::future::block_on(self.next());
        debug!("PIPELINE | forwarding {} bytes from {}", msg.payload.len(), msg.source);
        sink.write_line(&msg.payload);
    }

    /// Consumer task body.  Never returns.
    pub fn run_consumer<S: OutputSink + ?Sized>(&self, sink: &mut S) -> ! {
        info!("PIPELINE | consumer started");
        loop {
            self.forward_one(sink);
        }
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Messages dropped since start.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
