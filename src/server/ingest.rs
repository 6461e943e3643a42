//! Network ingestion boundary.
//!
//! Handles one inbound `storedata` request: pulls the room label out of the
//! payload, refreshes the sender in the registry, queues the payload for the
//! console and decides whether an acknowledgment is owed.  Payload format
//! knowledge stops here; the registry only ever sees a typed [`Label`].

use std::sync::Arc;

use log::{debug, warn};
use serde::Deserialize;

use crate::app::ports::TimePort;
use crate::config::bounded;

use super::pipeline::{MessagePipeline, OutgoingMessage};
use super::registry::{Label, NodeRegistry, UpdateOutcome};

/// Resource path the sensor nodes post to.
pub const RESOURCE_PATH: &str = "storedata";

/// Label used when the payload carries no usable room name.
pub const UNKNOWN_ROOM: &str = "Unknown";

/// Request type as seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Sender expects an acknowledgment.
    Confirmable,
    NonConfirmable,
}

/// One inbound request.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub source: &'a str,
    pub payload: &'a [u8],
    pub kind: RequestKind,
}

/// Result of handling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub room: Label,
    pub registry: UpdateOutcome,
    pub queued: bool,
    /// An acknowledgment must be sent back.
    pub ack: bool,
}

/// Producer side of the server: registry refresh plus non-blocking enqueue.
#[derive(Clone)]
pub struct Ingest {
    registry: Arc<NodeRegistry>,
    pipeline: Arc<MessagePipeline>,
    clock: Arc<dyn TimePort>,
}

impl Ingest {
    pub fn new(
        registry: Arc<NodeRegistry>,
        pipeline: Arc<MessagePipeline>,
        clock: Arc<dyn TimePort>,
    ) -> Self {
        Self {
            registry,
            pipeline,
            clock,
        }
    }

    /// Never blocks and never fails.  The ack decision depends only on the
    /// request type, not on whether the message was queued.
    pub fn handle(&self, req: InboundRequest<'_>) -> IngestOutcome {
        let payload = String::from_utf8_lossy(req.payload);
        let room = extract_room_name(&payload);
        debug!("INGEST | {} bytes from {} ({})", req.payload.len(), req.source, room);

        let registry = self
            .registry
            .update(req.source, &room, self.clock.uptime_ms());
        let queued = self
            .pipeline
            .try_enqueue(OutgoingMessage::new(&payload, req.source));
        if !queued {
            warn!("INGEST | dropped packet from {}", req.source);
        }

        IngestOutcome {
            room,
            registry,
            queued,
            ack: req.kind == RequestKind::Confirmable,
        }
    }
}

#[derive(Deserialize)]
struct RoomField {
    room_name: Option<String>,
}

/// Best-effort room label.
///
/// Tries a structured decode first; payloads that are not valid JSON (for
/// example truncated ones) fall back to scanning for `"room_name"`.  Absent,
/// empty or malformed values yield [`UNKNOWN_ROOM`].
pub fn extract_room_name(payload: &str) -> Label {
    let found = match serde_json::from_str::<RoomField>(payload) {
        Ok(field) => field.room_name,
        Err(_) => scan_room_name(payload).map(str::to_owned),
    };
    match found {
        Some(name) if !name.is_empty() => bounded(&name),
        _ => bounded(UNKNOWN_ROOM),
    }
}

/// `"room_name"` ws* `:` ws* `"` value `"`.  Escapes are not interpreted.
fn scan_room_name(payload: &str) -> Option<&str> {
    const KEY: &str = "\"room_name\"";
    let start = payload.find(KEY)? + KEY.len();
    let rest = payload[start..].trim_start();
    let rest = rest.strip_prefix(':')?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}
