//! Fuzz target: server ingest path
//!
//! Feeds arbitrary bytes through `Ingest::handle` from a rotating set of
//! source addresses and asserts that it never panics, always acknowledges
//! confirmable requests, and never lets the registry or pipeline grow past
//! their fixed capacities.
//!
//! cargo fuzz run fuzz_ingest

#![no_main]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use libfuzzer_sys::fuzz_target;
use moldwatch::app::ports::TimePort;
use moldwatch::server::ingest::{InboundRequest, Ingest, RequestKind, extract_room_name};
use moldwatch::server::pipeline::{MessagePipeline, PIPELINE_CAPACITY};
use moldwatch::server::registry::{NodeRegistry, REGISTRY_CAPACITY};

struct Clock(AtomicU64);

impl TimePort for Clock {
    fn uptime_ms(&self) -> u64 {
        self.0.fetch_add(250, Ordering::Relaxed)
    }
}

fuzz_target!(|data: &[u8]| {
    let room = extract_room_name(&String::from_utf8_lossy(data));
    assert!(!room.is_empty(), "room label must never be empty");

    let registry = Arc::new(NodeRegistry::new());
    let pipeline = Arc::new(MessagePipeline::new());
    let ingest = Ingest::new(registry.clone(), pipeline.clone(), Arc::new(Clock(AtomicU64::new(0))));

    // Split on NUL so one input drives several requests.
    for (i, chunk) in data.split(|b| *b == 0).enumerate() {
        let source = format!("fd00::{:x}", chunk.first().copied().unwrap_or(0) as usize + i);
        let out = ingest.handle(InboundRequest {
            source: &source,
            payload: chunk,
            kind: RequestKind::Confirmable,
        });
        assert!(out.ack, "confirmable requests are always acknowledged");
    }

    assert!(registry.len() <= REGISTRY_CAPACITY);
    assert!(pipeline.len() <= PIPELINE_CAPACITY);

    let _ = registry.check_timeout(u64::MAX, 15_000);
    assert_eq!(registry.online_count(), 0);
});
