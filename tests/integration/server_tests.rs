//! Server integration: ingest → registry / pipeline → watchdog → sink.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moldwatch::app::ports::TimePort;
use moldwatch::config::ServerConfig;
use moldwatch::error::Error;
use moldwatch::server::Server;
use moldwatch::server::ingest::{InboundRequest, RequestKind};
use moldwatch::server::pipeline::PIPELINE_CAPACITY;
use moldwatch::server::registry::UpdateOutcome;
use moldwatch::server::watchdog;

use crate::mock_hw::{ManualClock, RecordingSink};

const KITCHEN: &[u8] = br#"{"message_type":"DATA","room_name":"Kitchen","temperature":21.5,"humidity":40.0}"#;
const DEN: &[u8] = br#"{"message_type":"DATA","room_name":"Den","temperature":19.0,"humidity":55.0}"#;

fn request<'a>(source: &'a str, payload: &'a [u8]) -> InboundRequest<'a> {
    InboundRequest {
        source,
        payload,
        kind: RequestKind::Confirmable,
    }
}

fn server(clock: &Arc<ManualClock>) -> Server {
    Server::new(ServerConfig::default(), clock.clone())
}

fn drain(server: &Server, sink: &mut RecordingSink) {
    while !server.pipeline().is_empty() {
        server.pipeline().forward_one(sink);
    }
}

#[test]
fn reports_are_forwarded_verbatim() {
    let clock = ManualClock::at(0);
    let s = server(&clock);
    let ingest = s.ingest();

    let out = ingest.handle(request("fd00::2", KITCHEN));
    assert_eq!(out.registry, UpdateOutcome::Registered);
    assert_eq!(out.room.as_str(), "Kitchen");

    let mut sink = RecordingSink::default();
    drain(&s, &mut sink);
    assert_eq!(sink.lines(), vec![String::from_utf8(KITCHEN.to_vec()).unwrap()]);
}

#[test]
fn relabelled_node_keeps_one_entry() {
    let clock = ManualClock::at(0);
    let s = server(&clock);
    let ingest = s.ingest();

    ingest.handle(request("fd00::1", KITCHEN));
    clock.advance(1_000);
    ingest.handle(request("fd00::1", DEN));

    let nodes = s.registry().snapshot();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].label.as_str(), "Den");
    assert_eq!(nodes[0].last_seen_ms, 1_000);
}

#[test]
fn silent_node_is_reported_once_then_reconnects() {
    let clock = ManualClock::at(0);
    let s = server(&clock);
    let ingest = s.ingest();
    let timeout = s.config().liveness_timeout_ms;
    let mut sink = RecordingSink::default();

    ingest.handle(request("fd00::1", KITCHEN));
    ingest.handle(request("fd00::2", DEN));
    drain(&s, &mut sink);

    // Den keeps talking, Kitchen goes quiet.
    for _ in 0..4 {
        clock.advance(5_000);
        ingest.handle(request("fd00::2", DEN));
        watchdog::sweep(s.registry(), s.pipeline(), clock.uptime_ms(), timeout);
    }
    drain(&s, &mut sink);

    let alerts: Vec<_> = sink
        .lines()
        .into_iter()
        .filter(|l| l.contains("node_lost"))
        .collect();
    assert_eq!(
        alerts,
        vec![r#"{"event":"node_lost","room":"Kitchen","ip":"fd00::1"}"#.to_string()]
    );
    assert_eq!(s.registry().online_count(), 1);

    let out = ingest.handle(request("fd00::1", KITCHEN));
    assert_eq!(out.registry, UpdateOutcome::Reconnected);
    assert_eq!(s.registry().online_count(), 2);
}

#[test]
fn flood_keeps_capacity_and_still_acks() {
    let clock = ManualClock::at(0);
    let s = server(&clock);
    let ingest = s.ingest();

    let outcomes: Vec<_> = (0..=PIPELINE_CAPACITY)
        .map(|_| ingest.handle(request("fd00::2", KITCHEN)))
        .collect();

    assert!(outcomes.iter().all(|o| o.ack));
    assert_eq!(outcomes.iter().filter(|o| !o.queued).count(), 1);
    assert_eq!(s.pipeline().len(), PIPELINE_CAPACITY);
    assert_eq!(s.pipeline().dropped(), 1);
}

#[test]
fn alerts_compete_with_data_for_capacity() {
    let clock = ManualClock::at(0);
    let s = server(&clock);
    let ingest = s.ingest();

    ingest.handle(request("fd00::1", KITCHEN));
    for _ in 1..PIPELINE_CAPACITY {
        ingest.handle(request("fd00::2", DEN));
    }
    clock.advance(20_000);
    let queued = watchdog::sweep(s.registry(), s.pipeline(), clock.uptime_ms(), 15_000);

    assert_eq!(queued, 0, "queue was already full");
    assert_eq!(s.pipeline().dropped(), 2, "both nodes lost, both alerts dropped");
    assert_eq!(s.registry().online_count(), 0);
}

#[test]
fn started_server_forwards_to_sink() {
    let clock = ManualClock::at(0);
    let s = server(&clock);
    let sink = RecordingSink::default();
    let _tasks = s.start(sink.clone()).unwrap();

    s.ingest().handle(request("fd00::2", DEN));

    let deadline = Instant::now() + Duration::from_secs(2);
    while sink.lines().is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(sink.lines().len(), 1);
    assert!(sink.lines()[0].contains("\"room_name\":\"Den\""));
}

#[test]
fn unusable_sweep_period_is_rejected_at_start() {
    let clock = ManualClock::at(0);
    for sweep in [0, 15_000, 20_000] {
        let config = ServerConfig {
            sweep_period_ms: sweep,
            liveness_timeout_ms: 15_000,
            ..ServerConfig::default()
        };
        let s = Server::new(config, clock.clone());
        let result = s.start(RecordingSink::default());
        assert!(matches!(result, Err(Error::Config(_))), "sweep {sweep}");
    }
}
