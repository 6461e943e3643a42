//! Sensor-node integration: diagnostics → flags → readers → reports.

use std::sync::Arc;
use std::time::Duration;

use moldwatch::app::report::{MessageKind, ReportBody};
use moldwatch::config::NodeConfig;
use moldwatch::error::{DriverError, Error};
use moldwatch::health::HealthStatus;
use moldwatch::mold::RiskLevel;
use moldwatch::scheduler::SensorNode;
use moldwatch::sensors::{SensorBus, SharedSensorState};

use crate::mock_hw::{MockSensor, RecordingTransport, SensorHandle, Sent, mock_sensor};

struct Rig {
    node: SensorNode<MockSensor, RecordingTransport>,
    a: SensorHandle,
    b: SensorHandle,
    sent: Sent,
}

fn rig_with(config: NodeConfig, a: (f32, f32), b: (f32, f32)) -> Rig {
    let (sensor_a, a) = mock_sensor(a.0, a.1);
    let (sensor_b, b) = mock_sensor(b.0, b.1);
    let (transport, sent) = RecordingTransport::new();
    let node = SensorNode::new(config, SensorBus::new(sensor_a, sensor_b), transport);
    Rig { node, a, b, sent }
}

/// One model hour per MoldUpdate cycle.
fn hourly() -> NodeConfig {
    NodeConfig {
        mold_period_ms: 3_600_000,
        ..NodeConfig::default()
    }
}

fn rig(a: (f32, f32), b: (f32, f32)) -> Rig {
    rig_with(hourly(), a, b)
}

// ── Health task ───────────────────────────────────────────────

#[test]
fn readers_see_nothing_before_first_health_cycle() {
    let r = rig((21.0, 40.0), (21.0, 41.0));
    assert_eq!(r.node.sensor_state(), SharedSensorState::default());
    assert!(r.node.run_telemetry_cycle().is_none());
    assert_eq!(r.sent.len(), 0, "skipped cycle must not report");
    assert_eq!(r.a.reads() + r.b.reads(), 0);
}

#[test]
fn healthy_channels_are_enabled_and_reported_as_data() {
    let r = rig((21.0, 40.0), (21.0, 41.0));
    let d = r.node.run_health_cycle();

    assert_eq!(d.status, [HealthStatus::Ok; 2]);
    assert_eq!(
        r.node.sensor_state(),
        SharedSensorState {
            channel_a_enabled: true,
            channel_b_enabled: true
        }
    );
    let report = r.sent.last().unwrap();
    assert_eq!(report.kind, MessageKind::Data);
    assert_eq!(report.room_name.as_str(), "Office Room");
}

#[test]
fn power_fault_disables_one_channel_and_alerts() {
    let r = rig((21.0, 40.0), (21.0, 41.0));
    r.b.fail_read(DriverError::Power);

    let d = r.node.run_health_cycle();
    assert_eq!(d.status, [HealthStatus::Ok, HealthStatus::PowerFault]);
    assert_eq!(r.sent.last().unwrap().kind, MessageKind::Alert);

    let reads_b = r.b.reads();
    let sample = r.node.run_telemetry_cycle().unwrap();
    assert_eq!(sample.temperature, 21.0);
    assert_eq!(r.b.reads(), reads_b, "disabled channel must not be read");
}

#[test]
fn drift_keeps_both_channels_and_stays_data() {
    let r = rig((20.0, 50.0), (20.0, 70.0));
    let d = r.node.run_health_cycle();
    assert_eq!(d.status, [HealthStatus::ValueDrift; 2]);
    assert_eq!(d.enabled(), [true, true]);
    assert_eq!(r.sent.last().unwrap().kind, MessageKind::Data);
}

#[test]
fn recovery_re_enables_channel() {
    let r = rig((21.0, 40.0), (21.0, 41.0));
    r.a.fail_detect(DriverError::Bus);
    r.node.run_health_cycle();
    assert!(!r.node.sensor_state().channel_a_enabled);

    r.a.set(21.0, 40.0);
    r.node.run_health_cycle();
    assert!(r.node.sensor_state().channel_a_enabled);
}

// ── Telemetry task ────────────────────────────────────────────

#[test]
fn telemetry_averages_both_channels() {
    let r = rig((20.0, 40.0), (22.0, 44.0));
    r.node.run_health_cycle();
    let s = r.node.run_telemetry_cycle().unwrap();
    assert!((s.temperature - 21.0).abs() < 1e-6);
    assert!((s.humidity - 42.0).abs() < 1e-6);

    let report = r.sent.last().unwrap();
    assert_eq!(report.kind, MessageKind::Data);
    assert!(matches!(report.body, ReportBody::Telemetry(_)));
}

#[test]
fn both_channels_down_skips_readers_without_touching_model() {
    let r = rig((24.0, 95.0), (24.0, 95.0));
    r.a.fail_detect(DriverError::Bus);
    r.b.fail_detect(DriverError::NotReady);
    r.node.run_health_cycle();
    let after_health = r.sent.len();

    assert!(r.node.run_telemetry_cycle().is_none());
    assert!(r.node.run_mold_cycle().is_none());
    assert_eq!(r.sent.len(), after_health);
    assert_eq!(r.node.model().mold_index(), 0.0);
    assert_eq!(r.node.model().time_wet_hours(), 0.0);
}

#[test]
fn busy_transport_does_not_stop_the_cycle() {
    let (sensor_a, _a) = mock_sensor(21.0, 40.0);
    let (sensor_b, _b) = mock_sensor(21.0, 40.0);
    let (mut transport, sent) = RecordingTransport::new();
    transport.busy = true;
    let node = SensorNode::new(hourly(), SensorBus::new(sensor_a, sensor_b), transport);

    node.run_health_cycle();
    assert!(node.run_telemetry_cycle().is_some());
    assert_eq!(sent.len(), 0);
}

// ── MoldUpdate task ───────────────────────────────────────────

#[test]
fn wet_spell_then_long_dry_spell() {
    let r = rig((24.0, 95.0), (0.0, 0.0));
    r.b.fail_detect(DriverError::Bus);
    r.node.run_health_cycle();

    let mut previous = 0.0;
    for _ in 0..5 {
        r.node.run_mold_cycle().unwrap();
        let m = r.node.model();
        assert!(m.is_growing());
        assert!(m.mold_index() > previous);
        previous = m.mold_index();
        assert_eq!(r.sent.last().unwrap().kind, MessageKind::Alert);
    }

    r.a.set(24.0, 40.0);
    let mut at_24h = 0.0;
    for hour in 1..=30 {
        r.node.run_mold_cycle().unwrap();
        let m = r.node.model();
        assert!(!m.is_growing(), "hour {hour} of the dry spell");
        if hour == 24 {
            at_24h = m.mold_index();
        }
    }
    let m = r.node.model();
    assert!(m.mold_index() < at_24h);
    assert!(m.mold_index() < previous);
    assert_eq!(m.risk_level(), RiskLevel::Clean);
    assert_eq!(r.sent.last().unwrap().kind, MessageKind::Data);
}

#[test]
fn mold_report_carries_model_state() {
    let r = rig((24.0, 95.0), (24.0, 95.0));
    r.node.run_health_cycle();
    r.node.run_mold_cycle();

    match r.sent.last().unwrap().body {
        ReportBody::Mold {
            mold_index,
            risk,
            growing,
            sample,
        } => {
            assert!(mold_index > 0.0);
            assert_eq!(risk, RiskLevel::Clean);
            assert!(growing);
            assert_eq!(sample.humidity, 95.0);
        }
        ref other => panic!("expected mold report, got {other:?}"),
    }
}

// ── Threads ───────────────────────────────────────────────────

#[test]
fn started_tasks_run_health_first_and_stop_cleanly() {
    let config = NodeConfig {
        health_period_ms: 100,
        telemetry_period_ms: 150,
        mold_period_ms: 200,
        settle_delay_ms: 0,
        stagger_ms: 60,
        ..NodeConfig::default()
    };
    let r = rig_with(config, (21.0, 40.0), (21.0, 41.0));
    let sent = r.sent.clone();
    let node = Arc::new(r.node);

    let handles = node.start().unwrap();
    std::thread::sleep(Duration::from_millis(700));
    node.stop();
    for h in handles {
        h.join().unwrap();
    }

    let all = sent.all();
    assert!(all.len() >= 5, "got {} reports", all.len());
    assert!(matches!(all[0].body, ReportBody::Health { .. }));
    assert!(all.iter().any(|r| matches!(r.body, ReportBody::Telemetry(_))));
    assert!(all.iter().any(|r| matches!(r.body, ReportBody::Mold { .. })));
}

#[test]
fn tied_or_zero_periods_are_rejected_at_start() {
    let tied = NodeConfig {
        health_period_ms: 200,
        telemetry_period_ms: 200,
        ..NodeConfig::default()
    };
    let node = Arc::new(rig_with(tied, (21.0, 40.0), (21.0, 41.0)).node);
    assert!(matches!(node.start(), Err(Error::Config(_))));
    assert!(node.is_running());

    let zero = NodeConfig {
        health_period_ms: 0,
        ..NodeConfig::default()
    };
    let node = Arc::new(rig_with(zero, (21.0, 40.0), (21.0, 41.0)).node);
    assert!(matches!(node.start(), Err(Error::Config(_))));
}
