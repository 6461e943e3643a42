//! Mock adapters for integration tests.
//!
//! Sensors are scripted through a shared handle so a test can change a
//! channel's behaviour after the driver has been moved into a node.  The
//! transport and sink record everything they are given.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use moldwatch::app::ports::{Delivery, DeliveryCallback, OutputSink, SensorDriver, TimePort, Transport};
use moldwatch::app::report::Report;
use moldwatch::error::{DriverError, TransportError};
use moldwatch::sensors::RawSample;

// ── Scripted sensor ───────────────────────────────────────────

#[derive(Debug)]
struct Script {
    detect: Result<(), DriverError>,
    read: Result<RawSample, DriverError>,
    reads: u32,
}

pub struct MockSensor {
    script: Arc<Mutex<Script>>,
}

/// Test-side control of a [`MockSensor`].
#[derive(Clone)]
pub struct SensorHandle {
    script: Arc<Mutex<Script>>,
}

pub fn mock_sensor(temperature: f32, humidity: f32) -> (MockSensor, SensorHandle) {
    let script = Arc::new(Mutex::new(Script {
        detect: Ok(()),
        read: Ok(RawSample::new(temperature, humidity)),
        reads: 0,
    }));
    (
        MockSensor {
            script: Arc::clone(&script),
        },
        SensorHandle { script },
    )
}

impl SensorHandle {
    pub fn set(&self, temperature: f32, humidity: f32) {
        let mut s = self.script.lock().unwrap();
        s.detect = Ok(());
        s.read = Ok(RawSample::new(temperature, humidity));
    }

    pub fn fail_detect(&self, e: DriverError) {
        self.script.lock().unwrap().detect = Err(e);
    }

    pub fn fail_read(&self, e: DriverError) {
        self.script.lock().unwrap().read = Err(e);
    }

    /// Number of `read` calls so far (detection excluded).
    pub fn reads(&self) -> u32 {
        self.script.lock().unwrap().reads
    }
}

impl SensorDriver for MockSensor {
    fn detect(&mut self) -> Result<(), DriverError> {
        self.script.lock().unwrap().detect
    }

    fn read(&mut self) -> Result<RawSample, DriverError> {
        let mut s = self.script.lock().unwrap();
        s.reads += 1;
        s.read
    }
}

// ── Recording transport ───────────────────────────────────────

#[derive(Clone, Default)]
pub struct Sent(Arc<Mutex<Vec<Report>>>);

impl Sent {
    pub fn all(&self) -> Vec<Report> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Report> {
        self.0.lock().unwrap().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Accepts every report and confirms delivery immediately, unless busy.
pub struct RecordingTransport {
    pub sent: Sent,
    pub busy: bool,
}

impl RecordingTransport {
    pub fn new() -> (Self, Sent) {
        let sent = Sent::default();
        (
            Self {
                sent: sent.clone(),
                busy: false,
            },
            sent,
        )
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, report: &Report, on_delivery: DeliveryCallback) -> Result<(), TransportError> {
        if self.busy {
            return Err(TransportError::Busy);
        }
        self.sent.0.lock().unwrap().push(report.clone());
        on_delivery(Delivery::Confirmed);
        Ok(())
    }
}

// ── Recording sink ────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl OutputSink for RecordingSink {
    fn write_line(&mut self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}

// ── Manual clock ──────────────────────────────────────────────

#[derive(Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn at(ms: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(ms)))
    }

    pub fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimePort for ManualClock {
    fn uptime_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
