//! In-process mesh transport for simulation and tests.
//!
//! Nodes hand encoded reports to a shared [`LoopbackLink`]; a radio thread
//! drains the link and delivers each frame to the server's [`Ingest`] as a
//! confirmable request.  The sender learns the outcome through its
//! delivery callback: ack → `Confirmed`, no ack → `Failed`.
//!
//! ```text
//! SensorNode ─▶ LoopbackTransport::send ─▶ Channel ─▶ radio thread ─▶ Ingest::handle
//!     ▲                                                    │
//!     └──────────────── DeliveryCallback ◀─────────────────┘
//! ```
//!
//! Taking the link down makes the radio lose every frame, which is how the
//! liveness watchdog is exercised without real hardware.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};

use crate::app::ports::{Delivery, DeliveryCallback, Transport};
use crate::app::report::Report;
use crate::config::bounded;
use crate::drivers::task_pin::{self, Core, TaskSpec};
use crate::error::{Result, TransportError};
use crate::server::ingest::{InboundRequest, Ingest, RequestKind};
use crate::server::pipeline::Payload;
use crate::server::registry::Address;

/// Frames in flight before senders see `Busy`.
pub const LINK_DEPTH: usize = 8;

const RADIO_PRIORITY: u8 = 9;

struct Frame {
    source: Address,
    payload: Payload,
    on_delivery: DeliveryCallback,
}

/// Shared medium between every node endpoint and the server radio.
pub struct LoopbackLink {
    channel: Channel<CriticalSectionRawMutex, Frame, LINK_DEPTH>,
    up: AtomicBool,
    delivered: AtomicU32,
    lost: AtomicU32,
}

impl Default for LoopbackLink {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackLink {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            up: AtomicBool::new(true),
            delivered: AtomicU32::new(0),
            lost: AtomicU32::new(0),
        }
    }

    /// Node-side transport bound to `source`.
    pub fn endpoint(self: &Arc<Self>, source: &str) -> LoopbackTransport {
        LoopbackTransport {
            source: bounded(source),
            link: Arc::clone(self),
        }
    }

    /// Simulate radio loss (`false`) or recovery (`true`).
    pub fn set_up(&self, up: bool) {
        info!("LOOPBACK | link {}", if up { "up" } else { "down" });
        self.up.store(up, Ordering::Release);
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    /// Frames handed to the server and acknowledged.
    pub fn delivered(&self) -> u32 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Frames lost in the air or left unacknowledged.
    pub fn lost(&self) -> u32 {
        self.lost.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> usize {
        self.channel.len()
    }

    /// Wait for one frame and deliver it.
    pub fn pump_one(&self, ingest: &Ingest) {
        let frame = futures_lite::future::block_on(self.channel.receive());
        self.deliver(frame, ingest);
    }

    /// Deliver every queued frame without waiting.  Returns the count.
    pub fn drain(&self, ingest: &Ingest) -> usize {
        let mut n = 0;
        while let Ok(frame) = self.channel.try_receive() {
            self.deliver(frame, ingest);
            n += 1;
        }
        n
    }

    fn deliver(&self, frame: Frame, ingest: &Ingest) {
        let outcome = if self.is_up() {
            let result = ingest.handle(InboundRequest {
                source: &frame.source,
                payload: frame.payload.as_bytes(),
                kind: RequestKind::Confirmable,
            });
            if result.ack {
                Delivery::Confirmed
            } else {
                Delivery::Failed
            }
        } else {
            debug!("LOOPBACK | frame from {} lost", frame.source);
            Delivery::Failed
        };

        match outcome {
            Delivery::Confirmed => self.delivered.fetch_add(1, Ordering::Relaxed),
            Delivery::Failed => self.lost.fetch_add(1, Ordering::Relaxed),
        };
        (frame.on_delivery)(outcome);
    }

    /// Spawn the server-side radio task.  Runs forever.
    pub fn spawn_radio(self: &Arc<Self>, ingest: Ingest) -> Result<JoinHandle<()>> {
        let link = Arc::clone(self);
        let spec = TaskSpec {
            name: "radio\0",
            core: Core::Pro,
            priority: RADIO_PRIORITY,
            stack_kb: 8,
        };
        task_pin::spawn(spec, move || {
            info!("LOOPBACK | radio listening on '{}'", crate::server::ingest::RESOURCE_PATH);
            loop {
                link.pump_one(&ingest);
            }
        })
    }
}

/// Node-side handle: encodes reports and queues them on the link.
pub struct LoopbackTransport {
    source: Address,
    link: Arc<LoopbackLink>,
}

impl Transport for LoopbackTransport {
    fn send(
        &mut self,
        report: &Report,
        on_delivery: DeliveryCallback,
    ) -> core::result::Result<(), TransportError> {
        let json = report.to_json()?;
        let mut payload = Payload::new();
        payload.push_str(&json).map_err(|()| {
            warn!("LOOPBACK | report of {} bytes exceeds frame", json.len());
            TransportError::Encode
        })?;

        self.link
            .channel
            .try_send(Frame {
                source: self.source.clone(),
                payload,
                on_delivery,
            })
            .map_err(|_| {
                warn!("LOOPBACK | link busy, report from {} not queued", self.source);
                TransportError::Busy
            })
    }
}
