//! Liveness watchdog.
//!
//! Sweeps the registry every `sweep_period_ms` and injects one
//! `node_lost` alert per newly silent node into the pipeline, through the
//! same non-blocking enqueue as network traffic.  Detection latency is
//! bounded by `liveness_timeout_ms + sweep_period_ms`.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{info, warn};

use crate::app::ports::TimePort;
use crate::config::ServerConfig;
use crate::drivers::task_pin::{self, Core, TaskSpec};
use crate::error::Result;

use super::pipeline::{MessagePipeline, OutgoingMessage};
use super::registry::NodeRegistry;

const WATCHDOG_PRIORITY: u8 = 6;

/// One sweep.  Returns the number of alerts actually queued.
pub fn sweep(
    registry: &NodeRegistry,
    pipeline: &MessagePipeline,
    now_ms: u64,
    timeout_ms: u64,
) -> usize {
    let mut queued = 0;
    for node in registry.check_timeout(now_ms, timeout_ms) {
        if pipeline.try_enqueue(OutgoingMessage::node_lost(&node)) {
            info!("WATCHDOG | timeout alert queued for {}", node.label);
            queued += 1;
        } else {
            warn!("WATCHDOG | alert for {} dropped, queue full", node.label);
        }
    }
    queued
}

/// Spawn the periodic sweep task.
pub fn spawn(
    config: &ServerConfig,
    registry: Arc<NodeRegistry>,
    pipeline: Arc<MessagePipeline>,
    clock: Arc<dyn TimePort>,
) -> Result<JoinHandle<()>> {
    let period = Duration::from_millis(config.sweep_period_ms);
    let timeout_ms = config.liveness_timeout_ms;
    let spec = TaskSpec {
        name: "watchdog\0",
        core: Core::App,
        priority: WATCHDOG_PRIORITY,
        stack_kb: 4,
    };
    task_pin::spawn(spec, move || {
        info!(
            "WATCHDOG | sweeping every {:?}, timeout {} ms",
            period, timeout_ms
        );
        loop {
            std::thread::sleep(period);
            sweep(&registry, &pipeline, clock.uptime_ms(), timeout_ms);
        }
    })
}
