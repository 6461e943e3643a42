//! Server node: liveness tracking and console forwarding.
//!
//! ```text
//!  radio ──▶ Ingest ──┬──▶ NodeRegistry ◀── Watchdog (sweep)
//!                     │                        │
//!                     ▼                        ▼
//!                MessagePipeline ◀─────────────┘
//!                     │
//!                     ▼
//!                 Consumer ──▶ OutputSink
//! ```

pub mod ingest;
pub mod pipeline;
pub mod registry;
pub mod watchdog;

use std::sync::Arc;
use std::thread::JoinHandle;

use crate::app::ports::{OutputSink, TimePort};
use crate::config::ServerConfig;
use crate::drivers::task_pin::{self, Core, TaskSpec};
use crate::error::{Error, Result};

use ingest::Ingest;
use pipeline::MessagePipeline;
use registry::NodeRegistry;

const CONSUMER_PRIORITY: u8 = 5;

pub struct Server {
    config: ServerConfig,
    registry: Arc<NodeRegistry>,
    pipeline: Arc<MessagePipeline>,
    clock: Arc<dyn TimePort>,
}

impl Server {
    pub fn new(config: ServerConfig, clock: Arc<dyn TimePort>) -> Self {
        Self {
            config,
            registry: Arc::new(NodeRegistry::new()),
            pipeline: Arc::new(MessagePipeline::new()),
            clock,
        }
    }

    /// Producer handle for the transport's request handler.
    pub fn ingest(&self) -> Ingest {
        Ingest::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.clock),
        )
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn pipeline(&self) -> &Arc<MessagePipeline> {
        &self.pipeline
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Spawn the watchdog and the console consumer.  Both run forever.
    pub fn start<S>(&self, mut sink: S) -> Result<[JoinHandle<()>; 2]>
    where
        S: OutputSink + 'static,
    {
        let (sweep, timeout) = (self.config.sweep_period_ms, self.config.liveness_timeout_ms);
        if sweep == 0 || sweep >= timeout {
            return Err(Error::Config("sweep period must be > 0 and below the liveness timeout"));
        }

        let watchdog = watchdog::spawn(
            &self.config,
            Arc::clone(&self.registry),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.clock),
        )?;

        let pipeline = Arc::clone(&self.pipeline);
        let spec = TaskSpec {
            name: "console\0",
            core: Core::App,
            priority: CONSUMER_PRIORITY,
            stack_kb: 4,
        };
        let consumer = task_pin::spawn(spec, move || pipeline.run_consumer(&mut sink))?;

        Ok([watchdog, consumer])
    }
}
