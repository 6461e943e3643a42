//! Prioritised thread spawning.
//!
//! On ESP-IDF, `std::thread` is a thin wrapper over FreeRTOS tasks and
//! `esp_pthread_set_cfg()` sets the affinity, priority and stack size of the
//! *next* `pthread_create()` from the calling thread.  The config→spawn pair
//! therefore must not interleave with other spawns on the same thread.
//!
//! On the host there is no priority control; the requested priority is only
//! logged so the rate-monotonic assignment stays visible in simulation runs.

use std::thread::JoinHandle;

use crate::error::{Error, Result};

/// CPU core identifiers for the ESP32 dual-core parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): radio and network stacks.
    Pro = 0,
    /// Core 1 (APP_CPU): sensing and modelling.
    App = 1,
}

/// Spawn parameters for one periodic task.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    /// NUL-terminated (e.g. `"health\0"`).
    pub name: &'static str,
    pub core: Core,
    /// FreeRTOS priority; larger preempts smaller.
    pub priority: u8,
    pub stack_kb: usize,
}

impl TaskSpec {
    fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

#[cfg(target_os = "espidf")]
pub fn spawn(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> Result<JoinHandle<()>> {
    // SAFETY: the config struct lives on this stack frame for the duration of
    // the call and `name` is a NUL-terminated 'static string.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = i32::from(spec.priority);
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        cfg.thread_name = spec.name.as_ptr() as *const _;
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        log::error!("esp_pthread_set_cfg failed for '{}': {}", spec.display_name(), ret);
        return Err(Error::Init("pthread config rejected"));
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
        .map_err(|_| Error::Init("thread creation failed"))
}

/// Simulation fallback: plain thread, priority logged only.
#[cfg(not(target_os = "espidf"))]
pub fn spawn(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> Result<JoinHandle<()>> {
    log::info!(
        "Spawning '{}' (sim, pri={} not enforced, stack={}KB)",
        spec.display_name(),
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
        .map_err(|_| Error::Init("thread creation failed"))
}
