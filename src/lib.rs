//! Moldwatch firmware core.
//!
//! Sensor nodes read two redundant temperature/humidity channels, diagnose
//! their health, run the VTT mold-growth model and report over the mesh to
//! a server node that tracks liveness and forwards traffic to the operator
//! console.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; the host build runs
//! the same logic against simulated sensors and an in-process transport.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod health;
pub mod mold;
pub mod scheduler;
pub mod sensors;
pub mod server;
