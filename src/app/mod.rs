//! Application boundary: port traits and the report records that cross them.
//!
//! Everything the domain needs from the outside world (sensor channels, the
//! mesh transport, output sinks, clocks, config storage) is expressed as a
//! trait in [`ports`], keeping the core testable without real peripherals.

pub mod ports;
pub mod report;
