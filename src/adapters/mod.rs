//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements   | Connects to                        |
//! |---------------|--------------|------------------------------------|
//! | `config_file` | ConfigPort   | JSON document on the filesystem    |
//! | `log_sink`    | OutputSink   | stdout (UART on the device)         |
//! | `loopback`    | Transport    | In-process radio → server ingest   |
//! | `time`        | TimePort     | ESP32 system timer / `Instant`     |
//!
//! Sensor drivers live under [`crate::sensors`].

pub mod config_file;
pub mod log_sink;
pub mod loopback;
pub mod time;
