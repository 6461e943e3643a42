//! Platform helpers shared by the node and server tasks.

pub mod task_pin;
