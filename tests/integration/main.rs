//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one side of the system
//! against mock adapters.  All tests run on the host with no real hardware.

mod mock_hw;
mod node_tests;
mod server_tests;
