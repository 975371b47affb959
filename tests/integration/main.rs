//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with virtual time;
//! no real hardware or sleeping required.

mod mock_hw;
mod poller_tests;
mod recording_tests;
mod service_tests;
