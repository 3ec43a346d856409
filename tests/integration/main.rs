//! Integration test entry point.
//!
//! One test binary; each area lives in its own module. Everything here runs
//! on the host against the mock device — no hardware involved.

mod light_cycle_tests;
mod mock_device;
