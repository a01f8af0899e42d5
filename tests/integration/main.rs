//! Integration test driver for the `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the orchestrator
//! against mock or simulated adapters.  All tests run on the host with
//! no radio required.

mod mock_ports;
mod orchestrator_tests;
mod provisioning_flow_tests;
