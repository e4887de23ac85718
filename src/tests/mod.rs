//! Scenario tests for svcwait.
//!
//! Runs the orchestrator end to end against local TCP and HTTP fixtures.


pub mod support;
