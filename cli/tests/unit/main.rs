//! Unit tests for the ec2-k3s CLI
//!
//! These tests use the library directly and run fast without external I/O.

mod architecture;
mod property_tests;
mod state_and_config;
