//! Test helpers shared by the integration tests

#![allow(dead_code)]

pub mod registry;

pub use registry::{FakeRegistry, days_ago, fixed_now, write_sbom};
