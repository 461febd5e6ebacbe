//! Integration test crate for the usage collector.
//!
//! This crate exists solely to run tests that span the configuration and
//! pipeline crates. It has no public API - all functionality is in the test
//! modules.

#![forbid(unsafe_code)]
