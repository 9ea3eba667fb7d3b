//! Integration test crate for the accrue workspace.
//!
//! This crate has no library code; it only contains integration tests
//! that exercise accumulator flows across the types, store and accum crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p accrue-integration-tests
//! ```
