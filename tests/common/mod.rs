// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Common test utilities and fixtures shared across all test targets
//!
//! Provides in-memory fakes for the control plane interfaces and builders for
//! database topologies.
//!
//! # Usage
//!
//! Include this module in your test file:
//! ```rust,ignore
//! #[path = "../common/mod.rs"]
//! mod common;
//! use common::*;
//! ```


pub use fakes::*;
pub use fixtures::*;
