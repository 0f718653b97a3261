//! Core types and trait definitions for the capability map projections.
//!
//! This crate is deliberately free of database and runtime dependencies. The
//! propagation engine (`capmap-projectors`) and the storage backends
//! (`capmap-store-sqlite`) both depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod capability;
pub mod domain;
pub mod error;
pub mod event;
pub mod importance;
pub mod realization;
pub mod store;

pub use error::{Error, Result};
