//! SQLite backend for the capability map projections.
//!
//! One [`SqliteStore`] serves both the facts the propagators read and the
//! three effective views they maintain. All database access goes through
//! [`tokio_rusqlite`] so it runs off the async runtime.

#![allow(async_fn_in_trait)]

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
