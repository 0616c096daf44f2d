//! SQLite backend for the Roster employee store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod cipher;
mod encode;
mod schema;
mod store;

pub mod error;

pub use cipher::SinCipher;
pub use error::{Error, Result};
pub use store::SqliteStore;
