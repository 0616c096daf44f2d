//! Domain types, business rules and the storage trait for Roster.
//!
//! Nothing here talks to HTTP or SQLite; `roster-store-sqlite`,
//! `roster-admin` and the `roster` binary all build on these types.

pub mod admin;
pub mod color;
pub mod employee;
pub mod error;
pub mod import;
pub mod reference;
pub mod store;
pub mod text;

pub use error::{Error, FieldError, Result, Validated, ValidationErrors};
