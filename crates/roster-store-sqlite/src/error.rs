//! Error type for `roster-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  /// A stored value could not be turned back into its domain type.
  #[error("decode error: {0}")]
  Decode(String),

  #[error("cipher error: {0}")]
  Cipher(String),

  #[error("employee not found: {0}")]
  EmployeeNotFound(i64),

  #[error("province not found: {0}")]
  ProvinceNotFound(i64),

  /// The geography every employee falls back to has not been seeded.
  #[error("default geography {0:?} does not exist")]
  DefaultGeographyMissing(&'static str),
}

impl From<tokio_rusqlite::Error> for Error {
  /// Errors raised inside a connection closure travel as
  /// `tokio_rusqlite::Error::Other`; unwrap ours back out.
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
        Ok(ours) => *ours,
        Err(other) => Error::Database(tokio_rusqlite::Error::Other(other)),
      },
      other => Error::Database(other),
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self { Error::Database(err.into()) }
}

impl Error {
  /// Box `self` for returning from inside a `Connection::call` closure.
  pub(crate) fn into_call(self) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(self))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
