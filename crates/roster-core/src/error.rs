//! Error types for `roster-core`.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationErrors),

  #[error("unable to parse date: {0:?}")]
  DateParse(String),

  #[error("unknown admin model: {0:?}")]
  UnknownModel(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Validation ──────────────────────────────────────────────────────────────

/// A single business-rule violation, optionally tied to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  /// `None` for record-wide errors (Django's "non-field errors").
  pub field:   Option<&'static str>,
  pub message: String,
}

impl FieldError {
  pub fn record(message: impl Into<String>) -> Self {
    Self { field: None, message: message.into() }
  }

  pub fn field(field: &'static str, message: impl Into<String>) -> Self {
    Self { field: Some(field), message: message.into() }
  }
}

/// All violations found while cleaning one record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Error)]
#[error("{}", render(.0))]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn push(&mut self, error: FieldError) { self.0.push(error); }

  /// `Ok(())` when nothing was collected.
  pub fn into_result(self) -> Result<(), Self> {
    if self.0.is_empty() { Ok(()) } else { Err(self) }
  }

  pub fn messages(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(|e| e.message.as_str())
  }
}

fn render(errors: &[FieldError]) -> String {
  errors
    .iter()
    .map(|e| match e.field {
      Some(f) => format!("{f}: {}", e.message),
      None => e.message.clone(),
    })
    .collect::<Vec<_>>()
    .join("; ")
}

/// Outcome of a save that may be rejected by business rules without that
/// being a storage failure.
pub type Validated<T> = std::result::Result<T, ValidationErrors>;
