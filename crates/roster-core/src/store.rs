//! The `RosterStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `roster-store-sqlite`).
//! Higher layers (`roster-admin`, `roster-cli`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Validated,
  employee::{Employee, EmployeeRecord, NextIds},
  import::{ImportedEmployee, UpsertOutcome},
  reference::{City, Geography, NewCity, NewGeography, NewProvince, Province, Relationship, Status},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`RosterStore::list_employees`]. Every filter is optional
/// and they combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeQuery {
  /// Substring match over the employee admin's search fields.
  pub text:         Option<String>,
  /// `true`: status in the active set; `false`: anything else.
  pub active:       Option<bool>,
  pub status_id:    Option<i64>,
  pub geography_id: Option<i64>,
  pub is_staff:     Option<bool>,
  pub is_superuser: Option<bool>,
  pub hired_after:  Option<NaiveDate>,
  pub hired_before: Option<NaiveDate>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

/// Parameters for the reference-data listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceQuery {
  /// Substring match over the model's search fields.
  pub text:        Option<String>,
  /// Cities only: restrict to one province.
  pub province_id: Option<i64>,
}

// ─── SIN migration types ─────────────────────────────────────────────────────

/// Snapshot printed before a SIN migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinStatistics {
  pub total:             u64,
  pub sin_null:          u64,
  pub sin_empty:         u64,
  pub sin_populated:     u64,
  pub already_encrypted: u64,
}

/// A row eligible for migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinCandidate {
  pub id:        i64,
  pub sin:       String,
  /// Whether `sin_e` already holds a non-empty value. The stored value is
  /// never decrypted here, so a row sealed under another key still pages.
  pub encrypted: bool,
}

impl SinCandidate {
  pub fn is_encrypted(&self) -> bool { self.encrypted }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Roster store backend.
///
/// Every employee write runs the save hook and validation; a rejected record
/// comes back as the inner `Err` of a [`Validated`] so callers can tell
/// business-rule failures apart from storage failures.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RosterStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reference data ────────────────────────────────────────────────────

  fn list_provinces(
    &self,
    query: ReferenceQuery,
  ) -> impl Future<Output = Result<Vec<Province>, Self::Error>> + Send + '_;

  /// Duplicate names (and abbreviations) come back as validation errors,
  /// as do duplicates in the other lookup tables.
  fn add_province(
    &self,
    input: NewProvince,
  ) -> impl Future<Output = Result<Validated<Province>, Self::Error>> + Send + '_;

  fn list_cities(
    &self,
    query: ReferenceQuery,
  ) -> impl Future<Output = Result<Vec<City>, Self::Error>> + Send + '_;

  fn get_city(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<City>, Self::Error>> + Send + '_;

  fn add_city(
    &self,
    input: NewCity,
  ) -> impl Future<Output = Result<Validated<City>, Self::Error>> + Send + '_;

  fn list_relationships(
    &self,
    query: ReferenceQuery,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  fn add_relationship(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Validated<Relationship>, Self::Error>> + Send + '_;

  fn list_statuses(
    &self,
    query: ReferenceQuery,
  ) -> impl Future<Output = Result<Vec<Status>, Self::Error>> + Send + '_;

  fn add_status(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Validated<Status>, Self::Error>> + Send + '_;

  fn list_geographies(
    &self,
    query: ReferenceQuery,
  ) -> impl Future<Output = Result<Vec<Geography>, Self::Error>> + Send + '_;

  fn add_geography(
    &self,
    input: NewGeography,
  ) -> impl Future<Output = Result<Validated<Geography>, Self::Error>> + Send + '_;

  // ── Employees ─────────────────────────────────────────────────────────

  /// Insert a new employee with an unusable password.
  fn create_employee(
    &self,
    record: EmployeeRecord,
  ) -> impl Future<Output = Result<Validated<Employee>, Self::Error>> + Send + '_;

  /// Replace every editable field of an existing employee.
  fn update_employee(
    &self,
    id: i64,
    record: EmployeeRecord,
  ) -> impl Future<Output = Result<Validated<Employee>, Self::Error>> + Send + '_;

  fn get_employee(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Employee>, Self::Error>> + Send + '_;

  fn find_employee_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Employee>, Self::Error>> + Send + 'a;

  /// Employees matching `query`, most recently hired first.
  fn list_employees<'a>(
    &'a self,
    query: &'a EmployeeQuery,
  ) -> impl Future<Output = Result<Vec<Employee>, Self::Error>> + Send + 'a;

  /// Store a password hash (already hashed by the caller).
  fn set_password(
    &self,
    id: i64,
    password_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Stamp `last_login` with the current time.
  fn record_login(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// One more than the highest ISS/IAT and MSS ids in use.
  fn next_ids(&self) -> impl Future<Output = Result<NextIds, Self::Error>> + Send + '_;

  // ── Batch jobs ────────────────────────────────────────────────────────

  /// Create-or-update each row by email inside a single transaction.
  ///
  /// Rows rejected by validation are reported and skipped; any storage
  /// failure rolls back the whole batch and is returned as `Err`.
  fn upsert_employees(
    &self,
    rows: Vec<ImportedEmployee>,
  ) -> impl Future<Output = Result<Vec<UpsertOutcome>, Self::Error>> + Send + '_;

  fn sin_statistics(&self) -> impl Future<Output = Result<SinStatistics, Self::Error>> + Send + '_;

  /// Number of rows [`Self::sin_candidates`] would page through.
  fn count_sin_candidates(
    &self,
    force: bool,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Next page of migration candidates with `id > after_id`, ordered by id.
  ///
  /// With `force` every row with a non-empty plaintext SIN qualifies;
  /// otherwise only rows whose encrypted SIN is null or empty.
  fn sin_candidates(
    &self,
    force: bool,
    after_id: i64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SinCandidate>, Self::Error>> + Send + '_;

  /// Encrypt and store `sin` as the employee's `sin_e` in its own
  /// transaction.
  fn store_encrypted_sin(
    &self,
    id: i64,
    sin: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
