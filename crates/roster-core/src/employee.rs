//! Employee: the central record of the store.
//!
//! [`EmployeeRecord`] carries every field an administrator can edit.
//! [`Employee`] wraps a persisted record with the fields only the system
//! writes (primary key, password hash, login bookkeeping).
//!
//! Every save goes through [`EmployeeRecord::prepare_for_save`] followed by
//! [`EmployeeRecord::clean`]; the store resolves the default geography in
//! between because that needs a lookup.

use chrono::{DateTime, Local, NaiveDate, Utc};
use rand_core::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
  FieldError, ValidationErrors,
  color::{self, DEFAULT_COLOR},
  reference::{City, Status},
  text::friendly_capitalize,
};

// ─── Field limits ────────────────────────────────────────────────────────────

const MAX_NAME: usize = 150;
const MAX_MIDDLE_NAME: usize = 32;
const MAX_SIN: usize = 11;
const MAX_ADDRESS: usize = 128;
const MAX_POSTAL_CODE: usize = 7;
const MAX_PHONE: usize = 12;
const MAX_EMERGENCY_NAME: usize = 64;
const SALARY_MAX_DIGITS: u32 = 8;
const SALARY_DECIMAL_PLACES: u32 = 2;

/// Prefix Django-style hashers use for "this account cannot log in".
pub const UNUSABLE_PASSWORD_PREFIX: char = '!';

// ─── Record ──────────────────────────────────────────────────────────────────

/// The editable part of an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeRecord {
  // ── Personal ────────────────────────────────────────────────────────────
  /// Unique login identifier.
  pub email:         String,
  pub first_name:    String,
  pub middle_name:   Option<String>,
  pub last_name:     String,
  pub date_of_birth: Option<NaiveDate>,

  // ── Contact ─────────────────────────────────────────────────────────────
  pub phone_number:       Option<String>,
  pub extra_phone_number: Option<String>,
  pub address:            Option<String>,
  pub address2:           Option<String>,
  pub city_id:            i64,
  pub postal_code:        Option<String>,
  /// `None` until the first save backfills the default geography.
  pub geography_id:       Option<i64>,

  // ── Emergency contact ───────────────────────────────────────────────────
  pub emergency_contact_name:    Option<String>,
  pub emergency_relationship_id: Option<i64>,
  pub emergency_phone_number:    Option<String>,

  // ── Employment ──────────────────────────────────────────────────────────
  pub status_id:     i64,
  pub date_hired:    Option<NaiveDate>,
  pub date_released: Option<NaiveDate>,
  pub salary:        Option<Decimal>,
  /// Hours worked per week.
  pub weekly_hours:  u16,

  // ── Tax & identification ────────────────────────────────────────────────
  /// Plaintext SIN; kept only until every row has been migrated to `sin_e`.
  pub sin:   Option<String>,
  /// SIN encrypted at rest. Plaintext in memory; the store encrypts it.
  pub sin_e: Option<String>,

  // ── Security licenses ───────────────────────────────────────────────────
  pub iss_iat_id:                  Option<u32>,
  pub mss_id:                      Option<u32>,
  pub iss_security_license_number: Option<u32>,
  pub iat_security_license_number: Option<u32>,
  pub mss_security_license_number: Option<u32>,

  // ── System ──────────────────────────────────────────────────────────────
  pub is_staff:     bool,
  pub is_superuser: bool,
  /// Whether the account may log in. Unrelated to employment status.
  pub is_active:    bool,

  // ── Additional ──────────────────────────────────────────────────────────
  pub color: String,
  pub notes: Option<String>,
}

impl Default for EmployeeRecord {
  fn default() -> Self {
    Self {
      email: String::new(),
      first_name: String::new(),
      middle_name: None,
      last_name: String::new(),
      date_of_birth: None,
      phone_number: None,
      extra_phone_number: None,
      address: None,
      address2: None,
      city_id: City::HALIFAX_ID,
      postal_code: None,
      geography_id: None,
      emergency_contact_name: None,
      emergency_relationship_id: None,
      emergency_phone_number: None,
      status_id: Status::FULLTIME_ID,
      date_hired: Some(Local::now().date_naive()),
      date_released: None,
      salary: None,
      weekly_hours: 0,
      sin: None,
      sin_e: None,
      iss_iat_id: None,
      mss_id: None,
      iss_security_license_number: None,
      iat_security_license_number: None,
      mss_security_license_number: None,
      is_staff: false,
      is_superuser: false,
      is_active: true,
      color: DEFAULT_COLOR.to_owned(),
      notes: None,
    }
  }
}

impl EmployeeRecord {
  /// A record with the required fields set and everything else defaulted.
  pub fn new(
    email: impl Into<String>,
    first_name: impl Into<String>,
    last_name: impl Into<String>,
  ) -> Self {
    Self {
      email: email.into(),
      first_name: first_name.into(),
      last_name: last_name.into(),
      ..Self::default()
    }
  }

  /// Employed under a full-time, part-time or casual status.
  pub fn is_active_employee(&self) -> bool { Status::is_active_id(self.status_id) }

  /// `"<first>, <last>"`: the label used in lists.
  pub fn full_name(&self) -> String {
    format!("{}, {}", self.first_name, self.last_name)
  }

  // ── Save hook ───────────────────────────────────────────────────────────

  /// Mutations applied before every save, using the OS RNG for colours.
  pub fn prepare_for_save(&mut self) {
    self.prepare_for_save_with(&mut rand_core::OsRng);
  }

  /// Assigns a random light colour if the sentinel is still in place, and
  /// forces the inactive status onto anyone with a release date.
  pub fn prepare_for_save_with(&mut self, rng: &mut impl RngCore) {
    if self.color.eq_ignore_ascii_case(DEFAULT_COLOR) {
      self.color = color::random_light_with(rng);
    }
    if self.date_released.is_some() {
      self.status_id = Status::INACTIVE_ID;
    }
  }

  // ── Validation ──────────────────────────────────────────────────────────

  /// Check business rules and normalise free-text fields.
  ///
  /// Blank optional strings become `None` and the first address line is
  /// capitalised. Every violation is collected rather than stopping at the
  /// first.
  pub fn clean(&mut self) -> Result<(), ValidationErrors> {
    self.normalize();

    let mut errors = ValidationErrors::default();

    if self.is_active_employee() && self.date_released.is_some() {
      errors.push(FieldError::record("Active employees cannot have a release date."));
    }
    if !self.is_active_employee() && self.date_released.is_none() {
      errors.push(FieldError::record("Inactive employees must have a release date."));
    }

    if self.email.is_empty() {
      errors.push(FieldError::field("email", "This field is required."));
    } else if !looks_like_email(&self.email) {
      errors.push(FieldError::field("email", "Enter a valid email address."));
    }

    check_len(&mut errors, "first_name", Some(&self.first_name), MAX_NAME);
    check_len(&mut errors, "last_name", Some(&self.last_name), MAX_NAME);
    check_len(&mut errors, "middle_name", self.middle_name.as_deref(), MAX_MIDDLE_NAME);
    check_len(&mut errors, "sin", self.sin.as_deref(), MAX_SIN);
    check_len(&mut errors, "address", self.address.as_deref(), MAX_ADDRESS);
    check_len(&mut errors, "address2", self.address2.as_deref(), MAX_ADDRESS);
    check_len(&mut errors, "postal_code", self.postal_code.as_deref(), MAX_POSTAL_CODE);
    check_len(&mut errors, "phone_number", self.phone_number.as_deref(), MAX_PHONE);
    check_len(
      &mut errors,
      "extra_phone_number",
      self.extra_phone_number.as_deref(),
      MAX_PHONE,
    );
    check_len(
      &mut errors,
      "emergency_phone_number",
      self.emergency_phone_number.as_deref(),
      MAX_PHONE,
    );
    check_len(
      &mut errors,
      "emergency_contact_name",
      self.emergency_contact_name.as_deref(),
      MAX_EMERGENCY_NAME,
    );

    if !color::is_hex_color(&self.color) {
      errors.push(FieldError::field("color", "Enter six hexadecimal digits."));
    }

    if let Some(salary) = self.salary {
      if salary.is_sign_negative() {
        errors.push(FieldError::field("salary", "Salary cannot be negative."));
      }
      if !fits_decimal(salary, SALARY_MAX_DIGITS, SALARY_DECIMAL_PLACES) {
        errors.push(FieldError::field(
          "salary",
          format!(
            "Ensure there are no more than {SALARY_MAX_DIGITS} digits in total \
             and {SALARY_DECIMAL_PLACES} decimal places."
          ),
        ));
      }
    }

    errors.into_result()
  }

  fn normalize(&mut self) {
    self.email = self.email.trim().to_owned();
    for field in [
      &mut self.middle_name,
      &mut self.phone_number,
      &mut self.extra_phone_number,
      &mut self.address,
      &mut self.address2,
      &mut self.postal_code,
      &mut self.emergency_contact_name,
      &mut self.emergency_phone_number,
      &mut self.sin,
      &mut self.sin_e,
      &mut self.notes,
    ] {
      if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
        *field = None;
      }
    }
    self.address = self.address.as_deref().map(friendly_capitalize);
  }
}

fn check_len(
  errors: &mut ValidationErrors,
  field: &'static str,
  value: Option<&str>,
  max: usize,
) {
  if let Some(v) = value {
    let len = v.chars().count();
    if len > max {
      errors.push(FieldError::field(
        field,
        format!("Ensure this value has at most {max} characters (it has {len})."),
      ));
    }
  }
}

fn looks_like_email(value: &str) -> bool {
  match value.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
    }
    None => false,
  }
}

fn fits_decimal(value: Decimal, max_digits: u32, places: u32) -> bool {
  let normalized = value.normalize();
  if normalized.scale() > places {
    return false;
  }
  let integer_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len();
  integer_digits as u32 <= max_digits - places
}

// ─── Employee ────────────────────────────────────────────────────────────────

/// A persisted employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
  pub id:          i64,
  /// argon2 PHC string, or a value starting with `!` for accounts that
  /// cannot log in.
  pub password:    String,
  pub last_login:  Option<DateTime<Utc>>,
  pub date_joined: DateTime<Utc>,
  #[serde(flatten)]
  pub record:      EmployeeRecord,
}

impl Employee {
  pub fn has_usable_password(&self) -> bool {
    !self.password.is_empty() && !self.password.starts_with(UNUSABLE_PASSWORD_PREFIX)
  }

  /// ISS/IAT id for list display; blank when unset.
  pub fn admin_iss_iat_id(&self) -> String {
    self.record.iss_iat_id.map(|v| v.to_string()).unwrap_or_default()
  }

  /// MSS id for list display; blank when unset.
  pub fn admin_mss_id(&self) -> String {
    self.record.mss_id.map(|v| v.to_string()).unwrap_or_default()
  }

  /// `"<address>, <city>, <province abbreviation>"`.
  pub fn full_address(&self, city: &City) -> String {
    format!(
      "{}, {}, {}",
      self.record.address.as_deref().unwrap_or_default(),
      city.name,
      city.province.abbreviation,
    )
  }
}

impl std::fmt::Display for Employee {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.record.full_name())
  }
}

/// Next free values for the two sequential badge numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextIds {
  pub iss_iat_id: u32,
  pub mss_id:     u32,
}
