//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, salaries
//! are decimal strings, and the encrypted SIN is sealed by [`SinCipher`].

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use roster_core::employee::{Employee, EmployeeRecord};
use rusqlite::{Row, types::Value};
use rust_decimal::Decimal;

use crate::{Error, Result, SinCipher};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

// ─── Numbers ─────────────────────────────────────────────────────────────────

fn decode_decimal(s: &str) -> Result<Decimal> {
  Decimal::from_str(s).map_err(|e| Error::Decode(format!("decimal {s:?}: {e}")))
}

fn decode_u32(column: &str, v: i64) -> Result<u32> {
  u32::try_from(v).map_err(|_| Error::Decode(format!("{column} out of range: {v}")))
}

// ─── Employee columns ────────────────────────────────────────────────────────

/// Columns selected for a full employee row, in [`RawEmployee`] order.
pub const EMPLOYEE_COLUMNS: &str = "
  id, password, last_login, date_joined,
  email, first_name, middle_name, last_name, date_of_birth,
  sin, sin_e, date_hired, date_released,
  address, address2, city_id, postal_code, phone_number, extra_phone_number,
  status_id, emergency_phone_number, emergency_contact_name, emergency_relationship_id,
  iss_iat_id, mss_id, salary,
  iss_security_license_number, iat_security_license_number, mss_security_license_number,
  notes, color, weekly_hours, geography_id, is_staff, is_superuser, is_active";

/// Columns written from an [`EmployeeRecord`], in [`encode_record`] order.
pub const RECORD_COLUMNS: [&str; 32] = [
  "email",
  "first_name",
  "middle_name",
  "last_name",
  "date_of_birth",
  "sin",
  "sin_e",
  "date_hired",
  "date_released",
  "address",
  "address2",
  "city_id",
  "postal_code",
  "phone_number",
  "extra_phone_number",
  "status_id",
  "emergency_phone_number",
  "emergency_contact_name",
  "emergency_relationship_id",
  "iss_iat_id",
  "mss_id",
  "salary",
  "iss_security_license_number",
  "iat_security_license_number",
  "mss_security_license_number",
  "notes",
  "color",
  "weekly_hours",
  "geography_id",
  "is_staff",
  "is_superuser",
  "is_active",
];

/// Bind values for [`RECORD_COLUMNS`]. `geography_id` must already be
/// resolved; the SIN is encrypted here.
pub fn encode_record(record: &EmployeeRecord, cipher: &SinCipher) -> Result<Vec<Value>> {
  let sin_e = record.sin_e.as_deref().map(|v| cipher.encrypt(v)).transpose()?;

  Ok(vec![
    record.email.clone().into(),
    record.first_name.clone().into(),
    record.middle_name.clone().into(),
    record.last_name.clone().into(),
    record.date_of_birth.map(encode_date).into(),
    record.sin.clone().into(),
    sin_e.into(),
    record.date_hired.map(encode_date).into(),
    record.date_released.map(encode_date).into(),
    record.address.clone().into(),
    record.address2.clone().into(),
    record.city_id.into(),
    record.postal_code.clone().into(),
    record.phone_number.clone().into(),
    record.extra_phone_number.clone().into(),
    record.status_id.into(),
    record.emergency_phone_number.clone().into(),
    record.emergency_contact_name.clone().into(),
    record.emergency_relationship_id.into(),
    record.iss_iat_id.into(),
    record.mss_id.into(),
    record.salary.map(|s| s.to_string()).into(),
    record.iss_security_license_number.into(),
    record.iat_security_license_number.into(),
    record.mss_security_license_number.into(),
    record.notes.clone().into(),
    record.color.clone().into(),
    record.weekly_hours.into(),
    record.geography_id.into(),
    record.is_staff.into(),
    record.is_superuser.into(),
    record.is_active.into(),
  ])
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `employees` row.
pub struct RawEmployee {
  pub id:                          i64,
  pub password:                    String,
  pub last_login:                  Option<String>,
  pub date_joined:                 String,
  pub email:                       String,
  pub first_name:                  String,
  pub middle_name:                 Option<String>,
  pub last_name:                   String,
  pub date_of_birth:               Option<String>,
  pub sin:                         Option<String>,
  pub sin_e:                       Option<String>,
  pub date_hired:                  Option<String>,
  pub date_released:               Option<String>,
  pub address:                     Option<String>,
  pub address2:                    Option<String>,
  pub city_id:                     i64,
  pub postal_code:                 Option<String>,
  pub phone_number:                Option<String>,
  pub extra_phone_number:          Option<String>,
  pub status_id:                   i64,
  pub emergency_phone_number:      Option<String>,
  pub emergency_contact_name:      Option<String>,
  pub emergency_relationship_id:   Option<i64>,
  pub iss_iat_id:                  Option<i64>,
  pub mss_id:                      Option<i64>,
  pub salary:                      Option<String>,
  pub iss_security_license_number: Option<i64>,
  pub iat_security_license_number: Option<i64>,
  pub mss_security_license_number: Option<i64>,
  pub notes:                       Option<String>,
  pub color:                       String,
  pub weekly_hours:                i64,
  pub geography_id:                i64,
  pub is_staff:                    bool,
  pub is_superuser:                bool,
  pub is_active:                   bool,
}

impl RawEmployee {
  /// Read a row selected with [`EMPLOYEE_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                          row.get(0)?,
      password:                    row.get(1)?,
      last_login:                  row.get(2)?,
      date_joined:                 row.get(3)?,
      email:                       row.get(4)?,
      first_name:                  row.get(5)?,
      middle_name:                 row.get(6)?,
      last_name:                   row.get(7)?,
      date_of_birth:               row.get(8)?,
      sin:                         row.get(9)?,
      sin_e:                       row.get(10)?,
      date_hired:                  row.get(11)?,
      date_released:               row.get(12)?,
      address:                     row.get(13)?,
      address2:                    row.get(14)?,
      city_id:                     row.get(15)?,
      postal_code:                 row.get(16)?,
      phone_number:                row.get(17)?,
      extra_phone_number:          row.get(18)?,
      status_id:                   row.get(19)?,
      emergency_phone_number:      row.get(20)?,
      emergency_contact_name:      row.get(21)?,
      emergency_relationship_id:   row.get(22)?,
      iss_iat_id:                  row.get(23)?,
      mss_id:                      row.get(24)?,
      salary:                      row.get(25)?,
      iss_security_license_number: row.get(26)?,
      iat_security_license_number: row.get(27)?,
      mss_security_license_number: row.get(28)?,
      notes:                       row.get(29)?,
      color:                       row.get(30)?,
      weekly_hours:                row.get(31)?,
      geography_id:                row.get(32)?,
      is_staff:                    row.get(33)?,
      is_superuser:                row.get(34)?,
      is_active:                   row.get(35)?,
    })
  }

  pub fn into_employee(self, cipher: &SinCipher) -> Result<Employee> {
    let date = |s: Option<String>| s.as_deref().map(decode_date).transpose();
    let number = |column: &str, v: Option<i64>| v.map(|v| decode_u32(column, v)).transpose();

    let record = EmployeeRecord {
      email:                       self.email,
      first_name:                  self.first_name,
      middle_name:                 self.middle_name,
      last_name:                   self.last_name,
      date_of_birth:               date(self.date_of_birth)?,
      phone_number:                self.phone_number,
      extra_phone_number:          self.extra_phone_number,
      address:                     self.address,
      address2:                    self.address2,
      city_id:                     self.city_id,
      postal_code:                 self.postal_code,
      geography_id:                Some(self.geography_id),
      emergency_contact_name:      self.emergency_contact_name,
      emergency_relationship_id:   self.emergency_relationship_id,
      emergency_phone_number:      self.emergency_phone_number,
      status_id:                   self.status_id,
      date_hired:                  date(self.date_hired)?,
      date_released:               date(self.date_released)?,
      salary:                      self.salary.as_deref().map(decode_decimal).transpose()?,
      weekly_hours:                u16::try_from(self.weekly_hours).map_err(|_| {
        Error::Decode(format!("weekly_hours out of range: {}", self.weekly_hours))
      })?,
      sin:                         self.sin,
      sin_e:                       decode_sin_e(self.sin_e.as_deref(), cipher)?,
      iss_iat_id:                  number("iss_iat_id", self.iss_iat_id)?,
      mss_id:                      number("mss_id", self.mss_id)?,
      iss_security_license_number: number(
        "iss_security_license_number",
        self.iss_security_license_number,
      )?,
      iat_security_license_number: number(
        "iat_security_license_number",
        self.iat_security_license_number,
      )?,
      mss_security_license_number: number(
        "mss_security_license_number",
        self.mss_security_license_number,
      )?,
      is_staff:                    self.is_staff,
      is_superuser:                self.is_superuser,
      is_active:                   self.is_active,
      color:                       self.color,
      notes:                       self.notes,
    };

    Ok(Employee {
      id:          self.id,
      password:    self.password,
      last_login:  self.last_login.as_deref().map(decode_dt).transpose()?,
      date_joined: decode_dt(&self.date_joined)?,
      record,
    })
  }
}

/// Empty strings are left as-is: they count as "not yet encrypted".
pub fn decode_sin_e(stored: Option<&str>, cipher: &SinCipher) -> Result<Option<String>> {
  match stored {
    None => Ok(None),
    Some("") => Ok(Some(String::new())),
    Some(v) => cipher.decrypt(v).map(Some),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_are_iso() {
    let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    assert_eq!(encode_date(d), "2024-01-05");
    assert_eq!(decode_date("2024-01-05").unwrap(), d);
    assert!(decode_date("05/01/2024").is_err());
  }

  #[test]
  fn record_binds_every_column() {
    let record = EmployeeRecord::new("a@x.com", "Ann", "Lee");
    let values = encode_record(&record, &SinCipher::generate()).unwrap();
    assert_eq!(values.len(), RECORD_COLUMNS.len());
    assert_eq!(values[0], Value::Text("a@x.com".into()));
    assert_eq!(values[6], Value::Null);
  }

  #[test]
  fn empty_sin_e_is_not_decrypted() {
    let cipher = SinCipher::generate();
    assert_eq!(decode_sin_e(Some(""), &cipher).unwrap(), Some(String::new()));
    assert_eq!(decode_sin_e(None, &cipher).unwrap(), None);
  }
}
