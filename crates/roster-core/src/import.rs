//! Mapping of loosely-typed import rows onto employee fields.
//!
//! Rows arrive as header → value maps (see `roster import-employees`). Text
//! is trimmed, blanks become `None`, numbers parse permissively, and dates
//! are tried against a fixed list of formats. Only an unparseable date is a
//! hard error for the row.

use std::{collections::HashMap, str::FromStr};

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  color::IMPORT_FALLBACK_COLOR,
  employee::EmployeeRecord,
  reference::City,
  text::non_blank,
};

/// Accepted date layouts, tried in order.
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];

// ─── Scalar parsers ──────────────────────────────────────────────────────────

/// Parse a date in any of [`DATE_FORMATS`]; blank input is `Ok(None)`.
pub fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
  let Some(raw) = non_blank(value) else {
    return Ok(None);
  };
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(&raw, fmt).ok())
    .map(Some)
    .ok_or(Error::DateParse(raw))
}

/// Parse an integer; blank or malformed input is `None`.
pub fn parse_int<T: FromStr>(value: Option<&str>) -> Option<T> {
  non_blank(value).and_then(|v| v.parse().ok())
}

/// Parse a decimal; blank or malformed input is `None`.
pub fn parse_decimal(value: Option<&str>) -> Option<Decimal> {
  non_blank(value).and_then(|v| Decimal::from_str(&v).ok())
}

/// `true`, `1`, `yes` and `t` (any case) are true; a blank value is true.
pub fn parse_bool(value: Option<&str>) -> bool {
  match non_blank(value) {
    Some(v) => matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "t"),
    None => true,
  }
}

// ─── Imported row ────────────────────────────────────────────────────────────

/// The columns an import is allowed to write. On update, fields not listed
/// here (status, geography, password, encrypted SIN, staff flags) keep their
/// stored values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedEmployee {
  pub email:                       String,
  pub first_name:                  String,
  pub last_name:                   String,
  pub middle_name:                 Option<String>,
  pub sin:                         Option<String>,
  pub address:                     Option<String>,
  pub address2:                    Option<String>,
  pub postal_code:                 Option<String>,
  pub phone_number:                Option<String>,
  pub extra_phone_number:          Option<String>,
  pub emergency_phone_number:      Option<String>,
  pub emergency_contact_name:      Option<String>,
  pub notes:                       Option<String>,
  pub color:                       String,
  pub is_active:                   bool,
  pub date_of_birth:               Option<NaiveDate>,
  pub date_hired:                  NaiveDate,
  pub date_released:               Option<NaiveDate>,
  pub iss_iat_id:                  Option<u32>,
  pub mss_id:                      Option<u32>,
  pub iss_security_license_number: Option<u32>,
  pub iat_security_license_number: Option<u32>,
  pub mss_security_license_number: Option<u32>,
  pub weekly_hours:                u16,
  pub salary:                      Option<Decimal>,
  pub city_id:                     i64,
  pub emergency_relationship_id:   Option<i64>,
}

impl ImportedEmployee {
  /// Map one header-keyed row. Fails only on an unparseable date.
  pub fn from_row(row: &HashMap<String, String>) -> Result<Self> {
    let get = |key: &str| row.get(key).map(String::as_str);
    let text = |key: &str| get(key).map(str::trim).unwrap_or_default().to_owned();
    let opt = |key: &str| non_blank(get(key));

    Ok(Self {
      email:                       text("email"),
      first_name:                  text("first_name"),
      last_name:                   text("last_name"),
      middle_name:                 opt("middle_name"),
      sin:                         opt("sin"),
      address:                     opt("address"),
      address2:                    opt("address2"),
      postal_code:                 opt("postal_code"),
      phone_number:                opt("phone_number"),
      extra_phone_number:          opt("extra_phone_number"),
      emergency_phone_number:      opt("emergency_phone_number"),
      emergency_contact_name:      opt("emergency_contact_name"),
      notes:                       opt("notes"),
      color:                       opt("color")
        .unwrap_or_else(|| IMPORT_FALLBACK_COLOR.to_owned()),
      is_active:                   parse_bool(get("is_active")),
      date_of_birth:               parse_date(get("date_of_birth"))?,
      date_hired:                  parse_date(get("date_hired"))?
        .unwrap_or_else(|| Local::now().date_naive()),
      date_released:               parse_date(get("date_released"))?,
      iss_iat_id:                  parse_int(get("iss_iat_id")),
      mss_id:                      parse_int(get("mss_id")),
      iss_security_license_number: parse_int(get("iss_security_license_number")),
      iat_security_license_number: parse_int(get("iat_security_license_number")),
      mss_security_license_number: parse_int(get("mss_security_license_number")),
      weekly_hours:                parse_int(get("weekly_hours")).unwrap_or(0),
      salary:                      parse_decimal(get("salary")),
      city_id:                     parse_int(get("city_id")).unwrap_or(City::HALIFAX_ID),
      emergency_relationship_id:   parse_int(get("emergency_relationship_id")),
    })
  }

  /// Overwrite the imported columns of `record`.
  pub fn apply_to(&self, record: &mut EmployeeRecord) {
    record.email = self.email.clone();
    record.first_name = self.first_name.clone();
    record.last_name = self.last_name.clone();
    record.middle_name = self.middle_name.clone();
    record.sin = self.sin.clone();
    record.address = self.address.clone();
    record.address2 = self.address2.clone();
    record.postal_code = self.postal_code.clone();
    record.phone_number = self.phone_number.clone();
    record.extra_phone_number = self.extra_phone_number.clone();
    record.emergency_phone_number = self.emergency_phone_number.clone();
    record.emergency_contact_name = self.emergency_contact_name.clone();
    record.notes = self.notes.clone();
    record.color = self.color.clone();
    record.is_active = self.is_active;
    record.date_of_birth = self.date_of_birth;
    record.date_hired = Some(self.date_hired);
    record.date_released = self.date_released;
    record.iss_iat_id = self.iss_iat_id;
    record.mss_id = self.mss_id;
    record.iss_security_license_number = self.iss_security_license_number;
    record.iat_security_license_number = self.iat_security_license_number;
    record.mss_security_license_number = self.mss_security_license_number;
    record.weekly_hours = self.weekly_hours;
    record.salary = self.salary;
    record.city_id = self.city_id;
    record.emergency_relationship_id = self.emergency_relationship_id;
  }

  /// A fresh record populated from this row.
  pub fn to_record(&self) -> EmployeeRecord {
    let mut record = EmployeeRecord::default();
    self.apply_to(&mut record);
    record
  }
}

/// What happened to one row handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpsertOutcome {
  Created { id: i64 },
  Updated { id: i64 },
  /// Business rules rejected the row; nothing was written for it.
  Rejected { errors: crate::ValidationErrors },
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
      .iter()
      .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
      .collect()
  }

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  #[test]
  fn dates_in_every_format() {
    assert_eq!(parse_date(Some("2024-01-15")).unwrap(), Some(ymd(2024, 1, 15)));
    assert_eq!(parse_date(Some("01/15/2024")).unwrap(), Some(ymd(2024, 1, 15)));
    assert_eq!(parse_date(Some("15/01/2024")).unwrap(), Some(ymd(2024, 1, 15)));
    assert_eq!(parse_date(Some("2024/01/15")).unwrap(), Some(ymd(2024, 1, 15)));
  }

  #[test]
  fn ambiguous_date_prefers_month_first() {
    assert_eq!(parse_date(Some("03/04/2024")).unwrap(), Some(ymd(2024, 3, 4)));
  }

  #[test]
  fn blank_date_is_none_and_garbage_is_error() {
    assert_eq!(parse_date(Some("  ")).unwrap(), None);
    assert_eq!(parse_date(None).unwrap(), None);
    assert!(matches!(parse_date(Some("next tuesday")), Err(Error::DateParse(s)) if s == "next tuesday"));
  }

  #[test]
  fn permissive_numbers() {
    assert_eq!(parse_int::<u32>(Some(" 17 ")), Some(17));
    assert_eq!(parse_int::<u32>(Some("-3")), None);
    assert_eq!(parse_int::<u32>(Some("abc")), None);
    assert_eq!(parse_decimal(Some("52000.50")), Some(Decimal::from_str("52000.50").unwrap()));
    assert_eq!(parse_decimal(Some("$5")), None);
  }

  #[test]
  fn booleans() {
    for v in ["True", "1", "YES", "t"] {
      assert!(parse_bool(Some(v)));
    }
    for v in ["false", "0", "no", "n"] {
      assert!(!parse_bool(Some(v)));
    }
    assert!(parse_bool(None));
  }

  #[test]
  fn minimal_row_gets_defaults() {
    let r = ImportedEmployee::from_row(&row(&[
      ("email", "a@x.com"),
      ("first_name", "Ann"),
      ("last_name", "Lee"),
      ("date_hired", "2024/01/15"),
    ]))
    .unwrap();
    assert_eq!(r.date_hired, ymd(2024, 1, 15));
    assert_eq!(r.city_id, City::HALIFAX_ID);
    assert_eq!(r.color, IMPORT_FALLBACK_COLOR);
    assert_eq!(r.weekly_hours, 0);
    assert!(r.is_active);
    assert_eq!(r.emergency_relationship_id, None);
    assert_eq!(r.middle_name, None);
  }

  #[test]
  fn bad_foreign_keys_fall_back() {
    let r = ImportedEmployee::from_row(&row(&[
      ("email", "a@x.com"),
      ("city_id", "halifax"),
      ("emergency_relationship_id", "spouse"),
    ]))
    .unwrap();
    assert_eq!(r.city_id, City::HALIFAX_ID);
    assert_eq!(r.emergency_relationship_id, None);
  }

  #[test]
  fn apply_preserves_unmapped_fields() {
    let imported = ImportedEmployee::from_row(&row(&[
      ("email", "a@x.com"),
      ("first_name", "Ann"),
      ("last_name", "Lee"),
    ]))
    .unwrap();
    let mut record = EmployeeRecord::new("a@x.com", "Old", "Name");
    record.is_staff = true;
    record.sin_e = Some("123456789".into());
    record.geography_id = Some(3);
    imported.apply_to(&mut record);
    assert_eq!(record.first_name, "Ann");
    assert!(record.is_staff);
    assert_eq!(record.sin_e.as_deref(), Some("123456789"));
    assert_eq!(record.geography_id, Some(3));
  }
}
