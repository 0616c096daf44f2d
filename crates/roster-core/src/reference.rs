//! Reference data: the small lookup tables employees point at.
//!
//! These rows are seeded once when a store is initialised and rarely change
//! afterwards. Several of them have fixed identifiers that business rules
//! depend on; those live here as constants.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Province ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
  pub id:           i64,
  pub name:         String,
  /// Two-letter postal abbreviation, e.g. `NS`.
  pub abbreviation: String,
}

impl fmt::Display for Province {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProvince {
  pub name:         String,
  pub abbreviation: String,
}

// ─── City ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
  pub id:       i64,
  pub name:     String,
  pub province: Province,
}

impl City {
  /// Halifax: every employee without an explicit city lives here.
  pub const HALIFAX_ID: i64 = 1;
}

impl fmt::Display for City {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}, {}", self.name, self.province.abbreviation)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCity {
  pub name:        String,
  pub province_id: i64,
}

// ─── Relationship ────────────────────────────────────────────────────────────

/// How an emergency contact relates to the employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
  pub id:   i64,
  pub name: String,
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
  pub id:   i64,
  pub name: String,
}

impl Status {
  pub const FULLTIME_ID: i64 = 1;
  pub const PARTTIME_ID: i64 = 2;
  pub const CASUAL_ID: i64 = 3;
  pub const INACTIVE_ID: i64 = 4;

  /// Statuses under which an employee counts as currently employed.
  pub const ACTIVE_IDS: [i64; 3] =
    [Self::FULLTIME_ID, Self::PARTTIME_ID, Self::CASUAL_ID];

  pub fn is_active_id(id: i64) -> bool { Self::ACTIVE_IDS.contains(&id) }

  pub fn is_active(&self) -> bool { Self::is_active_id(self.id) }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

// ─── Geography ───────────────────────────────────────────────────────────────

/// Area in which the company operates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geography {
  pub id:       i64,
  pub name:     String,
  /// IANA zone name, e.g. `America/Halifax`.
  pub timezone: String,
}

/// Name of the geography assigned to employees saved without one.
pub const DEFAULT_GEOGRAPHY_NAME: &str = "NS";

#[derive(Debug, Clone, Deserialize)]
pub struct NewGeography {
  pub name:     String,
  pub timezone: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn active_set_excludes_inactive() {
    assert!(Status::is_active_id(Status::FULLTIME_ID));
    assert!(Status::is_active_id(Status::PARTTIME_ID));
    assert!(Status::is_active_id(Status::CASUAL_ID));
    assert!(!Status::is_active_id(Status::INACTIVE_ID));
  }

  #[test]
  fn city_display_uses_province_abbreviation() {
    let city = City {
      id:       City::HALIFAX_ID,
      name:     "Halifax".into(),
      province: Province {
        id:           1,
        name:         "Nova Scotia".into(),
        abbreviation: "NS".into(),
      },
    };
    assert_eq!(city.to_string(), "Halifax, NS");
  }
}
