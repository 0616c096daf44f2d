//! Declarative admin configuration.
//!
//! One [`ModelAdmin`] per entity says which columns an administrative list
//! shows, what can be searched and filtered, and how the detail form is
//! grouped. The `roster-admin` crate serves these descriptors and builds its
//! list and detail responses from them.

use serde::Serialize;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fieldset {
  pub title:     &'static str,
  pub fields:    &'static [&'static str],
  /// Rendered folded until the user opens it.
  pub collapsed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelAdmin {
  pub model:         &'static str,
  pub verbose_name:  &'static str,
  pub list_display:  &'static [&'static str],
  pub list_filter:   &'static [&'static str],
  pub search_fields: &'static [&'static str],
  /// Empty means "one group holding every field".
  pub fieldsets:     &'static [Fieldset],
  /// Foreign keys edited as plain ids rather than drop-downs.
  pub raw_id_fields: &'static [&'static str],
  /// Field names; a leading `-` sorts descending.
  pub ordering:      &'static [&'static str],
}

// ─── Reference data ──────────────────────────────────────────────────────────

pub const STATUS: ModelAdmin = ModelAdmin {
  model:         "status",
  verbose_name:  "status",
  list_display:  &["id", "name"],
  list_filter:   &[],
  search_fields: &["name"],
  fieldsets:     &[],
  raw_id_fields: &[],
  ordering:      &["id"],
};

pub const GEOGRAPHY: ModelAdmin = ModelAdmin {
  model:         "geography",
  verbose_name:  "geographies",
  list_display:  &["id", "name", "timezone"],
  list_filter:   &[],
  search_fields: &["name"],
  fieldsets:     &[],
  raw_id_fields: &[],
  ordering:      &["id"],
};

pub const CITY: ModelAdmin = ModelAdmin {
  model:         "city",
  verbose_name:  "cities",
  list_display:  &["name", "province"],
  list_filter:   &["province"],
  search_fields: &["name", "province__name"],
  fieldsets:     &[],
  raw_id_fields: &[],
  ordering:      &["name"],
};

pub const PROVINCE: ModelAdmin = ModelAdmin {
  model:         "province",
  verbose_name:  "provinces",
  list_display:  &["name", "abbreviation"],
  list_filter:   &[],
  search_fields: &[],
  fieldsets:     &[],
  raw_id_fields: &[],
  ordering:      &["name"],
};

pub const RELATIONSHIP: ModelAdmin = ModelAdmin {
  model:         "relationship",
  verbose_name:  "relationships",
  list_display:  &["name"],
  list_filter:   &[],
  search_fields: &[],
  fieldsets:     &[],
  raw_id_fields: &[],
  ordering:      &["id"],
};

// ─── Employee ────────────────────────────────────────────────────────────────

/// Pseudo-filter: status in the active set (or not).
pub const ACTIVE_FILTER: &str = "active";

pub const EMPLOYEE: ModelAdmin = ModelAdmin {
  model:         "employee",
  verbose_name:  "employees",
  list_display:  &["email", "first_name", "last_name", "status", "date_hired", "is_active"],
  list_filter:   &[
    ACTIVE_FILTER,
    "status",
    "geography",
    "is_staff",
    "is_superuser",
    "date_hired",
  ],
  search_fields: &["first_name", "last_name", "email", "sin", "phone_number"],
  fieldsets:     &[
    Fieldset {
      title:     "Personal Information",
      fields:    &["first_name", "middle_name", "last_name", "date_of_birth", "email"],
      collapsed: false,
    },
    Fieldset {
      title:     "Contact Information",
      fields:    &[
        "phone_number",
        "extra_phone_number",
        "address",
        "address2",
        "city",
        "postal_code",
        "geography",
      ],
      collapsed: false,
    },
    Fieldset {
      title:     "Emergency Contact",
      fields:    &[
        "emergency_contact_name",
        "emergency_relationship",
        "emergency_phone_number",
      ],
      collapsed: true,
    },
    Fieldset {
      title:     "Employment Information",
      fields:    &["status", "date_hired", "date_released", "salary", "weekly_hours"],
      collapsed: false,
    },
    Fieldset {
      title:     "Tax & Identification",
      fields:    &["sin", "sin_e"],
      collapsed: true,
    },
    Fieldset {
      title:     "Security Licenses",
      fields:    &[
        "iss_iat_id",
        "mss_id",
        "iss_security_license_number",
        "iat_security_license_number",
        "mss_security_license_number",
      ],
      collapsed: true,
    },
    Fieldset {
      title:     "System Information",
      fields:    &["is_staff", "is_superuser", "last_login", "date_joined", "password"],
      collapsed: true,
    },
    Fieldset {
      title:     "Additional Information",
      fields:    &["color", "notes"],
      collapsed: true,
    },
  ],
  raw_id_fields: &["geography", "city", "status", "emergency_relationship"],
  ordering:      &["-date_hired"],
};

/// Every registered admin, in menu order.
pub static REGISTRY: [ModelAdmin; 6] = [EMPLOYEE, STATUS, GEOGRAPHY, CITY, PROVINCE, RELATIONSHIP];

/// Look up a registered admin by its model name.
pub fn find(model: &str) -> Result<&'static ModelAdmin> {
  REGISTRY
    .iter()
    .find(|m| m.model == model)
    .ok_or_else(|| Error::UnknownModel(model.to_owned()))
}

/// Storage column behind a form field; foreign keys carry an `_id` suffix.
pub fn column_for(field: &str) -> String {
  match field {
    "city" | "status" | "geography" | "emergency_relationship" => format!("{field}_id"),
    other => other.to_owned(),
  }
}
