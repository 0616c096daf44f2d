//! [`SqliteStore`]: the SQLite implementation of [`RosterStore`].

use std::path::Path;

use chrono::Utc;
use roster_core::{
  FieldError, Validated, ValidationErrors,
  admin::{self, column_for},
  employee::{Employee, EmployeeRecord, NextIds, UNUSABLE_PASSWORD_PREFIX},
  import::{ImportedEmployee, UpsertOutcome},
  reference::{
    City, DEFAULT_GEOGRAPHY_NAME, Geography, NewCity, NewGeography, NewProvince, Province,
    Relationship, Status,
  },
  store::{EmployeeQuery, ReferenceQuery, RosterStore, SinCandidate, SinStatistics},
};
use rusqlite::{Connection, OptionalExtension as _, params, params_from_iter, types::Value};
use tracing::{debug, warn};

use crate::{
  Error, Result, SinCipher,
  encode::{
    EMPLOYEE_COLUMNS, RECORD_COLUMNS, RawEmployee, encode_date, encode_dt,
    encode_record,
  },
  schema::{SCHEMA, SEED},
};

const DEFAULT_LIST_LIMIT: usize = 100;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roster store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  cipher:          SinCipher,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, run schema initialisation and seed
  /// the reference tables.
  pub async fn open(path: impl AsRef<Path>, cipher: SinCipher) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, cipher };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store with a throwaway SIN key: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, cipher: SinCipher::generate() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(SEED)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Look up the raw row and decrypt it.
  async fn load_employee(&self, filter: &'static str, value: Value) -> Result<Option<Employee>> {
    let raw: Option<RawEmployee> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE {filter} = ?1"),
              [value],
              RawEmployee::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(|r| r.into_employee(&self.cipher)).transpose()
  }

  async fn get_or_missing(&self, id: i64) -> Result<Employee> {
    self.get_employee(id).await?.ok_or(Error::EmployeeNotFound(id))
  }
}

// ─── Save path ───────────────────────────────────────────────────────────────
//
// These run on the connection thread, either directly on the connection or
// inside a transaction (which derefs to `Connection`).

/// Save hook, default geography, then validation, then the write.
///
/// Returns the row id, or the validation errors when nothing was written.
fn save_employee(
  conn: &Connection,
  cipher: &SinCipher,
  id: Option<i64>,
  mut record: EmployeeRecord,
) -> Result<Validated<i64>> {
  record.prepare_for_save();

  if record.geography_id.is_none() {
    let default: Option<i64> = conn
      .query_row(
        "SELECT id FROM geographies WHERE name = ?1",
        [DEFAULT_GEOGRAPHY_NAME],
        |r| r.get(0),
      )
      .optional()?;
    record.geography_id =
      Some(default.ok_or(Error::DefaultGeographyMissing(DEFAULT_GEOGRAPHY_NAME))?);
  }

  let mut errors = match record.clean() {
    Ok(()) => ValidationErrors::default(),
    Err(e) => e,
  };
  check_references(conn, &record, &mut errors)?;
  check_unique(conn, id, &record, &mut errors)?;
  if let Err(e) = errors.into_result() {
    return Ok(Err(e));
  }

  let mut values = encode_record(&record, cipher)?;

  let id = match id {
    Some(id) => {
      let assignments = RECORD_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{c} = ?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
      values.push(id.into());
      let changed = conn.execute(
        &format!("UPDATE employees SET {assignments} WHERE id = ?{}", RECORD_COLUMNS.len() + 1),
        params_from_iter(values),
      )?;
      if changed == 0 {
        return Err(Error::EmployeeNotFound(id));
      }
      id
    }
    None => {
      let placeholders = (3..RECORD_COLUMNS.len() + 3)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
      let mut bound: Vec<Value> = vec![
        UNUSABLE_PASSWORD_PREFIX.to_string().into(),
        encode_dt(Utc::now()).into(),
      ];
      bound.append(&mut values);
      conn.execute(
        &format!(
          "INSERT INTO employees (password, date_joined, {}) VALUES (?1, ?2, {placeholders})",
          RECORD_COLUMNS.join(", ")
        ),
        params_from_iter(bound),
      )?;
      conn.last_insert_rowid()
    }
  };

  Ok(Ok(id))
}

fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
  Ok(
    conn
      .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), [id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

fn check_references(
  conn: &Connection,
  record: &EmployeeRecord,
  errors: &mut ValidationErrors,
) -> Result<()> {
  let mut refs = vec![
    ("city", "cities", record.city_id),
    ("status", "statuses", record.status_id),
  ];
  if let Some(g) = record.geography_id {
    refs.push(("geography", "geographies", g));
  }
  if let Some(r) = record.emergency_relationship_id {
    refs.push(("emergency_relationship", "relationships", r));
  }

  for (field, table, id) in refs {
    if !exists(conn, table, id)? {
      errors.push(FieldError::field(
        field,
        format!("Select a valid choice. {id} is not one of the available choices."),
      ));
    }
  }
  Ok(())
}

fn check_unique(
  conn: &Connection,
  own_id: Option<i64>,
  record: &EmployeeRecord,
  errors: &mut ValidationErrors,
) -> Result<()> {
  let own = own_id.unwrap_or(-1);
  let mut taken = |field: &'static str, label: &str, value: Value| -> Result<()> {
    if value == Value::Null {
      return Ok(());
    }
    let clash = conn
      .query_row(
        &format!("SELECT 1 FROM employees WHERE {field} = ?1 AND id != ?2"),
        params![value, own],
        |_| Ok(()),
      )
      .optional()?
      .is_some();
    if clash {
      errors.push(FieldError::field(
        field,
        format!("Employee with this {label} already exists."),
      ));
    }
    Ok(())
  };

  taken("email", "email address", record.email.clone().into())?;
  taken("iss_iat_id", "ISS/IAT ID", record.iss_iat_id.into())?;
  taken("mss_id", "MSS ID", record.mss_id.into())?;
  Ok(())
}

/// Record a field error when `table.column` already holds `value`.
fn check_taken(
  conn: &Connection,
  table: &str,
  column: &'static str,
  model: &str,
  value: &str,
  errors: &mut ValidationErrors,
) -> Result<()> {
  let clash = conn
    .query_row(&format!("SELECT 1 FROM {table} WHERE {column} = ?1"), [value], |_| Ok(()))
    .optional()?
    .is_some();
  if clash {
    errors.push(FieldError::field(column, format!("{model} with this {column} already exists.")));
  }
  Ok(())
}

/// Swap foreign keys that point nowhere for safe defaults.
fn substitute_missing_refs(conn: &Connection, row: &mut ImportedEmployee) -> Result<()> {
  if !exists(conn, "cities", row.city_id)? {
    warn!(email = %row.email, city_id = row.city_id, "unknown city, using default");
    row.city_id = City::HALIFAX_ID;
  }
  if let Some(rel) = row.emergency_relationship_id {
    if !exists(conn, "relationships", rel)? {
      warn!(email = %row.email, relationship_id = rel, "unknown relationship, dropping");
      row.emergency_relationship_id = None;
    }
  }
  Ok(())
}

/// The record currently stored under `email`, with its id.
fn existing_by_email(
  conn: &Connection,
  cipher: &SinCipher,
  email: &str,
) -> Result<Option<(i64, EmployeeRecord)>> {
  let raw = conn
    .query_row(
      &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE email = ?1"),
      [email],
      RawEmployee::from_row,
    )
    .optional()?;
  raw
    .map(|r| r.into_employee(cipher).map(|e| (e.id, e.record)))
    .transpose()
}

// ─── Dynamic WHERE ───────────────────────────────────────────────────────────

/// Accumulates `AND`-joined conditions with positional parameters.
#[derive(Default)]
struct Filter {
  conds:  Vec<String>,
  params: Vec<Value>,
}

impl Filter {
  fn push(&mut self, cond: impl FnOnce(usize) -> String, value: Value) {
    self.params.push(value);
    self.conds.push(cond(self.params.len()));
  }

  /// `(col1 LIKE ?n OR col2 LIKE ?n …)` over the given columns.
  fn search(&mut self, columns: &[String], text: Option<&str>) {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
      return;
    };
    let pattern = format!("%{}%", escape_like(text));
    self.push(
      |n| {
        let ors = columns
          .iter()
          .map(|c| format!("{c} LIKE ?{n} ESCAPE '\\'"))
          .collect::<Vec<_>>()
          .join(" OR ");
        format!("({ors})")
      },
      pattern.into(),
    );
  }

  fn clause(&self) -> String {
    if self.conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.conds.join(" AND "))
    }
  }
}

/// Escape LIKE wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

fn search_columns(model: &admin::ModelAdmin) -> Vec<String> {
  model.search_fields.iter().map(|f| column_for(f)).collect()
}

// ─── RosterStore impl ────────────────────────────────────────────────────────

impl RosterStore for SqliteStore {
  type Error = Error;

  // ── Reference data ────────────────────────────────────────────────────────

  async fn list_provinces(&self, query: ReferenceQuery) -> Result<Vec<Province>> {
    let mut filter = Filter::default();
    filter.search(&["name".into(), "abbreviation".into()], query.text.as_deref());

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT id, name, abbreviation FROM provinces {} ORDER BY name",
            filter.clause()
          ))?;
          let rows = stmt
            .query_map(params_from_iter(filter.params), |row| {
              Ok(Province {
                id:           row.get(0)?,
                name:         row.get(1)?,
                abbreviation: row.get(2)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn add_province(&self, input: NewProvince) -> Result<Validated<Province>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut errors = ValidationErrors::default();
          check_taken(conn, "provinces", "name", "Province", &input.name, &mut errors)
            .map_err(Error::into_call)?;
          check_taken(
            conn,
            "provinces",
            "abbreviation",
            "Province",
            &input.abbreviation,
            &mut errors,
          )
          .map_err(Error::into_call)?;
          if let Err(errors) = errors.into_result() {
            return Ok(Err(errors));
          }

          conn.execute(
            "INSERT INTO provinces (name, abbreviation) VALUES (?1, ?2)",
            params![input.name, input.abbreviation],
          )?;
          Ok(Ok(Province {
            id:           conn.last_insert_rowid(),
            name:         input.name,
            abbreviation: input.abbreviation,
          }))
        })
        .await?,
    )
  }

  async fn list_cities(&self, query: ReferenceQuery) -> Result<Vec<City>> {
    let mut filter = Filter::default();
    let columns: Vec<String> = search_columns(&admin::CITY)
      .into_iter()
      .map(|c| match c.as_str() {
        "province__name" => "p.name".to_owned(),
        other => format!("c.{other}"),
      })
      .collect();
    filter.search(&columns, query.text.as_deref());
    if let Some(p) = query.province_id {
      filter.push(|n| format!("c.province_id = ?{n}"), p.into());
    }

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT c.id, c.name, p.id, p.name, p.abbreviation
             FROM cities c JOIN provinces p ON p.id = c.province_id
             {} ORDER BY c.name",
            filter.clause()
          ))?;
          let rows = stmt
            .query_map(params_from_iter(filter.params), city_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn get_city(&self, id: i64) -> Result<Option<City>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT c.id, c.name, p.id, p.name, p.abbreviation
                 FROM cities c JOIN provinces p ON p.id = c.province_id
                 WHERE c.id = ?1",
                [id],
                city_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn add_city(&self, input: NewCity) -> Result<Validated<City>> {
    let province_id = input.province_id;
    let saved = self
      .conn
      .call(move |conn| {
        if !exists(conn, "provinces", input.province_id).map_err(Error::into_call)? {
          return Err(Error::ProvinceNotFound(input.province_id).into_call());
        }
        let mut errors = ValidationErrors::default();
        check_taken(conn, "cities", "name", "City", &input.name, &mut errors)
          .map_err(Error::into_call)?;
        if let Err(errors) = errors.into_result() {
          return Ok(Err(errors));
        }

        conn.execute(
          "INSERT INTO cities (name, province_id) VALUES (?1, ?2)",
          params![input.name, input.province_id],
        )?;
        Ok(Ok(conn.last_insert_rowid()))
      })
      .await?;

    match saved {
      Ok(id) => Ok(Ok(self.get_city(id).await?.ok_or(Error::ProvinceNotFound(province_id))?)),
      Err(errors) => Ok(Err(errors)),
    }
  }

  async fn list_relationships(&self, query: ReferenceQuery) -> Result<Vec<Relationship>> {
    let mut filter = Filter::default();
    filter.search(&["name".into()], query.text.as_deref());

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT id, name FROM relationships {} ORDER BY id",
            filter.clause()
          ))?;
          let rows = stmt
            .query_map(params_from_iter(filter.params), |row| {
              Ok(Relationship { id: row.get(0)?, name: row.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn add_relationship(&self, name: String) -> Result<Validated<Relationship>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut errors = ValidationErrors::default();
          check_taken(conn, "relationships", "name", "Relationship", &name, &mut errors)
            .map_err(Error::into_call)?;
          if let Err(errors) = errors.into_result() {
            return Ok(Err(errors));
          }

          conn.execute("INSERT INTO relationships (name) VALUES (?1)", [&name])?;
          Ok(Ok(Relationship { id: conn.last_insert_rowid(), name }))
        })
        .await?,
    )
  }

  async fn list_statuses(&self, query: ReferenceQuery) -> Result<Vec<Status>> {
    let mut filter = Filter::default();
    filter.search(&search_columns(&admin::STATUS), query.text.as_deref());

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT id, name FROM statuses {} ORDER BY id",
            filter.clause()
          ))?;
          let rows = stmt
            .query_map(params_from_iter(filter.params), |row| {
              Ok(Status { id: row.get(0)?, name: row.get(1)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn add_status(&self, name: String) -> Result<Validated<Status>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut errors = ValidationErrors::default();
          check_taken(conn, "statuses", "name", "Status", &name, &mut errors)
            .map_err(Error::into_call)?;
          if let Err(errors) = errors.into_result() {
            return Ok(Err(errors));
          }

          conn.execute("INSERT INTO statuses (name) VALUES (?1)", [&name])?;
          Ok(Ok(Status { id: conn.last_insert_rowid(), name }))
        })
        .await?,
    )
  }

  async fn list_geographies(&self, query: ReferenceQuery) -> Result<Vec<Geography>> {
    let mut filter = Filter::default();
    filter.search(&search_columns(&admin::GEOGRAPHY), query.text.as_deref());

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT id, name, timezone FROM geographies {} ORDER BY id",
            filter.clause()
          ))?;
          let rows = stmt
            .query_map(params_from_iter(filter.params), |row| {
              Ok(Geography { id: row.get(0)?, name: row.get(1)?, timezone: row.get(2)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn add_geography(&self, input: NewGeography) -> Result<Validated<Geography>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut errors = ValidationErrors::default();
          check_taken(conn, "geographies", "name", "Geography", &input.name, &mut errors)
            .map_err(Error::into_call)?;
          if let Err(errors) = errors.into_result() {
            return Ok(Err(errors));
          }

          conn.execute(
            "INSERT INTO geographies (name, timezone) VALUES (?1, ?2)",
            params![input.name, input.timezone],
          )?;
          Ok(Ok(Geography {
            id:       conn.last_insert_rowid(),
            name:     input.name,
            timezone: input.timezone,
          }))
        })
        .await?,
    )
  }

  // ── Employees ─────────────────────────────────────────────────────────────

  async fn create_employee(&self, record: EmployeeRecord) -> Result<Validated<Employee>> {
    let cipher = self.cipher.clone();
    let saved = self
      .conn
      .call(move |conn| save_employee(conn, &cipher, None, record).map_err(Error::into_call))
      .await?;

    match saved {
      Ok(id) => Ok(Ok(self.get_or_missing(id).await?)),
      Err(errors) => Ok(Err(errors)),
    }
  }

  async fn update_employee(&self, id: i64, record: EmployeeRecord) -> Result<Validated<Employee>> {
    let cipher = self.cipher.clone();
    let saved = self
      .conn
      .call(move |conn| save_employee(conn, &cipher, Some(id), record).map_err(Error::into_call))
      .await?;

    match saved {
      Ok(id) => Ok(Ok(self.get_or_missing(id).await?)),
      Err(errors) => Ok(Err(errors)),
    }
  }

  async fn get_employee(&self, id: i64) -> Result<Option<Employee>> {
    self.load_employee("id", id.into()).await
  }

  async fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>> {
    self.load_employee("email", email.to_owned().into()).await
  }

  async fn list_employees(&self, query: &EmployeeQuery) -> Result<Vec<Employee>> {
    let mut filter = Filter::default();
    filter.search(&search_columns(&admin::EMPLOYEE), query.text.as_deref());

    let active_ids = Status::ACTIVE_IDS.map(|id| id.to_string()).join(", ");
    match query.active {
      Some(true) => filter.conds.push(format!("status_id IN ({active_ids})")),
      Some(false) => filter.conds.push(format!("status_id NOT IN ({active_ids})")),
      None => {}
    }
    if let Some(s) = query.status_id {
      filter.push(|n| format!("status_id = ?{n}"), s.into());
    }
    if let Some(g) = query.geography_id {
      filter.push(|n| format!("geography_id = ?{n}"), g.into());
    }
    if let Some(b) = query.is_staff {
      filter.push(|n| format!("is_staff = ?{n}"), b.into());
    }
    if let Some(b) = query.is_superuser {
      filter.push(|n| format!("is_superuser = ?{n}"), b.into());
    }
    if let Some(d) = query.hired_after {
      filter.push(|n| format!("date_hired >= ?{n}"), encode_date(d).into());
    }
    if let Some(d) = query.hired_before {
      filter.push(|n| format!("date_hired <= ?{n}"), encode_date(d).into());
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT) as i64;
    let offset = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawEmployee> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {EMPLOYEE_COLUMNS} FROM employees {}
           ORDER BY date_hired IS NULL, date_hired DESC, id
           LIMIT {limit} OFFSET {offset}",
          filter.clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(filter.params), RawEmployee::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(|r| r.into_employee(&self.cipher)).collect()
  }

  async fn set_password(&self, id: i64, password_hash: String) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE employees SET password = ?1 WHERE id = ?2",
          params![password_hash, id],
        )?)
      })
      .await?;
    if changed == 0 {
      return Err(Error::EmployeeNotFound(id));
    }
    Ok(())
  }

  async fn record_login(&self, id: i64) -> Result<()> {
    let at = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute("UPDATE employees SET last_login = ?1 WHERE id = ?2", params![at, id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn next_ids(&self) -> Result<NextIds> {
    let (iss_iat, mss): (Option<i64>, Option<i64>) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT MAX(iss_iat_id), MAX(mss_id) FROM employees",
          [],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?)
      })
      .await?;

    let next = |max: Option<i64>| -> Result<u32> {
      u32::try_from(max.unwrap_or(0) + 1)
        .map_err(|_| Error::Decode(format!("id sequence exhausted at {max:?}")))
    };
    Ok(NextIds { iss_iat_id: next(iss_iat)?, mss_id: next(mss)? })
  }

  // ── Batch jobs ────────────────────────────────────────────────────────────

  async fn upsert_employees(&self, rows: Vec<ImportedEmployee>) -> Result<Vec<UpsertOutcome>> {
    let cipher = self.cipher.clone();

    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let mut outcomes = Vec::with_capacity(rows.len());

          for mut row in rows {
            let outcome = (|| -> Result<UpsertOutcome> {
              substitute_missing_refs(&tx, &mut row)?;
              let existing = existing_by_email(&tx, &cipher, &row.email)?;
              let (id, record) = match existing {
                Some((id, mut record)) => {
                  row.apply_to(&mut record);
                  (Some(id), record)
                }
                None => (None, row.to_record()),
              };
              Ok(match save_employee(&tx, &cipher, id, record)? {
                Ok(saved) if id.is_some() => UpsertOutcome::Updated { id: saved },
                Ok(saved) => UpsertOutcome::Created { id: saved },
                Err(errors) => UpsertOutcome::Rejected { errors },
              })
            })()
            .map_err(Error::into_call)?;

            debug!(email = %row.email, ?outcome, "upserted");
            outcomes.push(outcome);
          }

          tx.commit()?;
          Ok(outcomes)
        })
        .await?,
    )
  }

  async fn sin_statistics(&self) -> Result<SinStatistics> {
    Ok(
      self
        .conn
        .call(|conn| {
          Ok(conn.query_row(
            "SELECT
               COUNT(*),
               COALESCE(SUM(sin IS NULL), 0),
               COALESCE(SUM(sin = ''), 0),
               COALESCE(SUM(sin IS NOT NULL AND sin != ''), 0),
               COALESCE(SUM(sin_e IS NOT NULL AND sin_e != ''), 0)
             FROM employees",
            [],
            |r| {
              Ok(SinStatistics {
                total:             r.get::<_, i64>(0)? as u64,
                sin_null:          r.get::<_, i64>(1)? as u64,
                sin_empty:         r.get::<_, i64>(2)? as u64,
                sin_populated:     r.get::<_, i64>(3)? as u64,
                already_encrypted: r.get::<_, i64>(4)? as u64,
              })
            },
          )?)
        })
        .await?,
    )
  }

  async fn count_sin_candidates(&self, force: bool) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM employees WHERE {}", sin_candidate_filter(force)),
          [],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }

  async fn sin_candidates(
    &self,
    force: bool,
    after_id: i64,
    limit: usize,
  ) -> Result<Vec<SinCandidate>> {
    let candidates = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT id, sin, sin_e IS NOT NULL AND sin_e != '' FROM employees
           WHERE {} AND id > ?1
           ORDER BY id LIMIT ?2",
          sin_candidate_filter(force)
        ))?;
        let rows = stmt
          .query_map(params![after_id, limit as i64], |r| {
            Ok(SinCandidate { id: r.get(0)?, sin: r.get(1)?, encrypted: r.get(2)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(candidates)
  }

  async fn store_encrypted_sin(&self, id: i64, sin: String) -> Result<()> {
    let sealed = self.cipher.encrypt(&sin)?;
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE employees SET sin_e = ?1 WHERE id = ?2",
          params![sealed, id],
        )?;
        if changed == 0 {
          return Err(Error::EmployeeNotFound(id).into_call());
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn sin_candidate_filter(force: bool) -> &'static str {
  if force {
    "sin IS NOT NULL AND sin != ''"
  } else {
    "sin IS NOT NULL AND sin != '' AND (sin_e IS NULL OR sin_e = '')"
  }
}

fn city_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<City> {
  Ok(City {
    id:       row.get(0)?,
    name:     row.get(1)?,
    province: Province {
      id:           row.get(2)?,
      name:         row.get(3)?,
      abbreviation: row.get(4)?,
    },
  })
}
