//! Handlers for `/employees` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/employees` | Filters below; rows carry the admin's `list_display` columns |
//! | `POST` | `/employees` | Body: an employee record; 422 with `errors` when rejected |
//! | `GET`  | `/employees/next-ids` | Next free ISS/IAT and MSS ids |
//! | `GET`  | `/employees/{id}` | Detail grouped by fieldsets; 404 if not found |
//! | `PUT`  | `/employees/{id}` | Full replacement of the editable fields |

use std::{collections::HashMap, sync::Arc};

use axum::{
  Json,
  Extension,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use roster_core::{
  admin::{self, column_for},
  employee::{Employee, EmployeeRecord, NextIds},
  store::{EmployeeQuery, ReferenceQuery, RosterStore},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::{auth::StaffUser, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  /// Search over the employee admin's search fields.
  pub q:            Option<String>,
  /// Status in the active set (or, with `false`, outside it).
  pub active:       Option<bool>,
  pub status:       Option<i64>,
  pub geography:    Option<i64>,
  pub is_staff:     Option<bool>,
  pub is_superuser: Option<bool>,
  pub hired_after:  Option<NaiveDate>,
  pub hired_before: Option<NaiveDate>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

impl From<ListParams> for EmployeeQuery {
  fn from(p: ListParams) -> Self {
    EmployeeQuery {
      text:         p.q,
      active:       p.active,
      status_id:    p.status,
      geography_id: p.geography,
      is_staff:     p.is_staff,
      is_superuser: p.is_superuser,
      hired_after:  p.hired_after,
      hired_before: p.hired_before,
      limit:        p.limit,
      offset:       p.offset,
    }
  }
}

/// `GET /employees[?q=...][&active=...][&status=...][&geography=...][&limit=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError>
where
  S: RosterStore,
{
  let query = EmployeeQuery::from(params);
  let employees = store.list_employees(&query).await.map_err(ApiError::store)?;

  let statuses: HashMap<i64, String> = store
    .list_statuses(ReferenceQuery::default())
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(|s| (s.id, s.name))
    .collect();

  let rows = employees
    .iter()
    .map(|e| list_row(e, &statuses))
    .collect::<Result<Vec<_>, _>>()?;
  Ok(Json(rows))
}

/// `id` plus one entry per `list_display` column.
///
/// `status` shows the status name and `is_active` whether that status is in
/// the active set.
fn list_row(
  employee: &Employee,
  statuses: &HashMap<i64, String>,
) -> Result<Map<String, Value>, ApiError> {
  let all = to_object(employee)?;

  let mut row = Map::new();
  row.insert("id".into(), employee.id.into());
  for &field in admin::EMPLOYEE.list_display {
    let value = match field {
      "status" => statuses
        .get(&employee.record.status_id)
        .cloned()
        .map(Value::String)
        .unwrap_or(Value::Null),
      "is_active" => employee.record.is_active_employee().into(),
      other => all.get(&column_for(other)).cloned().unwrap_or(Value::Null),
    };
    row.insert(field.into(), value);
  }
  Ok(row)
}

fn to_object(employee: &Employee) -> Result<Map<String, Value>, ApiError> {
  match serde_json::to_value(employee).map_err(ApiError::store)? {
    Value::Object(map) => Ok(map),
    _ => Ok(Map::new()),
  }
}

// ─── Detail ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FieldsetView {
  pub title:     &'static str,
  pub collapsed: bool,
  pub fields:    Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct EmployeeDetail {
  pub id:           i64,
  /// `"<first>, <last>"`.
  pub name:         String,
  pub full_address: Option<String>,
  pub fieldsets:    Vec<FieldsetView>,
}

/// Summary shown in place of the password hash.
fn password_summary(employee: &Employee) -> Value {
  if !employee.has_usable_password() {
    return "No password set.".into();
  }
  let algorithm = employee
    .password
    .trim_start_matches('$')
    .split('$')
    .next()
    .unwrap_or_default();
  format!("algorithm: {algorithm}").into()
}

async fn detail<S>(store: &S, employee: Employee) -> Result<EmployeeDetail, ApiError>
where
  S: RosterStore,
{
  let city = store
    .get_city(employee.record.city_id)
    .await
    .map_err(ApiError::store)?;
  let all = to_object(&employee)?;

  let fieldsets = admin::EMPLOYEE
    .fieldsets
    .iter()
    .map(|fs| {
      let fields = fs
        .fields
        .iter()
        .map(|&f| {
          let value = match f {
            "password" => password_summary(&employee),
            other => all.get(&column_for(other)).cloned().unwrap_or(Value::Null),
          };
          (f.to_owned(), value)
        })
        .collect();
      FieldsetView { title: fs.title, collapsed: fs.collapsed, fields }
    })
    .collect();

  Ok(EmployeeDetail {
    id: employee.id,
    name: employee.to_string(),
    full_address: city.map(|c| employee.full_address(&c)),
    fieldsets,
  })
}

/// `GET /employees/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<EmployeeDetail>, ApiError>
where
  S: RosterStore,
{
  let employee = store
    .get_employee(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("employee {id} not found")))?;
  Ok(Json(detail(store.as_ref(), employee).await?))
}

// ─── Create / update ──────────────────────────────────────────────────────────

/// `POST /employees`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Extension(staff): Extension<StaffUser>,
  Json(record): Json<EmployeeRecord>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore,
{
  let employee = store
    .create_employee(record)
    .await
    .map_err(ApiError::store)??;
  info!(
    employee_id = employee.id,
    email = %employee.record.email,
    staff = %staff.email,
    "employee created"
  );
  Ok((StatusCode::CREATED, Json(detail(store.as_ref(), employee).await?)))
}

/// `PUT /employees/{id}`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Extension(staff): Extension<StaffUser>,
  Path(id): Path<i64>,
  Json(record): Json<EmployeeRecord>,
) -> Result<Json<EmployeeDetail>, ApiError>
where
  S: RosterStore,
{
  if store.get_employee(id).await.map_err(ApiError::store)?.is_none() {
    return Err(ApiError::NotFound(format!("employee {id} not found")));
  }
  let employee = store
    .update_employee(id, record)
    .await
    .map_err(ApiError::store)??;
  info!(employee_id = id, staff = %staff.email, "employee updated");
  Ok(Json(detail(store.as_ref(), employee).await?))
}

// ─── Next ids ─────────────────────────────────────────────────────────────────

/// `GET /employees/next-ids`
pub async fn next_ids<S>(State(store): State<Arc<S>>) -> Result<Json<NextIds>, ApiError>
where
  S: RosterStore,
{
  Ok(Json(store.next_ids().await.map_err(ApiError::store)?))
}
