//! JSON administration API for Roster.
//!
//! Exposes an axum [`Router`] backed by any [`RosterStore`]. List columns,
//! search fields and detail grouping come from the descriptors in
//! [`roster_core::admin`]. Every route sits behind HTTP Basic auth against
//! active staff employees.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = roster_admin::admin_router(Arc::new(store));
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod employees;
pub mod error;
pub mod reference;

use std::sync::Arc;

use axum::{Json, Router, extract::Path, middleware, routing::get};
use roster_core::{admin::ModelAdmin, store::RosterStore};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// `GET /admin`: every registered model descriptor.
async fn registry() -> Json<&'static [ModelAdmin]> { Json(&roster_core::admin::REGISTRY) }

/// `GET /admin/{model}`: one descriptor, 404 for unregistered models.
async fn model_admin(Path(model): Path<String>) -> Result<Json<&'static ModelAdmin>, ApiError> {
  roster_core::admin::find(&model)
    .map(Json)
    .map_err(|e| ApiError::NotFound(e.to_string()))
}

/// Build the admin router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn admin_router<S>(store: Arc<S>) -> Router<()>
where
  S: RosterStore + 'static,
{
  Router::new()
    .route("/admin", get(registry))
    .route("/admin/{model}", get(model_admin))
    // Employees
    .route("/employees", get(employees::list::<S>).post(employees::create::<S>))
    .route("/employees/next-ids", get(employees::next_ids::<S>))
    .route("/employees/{id}", get(employees::get_one::<S>).put(employees::update::<S>))
    // Lookup tables
    .route(
      "/provinces",
      get(reference::list_provinces::<S>).post(reference::add_province::<S>),
    )
    .route("/cities", get(reference::list_cities::<S>).post(reference::add_city::<S>))
    .route(
      "/relationships",
      get(reference::list_relationships::<S>).post(reference::add_relationship::<S>),
    )
    .route("/statuses", get(reference::list_statuses::<S>).post(reference::add_status::<S>))
    .route(
      "/geographies",
      get(reference::list_geographies::<S>).post(reference::add_geography::<S>),
    )
    .route_layer(middleware::from_fn_with_state(store.clone(), auth::require_staff::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(store)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use roster_core::employee::EmployeeRecord;
  use roster_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  const ADMIN: &str = "boss@x.com";
  const PASSWORD: &str = "secret";

  async fn make_store() -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut record = EmployeeRecord::new(ADMIN, "Boss", "Person");
    record.is_staff = true;
    let admin = store.create_employee(record).await.unwrap().unwrap();
    store
      .set_password(admin.id, auth::hash_password(PASSWORD).unwrap())
      .await
      .unwrap();
    Arc::new(store)
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn send(
    store: Arc<SqliteStore>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::AUTHORIZATION, auth_header(ADMIN, PASSWORD));
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = admin_router(store).oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
  }

  // ── Auth ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_credentials_401() {
    let store = make_store().await;
    let req = Request::builder().uri("/admin").body(Body::empty()).unwrap();
    let resp = admin_router(store).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn wrong_password_401() {
    let store = make_store().await;
    let req = Request::builder()
      .uri("/admin")
      .header(header::AUTHORIZATION, auth_header(ADMIN, "nope"))
      .body(Body::empty())
      .unwrap();
    let resp = admin_router(store).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn non_staff_401() {
    let store = make_store().await;
    let clerk = store
      .create_employee(EmployeeRecord::new("clerk@x.com", "C", "K"))
      .await
      .unwrap()
      .unwrap();
    store
      .set_password(clerk.id, auth::hash_password("pw").unwrap())
      .await
      .unwrap();

    let req = Request::builder()
      .uri("/admin")
      .header(header::AUTHORIZATION, auth_header("clerk@x.com", "pw"))
      .body(Body::empty())
      .unwrap();
    let resp = admin_router(store).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn login_is_recorded() {
    let store = make_store().await;
    let (status, _) = send(store.clone(), "GET", "/admin", None).await;
    assert_eq!(status, StatusCode::OK);
    let admin = store.find_employee_by_email(ADMIN).await.unwrap().unwrap();
    assert!(admin.last_login.is_some());
  }

  // ── Registry ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn registry_lists_models() {
    let (status, body) = send(make_store().await, "GET", "/admin", None).await;
    assert_eq!(status, StatusCode::OK);
    let models: Vec<&str> = body
      .as_array()
      .unwrap()
      .iter()
      .map(|m| m["model"].as_str().unwrap())
      .collect();
    assert_eq!(models, ["employee", "status", "geography", "city", "province", "relationship"]);
  }

  #[tokio::test]
  async fn single_model_admin() {
    let store = make_store().await;
    let (status, body) = send(store.clone(), "GET", "/admin/employee", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ordering"], json!(["-date_hired"]));

    let (status, _) = send(store, "GET", "/admin/payroll", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Employees ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_then_detail() {
    let store = make_store().await;
    let (status, created) = send(
      store.clone(),
      "POST",
      "/employees",
      Some(json!({
        "email": "ann@x.com",
        "first_name": "Ann",
        "last_name": "Lee",
        "address": "1 spring garden road",
        "date_hired": "2024-01-15"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["name"], "Ann, Lee");
    assert_eq!(created["full_address"], "1 Spring Garden Road, Halifax, NS");

    let id = created["id"].as_i64().unwrap();
    let (status, detail) = send(store, "GET", &format!("/employees/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let fieldsets = detail["fieldsets"].as_array().unwrap();
    assert_eq!(fieldsets.len(), 8);
    assert_eq!(fieldsets[0]["title"], "Personal Information");
    assert_eq!(fieldsets[0]["fields"]["email"], "ann@x.com");
    assert_eq!(fieldsets[1]["fields"]["city"], 1);
    assert_eq!(fieldsets[2]["collapsed"], true);
    assert_eq!(fieldsets[6]["fields"]["password"], "No password set.");
  }

  #[tokio::test]
  async fn create_invalid_is_422() {
    let (status, body) = send(
      make_store().await,
      "POST",
      "/employees",
      Some(json!({
        "email": "bob@x.com",
        "first_name": "Bob",
        "last_name": "Roy",
        "status_id": 4
      })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let messages: Vec<&str> = body["errors"]
      .as_array()
      .unwrap()
      .iter()
      .map(|e| e["message"].as_str().unwrap())
      .collect();
    assert!(messages.contains(&"Inactive employees must have a release date."));
  }

  #[tokio::test]
  async fn list_projects_display_columns() {
    let store = make_store().await;
    let mut gone = EmployeeRecord::new("gone@x.com", "Gone", "Person");
    gone.date_released = Some(chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    store.create_employee(gone).await.unwrap().unwrap();

    let (status, body) = send(store.clone(), "GET", "/employees?active=false", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    let row = rows[0].as_object().unwrap();
    assert_eq!(row["email"], "gone@x.com");
    assert_eq!(row["status"], "Inactive");
    assert_eq!(row["is_active"], false);
    assert!(!row.contains_key("password"));
    assert!(!row.contains_key("sin"));

    let (_, body) = send(store, "GET", "/employees?q=boss", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn update_and_missing() {
    let store = make_store().await;
    let admin = store.find_employee_by_email(ADMIN).await.unwrap().unwrap();

    let mut record = serde_json::to_value(&admin.record).unwrap();
    record["notes"] = json!("promoted");
    let (status, body) =
      send(store.clone(), "PUT", &format!("/employees/{}", admin.id), Some(record.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["fieldsets"][7]["fields"]["notes"], "promoted");

    let (status, _) = send(store.clone(), "PUT", "/employees/999", Some(record)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(store, "GET", "/employees/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn next_ids_endpoint() {
    let (status, body) = send(make_store().await, "GET", "/employees/next-ids", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "iss_iat_id": 1, "mss_id": 1 }));
  }

  // ── Lookup tables ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn statuses_and_geographies() {
    let store = make_store().await;
    let (_, body) = send(store.clone(), "GET", "/statuses", None).await;
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (status, body) = send(
      store.clone(),
      "POST",
      "/geographies",
      Some(json!({ "name": "NB", "timezone": "America/Moncton" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "NB");

    let (_, body) = send(store, "GET", "/geographies?q=nb", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn add_city_checks_province() {
    let store = make_store().await;
    let (status, _) = send(
      store.clone(),
      "POST",
      "/cities",
      Some(json!({ "name": "Nowhere", "province_id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
      store.clone(),
      "POST",
      "/cities",
      Some(json!({ "name": "Truro", "province_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["province"]["abbreviation"], "NS");

    let (_, body) = send(store, "GET", "/cities?province=1", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn relationship_requires_name() {
    let (status, _) = send(
      make_store().await,
      "POST",
      "/relationships",
      Some(json!({ "name": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  }

  #[tokio::test]
  async fn duplicate_lookup_name_is_422() {
    let store = make_store().await;
    let (status, body) = send(
      store.clone(),
      "POST",
      "/relationships",
      Some(json!({ "name": "Spouse" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "name");
    assert_eq!(body["errors"][0]["message"], "Relationship with this name already exists.");

    let (status, _) = send(
      store,
      "POST",
      "/provinces",
      Some(json!({ "name": "Elsewhere", "abbreviation": "NS" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  }
}
