//! Handlers for the lookup tables: provinces, cities, relationships,
//! statuses and geographies. Each has a `GET` list (with `?q=` search) and a
//! `POST` create.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::{
  FieldError, ValidationErrors,
  reference::{City, Geography, NewCity, NewGeography, NewProvince, Province, Relationship, Status},
  store::{ReferenceQuery, RosterStore},
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub q:        Option<String>,
  /// Cities only.
  pub province: Option<i64>,
}

impl From<ListParams> for ReferenceQuery {
  fn from(p: ListParams) -> Self { ReferenceQuery { text: p.q, province_id: p.province } }
}

/// Body for the single-column tables.
#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

fn require_name(name: &str) -> Result<(), ApiError> {
  if name.trim().is_empty() {
    return Err(ValidationErrors(vec![FieldError::field("name", "This field is required.")]).into());
  }
  Ok(())
}

// ─── Provinces ────────────────────────────────────────────────────────────────

/// `GET /provinces[?q=...]`
pub async fn list_provinces<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Province>>, ApiError>
where
  S: RosterStore,
{
  Ok(Json(store.list_provinces(params.into()).await.map_err(ApiError::store)?))
}

/// `POST /provinces` with body `{"name":"Nova Scotia","abbreviation":"NS"}`
pub async fn add_province<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewProvince>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore,
{
  require_name(&body.name)?;
  if body.abbreviation.chars().count() != 2 {
    return Err(
      ValidationErrors(vec![FieldError::field(
        "abbreviation",
        "Ensure this value has exactly 2 characters.",
      )])
      .into(),
    );
  }
  let province = store.add_province(body).await.map_err(ApiError::store)??;
  Ok((StatusCode::CREATED, Json(province)))
}

// ─── Cities ───────────────────────────────────────────────────────────────────

/// `GET /cities[?q=...][&province=<id>]`
pub async fn list_cities<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<City>>, ApiError>
where
  S: RosterStore,
{
  Ok(Json(store.list_cities(params.into()).await.map_err(ApiError::store)?))
}

/// `POST /cities` with body `{"name":"Truro","province_id":1}`
pub async fn add_city<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewCity>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore,
{
  require_name(&body.name)?;
  let provinces = store
    .list_provinces(ReferenceQuery::default())
    .await
    .map_err(ApiError::store)?;
  if !provinces.iter().any(|p| p.id == body.province_id) {
    return Err(
      ValidationErrors(vec![FieldError::field(
        "province",
        format!(
          "Select a valid choice. {} is not one of the available choices.",
          body.province_id
        ),
      )])
      .into(),
    );
  }
  let city = store.add_city(body).await.map_err(ApiError::store)??;
  Ok((StatusCode::CREATED, Json(city)))
}

// ─── Relationships ────────────────────────────────────────────────────────────

/// `GET /relationships[?q=...]`
pub async fn list_relationships<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Relationship>>, ApiError>
where
  S: RosterStore,
{
  Ok(Json(store.list_relationships(params.into()).await.map_err(ApiError::store)?))
}

/// `POST /relationships` with body `{"name":"Cousin"}`
pub async fn add_relationship<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore,
{
  require_name(&body.name)?;
  let rel = store.add_relationship(body.name).await.map_err(ApiError::store)??;
  Ok((StatusCode::CREATED, Json(rel)))
}

// ─── Statuses ─────────────────────────────────────────────────────────────────

/// `GET /statuses[?q=...]`
pub async fn list_statuses<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Status>>, ApiError>
where
  S: RosterStore,
{
  Ok(Json(store.list_statuses(params.into()).await.map_err(ApiError::store)?))
}

/// `POST /statuses` with body `{"name":"Seasonal"}`. New statuses never join
/// the active set.
pub async fn add_status<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore,
{
  require_name(&body.name)?;
  let status = store.add_status(body.name).await.map_err(ApiError::store)??;
  Ok((StatusCode::CREATED, Json(status)))
}

// ─── Geographies ──────────────────────────────────────────────────────────────

/// `GET /geographies[?q=...]`
pub async fn list_geographies<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Geography>>, ApiError>
where
  S: RosterStore,
{
  Ok(Json(store.list_geographies(params.into()).await.map_err(ApiError::store)?))
}

/// `POST /geographies` with body `{"name":"NB","timezone":"America/Moncton"}`
pub async fn add_geography<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewGeography>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RosterStore,
{
  require_name(&body.name)?;
  let geography = store.add_geography(body).await.map_err(ApiError::store)??;
  Ok((StatusCode::CREATED, Json(geography)))
}
