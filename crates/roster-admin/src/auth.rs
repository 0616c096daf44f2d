//! HTTP Basic auth against staff employees, plus password hashing.
//!
//! The username is the employee's email. Only accounts with both
//! `is_staff` and `is_active` set and a usable argon2 hash get through.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;
use roster_core::store::RosterStore;
use tracing::{debug, warn};

use crate::error::ApiError;

/// The authenticated staff member, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct StaffUser {
  pub id:    i64,
  pub email: String,
}

/// Hash `password` into an argon2 PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Check `password` against a stored PHC string. Unusable hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(stored) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// `(username, password)` from an `Authorization: Basic …` header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Route layer: reject anything that is not a staff login.
pub async fn require_staff<S>(
  State(store): State<Arc<S>>,
  mut req: Request,
  next: Next,
) -> Result<Response, ApiError>
where
  S: RosterStore + 'static,
{
  let (email, password) = basic_credentials(req.headers())?;

  let employee = store
    .find_employee_by_email(&email)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  if !(employee.record.is_staff && employee.record.is_active) {
    warn!(%email, "login refused: not an active staff account");
    return Err(ApiError::Unauthorized);
  }
  if !employee.has_usable_password() || !verify_password(&password, &employee.password) {
    warn!(%email, "login refused: bad password");
    return Err(ApiError::Unauthorized);
  }

  store.record_login(employee.id).await.map_err(ApiError::store)?;
  debug!(employee_id = employee.id, "authenticated");

  req.extensions_mut().insert(StaffUser { id: employee.id, email });
  Ok(next.run(req).await)
}
