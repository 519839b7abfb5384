pub mod admin;
pub mod appointments;
pub mod availability;
pub mod health;
pub mod slots;

use axum::http::HeaderMap;

use crate::errors::AppError;

/// Staff endpoints are guarded by a bearer token. Real role-based auth is
/// an outer concern; this keeps the engine drivable on its own.
pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Customer identity arrives from the outer auth layer as a header.
pub(crate) fn customer_header(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("x-customer-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)
}
