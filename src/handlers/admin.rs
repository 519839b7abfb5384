use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDateTime;
use serde::Deserialize;

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::appointments;
use crate::state::AppState;

// GET /api/admin/appointments?status=pending&limit=50
#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status_filter = query
        .status
        .as_deref()
        .map(|s| {
            AppointmentStatus::parse(s)
                .ok_or_else(|| AppError::InvalidArgument(format!("unknown status: {s}")))
        })
        .transpose()?;
    let limit = query.limit.unwrap_or(100);

    let appointments = {
        let db = state.db.lock().unwrap();
        queries::list_appointments(&db, status_filter, limit)?
    };
    Ok(Json(appointments))
}

// GET /api/admin/appointments/pending
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let appointments = {
        let db = state.db.lock().unwrap();
        queries::list_pending_appointments(&db)?
    };
    Ok(Json(appointments))
}

// GET /api/admin/schedule?from=...&to=...
#[derive(Deserialize)]
pub struct ScheduleQuery {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let appointments = {
        let db = state.db.lock().unwrap();
        queries::list_appointments_between(
            &db,
            &query.from,
            &query.to,
            &[AppointmentStatus::Pending, AppointmentStatus::Confirmed],
        )?
    };
    Ok(Json(appointments))
}

/// Optional note/reason payload shared by the staff transitions. An empty
/// JSON object is a valid body.
#[derive(Deserialize, Default)]
pub struct AppointmentActionRequest {
    pub reason: Option<String>,
    pub owner_notes: Option<String>,
}

// POST /api/admin/appointments/:id/confirm
pub async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<AppointmentActionRequest>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let now = state.clock.now();

    let appointment = {
        let db = state.db.lock().unwrap();
        appointments::confirm(&db, now, &id, request.owner_notes)?
    };
    Ok(Json(appointment))
}

// POST /api/admin/appointments/:id/reject
pub async fn reject_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<AppointmentActionRequest>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let now = state.clock.now();

    let appointment = {
        let db = state.db.lock().unwrap();
        appointments::reject(&db, now, &id, request.reason, request.owner_notes)?
    };
    Ok(Json(appointment))
}

// POST /api/admin/appointments/:id/complete
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<AppointmentActionRequest>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let now = state.clock.now();

    let appointment = {
        let db = state.db.lock().unwrap();
        appointments::complete(&db, now, &id, request.owner_notes)?
    };

    // Completion is already persisted; a loyalty fault must not undo it.
    if let Err(e) = state.loyalty.award(&appointment.id).await {
        tracing::warn!(
            appointment_id = %appointment.id,
            error = %e,
            "failed to award loyalty stamp"
        );
    }

    Ok(Json(appointment))
}

// POST /api/admin/appointments/:id/no-show
pub async fn mark_no_show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<AppointmentActionRequest>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let now = state.clock.now();

    let appointment = {
        let db = state.db.lock().unwrap();
        appointments::mark_no_show(&db, now, &id, request.owner_notes)?
    };
    Ok(Json(appointment))
}
