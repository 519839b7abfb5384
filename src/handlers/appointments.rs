use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDateTime;
use serde::Deserialize;

use super::customer_header;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::Appointment;
use crate::services::appointments::{self, BookingRequest};
use crate::state::AppState;

// POST /api/appointments
#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub treatment_id: String,
    pub scheduled_at: NaiveDateTime,
    pub customer_notes: Option<String>,
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let customer_id = customer_header(&headers)?;
    let now = state.clock.now();

    let appointment = {
        let mut db = state.db.lock().unwrap();
        appointments::book(
            &mut db,
            state.config.slot_increment_minutes,
            now,
            &customer_id,
            BookingRequest {
                treatment_id: request.treatment_id,
                scheduled_at: request.scheduled_at,
                customer_notes: request.customer_notes,
            },
        )?
    };

    tracing::info!(
        appointment_id = %appointment.id,
        scheduled_at = %appointment.scheduled_at,
        "appointment booked"
    );
    Ok((StatusCode::CREATED, Json(appointment)))
}

// GET /api/appointments
pub async fn list_my_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let customer_id = customer_header(&headers)?;
    let appointments = {
        let db = state.db.lock().unwrap();
        queries::list_appointments_for_customer(&db, &customer_id)?
    };
    Ok(Json(appointments))
}

// DELETE /api/appointments/:id
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let customer_id = customer_header(&headers)?;
    let now = state.clock.now();

    let appointment = {
        let db = state.db.lock().unwrap();
        appointments::cancel(
            &db,
            state.config.cancellation_deadline_hours,
            now,
            &id,
            &customer_id,
        )?
    };

    tracing::info!(appointment_id = %appointment.id, "appointment cancelled");
    Ok(Json(appointment))
}
