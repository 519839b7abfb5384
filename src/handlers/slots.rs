use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{DaySlots, Treatment};
use crate::services;
use crate::state::AppState;

// GET /api/treatments
pub async fn list_treatments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Treatment>>, AppError> {
    let treatments = {
        let db = state.db.lock().unwrap();
        queries::list_active_treatments(&db)?
    };
    Ok(Json(treatments))
}

// GET /api/slots?treatment_id=...&date=2025-06-16
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub treatment_id: String,
    pub date: NaiveDate,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<DaySlots>, AppError> {
    let now = state.clock.now();
    let day = {
        let db = state.db.lock().unwrap();
        services::slots::slots_for_date(
            &db,
            &query.treatment_id,
            query.date,
            state.config.slot_increment_minutes,
            now,
        )?
    };
    Ok(Json(day))
}

// GET /api/slots/range?treatment_id=...&from=2025-06-16&to=2025-06-22
#[derive(Deserialize)]
pub struct SlotsRangeQuery {
    pub treatment_id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

pub async fn get_slots_range(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsRangeQuery>,
) -> Result<Json<Vec<DaySlots>>, AppError> {
    let now = state.clock.now();
    let days = {
        let db = state.db.lock().unwrap();
        services::slots::slots_for_range(
            &db,
            &query.treatment_id,
            query.from,
            query.to,
            state.config.slot_increment_minutes,
            state.config.booking_horizon_days,
            now,
        )?
    };
    Ok(Json(days))
}
