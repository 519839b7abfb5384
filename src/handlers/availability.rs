use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    weekday_name, BlockedPeriod, SpecificDateAvailability, WeeklyAvailability,
};
use crate::services::availability::{
    self, BlockedPeriodSpec, DateWindowPatch, DateWindowSpec, ReplacementWindow,
    WeeklyWindowPatch, WeeklyWindowSpec,
};
use crate::state::AppState;

const TIME_FMT: &str = "%H:%M";

fn parse_day(s: &str) -> Result<Weekday, AppError> {
    s.parse()
        .map_err(|_| AppError::InvalidArgument(format!("invalid day of week: {s}")))
}

fn parse_time(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s, TIME_FMT)
        .map_err(|_| AppError::InvalidArgument(format!("invalid time, expected HH:MM: {s}")))
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidArgument(format!("invalid date, expected YYYY-MM-DD: {s}")))
}

// ── Weekly Availability ──

#[derive(Deserialize)]
pub struct WeeklyWindowRequest {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct WeeklyWindowUpdateRequest {
    pub day_of_week: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub active: Option<bool>,
}

#[derive(Serialize)]
pub struct WeeklyWindowResponse {
    pub id: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub active: bool,
}

impl From<WeeklyAvailability> for WeeklyWindowResponse {
    fn from(w: WeeklyAvailability) -> Self {
        WeeklyWindowResponse {
            id: w.id,
            day_of_week: weekday_name(w.day_of_week).to_string(),
            start_time: w.start_time.format(TIME_FMT).to_string(),
            end_time: w.end_time.format(TIME_FMT).to_string(),
            active: w.active,
        }
    }
}

// GET /api/admin/availability/weekly
pub async fn list_weekly(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<WeeklyWindowResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let windows = {
        let db = state.db.lock().unwrap();
        queries::list_weekly(&db)?
    };
    Ok(Json(windows.into_iter().map(Into::into).collect()))
}

// POST /api/admin/availability/weekly
pub async fn create_weekly(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<WeeklyWindowRequest>,
) -> Result<(StatusCode, Json<WeeklyWindowResponse>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let spec = WeeklyWindowSpec {
        day_of_week: parse_day(&request.day_of_week)?,
        start_time: parse_time(&request.start_time)?,
        end_time: parse_time(&request.end_time)?,
        active: request.active.unwrap_or(true),
    };

    let window = {
        let db = state.db.lock().unwrap();
        availability::create_weekly(&db, spec)?
    };
    Ok((StatusCode::CREATED, Json(window.into())))
}

// PUT /api/admin/availability/weekly/:id
pub async fn update_weekly(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<WeeklyWindowUpdateRequest>,
) -> Result<Json<WeeklyWindowResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let patch = WeeklyWindowPatch {
        day_of_week: request.day_of_week.as_deref().map(parse_day).transpose()?,
        start_time: request.start_time.as_deref().map(parse_time).transpose()?,
        end_time: request.end_time.as_deref().map(parse_time).transpose()?,
        active: request.active,
    };

    let window = {
        let db = state.db.lock().unwrap();
        availability::update_weekly(&db, &id, patch)?
    };
    Ok(Json(window.into()))
}

// DELETE /api/admin/availability/weekly/:id
pub async fn delete_weekly(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    {
        let db = state.db.lock().unwrap();
        availability::delete_weekly(&db, &id)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ReplacementWindowRequest {
    pub start_time: String,
    pub end_time: String,
    pub active: Option<bool>,
    pub reason: Option<String>,
}

impl ReplacementWindowRequest {
    fn into_window(self) -> Result<ReplacementWindow, AppError> {
        Ok(ReplacementWindow {
            start_time: parse_time(&self.start_time)?,
            end_time: parse_time(&self.end_time)?,
            active: self.active.unwrap_or(true),
            reason: self.reason,
        })
    }
}

// PUT /api/admin/availability/weekly/day/:day
pub async fn replace_weekly_day(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(day): Path<String>,
    Json(request): Json<Vec<ReplacementWindowRequest>>,
) -> Result<Json<Vec<WeeklyWindowResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let day = parse_day(&day)?;
    let windows = request
        .into_iter()
        .map(ReplacementWindowRequest::into_window)
        .collect::<Result<Vec<_>, _>>()?;

    let created = {
        let mut db = state.db.lock().unwrap();
        availability::replace_weekly_for_day(&mut db, day, windows)?
    };
    Ok(Json(created.into_iter().map(Into::into).collect()))
}

// ── Specific Date Availability ──

#[derive(Deserialize)]
pub struct DateWindowRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub active: Option<bool>,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct DateWindowUpdateRequest {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub active: Option<bool>,
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct DateWindowResponse {
    pub id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub active: bool,
    pub reason: Option<String>,
}

impl From<SpecificDateAvailability> for DateWindowResponse {
    fn from(w: SpecificDateAvailability) -> Self {
        DateWindowResponse {
            id: w.id,
            date: w.date,
            start_time: w.start_time.format(TIME_FMT).to_string(),
            end_time: w.end_time.format(TIME_FMT).to_string(),
            active: w.active,
            reason: w.reason,
        }
    }
}

// GET /api/admin/availability/dates
pub async fn list_dates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<DateWindowResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let windows = {
        let db = state.db.lock().unwrap();
        queries::list_specific_date(&db)?
    };
    Ok(Json(windows.into_iter().map(Into::into).collect()))
}

// POST /api/admin/availability/dates
pub async fn create_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<DateWindowRequest>,
) -> Result<(StatusCode, Json<DateWindowResponse>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let spec = DateWindowSpec {
        date: parse_date(&request.date)?,
        start_time: parse_time(&request.start_time)?,
        end_time: parse_time(&request.end_time)?,
        active: request.active.unwrap_or(true),
        reason: request.reason,
    };

    let window = {
        let db = state.db.lock().unwrap();
        availability::create_specific_date(&db, spec)?
    };
    Ok((StatusCode::CREATED, Json(window.into())))
}

// PUT /api/admin/availability/dates/:id
pub async fn update_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<DateWindowUpdateRequest>,
) -> Result<Json<DateWindowResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let patch = DateWindowPatch {
        date: request.date.as_deref().map(parse_date).transpose()?,
        start_time: request.start_time.as_deref().map(parse_time).transpose()?,
        end_time: request.end_time.as_deref().map(parse_time).transpose()?,
        active: request.active,
        reason: request.reason,
    };

    let window = {
        let db = state.db.lock().unwrap();
        availability::update_specific_date(&db, &id, patch)?
    };
    Ok(Json(window.into()))
}

// DELETE /api/admin/availability/dates/:id
pub async fn delete_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    {
        let db = state.db.lock().unwrap();
        availability::delete_specific_date(&db, &id)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/admin/availability/dates/date/:date
pub async fn replace_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(date): Path<String>,
    Json(request): Json<Vec<ReplacementWindowRequest>>,
) -> Result<Json<Vec<DateWindowResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = parse_date(&date)?;
    let windows = request
        .into_iter()
        .map(ReplacementWindowRequest::into_window)
        .collect::<Result<Vec<_>, _>>()?;

    let created = {
        let mut db = state.db.lock().unwrap();
        availability::replace_for_date(&mut db, date, windows)?
    };
    Ok(Json(created.into_iter().map(Into::into).collect()))
}

// ── Blocked Periods ──

#[derive(Deserialize)]
pub struct BlockedPeriodRequest {
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct BlockedPeriodResponse {
    pub id: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub reason: Option<String>,
}

impl From<BlockedPeriod> for BlockedPeriodResponse {
    fn from(p: BlockedPeriod) -> Self {
        BlockedPeriodResponse {
            id: p.id,
            start_date_time: p.start_date_time,
            end_date_time: p.end_date_time,
            reason: p.reason,
        }
    }
}

// GET /api/admin/availability/blocked
pub async fn list_blocked(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BlockedPeriodResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let periods = {
        let db = state.db.lock().unwrap();
        queries::list_blocked_periods(&db)?
    };
    Ok(Json(periods.into_iter().map(Into::into).collect()))
}

// POST /api/admin/availability/blocked
pub async fn create_blocked(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<BlockedPeriodRequest>,
) -> Result<(StatusCode, Json<BlockedPeriodResponse>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let period = {
        let db = state.db.lock().unwrap();
        availability::create_blocked_period(
            &db,
            BlockedPeriodSpec {
                start_date_time: request.start_date_time,
                end_date_time: request.end_date_time,
                reason: request.reason,
            },
        )?
    };
    Ok((StatusCode::CREATED, Json(period.into())))
}

// DELETE /api/admin/availability/blocked/:id
pub async fn delete_blocked(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    {
        let db = state.db.lock().unwrap();
        availability::delete_blocked_period(&db, &id)?;
    }
    Ok(StatusCode::NO_CONTENT)
}
