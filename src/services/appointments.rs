use chrono::{Duration, NaiveDateTime};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{transition_allowed, Appointment, AppointmentStatus};
use crate::services::slots;

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub treatment_id: String,
    pub scheduled_at: NaiveDateTime,
    pub customer_notes: Option<String>,
}

/// Books an appointment for `customer_id` at the requested start.
///
/// The slot list the customer picked from may be stale, so availability is
/// re-checked here; the re-check and the insert run inside one IMMEDIATE
/// transaction, which together with the unique index on active starts
/// makes "check and reserve" atomic against concurrent bookings.
pub fn book(
    conn: &mut Connection,
    increment_minutes: i64,
    now: NaiveDateTime,
    customer_id: &str,
    request: BookingRequest,
) -> Result<Appointment, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    queries::get_customer(&tx, customer_id)?
        .ok_or_else(|| AppError::NotFound(format!("customer {customer_id}")))?;

    let treatment = queries::get_treatment(&tx, &request.treatment_id)?
        .ok_or_else(|| AppError::NotFound(format!("treatment {}", request.treatment_id)))?;
    if !treatment.active {
        return Err(AppError::InvalidArgument(format!(
            "treatment {} is not active",
            treatment.id
        )));
    }

    let day = slots::slots_for_date(
        &tx,
        &treatment.id,
        request.scheduled_at.date(),
        increment_minutes,
        now,
    )?;
    let slot_open = day
        .slots
        .iter()
        .any(|slot| slot.start_time == request.scheduled_at && slot.available);
    if !slot_open {
        return Err(AppError::SlotNotAvailable);
    }

    let appointment = Appointment {
        id: Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        treatment_id: treatment.id.clone(),
        scheduled_at: request.scheduled_at,
        // Frozen at booking time; later catalog edits do not touch it.
        duration_minutes: treatment.duration_minutes,
        status: AppointmentStatus::Pending,
        customer_notes: request.customer_notes,
        owner_notes: None,
        rejection_reason: None,
        confirmed_at: None,
        cancelled_at: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = queries::insert_appointment(&tx, &appointment) {
        if is_unique_violation(&e) {
            return Err(AppError::SlotNotAvailable);
        }
        return Err(e.into());
    }

    tx.commit()?;
    Ok(appointment)
}

/// Customer-initiated cancellation, allowed strictly before
/// `scheduled_at - deadline_hours`.
pub fn cancel(
    conn: &Connection,
    deadline_hours: i64,
    now: NaiveDateTime,
    appointment_id: &str,
    customer_id: &str,
) -> Result<Appointment, AppError> {
    let mut appointment = load_appointment(conn, appointment_id)?;

    if appointment.customer_id != customer_id {
        return Err(AppError::InvalidArgument(format!(
            "appointment {appointment_id} does not belong to the caller"
        )));
    }

    apply_transition(&mut appointment, AppointmentStatus::Cancelled)?;

    let deadline = appointment.scheduled_at - Duration::hours(deadline_hours);
    if now >= deadline {
        return Err(AppError::CancellationDeadlinePassed);
    }

    appointment.cancelled_at = Some(now);
    persist(conn, &mut appointment, now)?;
    Ok(appointment)
}

pub fn confirm(
    conn: &Connection,
    now: NaiveDateTime,
    appointment_id: &str,
    owner_notes: Option<String>,
) -> Result<Appointment, AppError> {
    let mut appointment = load_appointment(conn, appointment_id)?;
    apply_transition(&mut appointment, AppointmentStatus::Confirmed)?;

    appointment.confirmed_at = Some(now);
    if owner_notes.is_some() {
        appointment.owner_notes = owner_notes;
    }
    persist(conn, &mut appointment, now)?;
    Ok(appointment)
}

pub fn reject(
    conn: &Connection,
    now: NaiveDateTime,
    appointment_id: &str,
    reason: Option<String>,
    owner_notes: Option<String>,
) -> Result<Appointment, AppError> {
    let mut appointment = load_appointment(conn, appointment_id)?;
    apply_transition(&mut appointment, AppointmentStatus::Rejected)?;

    appointment.rejection_reason = reason;
    if owner_notes.is_some() {
        appointment.owner_notes = owner_notes;
    }
    persist(conn, &mut appointment, now)?;
    Ok(appointment)
}

/// Marks the appointment completed. The loyalty award that follows is the
/// caller's responsibility and must never roll this back.
pub fn complete(
    conn: &Connection,
    now: NaiveDateTime,
    appointment_id: &str,
    owner_notes: Option<String>,
) -> Result<Appointment, AppError> {
    let mut appointment = load_appointment(conn, appointment_id)?;
    apply_transition(&mut appointment, AppointmentStatus::Completed)?;

    appointment.completed_at = Some(now);
    if owner_notes.is_some() {
        appointment.owner_notes = owner_notes;
    }
    persist(conn, &mut appointment, now)?;
    Ok(appointment)
}

pub fn mark_no_show(
    conn: &Connection,
    now: NaiveDateTime,
    appointment_id: &str,
    owner_notes: Option<String>,
) -> Result<Appointment, AppError> {
    let mut appointment = load_appointment(conn, appointment_id)?;
    apply_transition(&mut appointment, AppointmentStatus::NoShow)?;

    if owner_notes.is_some() {
        appointment.owner_notes = owner_notes;
    }
    persist(conn, &mut appointment, now)?;
    Ok(appointment)
}

fn load_appointment(conn: &Connection, id: &str) -> Result<Appointment, AppError> {
    queries::get_appointment(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("appointment {id}")))
}

fn apply_transition(
    appointment: &mut Appointment,
    to: AppointmentStatus,
) -> Result<(), AppError> {
    if !transition_allowed(appointment.status, to) {
        return Err(AppError::InvalidStatusTransition {
            from: appointment.status.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
    appointment.status = to;
    Ok(())
}

fn persist(
    conn: &Connection,
    appointment: &mut Appointment,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    appointment.updated_at = now;
    if !queries::update_appointment(conn, appointment)? {
        return Err(AppError::NotFound(format!("appointment {}", appointment.id)));
    }
    Ok(())
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(f, _))
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
