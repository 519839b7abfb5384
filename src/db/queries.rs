use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rusqlite::{params, params_from_iter, Connection};

use crate::models::{
    weekday_from_index, Appointment, AppointmentStatus, BlockedPeriod, Customer,
    SpecificDateAvailability, Treatment, WeeklyAvailability,
};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";

fn fmt_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

fn parse_datetime(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .with_context(|| format!("invalid datetime in database: {s}"))
}

fn parse_opt_datetime(s: Option<String>) -> anyhow::Result<Option<NaiveDateTime>> {
    s.as_deref().map(parse_datetime).transpose()
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).with_context(|| format!("invalid date in database: {s}"))
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FMT).with_context(|| format!("invalid time in database: {s}"))
}

fn parse_weekday(index: i64) -> anyhow::Result<Weekday> {
    weekday_from_index(index)
        .with_context(|| format!("invalid day_of_week in database: {index}"))
}

// ── Treatments ──

pub fn get_treatment(conn: &Connection, id: &str) -> anyhow::Result<Option<Treatment>> {
    let result = conn.query_row(
        "SELECT id, name, duration_minutes, active FROM treatments WHERE id = ?1",
        params![id],
        |row| {
            Ok(Treatment {
                id: row.get(0)?,
                name: row.get(1)?,
                duration_minutes: row.get(2)?,
                active: row.get::<_, i64>(3)? != 0,
            })
        },
    );

    match result {
        Ok(treatment) => Ok(Some(treatment)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_active_treatments(conn: &Connection) -> anyhow::Result<Vec<Treatment>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, duration_minutes, active FROM treatments WHERE active = 1 ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Treatment {
            id: row.get(0)?,
            name: row.get(1)?,
            duration_minutes: row.get(2)?,
            active: row.get::<_, i64>(3)? != 0,
        })
    })?;

    let mut treatments = vec![];
    for row in rows {
        treatments.push(row?);
    }
    Ok(treatments)
}

pub fn insert_treatment(conn: &Connection, treatment: &Treatment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO treatments (id, name, duration_minutes, active) VALUES (?1, ?2, ?3, ?4)",
        params![
            treatment.id,
            treatment.name,
            treatment.duration_minutes,
            treatment.active as i64,
        ],
    )?;
    Ok(())
}

// ── Customers ──

pub fn get_customer(conn: &Connection, id: &str) -> anyhow::Result<Option<Customer>> {
    let result = conn.query_row(
        "SELECT id, name, email FROM customers WHERE id = ?1",
        params![id],
        |row| {
            Ok(Customer {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
            })
        },
    );

    match result {
        Ok(customer) => Ok(Some(customer)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn insert_customer(conn: &Connection, customer: &Customer) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO customers (id, name, email) VALUES (?1, ?2, ?3)",
        params![customer.id, customer.name, customer.email],
    )?;
    Ok(())
}

// ── Weekly Availability ──

pub fn insert_weekly(conn: &Connection, window: &WeeklyAvailability) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO weekly_availability (id, day_of_week, start_time, end_time, active)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            window.id,
            window.day_of_week.num_days_from_monday() as i64,
            window.start_time.format(TIME_FMT).to_string(),
            window.end_time.format(TIME_FMT).to_string(),
            window.active as i64,
        ],
    )?;
    Ok(())
}

pub fn update_weekly(conn: &Connection, window: &WeeklyAvailability) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE weekly_availability SET day_of_week = ?1, start_time = ?2, end_time = ?3, active = ?4
         WHERE id = ?5",
        params![
            window.day_of_week.num_days_from_monday() as i64,
            window.start_time.format(TIME_FMT).to_string(),
            window.end_time.format(TIME_FMT).to_string(),
            window.active as i64,
            window.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_weekly(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM weekly_availability WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn delete_weekly_for_day(conn: &Connection, day: Weekday) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM weekly_availability WHERE day_of_week = ?1",
        params![day.num_days_from_monday() as i64],
    )?;
    Ok(count)
}

pub fn get_weekly(conn: &Connection, id: &str) -> anyhow::Result<Option<WeeklyAvailability>> {
    let result = conn.query_row(
        "SELECT id, day_of_week, start_time, end_time, active
         FROM weekly_availability WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        },
    );

    match result {
        Ok(raw) => Ok(Some(weekly_from_raw(raw)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_weekly(conn: &Connection) -> anyhow::Result<Vec<WeeklyAvailability>> {
    weekly_query(
        conn,
        "SELECT id, day_of_week, start_time, end_time, active
         FROM weekly_availability ORDER BY day_of_week, start_time",
        params![],
    )
}

pub fn list_weekly_for_day(
    conn: &Connection,
    day: Weekday,
    active_only: bool,
) -> anyhow::Result<Vec<WeeklyAvailability>> {
    let index = day.num_days_from_monday() as i64;
    if active_only {
        weekly_query(
            conn,
            "SELECT id, day_of_week, start_time, end_time, active
             FROM weekly_availability WHERE day_of_week = ?1 AND active = 1 ORDER BY start_time",
            params![index],
        )
    } else {
        weekly_query(
            conn,
            "SELECT id, day_of_week, start_time, end_time, active
             FROM weekly_availability WHERE day_of_week = ?1 ORDER BY start_time",
            params![index],
        )
    }
}

fn weekly_query(
    conn: &Connection,
    sql: &str,
    query_params: impl rusqlite::Params,
) -> anyhow::Result<Vec<WeeklyAvailability>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(query_params, |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut windows = vec![];
    for row in rows {
        windows.push(weekly_from_raw(row?)?);
    }
    Ok(windows)
}

fn weekly_from_raw(raw: (String, i64, String, String, i64)) -> anyhow::Result<WeeklyAvailability> {
    let (id, day, start, end, active) = raw;
    Ok(WeeklyAvailability {
        id,
        day_of_week: parse_weekday(day)?,
        start_time: parse_time(&start)?,
        end_time: parse_time(&end)?,
        active: active != 0,
    })
}

// ── Specific Date Availability ──

pub fn insert_specific_date(
    conn: &Connection,
    window: &SpecificDateAvailability,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO specific_date_availability (id, date, start_time, end_time, active, reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            window.id,
            window.date.format(DATE_FMT).to_string(),
            window.start_time.format(TIME_FMT).to_string(),
            window.end_time.format(TIME_FMT).to_string(),
            window.active as i64,
            window.reason,
        ],
    )?;
    Ok(())
}

pub fn update_specific_date(
    conn: &Connection,
    window: &SpecificDateAvailability,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE specific_date_availability
         SET date = ?1, start_time = ?2, end_time = ?3, active = ?4, reason = ?5
         WHERE id = ?6",
        params![
            window.date.format(DATE_FMT).to_string(),
            window.start_time.format(TIME_FMT).to_string(),
            window.end_time.format(TIME_FMT).to_string(),
            window.active as i64,
            window.reason,
            window.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_specific_date(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM specific_date_availability WHERE id = ?1",
        params![id],
    )?;
    Ok(count > 0)
}

pub fn delete_specific_date_for_date(conn: &Connection, date: NaiveDate) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM specific_date_availability WHERE date = ?1",
        params![date.format(DATE_FMT).to_string()],
    )?;
    Ok(count)
}

pub fn get_specific_date(
    conn: &Connection,
    id: &str,
) -> anyhow::Result<Option<SpecificDateAvailability>> {
    let result = conn.query_row(
        "SELECT id, date, start_time, end_time, active, reason
         FROM specific_date_availability WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        },
    );

    match result {
        Ok(raw) => Ok(Some(specific_date_from_raw(raw)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_specific_date(conn: &Connection) -> anyhow::Result<Vec<SpecificDateAvailability>> {
    specific_date_query(
        conn,
        "SELECT id, date, start_time, end_time, active, reason
         FROM specific_date_availability ORDER BY date, start_time",
        params![],
    )
}

pub fn list_specific_date_for_date(
    conn: &Connection,
    date: NaiveDate,
    active_only: bool,
) -> anyhow::Result<Vec<SpecificDateAvailability>> {
    let date_str = date.format(DATE_FMT).to_string();
    if active_only {
        specific_date_query(
            conn,
            "SELECT id, date, start_time, end_time, active, reason
             FROM specific_date_availability WHERE date = ?1 AND active = 1 ORDER BY start_time",
            params![date_str],
        )
    } else {
        specific_date_query(
            conn,
            "SELECT id, date, start_time, end_time, active, reason
             FROM specific_date_availability WHERE date = ?1 ORDER BY start_time",
            params![date_str],
        )
    }
}

fn specific_date_query(
    conn: &Connection,
    sql: &str,
    query_params: impl rusqlite::Params,
) -> anyhow::Result<Vec<SpecificDateAvailability>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(query_params, |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut windows = vec![];
    for row in rows {
        windows.push(specific_date_from_raw(row?)?);
    }
    Ok(windows)
}

fn specific_date_from_raw(
    raw: (String, String, String, String, i64, Option<String>),
) -> anyhow::Result<SpecificDateAvailability> {
    let (id, date, start, end, active, reason) = raw;
    Ok(SpecificDateAvailability {
        id,
        date: parse_date(&date)?,
        start_time: parse_time(&start)?,
        end_time: parse_time(&end)?,
        active: active != 0,
        reason,
    })
}

// ── Blocked Periods ──

pub fn insert_blocked_period(conn: &Connection, period: &BlockedPeriod) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO blocked_periods (id, start_date_time, end_date_time, reason)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            period.id,
            fmt_datetime(&period.start_date_time),
            fmt_datetime(&period.end_date_time),
            period.reason,
        ],
    )?;
    Ok(())
}

pub fn delete_blocked_period(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM blocked_periods WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn list_blocked_periods(conn: &Connection) -> anyhow::Result<Vec<BlockedPeriod>> {
    blocked_query(
        conn,
        "SELECT id, start_date_time, end_date_time, reason
         FROM blocked_periods ORDER BY start_date_time",
        params![],
    )
}

/// Blocked periods overlapping [start, end), half-open on both sides.
pub fn list_blocked_periods_overlapping(
    conn: &Connection,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<Vec<BlockedPeriod>> {
    blocked_query(
        conn,
        "SELECT id, start_date_time, end_date_time, reason
         FROM blocked_periods WHERE start_date_time < ?1 AND end_date_time > ?2
         ORDER BY start_date_time",
        params![fmt_datetime(end), fmt_datetime(start)],
    )
}

fn blocked_query(
    conn: &Connection,
    sql: &str,
    query_params: impl rusqlite::Params,
) -> anyhow::Result<Vec<BlockedPeriod>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(query_params, |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut periods = vec![];
    for row in rows {
        let (id, start, end, reason) = row?;
        periods.push(BlockedPeriod {
            id,
            start_date_time: parse_datetime(&start)?,
            end_date_time: parse_datetime(&end)?,
            reason,
        });
    }
    Ok(periods)
}

// ── Appointments ──

const APPOINTMENT_COLUMNS: &str = "id, customer_id, treatment_id, scheduled_at, duration_minutes, \
     status, customer_notes, owner_notes, rejection_reason, confirmed_at, cancelled_at, \
     completed_at, created_at, updated_at";

pub fn insert_appointment(conn: &Connection, appointment: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, customer_id, treatment_id, scheduled_at, duration_minutes,
             status, customer_notes, owner_notes, rejection_reason, confirmed_at, cancelled_at,
             completed_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            appointment.id,
            appointment.customer_id,
            appointment.treatment_id,
            fmt_datetime(&appointment.scheduled_at),
            appointment.duration_minutes,
            appointment.status.as_str(),
            appointment.customer_notes,
            appointment.owner_notes,
            appointment.rejection_reason,
            appointment.confirmed_at.as_ref().map(fmt_datetime),
            appointment.cancelled_at.as_ref().map(fmt_datetime),
            appointment.completed_at.as_ref().map(fmt_datetime),
            fmt_datetime(&appointment.created_at),
            fmt_datetime(&appointment.updated_at),
        ],
    )?;
    Ok(())
}

/// Persists status, notes and lifecycle timestamps. Booking fields
/// (customer, treatment, scheduled_at, duration) are immutable after insert.
pub fn update_appointment(conn: &Connection, appointment: &Appointment) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, customer_notes = ?2, owner_notes = ?3,
             rejection_reason = ?4, confirmed_at = ?5, cancelled_at = ?6, completed_at = ?7,
             updated_at = ?8
         WHERE id = ?9",
        params![
            appointment.status.as_str(),
            appointment.customer_notes,
            appointment.owner_notes,
            appointment.rejection_reason,
            appointment.confirmed_at.as_ref().map(fmt_datetime),
            appointment.cancelled_at.as_ref().map(fmt_datetime),
            appointment.completed_at.as_ref().map(fmt_datetime),
            fmt_datetime(&appointment.updated_at),
            appointment.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_appointment_row(row)));

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Appointments with `scheduled_at` in [start, end) and one of the given
/// statuses, ordered by start time.
pub fn list_appointments_between(
    conn: &Connection,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    statuses: &[AppointmentStatus],
) -> anyhow::Result<Vec<Appointment>> {
    if statuses.is_empty() {
        return Ok(vec![]);
    }

    let placeholders = (3..3 + statuses.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE scheduled_at >= ?1 AND scheduled_at < ?2 AND status IN ({placeholders})
         ORDER BY scheduled_at ASC"
    );

    let mut query_params: Vec<String> = vec![fmt_datetime(start), fmt_datetime(end)];
    query_params.extend(statuses.iter().map(|s| s.as_str().to_string()));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(query_params), |row| {
        Ok(parse_appointment_row(row))
    })?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn list_appointments_for_customer(
    conn: &Connection,
    customer_id: &str,
) -> anyhow::Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE customer_id = ?1 ORDER BY scheduled_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![customer_id], |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn list_appointments(
    conn: &Connection,
    status_filter: Option<AppointmentStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Appointment>> {
    let mut appointments = vec![];
    match status_filter {
        Some(status) => {
            let sql = format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE status = ?1 ORDER BY scheduled_at DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![status.as_str(), limit], |row| {
                Ok(parse_appointment_row(row))
            })?;
            for row in rows {
                appointments.push(row??);
            }
        }
        None => {
            let sql = format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 ORDER BY scheduled_at DESC LIMIT ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit], |row| Ok(parse_appointment_row(row)))?;
            for row in rows {
                appointments.push(row??);
            }
        }
    }
    Ok(appointments)
}

pub fn list_pending_appointments(conn: &Connection) -> anyhow::Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE status = 'pending' ORDER BY scheduled_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let id: String = row.get(0)?;
    let customer_id: String = row.get(1)?;
    let treatment_id: String = row.get(2)?;
    let scheduled_at: String = row.get(3)?;
    let duration_minutes: i64 = row.get(4)?;
    let status: String = row.get(5)?;
    let customer_notes: Option<String> = row.get(6)?;
    let owner_notes: Option<String> = row.get(7)?;
    let rejection_reason: Option<String> = row.get(8)?;
    let confirmed_at: Option<String> = row.get(9)?;
    let cancelled_at: Option<String> = row.get(10)?;
    let completed_at: Option<String> = row.get(11)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(Appointment {
        id,
        customer_id,
        treatment_id,
        scheduled_at: parse_datetime(&scheduled_at)?,
        duration_minutes,
        status: AppointmentStatus::parse(&status)
            .with_context(|| format!("invalid appointment status in database: {status}"))?,
        customer_notes,
        owner_notes,
        rejection_reason,
        confirmed_at: parse_opt_datetime(confirmed_at)?,
        cancelled_at: parse_opt_datetime(cancelled_at)?,
        completed_at: parse_opt_datetime(completed_at)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}
