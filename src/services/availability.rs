use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    intervals_overlap, BlockedPeriod, SpecificDateAvailability, WeeklyAvailability,
};

// Rule mutation lives here; slot generation only ever reads the rule set.
// The invariant guarded throughout: active windows of one kind scoped to
// the same weekday (or the same date) never overlap.

#[derive(Debug, Clone)]
pub struct WeeklyWindowSpec {
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WeeklyWindowPatch {
    pub day_of_week: Option<Weekday>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct DateWindowSpec {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub active: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DateWindowPatch {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub active: Option<bool>,
    pub reason: Option<String>,
}

/// One window of a replace-for-day / replace-for-date payload.
#[derive(Debug, Clone)]
pub struct ReplacementWindow {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub active: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BlockedPeriodSpec {
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub reason: Option<String>,
}

// ── Weekly Availability ──

pub fn create_weekly(
    conn: &Connection,
    spec: WeeklyWindowSpec,
) -> Result<WeeklyAvailability, AppError> {
    validate_times(spec.start_time, spec.end_time)?;
    validate_no_weekly_overlap(conn, spec.day_of_week, spec.start_time, spec.end_time, None)?;

    let window = WeeklyAvailability {
        id: Uuid::new_v4().to_string(),
        day_of_week: spec.day_of_week,
        start_time: spec.start_time,
        end_time: spec.end_time,
        active: spec.active,
    };
    queries::insert_weekly(conn, &window)?;
    Ok(window)
}

pub fn update_weekly(
    conn: &Connection,
    id: &str,
    patch: WeeklyWindowPatch,
) -> Result<WeeklyAvailability, AppError> {
    let existing = queries::get_weekly(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("weekly availability {id}")))?;

    let window = WeeklyAvailability {
        id: existing.id,
        day_of_week: patch.day_of_week.unwrap_or(existing.day_of_week),
        start_time: patch.start_time.unwrap_or(existing.start_time),
        end_time: patch.end_time.unwrap_or(existing.end_time),
        active: patch.active.unwrap_or(existing.active),
    };

    validate_times(window.start_time, window.end_time)?;
    validate_no_weekly_overlap(
        conn,
        window.day_of_week,
        window.start_time,
        window.end_time,
        Some(&window.id),
    )?;

    queries::update_weekly(conn, &window)?;
    Ok(window)
}

/// Atomic replace of a weekday's rule set. The incoming list is validated
/// before anything is deleted; a failed validation leaves the stored set
/// untouched.
pub fn replace_weekly_for_day(
    conn: &mut Connection,
    day: Weekday,
    windows: Vec<ReplacementWindow>,
) -> Result<Vec<WeeklyAvailability>, AppError> {
    validate_replacement_set(&windows)?;

    let tx = conn.transaction()?;
    queries::delete_weekly_for_day(&tx, day)?;

    let mut created = Vec::with_capacity(windows.len());
    for window in windows {
        let record = WeeklyAvailability {
            id: Uuid::new_v4().to_string(),
            day_of_week: day,
            start_time: window.start_time,
            end_time: window.end_time,
            active: window.active,
        };
        queries::insert_weekly(&tx, &record)?;
        created.push(record);
    }

    tx.commit()?;
    Ok(created)
}

pub fn delete_weekly(conn: &Connection, id: &str) -> Result<(), AppError> {
    if !queries::delete_weekly(conn, id)? {
        return Err(AppError::NotFound(format!("weekly availability {id}")));
    }
    Ok(())
}

fn validate_no_weekly_overlap(
    conn: &Connection,
    day: Weekday,
    start: NaiveTime,
    end: NaiveTime,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let existing = queries::list_weekly_for_day(conn, day, true)?;
    for window in &existing {
        if exclude_id == Some(window.id.as_str()) {
            continue;
        }
        if intervals_overlap(start, end, window.start_time, window.end_time) {
            return Err(AppError::OverlappingAvailability);
        }
    }
    Ok(())
}

// ── Specific Date Availability ──

pub fn create_specific_date(
    conn: &Connection,
    spec: DateWindowSpec,
) -> Result<SpecificDateAvailability, AppError> {
    validate_times(spec.start_time, spec.end_time)?;
    validate_no_date_overlap(conn, spec.date, spec.start_time, spec.end_time, None)?;

    let window = SpecificDateAvailability {
        id: Uuid::new_v4().to_string(),
        date: spec.date,
        start_time: spec.start_time,
        end_time: spec.end_time,
        active: spec.active,
        reason: spec.reason,
    };
    queries::insert_specific_date(conn, &window)?;
    Ok(window)
}

pub fn update_specific_date(
    conn: &Connection,
    id: &str,
    patch: DateWindowPatch,
) -> Result<SpecificDateAvailability, AppError> {
    let existing = queries::get_specific_date(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("specific date availability {id}")))?;

    let window = SpecificDateAvailability {
        id: existing.id,
        date: patch.date.unwrap_or(existing.date),
        start_time: patch.start_time.unwrap_or(existing.start_time),
        end_time: patch.end_time.unwrap_or(existing.end_time),
        active: patch.active.unwrap_or(existing.active),
        reason: patch.reason.or(existing.reason),
    };

    validate_times(window.start_time, window.end_time)?;
    validate_no_date_overlap(
        conn,
        window.date,
        window.start_time,
        window.end_time,
        Some(&window.id),
    )?;

    queries::update_specific_date(conn, &window)?;
    Ok(window)
}

/// Same contract as `replace_weekly_for_day`, scoped by exact date.
pub fn replace_for_date(
    conn: &mut Connection,
    date: NaiveDate,
    windows: Vec<ReplacementWindow>,
) -> Result<Vec<SpecificDateAvailability>, AppError> {
    validate_replacement_set(&windows)?;

    let tx = conn.transaction()?;
    queries::delete_specific_date_for_date(&tx, date)?;

    let mut created = Vec::with_capacity(windows.len());
    for window in windows {
        let record = SpecificDateAvailability {
            id: Uuid::new_v4().to_string(),
            date,
            start_time: window.start_time,
            end_time: window.end_time,
            active: window.active,
            reason: window.reason,
        };
        queries::insert_specific_date(&tx, &record)?;
        created.push(record);
    }

    tx.commit()?;
    Ok(created)
}

pub fn delete_specific_date(conn: &Connection, id: &str) -> Result<(), AppError> {
    if !queries::delete_specific_date(conn, id)? {
        return Err(AppError::NotFound(format!(
            "specific date availability {id}"
        )));
    }
    Ok(())
}

fn validate_no_date_overlap(
    conn: &Connection,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let existing = queries::list_specific_date_for_date(conn, date, true)?;
    for window in &existing {
        if exclude_id == Some(window.id.as_str()) {
            continue;
        }
        if intervals_overlap(start, end, window.start_time, window.end_time) {
            return Err(AppError::OverlappingAvailability);
        }
    }
    Ok(())
}

// ── Blocked Periods ──

/// Blocked periods carry no overlap invariant; they may overlap each
/// other and any availability window.
pub fn create_blocked_period(
    conn: &Connection,
    spec: BlockedPeriodSpec,
) -> Result<BlockedPeriod, AppError> {
    if spec.start_date_time >= spec.end_date_time {
        return Err(AppError::InvalidArgument(
            "blocked period start must be before end".to_string(),
        ));
    }

    let period = BlockedPeriod {
        id: Uuid::new_v4().to_string(),
        start_date_time: spec.start_date_time,
        end_date_time: spec.end_date_time,
        reason: spec.reason,
    };
    queries::insert_blocked_period(conn, &period)?;
    Ok(period)
}

pub fn delete_blocked_period(conn: &Connection, id: &str) -> Result<(), AppError> {
    if !queries::delete_blocked_period(conn, id)? {
        return Err(AppError::NotFound(format!("blocked period {id}")));
    }
    Ok(())
}

// ── Shared validation ──

fn validate_times(start: NaiveTime, end: NaiveTime) -> Result<(), AppError> {
    if start >= end {
        return Err(AppError::InvalidArgument(
            "window start must be before end".to_string(),
        ));
    }
    Ok(())
}

fn validate_replacement_set(windows: &[ReplacementWindow]) -> Result<(), AppError> {
    for window in windows {
        validate_times(window.start_time, window.end_time)?;
    }
    for (i, a) in windows.iter().enumerate() {
        for b in &windows[i + 1..] {
            if intervals_overlap(a.start_time, a.end_time, b.start_time, b.end_time) {
                return Err(AppError::OverlappingAvailability);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn weekly(day: Weekday, start: &str, end: &str) -> WeeklyWindowSpec {
        WeeklyWindowSpec {
            day_of_week: day,
            start_time: t(start),
            end_time: t(end),
            active: true,
        }
    }

    fn replacement(start: &str, end: &str) -> ReplacementWindow {
        ReplacementWindow {
            start_time: t(start),
            end_time: t(end),
            active: true,
            reason: None,
        }
    }

    #[test]
    fn test_create_weekly_rejects_overlap() {
        let conn = setup_db();
        create_weekly(&conn, weekly(Weekday::Mon, "09:00", "12:00")).unwrap();

        let result = create_weekly(&conn, weekly(Weekday::Mon, "11:00", "14:00"));
        assert!(matches!(result, Err(AppError::OverlappingAvailability)));
    }

    #[test]
    fn test_create_weekly_allows_adjacent_and_other_days() {
        let conn = setup_db();
        create_weekly(&conn, weekly(Weekday::Mon, "09:00", "12:00")).unwrap();

        // Shares a boundary instant only: half-open intervals do not overlap.
        create_weekly(&conn, weekly(Weekday::Mon, "12:00", "14:00")).unwrap();
        // Same times on another weekday never conflict.
        create_weekly(&conn, weekly(Weekday::Tue, "09:00", "12:00")).unwrap();
    }

    #[test]
    fn test_create_weekly_ignores_inactive_windows() {
        let conn = setup_db();
        let mut spec = weekly(Weekday::Mon, "09:00", "12:00");
        spec.active = false;
        create_weekly(&conn, spec).unwrap();

        create_weekly(&conn, weekly(Weekday::Mon, "10:00", "13:00")).unwrap();
    }

    #[test]
    fn test_create_weekly_rejects_inverted_times() {
        let conn = setup_db();
        let result = create_weekly(&conn, weekly(Weekday::Mon, "12:00", "09:00"));
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_update_weekly_excludes_self_from_overlap_check() {
        let conn = setup_db();
        let window = create_weekly(&conn, weekly(Weekday::Mon, "09:00", "12:00")).unwrap();

        // Growing the same window by an hour overlaps only itself.
        let updated = update_weekly(
            &conn,
            &window.id,
            WeeklyWindowPatch {
                end_time: Some(t("13:00")),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.end_time, t("13:00"));
    }

    #[test]
    fn test_update_weekly_rejects_overlap_with_other_window() {
        let conn = setup_db();
        create_weekly(&conn, weekly(Weekday::Mon, "09:00", "12:00")).unwrap();
        let other = create_weekly(&conn, weekly(Weekday::Mon, "13:00", "15:00")).unwrap();

        let result = update_weekly(
            &conn,
            &other.id,
            WeeklyWindowPatch {
                start_time: Some(t("11:00")),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(AppError::OverlappingAvailability)));
    }

    #[test]
    fn test_update_weekly_not_found() {
        let conn = setup_db();
        let result = update_weekly(&conn, "missing", WeeklyWindowPatch::default());
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_replace_weekly_for_day() {
        let mut conn = setup_db();
        create_weekly(&conn, weekly(Weekday::Mon, "09:00", "12:00")).unwrap();

        let created = replace_weekly_for_day(
            &mut conn,
            Weekday::Mon,
            vec![replacement("08:00", "11:00"), replacement("13:00", "17:00")],
        )
        .unwrap();
        assert_eq!(created.len(), 2);

        let stored = queries::list_weekly_for_day(&conn, Weekday::Mon, true).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].start_time, t("08:00"));
        assert_eq!(stored[1].start_time, t("13:00"));
    }

    #[test]
    fn test_replace_weekly_is_idempotent() {
        let mut conn = setup_db();
        let windows = vec![replacement("09:00", "12:00"), replacement("14:00", "18:00")];

        replace_weekly_for_day(&mut conn, Weekday::Mon, windows.clone()).unwrap();
        replace_weekly_for_day(&mut conn, Weekday::Mon, windows).unwrap();

        let stored = queries::list_weekly_for_day(&conn, Weekday::Mon, true).unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn test_replace_weekly_validation_failure_keeps_existing_set() {
        let mut conn = setup_db();
        create_weekly(&conn, weekly(Weekday::Mon, "09:00", "12:00")).unwrap();

        let result = replace_weekly_for_day(
            &mut conn,
            Weekday::Mon,
            vec![replacement("08:00", "11:00"), replacement("10:00", "13:00")],
        );
        assert!(matches!(result, Err(AppError::OverlappingAvailability)));

        let stored = queries::list_weekly_for_day(&conn, Weekday::Mon, true).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].start_time, t("09:00"));
    }

    #[test]
    fn test_replace_weekly_with_empty_list_clears_day() {
        let mut conn = setup_db();
        create_weekly(&conn, weekly(Weekday::Mon, "09:00", "12:00")).unwrap();

        replace_weekly_for_day(&mut conn, Weekday::Mon, vec![]).unwrap();
        let stored = queries::list_weekly_for_day(&conn, Weekday::Mon, false).unwrap();
        assert!(stored.is_empty());
    }

    #[test]
    fn test_delete_weekly_not_found() {
        let conn = setup_db();
        let result = delete_weekly(&conn, "missing");
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_specific_date_overlap_scoped_to_date() {
        let conn = setup_db();
        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let other_date = NaiveDate::from_ymd_opt(2025, 6, 17).unwrap();

        create_specific_date(
            &conn,
            DateWindowSpec {
                date,
                start_time: t("09:00"),
                end_time: t("12:00"),
                active: true,
                reason: None,
            },
        )
        .unwrap();

        let overlapping = create_specific_date(
            &conn,
            DateWindowSpec {
                date,
                start_time: t("11:00"),
                end_time: t("13:00"),
                active: true,
                reason: None,
            },
        );
        assert!(matches!(
            overlapping,
            Err(AppError::OverlappingAvailability)
        ));

        // Same times on a different date are unrelated.
        create_specific_date(
            &conn,
            DateWindowSpec {
                date: other_date,
                start_time: t("11:00"),
                end_time: t("13:00"),
                active: true,
                reason: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_blocked_periods_may_overlap() {
        let conn = setup_db();
        let dt = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();

        create_blocked_period(
            &conn,
            BlockedPeriodSpec {
                start_date_time: dt("2025-06-16 10:00"),
                end_date_time: dt("2025-06-16 12:00"),
                reason: Some("lunch".to_string()),
            },
        )
        .unwrap();

        // Overlapping exclusions are allowed; only their union matters.
        create_blocked_period(
            &conn,
            BlockedPeriodSpec {
                start_date_time: dt("2025-06-16 11:00"),
                end_date_time: dt("2025-06-16 13:00"),
                reason: None,
            },
        )
        .unwrap();

        let stored = queries::list_blocked_periods(&conn).unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn test_delete_blocked_period_not_found() {
        let conn = setup_db();
        let result = delete_blocked_period(&conn, "missing");
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
