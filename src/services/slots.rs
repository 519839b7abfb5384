use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    intervals_overlap, Appointment, AppointmentStatus, BlockedPeriod, DaySlots, OpeningWindow,
    TimeSlot, Treatment,
};

const OCCUPYING_STATUSES: [AppointmentStatus; 2] =
    [AppointmentStatus::Pending, AppointmentStatus::Confirmed];

/// Pure slot computation for one date. Walks each opening window
/// independently: cursor starts at the window start and advances by the
/// increment while `cursor + duration` still fits (a slot ending exactly
/// at the window end is valid). Every candidate is returned; the
/// `available` flag carries the past/blocked/booked verdict.
pub fn generate_slots(
    date: NaiveDate,
    duration_minutes: i64,
    increment_minutes: i64,
    now: NaiveDateTime,
    windows: &[OpeningWindow],
    blocked: &[BlockedPeriod],
    appointments: &[Appointment],
) -> Vec<TimeSlot> {
    if duration_minutes <= 0 || increment_minutes <= 0 {
        return Vec::new();
    }

    let duration = Duration::minutes(duration_minutes);
    let increment = Duration::minutes(increment_minutes);

    let mut slots = Vec::new();
    for window in windows {
        let window_end = date.and_time(window.end_time);
        let mut cursor = date.and_time(window.start_time);

        while cursor + duration <= window_end {
            let slot_end = cursor + duration;
            let available = cursor >= now
                && !blocked.iter().any(|bp| {
                    intervals_overlap(cursor, slot_end, bp.start_date_time, bp.end_date_time)
                })
                && !appointments.iter().any(|apt| {
                    intervals_overlap(cursor, slot_end, apt.scheduled_at, apt.end_time())
                });

            slots.push(TimeSlot {
                start_time: cursor,
                end_time: slot_end,
                available,
            });
            cursor += increment;
        }
    }

    slots
}

/// Resolves the opening windows for one date. Active per-date overrides
/// replace the weekly rules for that date entirely; the weekly rules for
/// the weekday apply otherwise.
pub fn resolve_windows(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<OpeningWindow>> {
    let overrides = queries::list_specific_date_for_date(conn, date, true)?;
    if !overrides.is_empty() {
        return Ok(overrides.iter().map(OpeningWindow::from).collect());
    }

    let weekly = queries::list_weekly_for_day(conn, date.weekday(), true)?;
    Ok(weekly.iter().map(OpeningWindow::from).collect())
}

pub fn slots_for_date(
    conn: &Connection,
    treatment_id: &str,
    date: NaiveDate,
    increment_minutes: i64,
    now: NaiveDateTime,
) -> Result<DaySlots, AppError> {
    let treatment = resolve_treatment(conn, treatment_id)?;
    day_slots(conn, &treatment, date, increment_minutes, now)
}

/// One `DaySlots` per date in [from, to], inclusive. Dates without
/// windows yield empty slot lists, not errors.
pub fn slots_for_range(
    conn: &Connection,
    treatment_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    increment_minutes: i64,
    horizon_days: i64,
    now: NaiveDateTime,
) -> Result<Vec<DaySlots>, AppError> {
    if from > to {
        return Err(AppError::InvalidArgument(
            "range start must not be after range end".to_string(),
        ));
    }
    let span_days = (to - from).num_days() + 1;
    if span_days > horizon_days {
        return Err(AppError::InvalidArgument(format!(
            "range spans {span_days} days, maximum is {horizon_days}"
        )));
    }

    let treatment = resolve_treatment(conn, treatment_id)?;

    let mut result = Vec::with_capacity(span_days as usize);
    let mut current = from;
    while current <= to {
        result.push(day_slots(conn, &treatment, current, increment_minutes, now)?);
        current += Duration::days(1);
    }
    Ok(result)
}

fn resolve_treatment(conn: &Connection, treatment_id: &str) -> Result<Treatment, AppError> {
    let treatment = queries::get_treatment(conn, treatment_id)?
        .ok_or_else(|| AppError::NotFound(format!("treatment {treatment_id}")))?;
    if !treatment.active {
        return Err(AppError::InvalidArgument(format!(
            "treatment {treatment_id} is not active"
        )));
    }
    Ok(treatment)
}

fn day_slots(
    conn: &Connection,
    treatment: &Treatment,
    date: NaiveDate,
    increment_minutes: i64,
    now: NaiveDateTime,
) -> Result<DaySlots, AppError> {
    let windows = resolve_windows(conn, date)?;

    let day_start = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
        AppError::InvalidArgument(format!("invalid date {date}"))
    })?;
    let day_end = day_start + Duration::days(1);

    let blocked = queries::list_blocked_periods_overlapping(conn, &day_start, &day_end)?;
    let appointments =
        queries::list_appointments_between(conn, &day_start, &day_end, &OCCUPYING_STATUSES)?;

    let slots = generate_slots(
        date,
        treatment.duration_minutes,
        increment_minutes,
        now,
        &windows,
        &blocked,
        &appointments,
    );

    Ok(DaySlots {
        date,
        treatment_id: treatment.id.clone(),
        slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn window(start: &str, end: &str) -> OpeningWindow {
        OpeningWindow {
            start_time: t(start),
            end_time: t(end),
        }
    }

    fn blocked(start: &str, end: &str) -> BlockedPeriod {
        BlockedPeriod {
            id: "bp".to_string(),
            start_date_time: dt(start),
            end_date_time: dt(end),
            reason: None,
        }
    }

    fn appointment(start: &str, duration: i64) -> Appointment {
        Appointment {
            id: "apt".to_string(),
            customer_id: "c".to_string(),
            treatment_id: "tr".to_string(),
            scheduled_at: dt(start),
            duration_minutes: duration,
            status: AppointmentStatus::Pending,
            customer_notes: None,
            owner_notes: None,
            rejection_reason: None,
            confirmed_at: None,
            cancelled_at: None,
            completed_at: None,
            created_at: dt("2025-01-01 00:00"),
            updated_at: dt("2025-01-01 00:00"),
        }
    }

    // 2025-06-16 is a Monday.
    const MONDAY: &str = "2025-06-16";
    const EARLY: &str = "2025-06-16 00:00";

    #[test]
    fn test_single_window_slot_walk() {
        // Monday 09:00-12:00, duration 60, increment 15 -> starts 09:00..11:00.
        let slots = generate_slots(
            d(MONDAY),
            60,
            15,
            dt(EARLY),
            &[window("09:00", "12:00")],
            &[],
            &[],
        );
        assert_eq!(slots.len(), 9);
        assert_eq!(slots[0].start_time, dt("2025-06-16 09:00"));
        assert_eq!(slots[8].start_time, dt("2025-06-16 11:00"));
        assert_eq!(slots[8].end_time, dt("2025-06-16 12:00"));
        assert!(slots.iter().all(|s| s.available));
    }

    #[test]
    fn test_candidate_count_formula() {
        // floor((W - D) / I) + 1 candidates when D <= W.
        let cases = [
            (180_i64, 60_i64, 15_i64),
            (180, 60, 30),
            (120, 90, 20),
            (60, 60, 15),
            (55, 25, 10),
        ];
        for (w, dur, inc) in cases {
            let end = t("09:00") + Duration::minutes(w);
            let slots = generate_slots(
                d(MONDAY),
                dur,
                inc,
                dt(EARLY),
                &[OpeningWindow {
                    start_time: t("09:00"),
                    end_time: end,
                }],
                &[],
                &[],
            );
            assert_eq!(slots.len() as i64, (w - dur) / inc + 1, "W={w} D={dur} I={inc}");
        }
    }

    #[test]
    fn test_duration_longer_than_window_yields_nothing() {
        let slots = generate_slots(
            d(MONDAY),
            120,
            15,
            dt(EARLY),
            &[window("09:00", "10:00")],
            &[],
            &[],
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn test_no_windows_yields_nothing() {
        let slots = generate_slots(d(MONDAY), 60, 15, dt(EARLY), &[], &[], &[]);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_windows_walked_independently_in_order() {
        let slots = generate_slots(
            d(MONDAY),
            60,
            45,
            dt(EARLY),
            &[window("09:00", "10:30"), window("10:30", "12:00")],
            &[],
            &[],
        );
        // Each window produces its own cursor walk; nothing spans the seam.
        let starts: Vec<_> = slots.iter().map(|s| s.start_time).collect();
        assert_eq!(
            starts,
            vec![
                dt("2025-06-16 09:00"),
                dt("2025-06-16 10:30"),
                dt("2025-06-16 11:00"),
            ]
        );
    }

    #[test]
    fn test_blocked_period_marks_overlapping_slots_unavailable() {
        // Block 10:00-10:30 inside Monday 09:00-12:00, duration 60.
        let slots = generate_slots(
            d(MONDAY),
            60,
            15,
            dt(EARLY),
            &[window("09:00", "12:00")],
            &[blocked("2025-06-16 10:00", "2025-06-16 10:30")],
            &[],
        );

        let by_start = |s: &str| {
            slots
                .iter()
                .find(|slot| slot.start_time == dt(s))
                .cloned()
                .unwrap()
        };

        assert!(!by_start("2025-06-16 10:00").available);
        // 09:15-10:15 reaches into the block.
        assert!(!by_start("2025-06-16 09:15").available);
        // 09:00-10:00 touches the block boundary only.
        assert!(by_start("2025-06-16 09:00").available);
        // 10:30-11:30 starts exactly at the block end.
        assert!(by_start("2025-06-16 10:30").available);
    }

    #[test]
    fn test_appointment_marks_overlapping_slots_unavailable() {
        let slots = generate_slots(
            d(MONDAY),
            60,
            15,
            dt(EARLY),
            &[window("09:00", "12:00")],
            &[],
            &[appointment("2025-06-16 09:00", 60)],
        );

        let unavailable: Vec<_> = slots
            .iter()
            .filter(|s| !s.available)
            .map(|s| s.start_time)
            .collect();
        // Everything overlapping [09:00, 10:00) is taken; 10:00 onward is free.
        assert_eq!(
            unavailable,
            vec![
                dt("2025-06-16 09:00"),
                dt("2025-06-16 09:15"),
                dt("2025-06-16 09:30"),
                dt("2025-06-16 09:45"),
            ]
        );
    }

    #[test]
    fn test_past_slots_unavailable() {
        let slots = generate_slots(
            d(MONDAY),
            60,
            15,
            dt("2025-06-16 10:00"),
            &[window("09:00", "12:00")],
            &[],
            &[],
        );

        for slot in &slots {
            assert_eq!(slot.available, slot.start_time >= dt("2025-06-16 10:00"));
        }
        // A slot starting exactly at "now" is not in the past.
        assert!(slots
            .iter()
            .find(|s| s.start_time == dt("2025-06-16 10:00"))
            .unwrap()
            .available);
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let windows = [window("09:00", "12:00"), window("14:00", "18:00")];
        let blocks = [blocked("2025-06-16 15:00", "2025-06-16 15:30")];
        let appointments = [appointment("2025-06-16 09:30", 45)];

        let first = generate_slots(d(MONDAY), 60, 15, dt(EARLY), &windows, &blocks, &appointments);
        let second = generate_slots(d(MONDAY), 60, 15, dt(EARLY), &windows, &blocks, &appointments);
        assert_eq!(first, second);
    }

    #[test]
    fn test_available_slots_never_overlap_inputs() {
        let windows = [window("08:00", "13:00"), window("14:00", "19:00")];
        let blocks = [
            blocked("2025-06-16 09:00", "2025-06-16 09:40"),
            blocked("2025-06-16 16:20", "2025-06-16 16:50"),
        ];
        let appointments = [
            appointment("2025-06-16 11:00", 30),
            appointment("2025-06-16 14:30", 90),
        ];

        let slots = generate_slots(d(MONDAY), 50, 10, dt(EARLY), &windows, &blocks, &appointments);
        for slot in slots.iter().filter(|s| s.available) {
            for bp in &blocks {
                assert!(!intervals_overlap(
                    slot.start_time,
                    slot.end_time,
                    bp.start_date_time,
                    bp.end_date_time
                ));
            }
            for apt in &appointments {
                assert!(!intervals_overlap(
                    slot.start_time,
                    slot.end_time,
                    apt.scheduled_at,
                    apt.end_time()
                ));
            }
        }
    }

    // ── Loader behavior against the database ──

    mod with_db {
        use super::*;
        use crate::db;
        use crate::models::{Customer, Treatment};
        use crate::services::availability::{
            self, DateWindowSpec, WeeklyWindowSpec,
        };
        use chrono::Weekday;
        use rusqlite::Connection;

        fn setup_db() -> Connection {
            db::init_db(":memory:").unwrap()
        }

        fn seed_treatment(conn: &Connection, id: &str, duration: i64, active: bool) {
            queries::insert_treatment(
                conn,
                &Treatment {
                    id: id.to_string(),
                    name: "Test Treatment".to_string(),
                    duration_minutes: duration,
                    active,
                },
            )
            .unwrap();
        }

        fn seed_customer(conn: &Connection, id: &str) {
            queries::insert_customer(
                conn,
                &Customer {
                    id: id.to_string(),
                    name: "Test Customer".to_string(),
                    email: None,
                },
            )
            .unwrap();
        }

        fn monday_window(conn: &Connection, start: &str, end: &str) {
            availability::create_weekly(
                conn,
                WeeklyWindowSpec {
                    day_of_week: Weekday::Mon,
                    start_time: t(start),
                    end_time: t(end),
                    active: true,
                },
            )
            .unwrap();
        }

        #[test]
        fn test_slots_for_date_empty_without_windows() {
            let conn = setup_db();
            seed_treatment(&conn, "tr", 60, true);

            let day = slots_for_date(&conn, "tr", d(MONDAY), 15, dt(EARLY)).unwrap();
            assert!(day.slots.is_empty());
        }

        #[test]
        fn test_slots_for_date_unknown_treatment() {
            let conn = setup_db();
            let result = slots_for_date(&conn, "missing", d(MONDAY), 15, dt(EARLY));
            assert!(matches!(result, Err(AppError::NotFound(_))));
        }

        #[test]
        fn test_slots_for_date_inactive_treatment() {
            let conn = setup_db();
            seed_treatment(&conn, "tr", 60, false);
            let result = slots_for_date(&conn, "tr", d(MONDAY), 15, dt(EARLY));
            assert!(matches!(result, Err(AppError::InvalidArgument(_))));
        }

        #[test]
        fn test_date_override_replaces_weekly_windows() {
            let conn = setup_db();
            seed_treatment(&conn, "tr", 60, true);
            monday_window(&conn, "09:00", "12:00");

            availability::create_specific_date(
                &conn,
                DateWindowSpec {
                    date: d(MONDAY),
                    start_time: t("14:00"),
                    end_time: t("16:00"),
                    active: true,
                    reason: Some("special opening".to_string()),
                },
            )
            .unwrap();

            let day = slots_for_date(&conn, "tr", d(MONDAY), 15, dt(EARLY)).unwrap();
            assert!(day
                .slots
                .iter()
                .all(|s| s.start_time >= dt("2025-06-16 14:00")));
            assert_eq!(day.slots.len(), 5);

            // The following Monday falls back to the weekly rules.
            let next = slots_for_date(&conn, "tr", d("2025-06-23"), 15, dt(EARLY)).unwrap();
            assert_eq!(next.slots[0].start_time, dt("2025-06-23 09:00"));
        }

        #[test]
        fn test_pending_and_confirmed_occupy_cancelled_does_not() {
            let conn = setup_db();
            seed_treatment(&conn, "tr", 60, true);
            seed_customer(&conn, "cust");
            monday_window(&conn, "09:00", "12:00");

            for (id, start, status) in [
                ("a1", "2025-06-16 09:00", AppointmentStatus::Pending),
                ("a2", "2025-06-16 10:00", AppointmentStatus::Confirmed),
                ("a3", "2025-06-16 11:00", AppointmentStatus::Cancelled),
            ] {
                let mut apt = appointment(start, 60);
                apt.id = id.to_string();
                apt.customer_id = "cust".to_string();
                apt.treatment_id = "tr".to_string();
                apt.status = status;
                queries::insert_appointment(&conn, &apt).unwrap();
            }

            let day = slots_for_date(&conn, "tr", d(MONDAY), 60, dt(EARLY)).unwrap();
            let availability: Vec<_> = day.slots.iter().map(|s| s.available).collect();
            assert_eq!(availability, vec![false, false, true]);
        }

        #[test]
        fn test_range_covers_every_date_inclusive() {
            let conn = setup_db();
            seed_treatment(&conn, "tr", 60, true);
            monday_window(&conn, "09:00", "12:00");

            let days = slots_for_range(
                &conn,
                "tr",
                d("2025-06-16"),
                d("2025-06-18"),
                15,
                60,
                dt(EARLY),
            )
            .unwrap();
            assert_eq!(days.len(), 3);
            assert_eq!(days[0].slots.len(), 9);
            // Tuesday and Wednesday have no windows: present, but empty.
            assert!(days[1].slots.is_empty());
            assert!(days[2].slots.is_empty());
        }

        #[test]
        fn test_range_rejects_inverted_and_oversized_spans() {
            let conn = setup_db();
            seed_treatment(&conn, "tr", 60, true);

            let inverted = slots_for_range(
                &conn,
                "tr",
                d("2025-06-18"),
                d("2025-06-16"),
                15,
                60,
                dt(EARLY),
            );
            assert!(matches!(inverted, Err(AppError::InvalidArgument(_))));

            let oversized = slots_for_range(
                &conn,
                "tr",
                d("2025-06-01"),
                d("2025-09-01"),
                15,
                60,
                dt(EARLY),
            );
            assert!(matches!(oversized, Err(AppError::InvalidArgument(_))));
        }
    }
}
