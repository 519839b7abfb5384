use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Recurring weekly opening window. Active windows sharing a weekday
/// must not overlap.
#[derive(Debug, Clone)]
pub struct WeeklyAvailability {
    pub id: String,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub active: bool,
}

/// Per-date override window. When any active rows exist for a date they
/// replace the weekly windows for that date entirely.
#[derive(Debug, Clone)]
pub struct SpecificDateAvailability {
    pub id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub active: bool,
    pub reason: Option<String>,
}

/// Exclusion window (vacation, lunch break, maintenance). Blocked periods
/// may freely overlap each other and any availability window.
#[derive(Debug, Clone)]
pub struct BlockedPeriod {
    pub id: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub reason: Option<String>,
}

/// A resolved opening window for one concrete date, independent of which
/// rule kind produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningWindow {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl From<&WeeklyAvailability> for OpeningWindow {
    fn from(w: &WeeklyAvailability) -> Self {
        OpeningWindow {
            start_time: w.start_time,
            end_time: w.end_time,
        }
    }
}

impl From<&SpecificDateAvailability> for OpeningWindow {
    fn from(w: &SpecificDateAvailability) -> Self {
        OpeningWindow {
            start_time: w.start_time,
            end_time: w.end_time,
        }
    }
}

/// Half-open overlap test: [a1,a2) and [b1,b2) overlap iff a1 < b2 && a2 > b1.
pub fn intervals_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && a_end > b_start
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Inverse of `Weekday::num_days_from_monday`, used for the stored form.
pub fn weekday_from_index(index: i64) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}
