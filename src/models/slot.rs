use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One candidate slot: [start_time, start_time + duration). Unavailable
/// candidates are returned too so the caller can render a full grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub treatment_id: String,
    pub slots: Vec<TimeSlot>,
}
