use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub customer_id: String,
    pub treatment_id: String,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub customer_notes: Option<String>,
    pub owner_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    pub fn end_time(&self) -> NaiveDateTime {
        self.scheduled_at + chrono::Duration::minutes(self.duration_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "rejected" => Some(AppointmentStatus::Rejected),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "completed" => Some(AppointmentStatus::Completed),
            "no_show" => Some(AppointmentStatus::NoShow),
            _ => None,
        }
    }

    /// Statuses that hold the salon's single resource.
    pub fn occupies_slot(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Rejected
                | AppointmentStatus::Cancelled
                | AppointmentStatus::Completed
                | AppointmentStatus::NoShow
        )
    }
}

/// The complete status state machine as data. Anything not listed here
/// is an invalid transition.
pub const ALLOWED_TRANSITIONS: &[(AppointmentStatus, AppointmentStatus)] = &[
    (AppointmentStatus::Pending, AppointmentStatus::Confirmed),
    (AppointmentStatus::Pending, AppointmentStatus::Rejected),
    (AppointmentStatus::Pending, AppointmentStatus::Cancelled),
    (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled),
    (AppointmentStatus::Confirmed, AppointmentStatus::Completed),
    (AppointmentStatus::Confirmed, AppointmentStatus::NoShow),
];

pub fn transition_allowed(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    ALLOWED_TRANSITIONS.contains(&(from, to))
}
