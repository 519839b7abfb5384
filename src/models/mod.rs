pub mod appointment;
pub mod availability;
pub mod customer;
pub mod slot;
pub mod treatment;

pub use appointment::{transition_allowed, Appointment, AppointmentStatus};
pub use availability::{
    intervals_overlap, weekday_from_index, weekday_name, BlockedPeriod, OpeningWindow,
    SpecificDateAvailability, WeeklyAvailability,
};
pub use customer::Customer;
pub use slot::{DaySlots, TimeSlot};
pub use treatment::Treatment;
