//! Background jobs
//!
//! - `reminder_engine`: turns due reminders into notifications
//! - `scheduler`: fires the engine once per minute, aligned to the boundary

pub mod reminder_engine;
pub mod scheduler;

pub use reminder_engine::{
    humanize_time_remaining, reminder_content, ReminderEngine, ReminderRunSummary,
};
pub use scheduler::{
    alignment_delay, next_boundary, next_pre_tick, ReminderScheduler, SchedulerHandle,
};
