//! Reminder engine
//!
//! Turns every pending reminder due in a given minute into an
//! `EVENT_REMINDER` notification and flips it to `sent`.
//!
//! Each reminder is processed on its own: a failure is logged and counted,
//! and the rest of the batch carries on. A reminder whose processing fails
//! before it is marked sent stays pending, and because due reminders are
//! selected by exact minute, no later run picks it up again.

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{EventReminder, NotificationType, SYSTEM_SENDER};
use crate::repository::Repositories;
use crate::services::DeliveryDispatcher;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;
const MINUTES_PER_WEEK: i64 = 7 * MINUTES_PER_DAY;

/// Largest whole unit among weeks, days, hours and minutes, rounded down.
///
/// Negative durations read as `0 minutes`.
pub fn humanize_time_remaining(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);

    let (amount, unit) = if minutes >= MINUTES_PER_WEEK {
        (minutes / MINUTES_PER_WEEK, "week")
    } else if minutes >= MINUTES_PER_DAY {
        (minutes / MINUTES_PER_DAY, "day")
    } else if minutes >= MINUTES_PER_HOUR {
        (minutes / MINUTES_PER_HOUR, "hour")
    } else {
        (minutes, "minute")
    };

    if amount == 1 {
        format!("{amount} {unit}")
    } else {
        format!("{amount} {unit}s")
    }
}

pub fn reminder_content(event_name: &str, remaining: Duration) -> String {
    format!(
        "Reminder: \"{}\" starts in {}",
        event_name,
        humanize_time_remaining(remaining)
    )
}

/// Outcome of one `process_due` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderRunSummary {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ReminderEngine {
    repos: Repositories,
    dispatcher: DeliveryDispatcher,
}

impl ReminderEngine {
    pub fn new(repos: Repositories, dispatcher: DeliveryDispatcher) -> Self {
        Self { repos, dispatcher }
    }

    /// Process every pending reminder whose minute equals `target`'s minute.
    ///
    /// Only the lookup itself can fail the run; per-reminder errors are
    /// isolated and reported in the summary.
    pub async fn process_due(&self, target: DateTime<Utc>) -> AppResult<ReminderRunSummary> {
        let due = self.repos.reminders.find_due(target).await?;
        let mut summary = ReminderRunSummary {
            due: due.len(),
            ..Default::default()
        };

        if due.is_empty() {
            debug!(target = %target, "no reminders due");
            return Ok(summary);
        }

        for reminder in &due {
            match self.process_one(reminder, target).await {
                Ok(()) => {
                    summary.sent += 1;
                    metrics::record_reminder(true);
                }
                Err(e) => {
                    summary.failed += 1;
                    metrics::record_reminder(false);
                    error!(
                        reminder_id = %reminder.id,
                        event_id = %reminder.event_id,
                        user = %reminder.user_identity,
                        error = %e,
                        "reminder processing failed"
                    );
                }
            }
        }

        info!(
            target = %target,
            due = summary.due,
            sent = summary.sent,
            failed = summary.failed,
            "reminder run finished"
        );
        Ok(summary)
    }

    async fn process_one(&self, reminder: &EventReminder, target: DateTime<Utc>) -> AppResult<()> {
        let event = self
            .repos
            .events
            .find_event(reminder.event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("event".into()))?;

        let content = reminder_content(&event.name, event.starts_at - target);
        self.dispatcher
            .send_notification(
                &reminder.user_identity,
                SYSTEM_SENDER,
                NotificationType::EventReminder,
                &content,
                Some(event.id),
            )
            .await?;

        if !self.repos.reminders.mark_sent(reminder.id).await? {
            debug!(reminder_id = %reminder.id, "reminder was already marked sent");
        }
        Ok(())
    }
}
