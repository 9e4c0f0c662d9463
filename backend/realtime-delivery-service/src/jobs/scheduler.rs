//! Minute-aligned reminder trigger
//!
//! Two tasks cooperate:
//! - the ticker wakes at the pre-tick second of every minute, sleeps toward
//!   the next minute boundary and hands that boundary off;
//! - the worker runs the engine for each boundary it receives, one at a time.
//!
//! A slow engine run therefore delays the next run but never overlaps it, and
//! never disturbs the ticker's timing.

use super::reminder_engine::ReminderEngine;
use crate::config::SchedulerConfig;
use crate::models::truncate_to_minute;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Next instant strictly after `now` that sits on `pre_tick_second` of a minute.
pub fn next_pre_tick(now: DateTime<Utc>, pre_tick_second: u32) -> DateTime<Utc> {
    let candidate = truncate_to_minute(now) + chrono::Duration::seconds(pre_tick_second as i64);
    if candidate > now {
        candidate
    } else {
        candidate + chrono::Duration::minutes(1)
    }
}

/// Start of the minute following `t`.
pub fn next_boundary(t: DateTime<Utc>) -> DateTime<Utc> {
    truncate_to_minute(t) + chrono::Duration::minutes(1)
}

/// How long to sleep at `now` so processing starts `lead` before `target`.
///
/// `None` when `target` is already within `skip_threshold` (or past).
/// The sleep is capped at `max_alignment_sleep`.
pub fn alignment_delay(
    now: DateTime<Utc>,
    target: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Option<Duration> {
    let remaining = (target - now).to_std().ok()?;
    if remaining <= config.skip_threshold {
        return None;
    }
    Some(
        remaining
            .saturating_sub(config.lead)
            .min(config.max_alignment_sleep),
    )
}

/// Join handles of the two scheduler tasks.
pub struct SchedulerHandle {
    pub ticker: JoinHandle<()>,
    pub worker: JoinHandle<()>,
}

impl SchedulerHandle {
    pub async fn join(self) {
        if let Err(e) = self.ticker.await {
            warn!(error = %e, "reminder ticker task ended abnormally");
        }
        if let Err(e) = self.worker.await {
            warn!(error = %e, "reminder worker task ended abnormally");
        }
    }
}

pub struct ReminderScheduler {
    engine: ReminderEngine,
    config: SchedulerConfig,
}

impl ReminderScheduler {
    pub fn new(engine: ReminderEngine, config: SchedulerConfig) -> Self {
        Self { engine, config }
    }

    /// Start the ticker and worker; both stop when `shutdown` fires.
    pub fn spawn(self, shutdown: &broadcast::Sender<()>) -> SchedulerHandle {
        let (tx, rx) = mpsc::unbounded_channel();

        info!(
            pre_tick_second = self.config.pre_tick_second,
            lead_ms = self.config.lead.as_millis() as u64,
            "starting reminder scheduler"
        );

        let ticker = tokio::spawn(run_ticker(self.config, tx, shutdown.subscribe()));
        let worker = tokio::spawn(run_worker(self.engine, rx, shutdown.subscribe()));
        SchedulerHandle { ticker, worker }
    }
}

async fn run_ticker(
    config: SchedulerConfig,
    tx: mpsc::UnboundedSender<DateTime<Utc>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let now = Utc::now();
        let pre_tick = next_pre_tick(now, config.pre_tick_second);
        let wait = (pre_tick - now).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.recv() => break,
        }

        // Derived from the scheduled wake-up, not the actual one: a late wake
        // still processes the minute it was meant for.
        let target = next_boundary(pre_tick);

        if let Some(delay) = alignment_delay(Utc::now(), target, &config) {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => break,
            }
        }

        if tx.send(target).is_err() {
            break;
        }
    }
    info!("reminder ticker stopped");
}

pub(crate) async fn run_worker(
    engine: ReminderEngine,
    mut rx: mpsc::UnboundedReceiver<DateTime<Utc>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            target = rx.recv() => {
                let Some(target) = target else { break };
                let lag_ms = (Utc::now() - target).num_milliseconds();
                debug!(target = %target, lag_ms, "processing reminder boundary");

                if let Err(e) = engine.process_due(target).await {
                    error!(target = %target, error = %e, "reminder run failed");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
    info!("reminder worker stopped");
}
