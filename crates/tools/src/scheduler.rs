//! Reminders, timers and alarms on the tokio timer wheel
//!
//! Every scheduled item is a spawned task that sleeps until due, removes
//! itself from the table and publishes a [`Notification`]. Nothing is
//! persisted; pending items die with the process.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use shadow_core::{CapabilityResult, Result, ScheduleKind, ScheduleRequest, Scheduler, When};

use crate::CapabilityError;

/// A scheduled item that came due
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub kind: ScheduleKind,
    pub message: String,
    pub fired_at: DateTime<Local>,
}

impl Notification {
    /// Text to show or speak
    pub fn announcement(&self) -> String {
        match self.kind {
            ScheduleKind::Reminder => format!("Reminder: {}", self.message),
            ScheduleKind::Timer => "Your timer is done.".to_string(),
            ScheduleKind::Alarm => format!("Alarm! It's {}.", self.fired_at.format("%H:%M")),
        }
    }
}

struct Entry {
    kind: ScheduleKind,
    message: String,
    due: DateTime<Local>,
    handle: JoinHandle<()>,
}

type Table = Arc<Mutex<BTreeMap<u64, Entry>>>;

/// In-process scheduler backed by tokio tasks
pub struct TokioScheduler {
    next_id: AtomicU64,
    tasks: Table,
    notifier: mpsc::UnboundedSender<Notification>,
}

impl TokioScheduler {
    /// Create the scheduler and the receiving end of its notifications
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (notifier, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            next_id: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(BTreeMap::new())),
            notifier,
        };
        (scheduler, rx)
    }

    /// Number of pending items
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    fn validate(request: &ScheduleRequest) -> std::result::Result<(), CapabilityError> {
        if request.kind == ScheduleKind::Reminder && request.message.trim().is_empty() {
            return Err(CapabilityError::invalid_params("reminder needs a message"));
        }
        if let When::After(delay) = request.when {
            if delay.is_zero() {
                return Err(CapabilityError::invalid_params("delay must be positive"));
            }
        }
        Ok(())
    }

    fn spawn_timer(&self, id: u64, delay: Duration, kind: ScheduleKind, message: String) -> JoinHandle<()> {
        let tasks = Arc::clone(&self.tasks);
        let notifier = self.notifier.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tasks.lock().remove(&id);

            tracing::info!(id, kind = kind.as_str(), "Scheduled item fired");
            let notification = Notification {
                id,
                kind,
                message,
                fired_at: Local::now(),
            };
            if notifier.send(notification).is_err() {
                tracing::warn!(id, "No listener for scheduler notifications");
            }
        })
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for entry in self.tasks.lock().values() {
            entry.handle.abort();
        }
    }
}

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn schedule(&self, request: ScheduleRequest) -> Result<CapabilityResult> {
        Self::validate(&request)?;

        let now = Local::now();
        let delay = delay_until(request.when, now.time());
        let due = now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Hold the table while spawning so a short timer cannot fire before
        // its entry exists
        {
            let mut tasks = self.tasks.lock();
            let handle = self.spawn_timer(id, delay, request.kind, request.message.clone());
            tasks.insert(
                id,
                Entry {
                    kind: request.kind,
                    message: request.message.clone(),
                    due,
                    handle,
                },
            );
        }

        tracing::info!(id, kind = request.kind.as_str(), delay_secs = delay.as_secs(), "Scheduled item");

        let message = match (request.kind, request.when) {
            (ScheduleKind::Reminder, When::After(d)) => {
                format!("Reminder #{} set for {} from now: {}", id, describe_duration(d), request.message)
            }
            (ScheduleKind::Reminder, When::At(t)) => {
                format!("Reminder #{} set for {}: {}", id, t.format("%H:%M"), request.message)
            }
            (ScheduleKind::Timer, _) => format!("Timer #{} set for {}", id, describe_duration(delay)),
            (ScheduleKind::Alarm, _) => format!("Alarm #{} set for {}", id, due.format("%H:%M")),
        };
        Ok(CapabilityResult::ok(message))
    }

    async fn list(&self) -> Result<CapabilityResult> {
        let tasks = self.tasks.lock();
        if tasks.is_empty() {
            return Ok(CapabilityResult::ok("You have no active reminders, timers or alarms."));
        }

        let lines: Vec<String> = tasks
            .iter()
            .map(|(id, entry)| {
                let label = if entry.message.is_empty() {
                    String::new()
                } else {
                    format!(": {}", entry.message)
                };
                format!("#{} {} at {}{}", id, entry.kind.as_str(), entry.due.format("%H:%M"), label)
            })
            .collect();
        Ok(CapabilityResult::ok(lines.join("\n")))
    }

    async fn cancel(&self, task_id: u64) -> Result<CapabilityResult> {
        match self.tasks.lock().remove(&task_id) {
            Some(entry) => {
                entry.handle.abort();
                tracing::info!(id = task_id, "Cancelled scheduled item");
                Ok(CapabilityResult::ok(format!("Cancelled {} #{}.", entry.kind.as_str(), task_id)))
            }
            None => Ok(CapabilityResult::failure(format!("No reminder, timer or alarm with id {}.", task_id))),
        }
    }
}

/// Scheduler used when scheduling is switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpScheduler;

#[async_trait]
impl Scheduler for NoOpScheduler {
    async fn schedule(&self, request: ScheduleRequest) -> Result<CapabilityResult> {
        tracing::debug!(kind = request.kind.as_str(), "Scheduling disabled, dropping request");
        Ok(CapabilityResult::failure("Scheduling is not enabled."))
    }

    async fn list(&self) -> Result<CapabilityResult> {
        Ok(CapabilityResult::failure("Scheduling is not enabled."))
    }

    async fn cancel(&self, _task_id: u64) -> Result<CapabilityResult> {
        Ok(CapabilityResult::failure("Scheduling is not enabled."))
    }
}

/// Delay until `when`, with clock times resolved to their next occurrence
fn delay_until(when: When, now: NaiveTime) -> Duration {
    match when {
        When::After(delay) => delay,
        When::At(at) => {
            let mut delta = at - now;
            if delta <= chrono::Duration::zero() {
                delta = delta + chrono::Duration::days(1);
            }
            delta.to_std().unwrap_or_default()
        }
    }
}

/// "10 minutes", "1 hour 30 minutes", "45 seconds"
pub fn describe_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    let plural = |n: u64, unit: &str| format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" });
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(plural(minutes, "minute"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(plural(seconds, "second"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_duration() {
        assert_eq!(describe_duration(Duration::from_secs(600)), "10 minutes");
        assert_eq!(describe_duration(Duration::from_secs(5400)), "1 hour 30 minutes");
        assert_eq!(describe_duration(Duration::from_secs(1)), "1 second");
    }

    #[test]
    fn test_clock_time_wraps_to_tomorrow() {
        let now = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        let later = NaiveTime::from_hms_opt(21, 30, 0).unwrap();
        let earlier = NaiveTime::from_hms_opt(7, 0, 0).unwrap();

        assert_eq!(delay_until(When::At(later), now), Duration::from_secs(90 * 60));
        assert_eq!(delay_until(When::At(earlier), now), Duration::from_secs(11 * 3600));
        assert_eq!(delay_until(When::At(now), now), Duration::from_secs(24 * 3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_fires_and_leaves_table() {
        let (scheduler, mut rx) = TokioScheduler::new();
        let result = scheduler
            .schedule(ScheduleRequest::reminder("call mom", When::After(Duration::from_secs(600))))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.message.contains("10 minutes"));
        assert_eq!(scheduler.pending(), 1);

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.message, "call mom");
        assert_eq!(fired.announcement(), "Reminder: call mom");
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_and_cancel() {
        let (scheduler, _rx) = TokioScheduler::new();
        scheduler
            .schedule(ScheduleRequest::reminder("stretch", When::After(Duration::from_secs(60))))
            .await
            .unwrap();
        scheduler
            .schedule(ScheduleRequest::timer(Duration::from_secs(300)))
            .await
            .unwrap();

        let listed = scheduler.list().await.unwrap();
        assert!(listed.message.contains("#1 reminder"));
        assert!(listed.message.contains("#2 timer"));

        assert!(scheduler.cancel(1).await.unwrap().success);
        assert!(!scheduler.cancel(1).await.unwrap().success);
        assert_eq!(scheduler.pending(), 1);
    }

    #[tokio::test]
    async fn test_rejects_empty_reminder() {
        let (scheduler, _rx) = TokioScheduler::new();
        let err = scheduler
            .schedule(ScheduleRequest::reminder("  ", When::After(Duration::from_secs(60))))
            .await
            .unwrap_err();
        assert!(matches!(err, shadow_core::Error::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_noop_scheduler_reports_disabled() {
        let result = NoOpScheduler
            .schedule(ScheduleRequest::timer(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(!result.success);
    }
}
