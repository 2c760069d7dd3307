//! Timer strategies: fixed interval and daily time-of-day.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;

use crate::error::SchedulerError;
use crate::task::TaskOutcome;

/// Computes how long a job waits before its next invocation.
pub trait TaskTimer: Send + Sync {
    /// Delay from `now` until the next run. `previous` is the outcome of the
    /// run that just completed, or `None` before the first run.
    fn next_delay(&self, now: DateTime<Local>, previous: Option<&TaskOutcome>) -> Duration;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Runs a fixed period after the previous run completed.
///
/// Drift accumulates with run duration; that is fine for sampling jobs.
#[derive(Debug, Clone)]
pub struct FixedIntervalTimer {
    period: Duration,
    initial_delay: Duration,
}

impl FixedIntervalTimer {
    /// First run fires immediately, then every `period`.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            initial_delay: Duration::ZERO,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

impl TaskTimer for FixedIntervalTimer {
    fn next_delay(&self, _now: DateTime<Local>, previous: Option<&TaskOutcome>) -> Duration {
        match previous {
            None => self.initial_delay,
            Some(_) => self.period,
        }
    }

    fn describe(&self) -> String {
        format!("every {}ms", self.period.as_millis())
    }
}

/// Fires once a day at a fixed local time-of-day.
///
/// Backed by a six-field cron expression (`sec min hour * * *`). The next
/// trigger is always strictly after `now`; once today's slot has passed the
/// timer rolls over to tomorrow.
#[derive(Debug, Clone)]
pub struct DailyTimer {
    hour: u32,
    minute: u32,
    second: u32,
    schedule: Schedule,
}

impl DailyTimer {
    pub fn new(hour: u32, minute: u32, second: u32) -> Result<Self, SchedulerError> {
        if hour > 23 || minute > 59 || second > 59 {
            return Err(SchedulerError::InvalidTimer(format!(
                "time of day out of range: {hour:02}:{minute:02}:{second:02}"
            )));
        }

        let expr = format!("{second} {minute} {hour} * * *");
        let schedule = Schedule::from_str(&expr)
            .map_err(|e| SchedulerError::InvalidTimer(format!("{expr}: {e}")))?;

        Ok(Self {
            hour,
            minute,
            second,
            schedule,
        })
    }

    /// First matching instant strictly after `now`.
    pub fn next_fire_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.schedule.after(now).next()
    }
}

impl TaskTimer for DailyTimer {
    fn next_delay(&self, now: DateTime<Local>, _previous: Option<&TaskOutcome>) -> Duration {
        match self.next_fire_after(&now) {
            Some(next) => (next - now).to_std().unwrap_or(Duration::ZERO),
            // No local instant matched within the search window (DST gap);
            // check again in a day.
            None => Duration::from_secs(86_400),
        }
    }

    fn describe(&self) -> String {
        format!(
            "daily at {:02}:{:02}:{:02}",
            self.hour, self.minute, self.second
        )
    }
}
