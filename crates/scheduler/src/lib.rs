//! Named periodic jobs driven by pluggable timers.
//!
//! A [`Task`] is a unit of work with a stable name; a [`TaskTimer`] decides
//! how long to wait before each invocation. The [`Scheduler`] owns the job
//! registry and runs one loop per job, so a job never overlaps with itself
//! while distinct jobs run concurrently.

pub mod error;
pub mod metrics;
pub mod runner;
pub mod task;
pub mod timer;

pub use error::SchedulerError;
pub use metrics::{JobMetrics, SchedulerMetrics};
pub use runner::{Scheduler, SchedulerHandle};
pub use task::{Task, TaskOutcome};
pub use timer::{DailyTimer, FixedIntervalTimer, TaskTimer};
