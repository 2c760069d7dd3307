/// Errors raised while building or driving the job registry.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Job already registered: {0}")]
    DuplicateJob(String),
    #[error("Unknown job: {0}")]
    UnknownJob(String),
    #[error("Invalid timer: {0}")]
    InvalidTimer(String),
}
