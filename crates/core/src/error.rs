use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeeperError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),
}
