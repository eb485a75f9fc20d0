use thiserror::Error;

#[derive(Error, Debug)]
pub enum WindowError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Window lock poisoned by a panicking thread")]
    LockPoisoned,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WindowError>;
