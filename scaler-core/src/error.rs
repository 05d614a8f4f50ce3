use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScalerError {
    #[error("Limit error: {0}")]
    Limit(String),

    #[error("Policy error: {0}")]
    Policy(String),

    #[error("Special character error: {0}")]
    SpecialCharacter(String),

    #[error("Time error: {0}")]
    Time(String),

    #[error("Working set error: {0}")]
    WorkingSet(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Conflict error: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A 4xx from an upstream system: the request itself is invalid, so
    /// retrying it unchanged would just fail again.
    #[error("Rejected error: {0}")]
    Rejected(String),

    #[error("Interrupted error: {0}")]
    Interrupted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ScalerError>;
