use thiserror::Error;

#[derive(Error, Debug)]
pub enum FunilError {
    #[error("Not in a funil workspace. Run 'funil init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .funil/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FunilError>;
