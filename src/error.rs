//! Error types for taskbuddy
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad input, not signed in, unknown task)
//! - 4: Operation failed (store, identity provider, io)

use thiserror::Error;

/// Exit codes for the taskbuddy CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Failure reported by a [`crate::store::TaskStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(String),

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by an identity provider or the session file.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no identity available to sign in with")]
    NoIdentity,

    #[error("identity provider error: {0}")]
    Provider(String),

    #[error("session io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Main error type for taskbuddy operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Not signed in (run `taskbuddy login`)")]
    NotSignedIn,

    #[error("Nothing to update for task {0}")]
    EmptyPatch(String),

    // Operation failures (exit code 4)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sign-in error: {0}")]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidTask(_)
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::TaskNotFound(_)
            | Error::NotSignedIn
            | Error::EmptyPatch(_) => exit_codes::USER_ERROR,

            Error::Store(_)
            | Error::Auth(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for taskbuddy operations
pub type Result<T> = std::result::Result<T, Error>;
