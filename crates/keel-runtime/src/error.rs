//! Runtime error types.

use thiserror::Error;

use keel_framework::ChatError;

use crate::config::ConfigError;

/// Errors that stop the host from starting or running.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Chat is enabled in the configuration but no client was supplied.
    #[error("Chat is enabled but no chat client was registered with the runtime")]
    MissingChatClient,

    /// The chat client failed to start.
    #[error("Chat client failed to start: {0}")]
    Chat(#[from] ChatError),

    /// [`boot`](crate::KeelRuntime::boot) was called a second time.
    #[error("Runtime has already booted")]
    AlreadyBooted,

    /// Resolving the working directory or installing signal handlers failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
