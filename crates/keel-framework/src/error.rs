//! Error types for the Keel framework.

use std::path::PathBuf;

use thiserror::Error;

use keel_core::{BoxError, ComponentKind, ManifestError};

/// Why a load request did not end in an activated component.
///
/// [`EntryPointMissing`](LoadError::EntryPointMissing) is the one
/// non-fatal variant: it is recorded as a notice on the
/// [`LoadReport`](crate::loader::LoadReport) and the registration stands.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The manifest path is not under any known component root.
    #[error("manifest path {} is not under a framework or module root", .0.display())]
    ClassificationFailed(PathBuf),

    /// The manifest could not be read or parsed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The manifest's shape disagrees with the root it was found under.
    #[error("manifest {} describes a {found} but lives under the {expected} root", path.display())]
    KindMismatch {
        path: PathBuf,
        expected: ComponentKind,
        found: ComponentKind,
    },

    /// A hard dependency on the chat client is not satisfied.
    #[error("component '{component}' depends on the chat client, which is not loaded")]
    HardDependencyUnmet { component: String },

    /// The loaded code does not export the component or its entry point.
    #[error("component '{component}' has no entry point '{entry_point}'")]
    EntryPointMissing {
        component: String,
        entry_point: String,
    },

    /// Loading the code or running the entry point failed.
    #[error("component '{component}' failed to activate: {source}")]
    ActivationThrew {
        component: String,
        #[source]
        source: BoxError,
    },
}

impl LoadError {
    /// Returns `true` for the variants that cause a rollback.
    pub fn is_rollback(&self) -> bool {
        matches!(self, Self::ActivationThrew { .. })
    }
}

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors raised by the code-loading collaborator.
#[derive(Debug, Clone, Error)]
pub enum CodeLoadError {
    /// No linked component module matches the entry file.
    #[error("no component module is linked for entry file {}", .0.display())]
    ModuleNotFound(PathBuf),

    /// The entry file name is not valid UTF-8 or has no stem.
    #[error("entry file {} has no usable module name", .0.display())]
    InvalidEntryFile(PathBuf),
}

/// Errors raised by a persistence backend.
///
/// Callers in this crate never escalate these; they are logged as
/// persistence write failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The table has not been provisioned.
    #[error("table '{0}' does not exist")]
    MissingTable(String),

    /// The backend could not be reached.
    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),

    /// A row could not be converted.
    #[error("row conversion failed: {0}")]
    Row(#[from] serde_json::Error),
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors raised by the chat client collaborator.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// The client is not connected yet.
    #[error("chat client is not ready: {0}")]
    NotReady(String),

    /// The platform rejected a command registration.
    #[error("command '/{command}' was rejected: {reason}")]
    Rejected { command: String, reason: String },

    /// Connecting to the platform failed.
    #[error("chat client connection failed: {0}")]
    Connection(String),
}

/// Result type for chat client operations.
pub type ChatResult<T> = Result<T, ChatError>;
