//! Error types for manifest handling.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by component entry points and bus callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while reading, parsing or writing a component manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The document is neither a service-provider nor a feature-unit manifest.
    #[error("manifest {} matches neither the framework nor the module layout", path.display())]
    InvalidManifest {
        /// Path of the offending manifest.
        path: PathBuf,
    },

    /// A required key is absent or empty.
    #[error("manifest {} is missing required field '{field}'", path.display())]
    MissingRequiredField {
        /// Path of the offending manifest.
        path: PathBuf,
        /// Manifest key that was expected.
        field: &'static str,
    },

    /// The manifest file could not be read or written.
    #[error("failed to access manifest: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest is not valid TOML.
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    /// The updated manifest could not be serialised back to TOML.
    #[error("failed to serialise manifest: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ManifestError {
    pub(crate) fn missing(path: &std::path::Path, field: &'static str) -> Self {
        Self::MissingRequiredField {
            path: path.to_path_buf(),
            field,
        }
    }
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;
