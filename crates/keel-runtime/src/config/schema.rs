//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use keel_core::MANIFEST_FILE_NAME;
use keel_framework::{HostPaths, VERSION_TABLE};

/// Root configuration structure.
///
/// Every section has defaults, so an empty file (or no file) is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeelConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub boot: BootConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format of log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// A session log at `logging.file_path`.
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids in log lines.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in log lines.
    #[serde(default)]
    pub file_location: bool,

    /// Session log path, used with [`LogOutput::File`].
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-target levels, e.g. `keel_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

// =============================================================================
// Host
// =============================================================================

/// Identity of the host process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_host_name")]
    pub name: String,

    #[serde(default = "default_host_version")]
    pub version: String,

    /// Simulate command registration and keep manifests untouched.
    /// Forced on by an `.internal` marker in the working directory.
    #[serde(default)]
    pub debug_mode: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: default_host_name(),
            version: default_host_version(),
            debug_mode: false,
        }
    }
}

fn default_host_name() -> String {
    "keel".to_string()
}

fn default_host_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// =============================================================================
// Paths
// =============================================================================

/// Layout of the component tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the component tree.  Defaults to the current directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default = "default_frameworks_dir")]
    pub frameworks_dir: PathBuf,

    #[serde(default = "default_private_frameworks")]
    pub private_frameworks: PathBuf,

    #[serde(default = "default_public_frameworks")]
    pub public_frameworks: PathBuf,

    #[serde(default = "default_modules_dir")]
    pub modules_dir: PathBuf,

    #[serde(default = "default_manifest_file_name")]
    pub manifest_file_name: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            frameworks_dir: default_frameworks_dir(),
            private_frameworks: default_private_frameworks(),
            public_frameworks: default_public_frameworks(),
            modules_dir: default_modules_dir(),
            manifest_file_name: default_manifest_file_name(),
        }
    }
}

impl PathsConfig {
    /// Resolves the component roots under `root`.
    pub fn host_paths(&self, root: &Path) -> HostPaths {
        let frameworks = root.join(&self.frameworks_dir);
        HostPaths {
            private_frameworks: frameworks.join(&self.private_frameworks),
            public_frameworks: frameworks.join(&self.public_frameworks),
            modules: root.join(&self.modules_dir),
            manifest_file_name: self.manifest_file_name.clone(),
        }
    }
}

fn default_frameworks_dir() -> PathBuf {
    PathBuf::from("frameworks")
}

fn default_private_frameworks() -> PathBuf {
    PathBuf::from("PrivateFrameworks")
}

fn default_public_frameworks() -> PathBuf {
    PathBuf::from("PublicFrameworks")
}

fn default_modules_dir() -> PathBuf {
    PathBuf::from("modules")
}

fn default_manifest_file_name() -> String {
    MANIFEST_FILE_NAME.to_string()
}

// =============================================================================
// Boot
// =============================================================================

/// Directory names the boot sequencer skips, in addition to the built-ins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootConfig {
    #[serde(default)]
    pub ignore_private: Vec<String>,

    #[serde(default)]
    pub ignore_public: Vec<String>,

    #[serde(default = "default_ignore_modules")]
    pub ignore_modules: Vec<String>,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            ignore_private: Vec::new(),
            ignore_public: Vec::new(),
            ignore_modules: default_ignore_modules(),
        }
    }
}

fn default_ignore_modules() -> Vec<String> {
    vec!["shell".to_string()]
}

// =============================================================================
// Chat client & persistence
// =============================================================================

/// Chat platform credentials.  Required when `enabled` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub guild_id: Option<String>,
}

/// Persistent mirror of the version table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_version_table")]
    pub table: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            table: default_version_table(),
        }
    }
}

fn default_version_table() -> String {
    VERSION_TABLE.to_string()
}
