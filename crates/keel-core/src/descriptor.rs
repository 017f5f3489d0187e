//! Component descriptors: the parsed, immutable view of a manifest.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilitySet};

// ─── ComponentKind ────────────────────────────────────────────────────────────

/// The two kinds of component the host knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Long-lived shared capability provider ("framework").
    ServiceProvider,
    /// Independent unit of business behaviour ("module").
    FeatureUnit,
}

impl ComponentKind {
    /// Lower-case label used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceProvider => "framework",
            Self::FeatureUnit => "module",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── SubComponent ─────────────────────────────────────────────────────────────

/// A nested component listed in a manifest's structure map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubComponent {
    /// Key under which the sub-component was declared.
    pub label: String,
    /// Path of the sub-component's manifest, relative to the parent's directory.
    pub path: PathBuf,
}

// ─── Commands ─────────────────────────────────────────────────────────────────

/// Option type of a command argument, using the chat platform's numeric codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgumentKind {
    #[default]
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
    /// A code the host does not interpret; passed through unchanged.
    Other(i64),
}

impl ArgumentKind {
    /// Maps a numeric option code to a kind.
    pub fn from_code(code: i64) -> Self {
        match code {
            3 => Self::String,
            4 => Self::Integer,
            5 => Self::Boolean,
            6 => Self::User,
            7 => Self::Channel,
            8 => Self::Role,
            9 => Self::Mentionable,
            10 => Self::Number,
            11 => Self::Attachment,
            other => Self::Other(other),
        }
    }

    /// Returns the numeric option code.
    pub fn code(&self) -> i64 {
        match self {
            Self::String => 3,
            Self::Integer => 4,
            Self::Boolean => 5,
            Self::User => 6,
            Self::Channel => 7,
            Self::Role => 8,
            Self::Mentionable => 9,
            Self::Number => 10,
            Self::Attachment => 11,
            Self::Other(code) => *code,
        }
    }
}

/// One argument of a declared command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandArgument {
    pub name: String,
    pub description: String,
    pub kind: ArgumentKind,
    pub required: bool,
}

/// A command a feature unit asks the chat client to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    /// Empty for basic commands.
    pub arguments: Vec<CommandArgument>,
}

impl CommandSpec {
    /// Returns `true` if the command takes no arguments.
    pub fn is_basic(&self) -> bool {
        self.arguments.is_empty()
    }
}

// ─── ComponentDescriptor ──────────────────────────────────────────────────────

/// Everything the host knows about a component after parsing its manifest.
///
/// Names are expected to be unique within a process run, but neither the
/// registry nor the loader enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Registry key.
    pub name: String,
    pub kind: ComponentKind,
    pub description: String,
    /// Reverse-DNS style identifier.
    pub identifier: String,
    pub version: String,
    /// Code entry file, relative to the manifest directory.
    pub entry_file: PathBuf,
    /// Name of the entry point invoked after the entry file is loaded.
    /// Empty when the manifest does not name one.
    pub entry_point: String,
    /// Nested components, in manifest order.
    pub sub_components: Vec<SubComponent>,
    /// Dependency and ability tags (feature units only).
    pub capabilities: CapabilitySet,
    /// Commands offered to the chat client (feature units only).
    pub commands: Vec<CommandSpec>,
    /// Set once the commands have been registered in a previous run.
    pub previously_registered_commands: bool,
}

impl ComponentDescriptor {
    /// Creates a descriptor with only the required fields set.
    pub fn new(name: impl Into<String>, kind: ComponentKind, entry_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            identifier: String::new(),
            version: String::new(),
            entry_file: entry_file.into(),
            entry_point: String::new(),
            sub_components: Vec::new(),
            capabilities: CapabilitySet::new(),
            commands: Vec::new(),
            previously_registered_commands: false,
        }
    }

    /// Sets the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the entry point name.
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Adds a capability tag.
    pub fn with_capability(mut self, cap: Capability) -> Self {
        self.capabilities.add(cap);
        self
    }

    pub fn is_service_provider(&self) -> bool {
        self.kind == ComponentKind::ServiceProvider
    }

    pub fn is_feature_unit(&self) -> bool {
        self.kind == ComponentKind::FeatureUnit
    }

    /// Returns `true` if the unit runs in debug mode.
    pub fn debug_mode(&self) -> bool {
        self.capabilities.has(&Capability::DebugMode)
    }
}
