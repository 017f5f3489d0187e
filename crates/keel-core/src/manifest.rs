//! Component manifest parsing.
//!
//! Every component directory carries a `manifest.toml`.  Its shape decides the
//! component kind:
//!
//! ```toml
//! "Framework Name" = "exampleFramework"
//! "Framework Version" = "1.0.0"
//! "Framework Entry" = "initializeExample"
//!
//! ["Framework Structure"]
//! Main = "exampleFramework.rs"
//! Helper = "helper/manifest.toml"
//! ```
//!
//! A document with `Framework Name` describes a service provider, one with
//! `Module Name` a feature unit.  Every key of the structure map other than
//! `Main` is a sub-component whose manifest path is relative to this
//! manifest's directory.
//!
//! The parsed document is retained so that the loader can write
//! `Module Settings.hasPreviousInit` back after registering commands.

use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::{debug, warn};

use crate::capability::{Capability, CapabilitySet};
use crate::descriptor::{
    ArgumentKind, CommandArgument, CommandSpec, ComponentDescriptor, ComponentKind, SubComponent,
};
use crate::error::{ManifestError, ManifestResult};

/// Default manifest file name inside a component directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.toml";

// ─── Manifest keys ───────────────────────────────────────────────────────────

pub const FRAMEWORK_NAME: &str = "Framework Name";
pub const FRAMEWORK_DESCRIPTION: &str = "Framework Description";
pub const FRAMEWORK_VERSION: &str = "Framework Version";
pub const FRAMEWORK_IDENTIFIER: &str = "Framework Identifier";
pub const FRAMEWORK_ENTRY: &str = "Framework Entry";
pub const FRAMEWORK_STRUCTURE: &str = "Framework Structure";

pub const MODULE_NAME: &str = "Module Name";
pub const MODULE_DESCRIPTION: &str = "Module Description";
pub const MODULE_VERSION: &str = "Module Version";
pub const MODULE_IDENTIFIER: &str = "Module Identifier";
pub const MODULE_STRUCTURE: &str = "Module Structure";
pub const MODULE_SETTINGS: &str = "Module Settings";
pub const MODULE_ABILITIES: &str = "Module Abilities";
pub const MODULE_COMMANDS: &str = "Module Commands";
pub const MODULE_COMMAND_ARGUMENTS: &str = "Module Command Arguments";
pub const MODULE_COMMAND_ARG_TYPE: &str = "Module Command Arg Type";
pub const MODULE_COMMAND_ARG_DESCRIPTIONS: &str = "Module Command Arg Descriptions";
pub const MODULE_COMMAND_ARG_REQUIREMENT: &str = "Module Command Arg Requirement";

pub const STRUCTURE_MAIN: &str = "Main";

const SETTING_ENTRY_POINT: &str = "moduleEntryPoint";
const SETTING_WANTS_CHAT: &str = "canUseChatClient";
const SETTING_NEEDS_CHAT: &str = "dependsChatClient";
const SETTING_PREVIOUS_INIT: &str = "hasPreviousInit";
const SETTING_DEBUG_MODE: &str = "debugMode";
const ABILITY_INIT_COMMANDS: &str = "canInitSlashCommands";

const NO_ARGUMENTS: &str = "none";
const DEFAULT_ARGUMENT_DESCRIPTION: &str = "No description provided.";

// ─── ManifestDocument ────────────────────────────────────────────────────────

/// A parsed manifest together with the raw document it came from.
#[derive(Debug, Clone)]
pub struct ManifestDocument {
    path: PathBuf,
    table: Table,
    descriptor: ComponentDescriptor,
}

impl ManifestDocument {
    /// Parses `content`, which was read from `path`.
    ///
    /// Performs no I/O; `path` is only used to resolve relative paths and to
    /// label errors.
    pub fn parse(path: impl AsRef<Path>, content: &str) -> ManifestResult<Self> {
        let path = path.as_ref().to_path_buf();
        let table: Table = toml::from_str(content)?;

        let descriptor = if table.contains_key(FRAMEWORK_NAME) {
            parse_framework(&path, &table)?
        } else if table.contains_key(MODULE_NAME) {
            parse_module(&path, &table)?
        } else {
            return Err(ManifestError::InvalidManifest { path });
        };

        debug!(
            component = %descriptor.name,
            kind = %descriptor.kind,
            path = %path.display(),
            "Manifest parsed"
        );

        Ok(Self {
            path,
            table,
            descriptor,
        })
    }

    /// Reads and parses the manifest at `path`.
    pub async fn read(path: impl AsRef<Path>) -> ManifestResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(path, &content)
    }

    /// Path the manifest was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    pub fn into_descriptor(self) -> ComponentDescriptor {
        self.descriptor
    }

    /// Absolute (or working-directory relative) path of the entry file.
    pub fn entry_path(&self) -> PathBuf {
        self.directory().join(&self.descriptor.entry_file)
    }

    /// Resolved manifest paths of all sub-components, in manifest order.
    pub fn sub_component_paths(&self) -> Vec<PathBuf> {
        let dir = self.directory();
        self.descriptor
            .sub_components
            .iter()
            .map(|sub| dir.join(&sub.path))
            .collect()
    }

    /// Records that this unit's commands have been registered.
    ///
    /// Only the in-memory document changes; call [`save`](Self::save) to
    /// persist it.
    pub fn mark_commands_registered(&mut self) {
        let settings = self
            .table
            .entry(MODULE_SETTINGS)
            .or_insert_with(|| Value::Table(Table::new()));
        if let Value::Table(settings) = settings {
            settings.insert(SETTING_PREVIOUS_INIT.to_string(), Value::Boolean(true));
        }
        self.descriptor.previously_registered_commands = true;
    }

    /// Writes the document back to the path it was read from.
    pub async fn save(&self) -> ManifestResult<()> {
        let content = toml::to_string_pretty(&self.table)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

// ─── Shape-specific parsing ──────────────────────────────────────────────────

fn parse_framework(path: &Path, table: &Table) -> ManifestResult<ComponentDescriptor> {
    let name = required_str(path, table, FRAMEWORK_NAME)?;
    let (entry_file, sub_components) =
        parse_structure(path, sub_table(table, FRAMEWORK_STRUCTURE), FRAMEWORK_STRUCTURE)?;

    Ok(ComponentDescriptor {
        name,
        kind: ComponentKind::ServiceProvider,
        description: optional_str(table, FRAMEWORK_DESCRIPTION),
        identifier: optional_str(table, FRAMEWORK_IDENTIFIER),
        version: optional_str(table, FRAMEWORK_VERSION),
        entry_file,
        entry_point: optional_str(table, FRAMEWORK_ENTRY),
        sub_components,
        capabilities: CapabilitySet::new(),
        commands: Vec::new(),
        previously_registered_commands: false,
    })
}

fn parse_module(path: &Path, table: &Table) -> ManifestResult<ComponentDescriptor> {
    let name = required_str(path, table, MODULE_NAME)?;
    let (entry_file, sub_components) =
        parse_structure(path, sub_table(table, MODULE_STRUCTURE), MODULE_STRUCTURE)?;

    let settings = sub_table(table, MODULE_SETTINGS);
    let mut capabilities = CapabilitySet::new();
    if flag(settings, SETTING_WANTS_CHAT) {
        capabilities.add(Capability::WantsChatClient);
    }
    if flag(settings, SETTING_NEEDS_CHAT) {
        capabilities.add(Capability::NeedsChatClient);
    }
    if flag(settings, SETTING_DEBUG_MODE) {
        capabilities.add(Capability::DebugMode);
    }
    if let Some(abilities) = sub_table(table, MODULE_ABILITIES) {
        for (ability, enabled) in abilities {
            if enabled.as_bool() != Some(true) {
                continue;
            }
            if ability == ABILITY_INIT_COMMANDS {
                capabilities.add(Capability::InitCommands);
            } else {
                capabilities.add(Capability::Custom(ability.clone()));
            }
        }
    }

    Ok(ComponentDescriptor {
        name,
        kind: ComponentKind::FeatureUnit,
        description: optional_str(table, MODULE_DESCRIPTION),
        identifier: optional_str(table, MODULE_IDENTIFIER),
        version: optional_str(table, MODULE_VERSION),
        entry_file,
        entry_point: settings
            .and_then(|s| s.get(SETTING_ENTRY_POINT))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        sub_components,
        capabilities,
        commands: parse_commands(table),
        previously_registered_commands: flag(settings, SETTING_PREVIOUS_INIT),
    })
}

/// Splits a structure map into the entry file and the sub-components.
fn parse_structure(
    path: &Path,
    structure: Option<&Table>,
    key: &'static str,
) -> ManifestResult<(PathBuf, Vec<SubComponent>)> {
    let structure = structure.ok_or_else(|| ManifestError::missing(path, key))?;
    let main = structure
        .get(STRUCTURE_MAIN)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ManifestError::missing(path, STRUCTURE_MAIN))?;

    let mut sub_components = Vec::new();
    for (label, value) in structure {
        if label == STRUCTURE_MAIN {
            continue;
        }
        match value.as_str() {
            Some(sub_path) => sub_components.push(SubComponent {
                label: label.clone(),
                path: PathBuf::from(sub_path),
            }),
            None => warn!(
                path = %path.display(),
                label = %label,
                "Structure entry is not a path, ignoring"
            ),
        }
    }

    Ok((PathBuf::from(main), sub_components))
}

/// Builds command specs from the `Module Command*` tables.
///
/// Argument names are looked up verbatim in the per-argument tables and
/// lower-cased afterwards, as are command names.
fn parse_commands(table: &Table) -> Vec<CommandSpec> {
    let Some(commands) = sub_table(table, MODULE_COMMANDS) else {
        return Vec::new();
    };
    let arguments = sub_table(table, MODULE_COMMAND_ARGUMENTS);
    let arg_types = sub_table(table, MODULE_COMMAND_ARG_TYPE);
    let arg_descriptions = sub_table(table, MODULE_COMMAND_ARG_DESCRIPTIONS);
    let arg_requirements = sub_table(table, MODULE_COMMAND_ARG_REQUIREMENT);

    commands
        .iter()
        .map(|(name, description)| {
            let declared = arguments
                .and_then(|a| a.get(name))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim();

            let arguments = if declared.is_empty() || declared.eq_ignore_ascii_case(NO_ARGUMENTS) {
                Vec::new()
            } else {
                declared
                    .split(',')
                    .map(str::trim)
                    .filter(|arg| !arg.is_empty())
                    .map(|arg| CommandArgument {
                        name: arg.to_lowercase(),
                        description: arg_descriptions
                            .and_then(|d| d.get(arg))
                            .and_then(Value::as_str)
                            .unwrap_or(DEFAULT_ARGUMENT_DESCRIPTION)
                            .to_string(),
                        kind: arg_types
                            .and_then(|t| t.get(arg))
                            .and_then(Value::as_integer)
                            .map(ArgumentKind::from_code)
                            .unwrap_or_default(),
                        required: flag(arg_requirements, arg),
                    })
                    .collect()
            };

            CommandSpec {
                name: name.to_lowercase(),
                description: description.as_str().unwrap_or_default().to_string(),
                arguments,
            }
        })
        .collect()
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn sub_table<'a>(table: &'a Table, key: &str) -> Option<&'a Table> {
    table.get(key).and_then(Value::as_table)
}

fn required_str(path: &Path, table: &Table, key: &'static str) -> ManifestResult<String> {
    table
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ManifestError::missing(path, key))
}

fn optional_str(table: &Table, key: &str) -> String {
    table
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn flag(table: Option<&Table>, key: &str) -> bool {
    table
        .and_then(|t| t.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

// =============================================================================
// Tests
// =============================================================================
