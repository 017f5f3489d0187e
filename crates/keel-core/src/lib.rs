//! Keel Core - data model and primitives for the Keel component host.
//!
//! This crate has no knowledge of how components are loaded.  It provides:
//!
//! - **Descriptors** ([`ComponentDescriptor`]) - the parsed view of a manifest
//! - **Capabilities** ([`Capability`], [`CapabilitySet`]) - dependency and ability tags
//! - **Manifests** ([`ManifestDocument`]) - TOML manifest parsing and write-back
//! - **Signals** ([`ReadinessBus`]) - one-shot and persistent readiness signals
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────┐
//! │ manifest.toml    │────▶│ ManifestDocument     │──▶ ComponentDescriptor
//! └──────────────────┘     └──────────────────────┘
//!
//! ┌──────────────────┐ emit ┌─────────────────────┐
//! │ built-in service │─────▶│ ReadinessBus        │──▶ once / on subscribers
//! └──────────────────┘      └─────────────────────┘
//! ```

pub mod capability;
pub mod descriptor;
pub mod error;
pub mod manifest;
pub mod signal;

pub use capability::{Capability, CapabilitySet};
pub use descriptor::{
    ArgumentKind, CommandArgument, CommandSpec, ComponentDescriptor, ComponentKind, SubComponent,
};
pub use error::{BoxError, ManifestError, ManifestResult};
pub use manifest::{MANIFEST_FILE_NAME, ManifestDocument};
pub use signal::{ReadinessBus, Signal, signals};
