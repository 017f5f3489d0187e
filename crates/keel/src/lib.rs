//! # Keel
//!
//! A host that discovers components on disk, loads them in a fixed order and
//! keeps a registry of what is running.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────────┐     ┌──────────────────────────────────┐
//! │   Runtime   │────▶│ BootSequencer  │────▶│ PrivateFrameworks/*/manifest.toml │
//! │ (services)  │     │                │────▶│ PublicFrameworks/*/manifest.toml  │
//! └─────────────┘     └────────────────┘────▶│ modules/*/manifest.toml           │
//!                             │              └──────────────────────────────────┘
//!                             ▼
//!                     ┌────────────────┐
//!                     │     Loader     │──▶ Registry, VersionTable, HostContext
//!                     └────────────────┘
//! ```
//!
//! - **Runtime**: brings up the version table, registry, loader and chat client
//! - **Boot sequencer**: walks the three component roots in order
//! - **Loader**: gates dependencies, registers speculatively, activates, and
//!   rolls back on failure
//! - **Components**: code linked into the host, resolved by entry file name
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keel::prelude::*;
//!
//! fn greeter() -> Component {
//!     Component::builder("greeter")
//!         .entry_point("start", |_ctx| async { Ok(()) })
//!         .build()
//! }
//!
//! #[distributed_slice(COMPONENT_FACTORIES)]
//! #[linkme(crate = keel::framework::linkme)]
//! static GREETER: ComponentFactory = ComponentFactory::new("greeter", "greeter", greeter);
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     KeelRuntime::builder().build()?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `keel.toml` (default)
//! - `yaml-config`: read `keel.yaml`
//! - `json-log`: JSON log output

pub use keel_core as core;
pub use keel_framework as framework;
pub use keel_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use keel::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use keel_runtime::{BootSummary, KeelConfig, KeelRuntime, RuntimeError};

    // Components - what the host loads
    pub use keel_framework::linkme::distributed_slice;
    pub use keel_framework::{COMPONENT_FACTORIES, Component, ComponentFactory, ComponentTable};

    // Shared services handed to entry points
    pub use keel_framework::{ChatClient, HostContext, Loader, Registry, VersionKind, VersionTable};

    // Data model
    pub use keel_core::{BoxError, ComponentDescriptor, ComponentKind, ReadinessBus, signals};
}
