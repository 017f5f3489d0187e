//! # Keel Framework
//!
//! The component lifecycle layer of the Keel host.
//!
//! This layer provides:
//! - [`Registry`] - the insertion-ordered component catalogue
//! - [`VersionTable`] - component versions with an optional persistent mirror
//! - [`ComponentTable`] - statically linked component code, resolved by entry file
//! - [`HostContext`] - shared services handed to every entry point
//! - [`Loader`] - classification, dependency gating, speculative registration,
//!   activation, rollback and recursive sub-component loading
//! - [`ChatClient`] - the contract used to register feature unit commands

mod commands;
pub mod chat;
pub mod component;
pub mod context;
pub mod error;
pub mod loader;
pub mod persistence;
pub mod registry;
pub mod versions;

pub use chat::{ChatClient, CommandRegistration, LoopbackChatClient};
pub use component::{
    COMPONENT_FACTORIES, CapabilityArc, CodeLoader, Component, ComponentBuilder, ComponentFactory,
    ComponentTable, EntryPointFn, ModuleNamespace,
};
pub use context::{BuildType, HostContext, HostInfo, HostPaths, flags};
pub use error::{
    ChatError, ChatResult, CodeLoadError, LoadError, LoadResult, PersistenceError,
    PersistenceResult,
};
pub use loader::{ChildReport, LoadReport, LoadState, Loader};
pub use persistence::{MemoryBackend, PersistenceBackend, Row};
pub use registry::Registry;
pub use versions::{HostIdentity, VERSION_TABLE, VersionKind, VersionRecord, VersionTable};

#[doc(hidden)]
pub use linkme;
