//! Host configuration.
//!
//! Settings are layered with figment (defaults, files, `KEEL_*` environment
//! variables, programmatic overrides) and checked by [`validate_config`]
//! before the runtime uses them.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    BootConfig, ChatConfig, HostConfig, KeelConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    PathsConfig, PersistenceConfig, SpanEventConfig,
};
pub use validation::validate_config;
