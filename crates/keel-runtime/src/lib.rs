//! Keel Runtime - host orchestration for the Keel component system.
//!
//! This crate provides:
//! - Runtime orchestration (`KeelRuntime`)
//! - The boot sequencer that scans the component roots
//! - Layered configuration (`KeelConfig`, `ConfigLoader`)
//! - Logging configuration
//!
//! ```ignore
//! use keel_runtime::KeelRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = KeelRuntime::builder().build()?;
//!
//!     // Boot, then run until Ctrl+C
//!     runtime.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Component Roots
//!
//! Relative to the working directory, by default:
//!
//! - `frameworks/PrivateFrameworks` - host-internal service providers
//! - `frameworks/PublicFrameworks` - shared service providers
//! - `modules` - feature units
//!
//! Each component is a directory holding a `manifest.toml`.

pub mod boot;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use boot::{BUILTIN_SERVICES, BootSequencer, BootSummary, ScanTarget};
pub use config::{ConfigError, ConfigLoader, ConfigResult, KeelConfig, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{INTERNAL_MARKER, KeelRuntime, RuntimeBuilder};

// Re-export tracing for use by components
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for component code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
