//! Chat client contract.
//!
//! The host does not ship a chat platform integration.  It only needs two
//! things from one: a way to start it (which ends with the client emitting
//! [`signals::CHAT_CLIENT_READY`]) and a way to register the commands that
//! feature units declare.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use keel_core::{CommandSpec, ReadinessBus, signals};

use crate::error::ChatResult;

/// One command registration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRegistration {
    /// Feature unit declaring the command.
    pub component: String,
    /// The command, with lower-cased name and argument names.
    pub command: CommandSpec,
}

impl CommandRegistration {
    /// Returns `true` if the command takes no arguments.
    pub fn is_basic(&self) -> bool {
        self.command.is_basic()
    }
}

/// A chat platform client.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Component name the client registers under.
    fn name(&self) -> &str {
        "chat-client"
    }

    /// Client version recorded in the version table.
    fn version(&self) -> &str {
        "0.0.0"
    }

    /// Connects to the platform.
    ///
    /// Must emit [`signals::CHAT_CLIENT_READY`] on `bus` once connected.
    /// The runtime subscribes before calling this.
    async fn start(&self, bus: Arc<ReadinessBus>) -> ChatResult<()>;

    /// Registers one command.
    ///
    /// With `simulate` set the client must not touch the platform, only
    /// report what it would register.
    async fn register_command(
        &self,
        registration: &CommandRegistration,
        simulate: bool,
    ) -> ChatResult<()>;

    /// Disconnects from the platform.
    async fn stop(&self) {}
}

// ─── LoopbackChatClient ──────────────────────────────────────────────────────

/// A client that connects instantly and records every registration.
///
/// Stands in for a real platform in tests and local runs.
#[derive(Debug, Default)]
pub struct LoopbackChatClient {
    registered: Mutex<Vec<(CommandRegistration, bool)>>,
}

impl LoopbackChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every registration received, with its `simulate` flag.
    pub fn registrations(&self) -> Vec<(CommandRegistration, bool)> {
        self.registered.lock().clone()
    }

    /// Number of registrations received.
    pub fn registration_count(&self) -> usize {
        self.registered.lock().len()
    }
}

#[async_trait]
impl ChatClient for LoopbackChatClient {
    fn name(&self) -> &str {
        "loopback-chat"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    async fn start(&self, bus: Arc<ReadinessBus>) -> ChatResult<()> {
        info!("Loopback chat client connected");
        bus.emit(signals::CHAT_CLIENT_READY, None).await;
        Ok(())
    }

    async fn register_command(
        &self,
        registration: &CommandRegistration,
        simulate: bool,
    ) -> ChatResult<()> {
        info!(
            component = %registration.component,
            command = %registration.command.name,
            arguments = registration.command.arguments.len(),
            simulate,
            "Registering command"
        );
        self.registered.lock().push((registration.clone(), simulate));
        Ok(())
    }
}
