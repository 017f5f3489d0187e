//! Command registration for feature units.
//!
//! Runs once a unit and its sub-components have loaded.  Commands are handed
//! to the chat client one by one; when every call succeeds and the unit is
//! not in debug mode, `hasPreviousInit` is written back to the manifest so
//! the next run skips them.  Host debug mode only adds detail to the log.

use serde_json::json;
use tracing::{debug, error, info, warn};

use keel_core::{Capability, ComponentDescriptor, ManifestDocument, signals};

use crate::chat::CommandRegistration;
use crate::context::HostContext;

/// Why a unit's commands were not registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Skip {
    ChatClientNotLoaded,
    NoChatCapability,
    NoInitAbility,
    AlreadyRegistered,
    NoCommands,
}

pub(crate) fn skip_reason(ctx: &HostContext, descriptor: &ComponentDescriptor) -> Option<Skip> {
    if !ctx.chat_client_loaded() {
        Some(Skip::ChatClientNotLoaded)
    } else if !descriptor.capabilities.uses_chat_client() {
        Some(Skip::NoChatCapability)
    } else if !descriptor.capabilities.has(&Capability::InitCommands) {
        Some(Skip::NoInitAbility)
    } else if descriptor.previously_registered_commands {
        Some(Skip::AlreadyRegistered)
    } else if descriptor.commands.is_empty() {
        Some(Skip::NoCommands)
    } else {
        None
    }
}

/// Registers the unit's commands.  Returns how many the client accepted.
pub(crate) async fn register_commands(ctx: &HostContext, doc: &mut ManifestDocument) -> usize {
    let descriptor = doc.descriptor().clone();

    match skip_reason(ctx, &descriptor) {
        None => {}
        Some(Skip::AlreadyRegistered) => {
            info!(component = %descriptor.name, "Commands already registered, skipping");
            return 0;
        }
        Some(reason) => {
            debug!(component = %descriptor.name, ?reason, "Not registering commands");
            return 0;
        }
    }

    let Some(client) = ctx.chat_client() else {
        return 0;
    };
    let simulate = descriptor.debug_mode();
    let verbose = ctx.info().debug_mode;

    let mut accepted = 0;
    for command in &descriptor.commands {
        let registration = CommandRegistration {
            component: descriptor.name.clone(),
            command: command.clone(),
        };
        match client.register_command(&registration, simulate).await {
            Ok(()) => {
                accepted += 1;
                if verbose {
                    info!(
                        component = %descriptor.name,
                        command = %command.name,
                        arguments = ?command.arguments.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
                        "Command accepted"
                    );
                }
                ctx.bus()
                    .emit(
                        signals::COMMAND_REGISTERED,
                        Some(json!({
                            "component": descriptor.name,
                            "command": command.name,
                            "simulate": simulate,
                        })),
                    )
                    .await;
            }
            Err(e) => {
                error!(
                    component = %descriptor.name,
                    command = %command.name,
                    error = %e,
                    "Command registration failed"
                );
            }
        }
    }

    info!(
        component = %descriptor.name,
        accepted,
        declared = descriptor.commands.len(),
        simulate,
        "Commands registered"
    );

    if simulate {
        debug!(component = %descriptor.name, "Debug mode, manifest left untouched");
    } else if accepted == descriptor.commands.len() {
        doc.mark_commands_registered();
        if let Err(e) = doc.save().await {
            error!(
                component = %descriptor.name,
                path = %doc.path().display(),
                error = %e,
                "Failed to persist command registration"
            );
        }
    } else {
        warn!(
            component = %descriptor.name,
            "Some commands were rejected, registration will be retried next run"
        );
    }

    accepted
}
