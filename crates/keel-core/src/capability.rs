//! Capability tags declared by feature-unit manifests.
//!
//! Feature units advertise what they want from the host through boolean
//! flags in `Module Settings` and `Module Abilities`.  The parser folds those
//! flags into a [`CapabilitySet`] so the loader can gate on them without
//! knowing the manifest layout.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single capability tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Uses the chat client when it is available (soft dependency).
    WantsChatClient,
    /// Cannot run without the chat client (hard dependency).
    NeedsChatClient,
    /// May register its declared commands with the chat client.
    InitCommands,
    /// Runs in debug mode: command registration is simulated and never
    /// marked as done in the manifest.
    DebugMode,
    /// Any other ability flag set in the manifest.
    Custom(String),
}

impl Capability {
    /// Parses a capability from its tag string.
    pub fn parse(s: &str) -> Self {
        match s {
            "wants_chat_client" => Self::WantsChatClient,
            "needs_chat_client" => Self::NeedsChatClient,
            "init_commands" => Self::InitCommands,
            "debug_mode" => Self::DebugMode,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Returns the tag string for this capability.
    pub fn as_str(&self) -> &str {
        match self {
            Self::WantsChatClient => "wants_chat_client",
            Self::NeedsChatClient => "needs_chat_client",
            Self::InitCommands => "init_commands",
            Self::DebugMode => "debug_mode",
            Self::Custom(s) => s,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered set of capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    capabilities: BTreeSet<Capability>,
}

impl CapabilitySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set from tag strings.
    pub fn from_strings<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            capabilities: strings
                .into_iter()
                .map(|s| Capability::parse(s.as_ref()))
                .collect(),
        }
    }

    /// Adds a capability.
    pub fn add(&mut self, cap: Capability) {
        self.capabilities.insert(cap);
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, cap: Capability) -> Self {
        self.add(cap);
        self
    }

    /// Returns `true` if the set contains `cap`.
    pub fn has(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns `true` if the unit uses the chat client in any way.
    pub fn uses_chat_client(&self) -> bool {
        self.has(&Capability::WantsChatClient) || self.has(&Capability::NeedsChatClient)
    }

    /// Iterates over the capabilities in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    /// Number of capabilities in the set.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_known_tags() {
        for tag in ["wants_chat_client", "needs_chat_client", "init_commands", "debug_mode"] {
            assert_eq!(Capability::parse(tag).as_str(), tag);
        }
        assert_eq!(
            Capability::parse("telemetry"),
            Capability::Custom("telemetry".to_string())
        );
    }

    #[test]
    fn test_uses_chat_client() {
        assert!(!CapabilitySet::new().uses_chat_client());
        assert!(
            CapabilitySet::new()
                .with(Capability::WantsChatClient)
                .uses_chat_client()
        );
        assert!(
            CapabilitySet::from_strings(["needs_chat_client"]).uses_chat_client()
        );
    }
}
