//! The host context handed to every component entry point.
//!
//! [`HostContext`] replaces a process-wide mutable object.  It bundles the
//! shared services (registry, version table, readiness bus, chat client) and
//! the tables of live components:
//!
//! - **providers**: activated service providers, searched by
//!   [`capability`](HostContext::capability) for typed capability objects.
//! - **features**: activated feature units.
//!
//! Only the loader publishes into or withdraws from these tables.  The
//! "loaded" flags are owned by whichever component sets them; the runtime
//! sets [`flags::CHAT_CLIENT`] once the client reports ready.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use keel_core::{ComponentKind, MANIFEST_FILE_NAME, ReadinessBus};

use crate::chat::ChatClient;
use crate::component::Component;
use crate::registry::Registry;
use crate::versions::{HostIdentity, VersionTable};

/// Well-known "loaded" flags.
pub mod flags {
    pub const REGISTRY: &str = "registry";
    pub const VERSIONS: &str = "versions";
    pub const LOADER: &str = "loader";
    pub const PERSISTENCE: &str = "persistence";
    pub const CHAT_CLIENT: &str = "chat-client";
}

// ─── HostInfo ────────────────────────────────────────────────────────────────

/// How the host binary was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildType {
    Development,
    Release,
    /// Forced by an `.internal` marker next to the host.
    Internal,
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Development => "DEVELOPMENT",
            Self::Release => "RELEASE",
            Self::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}

/// Static facts about the running host.
#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    pub name: String,
    pub version: String,
    pub build: BuildType,
    pub debug_mode: bool,
    pub platform: &'static str,
    pub arch: &'static str,
}

impl HostInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            build: BuildType::Development,
            debug_mode: false,
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }

    /// Identity seeded into the version table as the kernel row.
    pub fn identity(&self) -> HostIdentity {
        HostIdentity {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

// ─── HostPaths ───────────────────────────────────────────────────────────────

/// Component roots used to classify manifest paths.
#[derive(Debug, Clone)]
pub struct HostPaths {
    pub private_frameworks: PathBuf,
    pub public_frameworks: PathBuf,
    pub modules: PathBuf,
    pub manifest_file_name: String,
}

impl HostPaths {
    /// Standard layout under `root`:
    /// `frameworks/PrivateFrameworks`, `frameworks/PublicFrameworks`, `modules`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            private_frameworks: root.join("frameworks").join("PrivateFrameworks"),
            public_frameworks: root.join("frameworks").join("PublicFrameworks"),
            modules: root.join("modules"),
            manifest_file_name: MANIFEST_FILE_NAME.to_string(),
        }
    }

    /// Kind of component expected under `path`, by location alone.
    pub fn classify(&self, path: &Path) -> Option<ComponentKind> {
        if path.starts_with(&self.private_frameworks) || path.starts_with(&self.public_frameworks) {
            Some(ComponentKind::ServiceProvider)
        } else if path.starts_with(&self.modules) {
            Some(ComponentKind::FeatureUnit)
        } else {
            None
        }
    }
}

// ─── HostContext ─────────────────────────────────────────────────────────────

/// Shared state passed to every entry point as `Arc<HostContext>`.
pub struct HostContext {
    info: HostInfo,
    paths: HostPaths,
    registry: Arc<Registry>,
    versions: Arc<VersionTable>,
    bus: Arc<ReadinessBus>,
    chat: Option<Arc<dyn ChatClient>>,
    flags: RwLock<HashMap<String, bool>>,
    providers: RwLock<Vec<(String, Arc<Component>)>>,
    features: RwLock<Vec<(String, Arc<Component>)>>,
}

impl HostContext {
    pub fn new(
        info: HostInfo,
        paths: HostPaths,
        registry: Arc<Registry>,
        versions: Arc<VersionTable>,
        bus: Arc<ReadinessBus>,
    ) -> Self {
        Self {
            info,
            paths,
            registry,
            versions,
            bus,
            chat: None,
            flags: RwLock::new(HashMap::new()),
            providers: RwLock::new(Vec::new()),
            features: RwLock::new(Vec::new()),
        }
    }

    /// Attaches a chat client.  It is not considered loaded until
    /// [`flags::CHAT_CLIENT`] is set.
    pub fn with_chat_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(client);
        self
    }

    // ─── Shared services ─────────────────────────────────────────────────────

    pub fn info(&self) -> &HostInfo {
        &self.info
    }

    pub fn paths(&self) -> &HostPaths {
        &self.paths
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn versions(&self) -> &Arc<VersionTable> {
        &self.versions
    }

    pub fn bus(&self) -> &Arc<ReadinessBus> {
        &self.bus
    }

    /// The attached chat client, whether or not it is ready.
    pub fn chat_client(&self) -> Option<&Arc<dyn ChatClient>> {
        self.chat.as_ref()
    }

    /// Returns `true` if a chat client is attached and has reported ready.
    pub fn chat_client_loaded(&self) -> bool {
        self.chat.is_some() && self.is_loaded(flags::CHAT_CLIENT)
    }

    // ─── Flags ───────────────────────────────────────────────────────────────

    pub fn set_loaded(&self, flag: &str, loaded: bool) {
        self.flags.write().insert(flag.to_string(), loaded);
    }

    pub fn is_loaded(&self, flag: &str) -> bool {
        self.flags.read().get(flag).copied().unwrap_or(false)
    }

    // ─── Component tables ────────────────────────────────────────────────────

    pub(crate) fn publish(&self, kind: ComponentKind, name: &str, component: Arc<Component>) {
        let table = match kind {
            ComponentKind::ServiceProvider => &self.providers,
            ComponentKind::FeatureUnit => &self.features,
        };
        table.write().push((name.to_string(), component));
    }

    /// Removes the most recently published component named `name`.
    pub(crate) fn withdraw(&self, kind: ComponentKind, name: &str) -> Option<Arc<Component>> {
        let table = match kind {
            ComponentKind::ServiceProvider => &self.providers,
            ComponentKind::FeatureUnit => &self.features,
        };
        let mut table = table.write();
        let pos = table.iter().rposition(|(n, _)| n == name)?;
        Some(table.remove(pos).1)
    }

    /// Returns the active service provider named `name`.
    pub fn provider(&self, name: &str) -> Option<Arc<Component>> {
        find(&self.providers.read(), name)
    }

    /// Returns the active feature unit named `name`.
    pub fn feature(&self, name: &str) -> Option<Arc<Component>> {
        find(&self.features.read(), name)
    }

    /// Names of active service providers in activation order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.read().iter().map(|(n, _)| n.clone()).collect()
    }

    /// Names of active feature units in activation order.
    pub fn feature_names(&self) -> Vec<String> {
        self.features.read().iter().map(|(n, _)| n.clone()).collect()
    }

    /// Returns the first capability of type `Arc<T>` exposed by any active
    /// service provider.
    pub fn capability<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.providers
            .read()
            .iter()
            .find_map(|(_, component)| component.capability::<T>())
    }
}

fn find(table: &[(String, Arc<Component>)], name: &str) -> Option<Arc<Component>> {
    table
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, c)| Arc::clone(c))
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("info", &self.info)
            .field("paths", &self.paths)
            .field("providers", &self.provider_names())
            .field("features", &self.feature_names())
            .field("chat_client_loaded", &self.chat_client_loaded())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> HostContext {
        HostContext::new(
            HostInfo::new("host", "1.0.0"),
            HostPaths::under("/srv/keel"),
            Arc::new(Registry::new()),
            Arc::new(VersionTable::new()),
            Arc::new(ReadinessBus::new()),
        )
    }

    #[test]
    fn test_classify_by_location() {
        let paths = HostPaths::under("/srv/keel");
        assert_eq!(
            paths.classify(Path::new(
                "/srv/keel/frameworks/PrivateFrameworks/db/manifest.toml"
            )),
            Some(ComponentKind::ServiceProvider)
        );
        assert_eq!(
            paths.classify(Path::new(
                "/srv/keel/frameworks/PublicFrameworks/db/manifest.toml"
            )),
            Some(ComponentKind::ServiceProvider)
        );
        assert_eq!(
            paths.classify(Path::new("/srv/keel/modules/greeter/manifest.toml")),
            Some(ComponentKind::FeatureUnit)
        );
        assert_eq!(paths.classify(Path::new("/tmp/greeter/manifest.toml")), None);
    }

    #[test]
    fn test_flags() {
        let ctx = context();
        assert!(!ctx.is_loaded(flags::CHAT_CLIENT));
        ctx.set_loaded(flags::CHAT_CLIENT, true);
        assert!(ctx.is_loaded(flags::CHAT_CLIENT));
        // No client attached.
        assert!(!ctx.chat_client_loaded());
    }

    #[test]
    fn test_publish_and_capability_lookup() {
        let ctx = context();
        let component = Component::builder("numbers")
            .provide::<u32>(Arc::new(7))
            .build();
        ctx.publish(ComponentKind::ServiceProvider, "numbers", Arc::new(component));

        assert_eq!(*ctx.capability::<u32>().unwrap(), 7);
        assert!(ctx.provider("numbers").is_some());
        assert!(ctx.feature("numbers").is_none());

        assert!(ctx.withdraw(ComponentKind::ServiceProvider, "numbers").is_some());
        assert!(ctx.capability::<u32>().is_none());
    }
}
