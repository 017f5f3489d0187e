//! The loader engine.
//!
//! A load request walks one manifest path through the following states:
//!
//! ```text
//! Received ─▶ Classified ─▶ Parsed ─▶ DependencyChecked ─▶ Registered ─▶ Activating
//!    │                                      │                              │
//!    ▼                                      ▼                    ┌─────────┴─────────┐
//! ClassificationFailed                 (request fails)           ▼                   ▼
//!                                                            Activated           RolledBack
//! ```
//!
//! Registration is speculative: the registry and version table learn about a
//! component before its code runs, and a failed activation undoes both.
//! After activation every sub-component is loaded depth-first as an
//! independent request, and finally a feature unit's commands are handed to
//! the chat client.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use keel_core::{
    BoxError, Capability, ComponentDescriptor, ComponentKind, ManifestDocument, signals,
};

use crate::commands;
use crate::component::CodeLoader;
use crate::context::{HostContext, flags};
use crate::error::{LoadError, LoadResult};
use crate::versions::VersionKind;

/// States of a single load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadState {
    Received,
    Classified,
    /// Classified under a service-provider root.
    ServiceProviderPath,
    /// Classified under the feature-unit root.
    FeatureUnitPath,
    Parsed,
    DependencyChecked,
    Registered,
    Activating,
    Activated,
    RolledBack,
    ClassificationFailed,
    /// The manifest was unreadable, misplaced or its dependencies unmet.
    /// Nothing was registered.
    Rejected,
}

impl LoadState {
    /// Returns `true` for states a request ends in.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Activated | Self::RolledBack | Self::ClassificationFailed | Self::Rejected
        )
    }

    /// The path state entered after classifying a request as `kind`.
    pub fn path_for(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::ServiceProvider => Self::ServiceProviderPath,
            ComponentKind::FeatureUnit => Self::FeatureUnitPath,
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of one sub-component request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildReport {
    pub path: PathBuf,
    pub loaded: bool,
}

/// Outcome of a successful load request.
#[derive(Debug)]
pub struct LoadReport {
    pub component: String,
    pub kind: ComponentKind,
    pub state: LoadState,
    /// Non-fatal problems, such as a missing entry point.
    pub notices: Vec<LoadError>,
    /// Sub-component requests in manifest order.
    pub children: Vec<ChildReport>,
    /// Commands accepted by the chat client during this request.
    pub commands_registered: usize,
}

impl LoadReport {
    fn new(descriptor: &ComponentDescriptor) -> Self {
        Self {
            component: descriptor.name.clone(),
            kind: descriptor.kind,
            state: LoadState::Registered,
            notices: Vec::new(),
            children: Vec::new(),
            commands_registered: 0,
        }
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Turns manifest paths into activated components.
///
/// Requests run one at a time on the caller's task.  Nothing here spawns.
pub struct Loader {
    ctx: Arc<HostContext>,
    code: Arc<dyn CodeLoader>,
    ready: AtomicBool,
}

impl Loader {
    pub fn new(ctx: Arc<HostContext>, code: Arc<dyn CodeLoader>) -> Self {
        Self {
            ctx,
            code,
            ready: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &Arc<HostContext> {
        &self.ctx
    }

    /// Marks the loader available and emits [`signals::LOADER_READY`].
    pub async fn init(&self) {
        if self.ready.swap(true, Ordering::SeqCst) {
            return;
        }
        self.ctx.set_loaded(flags::LOADER, true);
        info!("Loader ready");
        self.ctx.bus().emit(signals::LOADER_READY, None).await;
    }

    /// Decides the component kind from the manifest's location.
    pub fn classify(&self, path: &Path) -> LoadResult<ComponentKind> {
        self.ctx
            .paths()
            .classify(path)
            .ok_or_else(|| LoadError::ClassificationFailed(path.to_path_buf()))
    }

    /// Loads the component at `path`, logging any failure.
    ///
    /// Returns `true` if the component activated.
    pub async fn load_request(&self, path: &Path) -> bool {
        match self.load(path).await {
            Ok(report) => {
                info!(
                    component = %report.component,
                    kind = %report.kind,
                    children = report.children.len(),
                    "Load request complete"
                );
                true
            }
            Err(e) => {
                log_failure(path, &e);
                false
            }
        }
    }

    /// Loads the component at `path` and then its sub-components.
    ///
    /// A failing child is recorded in [`LoadReport::children`] and does not
    /// fail the parent.
    pub fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, LoadResult<LoadReport>> {
        Box::pin(async move {
            let (mut report, mut doc) = self.load_one(path).await?;

            for child in doc.sub_component_paths() {
                debug!(parent = %report.component, path = %child.display(), "Loading sub-component");
                let loaded = match self.load(&child).await {
                    Ok(_) => true,
                    Err(e) => {
                        log_failure(&child, &e);
                        false
                    }
                };
                report.children.push(ChildReport {
                    path: child,
                    loaded,
                });
            }

            if report.kind == ComponentKind::FeatureUnit {
                report.commands_registered = commands::register_commands(&self.ctx, &mut doc).await;
            }

            Ok(report)
        })
    }

    /// Runs one request up to a terminal state, without recursing.
    async fn load_one(&self, path: &Path) -> LoadResult<(LoadReport, ManifestDocument)> {
        trace_state(path, LoadState::Received);

        let expected = match self.classify(path) {
            Ok(kind) => kind,
            Err(e) => {
                trace_state(path, LoadState::ClassificationFailed);
                return Err(e);
            }
        };
        trace_state(path, LoadState::Classified);
        trace_state(path, LoadState::path_for(expected));

        let (doc, descriptor) = match self.parse_and_gate(path, expected).await {
            Ok(parsed) => parsed,
            Err(e) => {
                trace_state(path, LoadState::Rejected);
                return Err(e);
            }
        };
        trace_state(path, LoadState::DependencyChecked);

        self.register(&descriptor).await;
        trace_state(path, LoadState::Registered);

        let mut report = LoadReport::new(&descriptor);
        trace_state(path, LoadState::Activating);
        match self.activate(&doc, &mut report).await {
            Ok(()) => {
                report.state = LoadState::Activated;
                trace_state(path, LoadState::Activated);
                self.ctx
                    .bus()
                    .emit(
                        signals::COMPONENT_ACTIVATED,
                        Some(json!({
                            "name": descriptor.name,
                            "kind": descriptor.kind.as_str(),
                        })),
                    )
                    .await;
                Ok((report, doc))
            }
            Err(e) => {
                self.roll_back(&descriptor, &e).await;
                trace_state(path, LoadState::RolledBack);
                Err(e)
            }
        }
    }

    // ─── Gating ──────────────────────────────────────────────────────────────

    async fn parse_and_gate(
        &self,
        path: &Path,
        expected: ComponentKind,
    ) -> LoadResult<(ManifestDocument, ComponentDescriptor)> {
        let doc = ManifestDocument::read(path).await?;
        let found = doc.descriptor().kind;
        if found != expected {
            return Err(LoadError::KindMismatch {
                path: path.to_path_buf(),
                expected,
                found,
            });
        }
        trace_state(path, LoadState::Parsed);

        let descriptor = doc.descriptor().clone();
        self.check_dependencies(&descriptor)?;
        Ok((doc, descriptor))
    }

    fn check_dependencies(&self, descriptor: &ComponentDescriptor) -> LoadResult<()> {
        if !descriptor.is_feature_unit() {
            return Ok(());
        }
        let chat_loaded = self.ctx.chat_client_loaded();
        let caps = &descriptor.capabilities;

        if caps.has(&Capability::NeedsChatClient) && !chat_loaded {
            return Err(LoadError::HardDependencyUnmet {
                component: descriptor.name.clone(),
            });
        }
        if caps.has(&Capability::WantsChatClient) && !chat_loaded {
            warn!(
                component = %descriptor.name,
                "Chat client not loaded, continuing without it"
            );
        }
        Ok(())
    }

    // ─── Registration ────────────────────────────────────────────────────────

    async fn register(&self, descriptor: &ComponentDescriptor) {
        let registry = self.ctx.registry();
        if registry.is_ready() {
            registry.add(descriptor.clone());
        } else {
            warn!(component = %descriptor.name, "Registry not ready, component not catalogued");
        }

        let versions = self.ctx.versions();
        if versions.is_ready() {
            versions
                .set(
                    &descriptor.name,
                    VersionKind::from(descriptor.kind),
                    &descriptor.version,
                )
                .await;
        } else {
            warn!(component = %descriptor.name, "Version table not ready, version not recorded");
        }
    }

    // ─── Activation ──────────────────────────────────────────────────────────

    async fn activate(&self, doc: &ManifestDocument, report: &mut LoadReport) -> LoadResult<()> {
        let descriptor = doc.descriptor();
        let threw = |source: BoxError| LoadError::ActivationThrew {
            component: descriptor.name.clone(),
            source,
        };

        let namespace = self
            .code
            .load(&doc.entry_path())
            .await
            .map_err(|e| threw(Box::new(e)))?;

        let Some(component) = namespace.get(&descriptor.name) else {
            report.notices.push(self.entry_point_missing(descriptor));
            return Ok(());
        };
        self.ctx
            .publish(descriptor.kind, &descriptor.name, Arc::clone(&component));

        if descriptor.entry_point.is_empty() || !component.has_entry_point(&descriptor.entry_point) {
            report.notices.push(self.entry_point_missing(descriptor));
            return Ok(());
        }

        match component
            .invoke(&descriptor.entry_point, Arc::clone(&self.ctx))
            .await
        {
            Some(result) => result.map_err(threw),
            None => {
                report.notices.push(self.entry_point_missing(descriptor));
                Ok(())
            }
        }
    }

    fn entry_point_missing(&self, descriptor: &ComponentDescriptor) -> LoadError {
        let notice = LoadError::EntryPointMissing {
            component: descriptor.name.clone(),
            entry_point: descriptor.entry_point.clone(),
        };
        warn!(component = %descriptor.name, "{notice}, registration kept");
        notice
    }

    async fn roll_back(&self, descriptor: &ComponentDescriptor, cause: &LoadError) {
        warn!(component = %descriptor.name, error = %cause, "Rolling back component");
        self.ctx.registry().remove(&descriptor.name);
        self.ctx.versions().remove(&descriptor.name).await;
        self.ctx.withdraw(descriptor.kind, &descriptor.name);
        self.ctx
            .bus()
            .emit(
                signals::COMPONENT_ROLLED_BACK,
                Some(json!({
                    "name": descriptor.name,
                    "kind": descriptor.kind.as_str(),
                    "error": cause.to_string(),
                })),
            )
            .await;
    }

    // ─── Lookup ──────────────────────────────────────────────────────────────

    /// Unloading is not supported; the request is only logged.
    pub fn unload_request(&self, name: &str) {
        warn!(component = %name, "Unload requested but not supported, component stays active");
    }

    /// Looks up a registered component by name.
    pub fn request_component(&self, name: &str) -> Option<ComponentDescriptor> {
        match self.ctx.registry().find(name) {
            Some(descriptor) => {
                debug!(component = %name, kind = %descriptor.kind, "Component found");
                Some(descriptor)
            }
            None => {
                warn!(component = %name, "Requested component is not registered");
                None
            }
        }
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("ready", &self.ready.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn trace_state(path: &Path, state: LoadState) {
    debug!(path = %path.display(), %state, "Load state");
}

fn log_failure(path: &Path, err: &LoadError) {
    match err {
        LoadError::ClassificationFailed(_) => {
            error!(path = %path.display(), error = %err, "Cannot classify component")
        }
        LoadError::HardDependencyUnmet { .. } => {
            warn!(path = %path.display(), error = %err, "Component skipped")
        }
        _ => error!(path = %path.display(), error = %err, "Load request failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tempfile::TempDir;

    use keel_core::ReadinessBus;

    use super::*;
    use crate::chat::LoopbackChatClient;
    use crate::component::{Component, ComponentFactory, ComponentTable};
    use crate::context::{HostInfo, HostPaths};
    use crate::registry::Registry;
    use crate::versions::VersionTable;

    trait Storage: Send + Sync {
        fn backend(&self) -> &'static str;
    }

    struct InMemory;

    impl Storage for InMemory {
        fn backend(&self) -> &'static str {
            "memory"
        }
    }

    fn storage() -> Component {
        Component::builder("storage")
            .entry_point("start", |_ctx| async { Ok(()) })
            .provide::<dyn Storage>(Arc::new(InMemory))
            .build()
    }

    fn cache() -> Component {
        Component::builder("cache")
            .entry_point("start", |ctx| async move {
                match ctx.capability::<dyn Storage>() {
                    Some(_) => Ok(()),
                    None => Err(BoxError::from("storage capability missing")),
                }
            })
            .build()
    }

    fn broken() -> Component {
        Component::builder("broken")
            .entry_point("start", |_ctx| async { Err(BoxError::from("boom")) })
            .build()
    }

    fn greeter() -> Component {
        Component::builder("greeter")
            .entry_point("start", |_ctx| async { Ok(()) })
            .build()
    }

    fn table() -> ComponentTable {
        ComponentTable::new()
            .with(ComponentFactory::new("storage", "storage", storage))
            .with(ComponentFactory::new("cache", "cache", cache))
            .with(ComponentFactory::new("broken", "broken", broken))
            .with(ComponentFactory::new("greeter", "greeter", greeter))
    }

    struct Harness {
        dir: TempDir,
        loader: Loader,
        chat: Arc<LoopbackChatClient>,
    }

    impl Harness {
        async fn new(chat_loaded: bool) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let bus = Arc::new(ReadinessBus::new());
            let registry = Arc::new(Registry::new());
            let versions = Arc::new(VersionTable::new());
            let info = HostInfo::new("host", "1.0.0");
            registry.init(&bus).await;
            versions.init(&info.identity(), &bus).await;

            let chat = Arc::new(LoopbackChatClient::new());
            let ctx = HostContext::new(info, HostPaths::under(dir.path()), registry, versions, bus)
                .with_chat_client(chat.clone());
            ctx.set_loaded(flags::CHAT_CLIENT, chat_loaded);

            let loader = Loader::new(Arc::new(ctx), Arc::new(table()));
            Self { dir, loader, chat }
        }

        fn write(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        fn ctx(&self) -> &Arc<HostContext> {
            self.loader.context()
        }
    }

    fn framework(name: &str, extra: &str) -> String {
        format!(
            "\"Framework Name\" = \"{name}\"\n\"Framework Version\" = \"1.0.0\"\n\"Framework Entry\" = \"start\"\n\n[\"Framework Structure\"]\nMain = \"{name}.rs\"\n{extra}"
        )
    }

    const GREETER: &str = r#"
"Module Name" = "greeter"
"Module Version" = "0.2.0"

["Module Structure"]
Main = "greeter.rs"

["Module Settings"]
moduleEntryPoint = "start"
canUseChatClient = true

["Module Abilities"]
canInitSlashCommands = true

["Module Commands"]
Hello = "Say hello"
ping = "Check latency"

["Module Command Arguments"]
Hello = "Target"
ping = "none"
"#;

    #[tokio::test]
    async fn test_classify_by_root() {
        let h = Harness::new(false).await;
        let root = h.dir.path();
        let loader = &h.loader;

        assert_eq!(
            loader
                .classify(&root.join("frameworks/PrivateFrameworks/a/manifest.toml"))
                .unwrap(),
            ComponentKind::ServiceProvider
        );
        assert_eq!(
            loader
                .classify(&root.join("frameworks/PublicFrameworks/a/manifest.toml"))
                .unwrap(),
            ComponentKind::ServiceProvider
        );
        assert_eq!(
            loader.classify(&root.join("modules/a/manifest.toml")).unwrap(),
            ComponentKind::FeatureUnit
        );

        let stray = root.join("elsewhere/a/manifest.toml");
        assert!(matches!(
            loader.classify(&stray),
            Err(LoadError::ClassificationFailed(_))
        ));
        assert!(!loader.load_request(&stray).await);
        assert!(h.ctx().registry().is_empty());
    }

    #[test]
    fn test_load_states() {
        assert_eq!(
            LoadState::path_for(ComponentKind::ServiceProvider),
            LoadState::ServiceProviderPath
        );
        assert_eq!(
            LoadState::path_for(ComponentKind::FeatureUnit),
            LoadState::FeatureUnitPath
        );
        for state in [
            LoadState::Activated,
            LoadState::RolledBack,
            LoadState::ClassificationFailed,
            LoadState::Rejected,
        ] {
            assert!(state.is_terminal(), "{state}");
        }
        assert!(!LoadState::Registered.is_terminal());
        assert!(!LoadState::FeatureUnitPath.is_terminal());
    }

    #[tokio::test]
    async fn test_activation_publishes_capabilities() {
        let h = Harness::new(false).await;
        let path = h.write(
            "frameworks/PrivateFrameworks/storage/manifest.toml",
            &framework("storage", ""),
        );

        let report = h.loader.load(&path).await.unwrap();
        assert_eq!(report.state, LoadState::Activated);
        assert!(report.notices.is_empty());

        let ctx = h.ctx();
        assert_eq!(ctx.capability::<dyn Storage>().unwrap().backend(), "memory");
        assert_eq!(ctx.versions().version_of("storage").as_deref(), Some("1.0.0"));
        assert!(ctx.bus().has_fired(signals::COMPONENT_ACTIVATED));
    }

    #[tokio::test]
    async fn test_failed_entry_point_rolls_back() {
        let h = Harness::new(false).await;
        let path = h.write(
            "frameworks/PublicFrameworks/broken/manifest.toml",
            &framework("broken", ""),
        );
        let rolled_back = h.ctx().bus().once_receiver(signals::COMPONENT_ROLLED_BACK);

        let err = h.loader.load(&path).await.unwrap_err();
        assert!(err.is_rollback());

        let ctx = h.ctx();
        assert!(ctx.registry().find("broken").is_none());
        assert!(ctx.versions().version_of("broken").is_none());
        assert!(ctx.provider("broken").is_none());

        let signal = rolled_back.await.unwrap();
        assert_eq!(signal.payload.unwrap()["name"], "broken");
    }

    #[tokio::test]
    async fn test_missing_module_rolls_back() {
        let h = Harness::new(false).await;
        let path = h.write(
            "frameworks/PublicFrameworks/ghost/manifest.toml",
            &framework("ghost", ""),
        );

        assert!(!h.loader.load_request(&path).await);
        assert!(h.ctx().registry().find("ghost").is_none());
    }

    #[tokio::test]
    async fn test_missing_entry_point_keeps_registration() {
        let h = Harness::new(false).await;
        let path = h.write(
            "frameworks/PrivateFrameworks/storage/manifest.toml",
            &framework("storage", "").replace("\"start\"", "\"launch\""),
        );

        let report = h.loader.load(&path).await.unwrap();
        assert_eq!(report.state, LoadState::Activated);
        assert!(matches!(
            report.notices.as_slice(),
            [LoadError::EntryPointMissing { entry_point, .. }] if entry_point == "launch"
        ));
        assert!(h.ctx().registry().contains("storage"));
    }

    #[tokio::test]
    async fn test_hard_dependency_unmet_registers_nothing() {
        let h = Harness::new(false).await;
        let path = h.write(
            "modules/greeter/manifest.toml",
            &GREETER.replace("canUseChatClient", "dependsChatClient"),
        );

        let err = h.loader.load(&path).await.unwrap_err();
        assert!(matches!(err, LoadError::HardDependencyUnmet { ref component } if component == "greeter"));
        assert!(h.ctx().registry().is_empty());
        assert!(h.ctx().versions().version_of("greeter").is_none());
    }

    #[tokio::test]
    async fn test_wanted_chat_client_missing_still_activates() {
        let h = Harness::new(false).await;
        let path = h.write("modules/greeter/manifest.toml", GREETER);

        let report = h.loader.load(&path).await.unwrap();
        assert_eq!(report.state, LoadState::Activated);
        assert!(report.state.is_terminal());
        assert_eq!(report.commands_registered, 0);

        let ctx = h.ctx();
        assert!(ctx.registry().contains("greeter"));
        assert_eq!(ctx.versions().version_of("greeter").as_deref(), Some("0.2.0"));
        assert!(ctx.feature("greeter").is_some());
        assert_eq!(h.chat.registration_count(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), GREETER);
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_rejected() {
        let h = Harness::new(false).await;
        let path = h.write("modules/storage/manifest.toml", &framework("storage", ""));

        let err = h.loader.load(&path).await.unwrap_err();
        assert!(matches!(err, LoadError::KindMismatch { .. }));
        assert!(h.ctx().registry().is_empty());
    }

    #[tokio::test]
    async fn test_parent_activates_before_children() {
        let h = Harness::new(false).await;
        let parent = h.write(
            "frameworks/PrivateFrameworks/storage/manifest.toml",
            &framework(
                "storage",
                "Cache = \"cache/manifest.toml\"\nBroken = \"broken/manifest.toml\"\n",
            ),
        );
        h.write(
            "frameworks/PrivateFrameworks/storage/cache/manifest.toml",
            &framework("cache", ""),
        );
        h.write(
            "frameworks/PrivateFrameworks/storage/broken/manifest.toml",
            &framework("broken", ""),
        );

        let activated = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&activated);
        h.ctx().bus().on(signals::COMPONENT_ACTIVATED, move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let report = h.loader.load(&parent).await.unwrap();
        assert_eq!(report.children.len(), 2);
        assert!(report.children[0].loaded);
        assert!(!report.children[1].loaded);

        assert_eq!(activated.load(Ordering::SeqCst), 2);
        assert_eq!(h.ctx().provider_names(), ["storage", "cache"]);
        let names = h.ctx().registry().names();
        assert_eq!(names, ["storage", "cache"]);
    }

    #[tokio::test]
    async fn test_commands_registered_once() {
        let h = Harness::new(true).await;
        let path = h.write("modules/greeter/manifest.toml", GREETER);

        let report = h.loader.load(&path).await.unwrap();
        assert_eq!(report.commands_registered, 2);

        let registrations = h.chat.registrations();
        let hello = registrations
            .iter()
            .find(|(r, _)| r.command.name == "hello")
            .unwrap();
        assert_eq!(hello.0.command.arguments[0].name, "target");
        assert!(!hello.1);

        let saved = ManifestDocument::read(&path).await.unwrap();
        assert!(saved.descriptor().previously_registered_commands);

        // A second run reads the persisted flag and skips registration.
        let again = h.loader.load(&path).await.unwrap();
        assert_eq!(again.commands_registered, 0);
        assert_eq!(h.chat.registration_count(), 2);
    }

    #[tokio::test]
    async fn test_debug_mode_simulates_without_persisting() {
        let h = Harness::new(true).await;
        let path = h.write(
            "modules/greeter/manifest.toml",
            &GREETER.replace("canUseChatClient = true", "canUseChatClient = true\ndebugMode = true"),
        );

        let report = h.loader.load(&path).await.unwrap();
        assert_eq!(report.commands_registered, 2);
        assert!(h.chat.registrations().iter().all(|(_, simulate)| *simulate));

        let saved = ManifestDocument::read(&path).await.unwrap();
        assert!(!saved.descriptor().previously_registered_commands);
    }

    #[tokio::test]
    async fn test_request_component() {
        let h = Harness::new(false).await;
        let path = h.write(
            "frameworks/PrivateFrameworks/storage/manifest.toml",
            &framework("storage", ""),
        );
        assert!(h.loader.request_component("storage").is_none());
        assert!(h.loader.load_request(&path).await);
        assert!(h.loader.request_component("storage").is_some());

        h.loader.unload_request("storage");
        assert!(h.loader.request_component("storage").is_some());
    }
}
