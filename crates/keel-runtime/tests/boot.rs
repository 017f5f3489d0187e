//! End-to-end boot tests against a temporary component tree.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use keel_core::{BoxError, ManifestDocument, signals};
use keel_framework::{
    BuildType, Component, ComponentFactory, ComponentTable, LoopbackChatClient, MemoryBackend,
    VersionKind,
};
use keel_runtime::{INTERNAL_MARKER, KeelConfig, KeelRuntime, RuntimeBuilder, RuntimeError};

// ─── Components ──────────────────────────────────────────────────────────────

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        42
    }
}

fn clock() -> Component {
    Component::builder("clock")
        .entry_point("start", |_ctx| async { Ok(()) })
        .provide::<dyn Clock>(Arc::new(FixedClock))
        .build()
}

fn scheduler() -> Component {
    Component::builder("scheduler")
        .entry_point("start", |ctx| async move {
            match ctx.capability::<dyn Clock>() {
                Some(clock) if clock.now() == 42 => Ok(()),
                _ => Err(BoxError::from("clock capability missing")),
            }
        })
        .build()
}

fn faulty() -> Component {
    Component::builder("faulty")
        .entry_point("start", |_ctx| async { Err(BoxError::from("refusing to start")) })
        .build()
}

fn alpha() -> Component {
    Component::builder("alpha")
        .entry_point("start", |_ctx| async { Ok(()) })
        .build()
}

fn beta() -> Component {
    Component::builder("beta")
        .entry_point("start", |_ctx| async { Ok(()) })
        .build()
}

fn chatty() -> Component {
    Component::builder("chatty")
        .entry_point("start", |_ctx| async { Ok(()) })
        .build()
}

fn table() -> ComponentTable {
    ComponentTable::new()
        .with(ComponentFactory::new("clock", "clock", clock))
        .with(ComponentFactory::new("scheduler", "scheduler", scheduler))
        .with(ComponentFactory::new("faulty", "faulty", faulty))
        .with(ComponentFactory::new("alpha", "alpha", alpha))
        .with(ComponentFactory::new("beta", "beta", beta))
        .with(ComponentFactory::new("chatty", "chatty", chatty))
}

// ─── Tree helpers ────────────────────────────────────────────────────────────

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn framework(name: &str, extra: &str) -> String {
    format!(
        "\"Framework Name\" = \"{name}\"\n\"Framework Version\" = \"1.0.0\"\n\"Framework Entry\" = \"start\"\n\n[\"Framework Structure\"]\nMain = \"{name}.rs\"\n{extra}"
    )
}

fn feature(name: &str, settings: &str) -> String {
    format!(
        "\"Module Name\" = \"{name}\"\n\"Module Version\" = \"0.1.0\"\n\n[\"Module Structure\"]\nMain = \"{name}.rs\"\n\n[\"Module Settings\"]\nmoduleEntryPoint = \"start\"\n{settings}"
    )
}

const CHATTY: &str = r#"
"Module Name" = "chatty"
"Module Version" = "0.3.0"

["Module Structure"]
Main = "chatty.rs"

["Module Settings"]
moduleEntryPoint = "start"
dependsChatClient = true

["Module Abilities"]
canInitSlashCommands = true

["Module Commands"]
Ping = "Check latency"
Echo = "Repeat a message"

["Module Command Arguments"]
Ping = "none"
Echo = "Message"
"#;

fn base_config() -> KeelConfig {
    let mut config = KeelConfig::default();
    config.host.name = "test-host".into();
    config.host.version = "9.9.9".into();
    config
}

fn builder(root: &Path, config: KeelConfig) -> RuntimeBuilder {
    KeelRuntime::builder()
        .without_env()
        .without_logging()
        .search_path(root)
        .working_dir(root)
        .components(table())
        .merge(config)
}

fn chat_config() -> KeelConfig {
    let mut config = base_config();
    config.chat.enabled = true;
    config.chat.token = Some("token".into());
    config.chat.guild_id = Some("1234".into());
    config
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_parent_framework_loads_before_child() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "frameworks/PrivateFrameworks/clock/manifest.toml",
        &framework("clock", "Scheduler = \"scheduler/manifest.toml\"\n"),
    );
    write(
        dir.path(),
        "frameworks/PrivateFrameworks/clock/scheduler/manifest.toml",
        &framework("scheduler", ""),
    );

    let runtime = builder(dir.path(), base_config()).build().unwrap();
    let summary = runtime.boot().await.unwrap();

    assert_eq!(summary.frameworks, 1);
    assert_eq!(summary.failed, 0);
    let ctx = runtime.context();
    assert_eq!(ctx.provider_names(), ["clock", "scheduler"]);
    let names = ctx.registry().names();
    let clock = names.iter().position(|n| n == "clock").unwrap();
    let scheduler = names.iter().position(|n| n == "scheduler").unwrap();
    assert!(clock < scheduler);
}

#[tokio::test]
async fn test_chat_dependent_module_skipped_without_client() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "modules/chatty/manifest.toml", CHATTY);

    let runtime = builder(dir.path(), base_config()).build().unwrap();
    let summary = runtime.boot().await.unwrap();

    assert_eq!(summary.modules, 1);
    assert_eq!(summary.failed, 1);
    let ctx = runtime.context();
    assert!(!ctx.registry().contains("chatty"));
    assert!(ctx.versions().version_of("chatty").is_none());
    assert!(ctx.feature("chatty").is_none());
}

#[tokio::test]
async fn test_modules_load_in_lexical_order() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "modules/Beta/manifest.toml", &feature("beta", ""));
    write(dir.path(), "modules/Alpha/manifest.toml", &feature("alpha", ""));

    let runtime = builder(dir.path(), base_config()).build().unwrap();
    runtime.boot().await.unwrap();

    assert_eq!(runtime.context().feature_names(), ["alpha", "beta"]);
    let names = runtime.context().registry().names();
    let alpha = names.iter().position(|n| n == "alpha").unwrap();
    let beta = names.iter().position(|n| n == "beta").unwrap();
    assert!(alpha < beta);
}

#[tokio::test]
async fn test_load_request_outside_roots_is_refused() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "stray/alpha/manifest.toml", &feature("alpha", ""));

    let runtime = builder(dir.path(), base_config()).build().unwrap();
    runtime.boot().await.unwrap();

    let loader = runtime.loader();
    assert!(
        !loader
            .load_request(&dir.path().join("stray/alpha/manifest.toml"))
            .await
    );
    assert!(!runtime.context().registry().contains("alpha"));
}

#[tokio::test]
async fn test_failed_activation_rolls_back_and_boot_continues() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "frameworks/PublicFrameworks/faulty/manifest.toml",
        &framework("faulty", ""),
    );
    write(
        dir.path(),
        "frameworks/PublicFrameworks/zclock/manifest.toml",
        &framework("clock", ""),
    );

    let runtime = builder(dir.path(), base_config()).build().unwrap();
    let summary = runtime.boot().await.unwrap();

    assert_eq!(summary.frameworks, 2);
    assert_eq!(summary.failed, 1);
    let ctx = runtime.context();
    assert!(!ctx.registry().contains("faulty"));
    assert!(ctx.versions().version_of("faulty").is_none());
    assert!(ctx.provider("faulty").is_none());
    assert!(ctx.registry().contains("clock"));
    assert_eq!(ctx.bus().emit_count(signals::COMPONENT_ROLLED_BACK), 1);
}

#[tokio::test]
async fn test_commands_registered_once_across_runs() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "modules/chatty/manifest.toml", CHATTY);

    let first_client = Arc::new(LoopbackChatClient::new());
    let first = builder(dir.path(), chat_config())
        .chat_client(first_client.clone())
        .build()
        .unwrap();
    first.boot().await.unwrap();

    assert_eq!(first_client.registration_count(), 2);
    assert!(first.context().registry().contains("loopback-chat"));
    assert!(first.context().registry().contains("chatty"));
    let saved = ManifestDocument::read(dir.path().join("modules/chatty/manifest.toml"))
        .await
        .unwrap();
    assert!(saved.descriptor().previously_registered_commands);
    first.shutdown().await;

    let second_client = Arc::new(LoopbackChatClient::new());
    let second = builder(dir.path(), chat_config())
        .chat_client(second_client.clone())
        .build()
        .unwrap();
    second.boot().await.unwrap();

    assert!(second.context().registry().contains("chatty"));
    assert_eq!(second_client.registration_count(), 0);
}

#[tokio::test]
async fn test_ready_signals_fire_once() {
    let dir = TempDir::new().unwrap();
    let runtime = builder(dir.path(), base_config()).build().unwrap();
    let summary = runtime.boot().await.unwrap();
    assert_eq!(summary.attempted(), 0);

    let bus = runtime.context().bus();
    for signal in [
        signals::VERSIONS_READY,
        signals::REGISTRY_READY,
        signals::LOADER_READY,
    ] {
        assert_eq!(bus.emit_count(signal), 1, "{signal}");
    }
    assert!(!bus.has_fired(signals::CHAT_CLIENT_READY));
    assert!(runtime.context().registry().contains("versions"));

    assert!(matches!(
        runtime.boot().await,
        Err(RuntimeError::AlreadyBooted)
    ));
    assert_eq!(bus.emit_count(signals::REGISTRY_READY), 1);
}

#[tokio::test]
async fn test_persisted_version_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let mut config = base_config();
    config.persistence.enabled = true;

    let backend = Arc::new(MemoryBackend::new());
    let runtime = builder(dir.path(), config)
        .persistence(backend.clone())
        .build()
        .unwrap();
    runtime.boot().await.unwrap();

    let versions = runtime.context().versions();
    assert!(versions.is_persistent());
    assert!(backend.has_table(&runtime.config().persistence.table));

    versions.set("widget", VersionKind::Module, "1.0.0").await;
    versions.set("widget", VersionKind::Module, "2.0.0").await;

    let record = versions.get("widget").await.unwrap();
    assert_eq!(record.version, "1.0.0");
    assert_eq!(record.kind, VersionKind::Module);
    assert_eq!(versions.version_of("widget").as_deref(), Some("2.0.0"));

    let host = versions.get("test-host").await.unwrap();
    assert_eq!(host.kind, VersionKind::Kernel);
    assert_eq!(host.version, "9.9.9");
}

#[tokio::test]
async fn test_ignored_names_and_files_are_skipped() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "frameworks/PrivateFrameworks/registry/manifest.toml",
        &framework("clock", ""),
    );
    write(dir.path(), "modules/shell/manifest.toml", &feature("alpha", ""));
    write(dir.path(), "modules/notes.txt", "not a component");
    write(dir.path(), "modules/Beta/manifest.toml", &feature("beta", ""));

    let mut config = base_config();
    config.boot.ignore_modules.push("Beta".into());

    let runtime = builder(dir.path(), config).build().unwrap();
    let summary = runtime.boot().await.unwrap();

    assert_eq!(summary.attempted(), 0);
    let ctx = runtime.context();
    assert!(!ctx.registry().contains("clock"));
    assert!(!ctx.registry().contains("alpha"));
    assert!(!ctx.registry().contains("beta"));
}

#[tokio::test]
async fn test_internal_marker_enables_debug_mode() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(INTERNAL_MARKER), "").unwrap();

    let runtime = builder(dir.path(), base_config()).build().unwrap();
    let info = runtime.context().info();
    assert_eq!(info.build, BuildType::Internal);
    assert!(info.debug_mode);
}

#[tokio::test]
async fn test_host_debug_mode_still_registers_commands() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(INTERNAL_MARKER), "").unwrap();
    write(dir.path(), "modules/chatty/manifest.toml", CHATTY);

    let mut config = chat_config();
    config.host.debug_mode = true;
    let client = Arc::new(LoopbackChatClient::new());
    let runtime = builder(dir.path(), config)
        .chat_client(client.clone())
        .build()
        .unwrap();
    assert!(runtime.context().info().debug_mode);
    runtime.boot().await.unwrap();

    assert_eq!(client.registration_count(), 2);
    assert!(client.registrations().iter().all(|(_, simulate)| !*simulate));
    let saved = ManifestDocument::read(dir.path().join("modules/chatty/manifest.toml"))
        .await
        .unwrap();
    assert!(saved.descriptor().previously_registered_commands);
}

#[test]
fn test_chat_requires_client_and_credentials() {
    let dir = TempDir::new().unwrap();

    let result = builder(dir.path(), chat_config()).build();
    assert!(matches!(result, Err(RuntimeError::MissingChatClient)));

    let mut config = chat_config();
    config.chat.token = None;
    let result = builder(dir.path(), config)
        .chat_client(Arc::new(LoopbackChatClient::new()))
        .build();
    assert!(matches!(result, Err(RuntimeError::Config(_))));
}
