//! Host orchestration.
//!
//! [`KeelRuntime`] owns the built-in services and brings them up in a fixed
//! order before handing over to the boot sequencer:
//!
//! 1. version table (`versions.ready`)
//! 2. registry (`registry.ready`)
//! 3. loader (`loader.ready`)
//! 4. chat client, if configured (`chat-client.ready`)
//! 5. boot scan of the component roots
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use keel_runtime::KeelRuntime;
//!
//! let runtime = KeelRuntime::builder()
//!     .working_dir("/srv/keel")
//!     .build()?;
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tracing::{debug, info, warn};

use keel_core::{ComponentDescriptor, ComponentKind, ReadinessBus, signals};
use keel_framework::{
    BuildType, ChatClient, CodeLoader, ComponentTable, HostContext, HostInfo, Loader,
    MemoryBackend, PersistenceBackend, Registry, VersionKind, VersionTable, flags,
};

use crate::boot::{BootSequencer, BootSummary};
use crate::config::{ConfigLoader, KeelConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Marker file that switches the host into internal debug builds.
pub const INTERNAL_MARKER: &str = ".internal";

/// The Keel host.
pub struct KeelRuntime {
    config: KeelConfig,
    ctx: Arc<HostContext>,
    loader: Loader,
    booted: AtomicBool,
}

impl KeelRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &KeelConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<HostContext> {
        &self.ctx
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Starts the built-in services and loads every component.
    ///
    /// Individual component failures are logged and counted in the summary.
    /// Only a chat client that fails to start is fatal.
    pub async fn boot(&self) -> RuntimeResult<BootSummary> {
        if self.booted.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyBooted);
        }
        let info = self.ctx.info();
        info!(
            host = %info.name,
            version = %info.version,
            build = %info.build,
            platform = info.platform,
            arch = info.arch,
            debug_mode = info.debug_mode,
            "Booting host"
        );

        let bus = self.ctx.bus();
        let registry = self.ctx.registry();
        let versions = self.ctx.versions();

        // Subscribed before `registry.init` below; a later subscription
        // would miss the signal.
        {
            let registry = Arc::clone(registry);
            let versions = Arc::clone(versions);
            bus.once(signals::REGISTRY_READY, move |_| async move {
                let version = versions
                    .version_of(VersionTable::COMPONENT_NAME)
                    .unwrap_or_default();
                registry.add(
                    ComponentDescriptor::new(
                        VersionTable::COMPONENT_NAME,
                        ComponentKind::ServiceProvider,
                        "versions.rs",
                    )
                    .with_version(version),
                );
            });
        }

        versions.init(&info.identity(), bus).await;
        self.ctx.set_loaded(flags::VERSIONS, true);
        if versions.is_persistent() {
            self.ctx.set_loaded(flags::PERSISTENCE, true);
        }

        registry.init(bus).await;
        self.ctx.set_loaded(flags::REGISTRY, true);

        self.loader.init().await;

        if let Some(client) = self.ctx.chat_client() {
            self.start_chat_client(Arc::clone(client)).await?;
        }

        let reserved: Vec<&str> = self
            .ctx
            .chat_client()
            .map(|c| vec![c.name()])
            .unwrap_or_default();
        let summary = BootSequencer::standard(self.ctx.paths(), &self.config.boot, &reserved)
            .run(&self.loader)
            .await;

        info!(
            components = registry.len(),
            frameworks = summary.frameworks,
            modules = summary.modules,
            "Boot process complete"
        );
        Ok(summary)
    }

    async fn start_chat_client(&self, client: Arc<dyn ChatClient>) -> RuntimeResult<()> {
        let bus = self.ctx.bus();
        // The client emits from inside `start`, so subscribe first.
        let ready = bus.once_receiver(signals::CHAT_CLIENT_READY);

        info!(client = client.name(), "Starting chat client");
        client.start(Arc::clone(bus)).await?;

        match ready.await {
            Ok(_) => {
                self.ctx.set_loaded(flags::CHAT_CLIENT, true);
                self.ctx.registry().add(
                    ComponentDescriptor::new(client.name(), ComponentKind::ServiceProvider, "")
                        .with_version(client.version()),
                );
                self.ctx
                    .versions()
                    .set(client.name(), VersionKind::Framework, client.version())
                    .await;
                info!(client = client.name(), "Chat client ready");
            }
            Err(_) => {
                warn!(
                    client = client.name(),
                    "Chat client stopped without reporting ready, continuing without it"
                );
            }
        }
        Ok(())
    }

    /// Emits `host.shutdown` and stops the chat client.
    pub async fn shutdown(&self) {
        info!("Shutting down host");
        self.ctx.bus().emit(signals::HOST_SHUTDOWN, None).await;
        if let Some(client) = self.ctx.chat_client() {
            client.stop().await;
        }
        info!("Host stopped");
    }

    /// Boots, then runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.boot().await?;
        info!("Keel host is running. Press Ctrl+C to stop.");
        let waited = wait_for_shutdown().await;
        self.shutdown().await;
        waited
    }

    /// Boots, then runs until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.boot().await?;
        shutdown.await;
        self.shutdown().await;
        Ok(())
    }
}

impl std::fmt::Debug for KeelRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeelRuntime")
            .field("ctx", &self.ctx)
            .field("booted", &self.booted.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`KeelRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    working_dir: Option<PathBuf>,
    code: Option<Arc<dyn CodeLoader>>,
    chat: Option<Arc<dyn ChatClient>>,
    persistence: Option<Arc<dyn PersistenceBackend>>,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            working_dir: None,
            code: None,
            chat: None,
            persistence: None,
            init_logging: true,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: KeelConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Root of the component tree.  Overrides `paths.working_dir`.
    pub fn working_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// Resolves entry files against `table` instead of the linked factories.
    pub fn components(mut self, table: ComponentTable) -> Self {
        self.code = Some(Arc::new(table));
        self
    }

    pub fn code_loader(mut self, loader: Arc<dyn CodeLoader>) -> Self {
        self.code = Some(loader);
        self
    }

    /// Client started during boot when `chat.enabled` is set.
    pub fn chat_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(client);
        self
    }

    /// Backend mirroring the version table when `persistence.enabled` is
    /// set.  Defaults to [`MemoryBackend`].
    pub fn persistence(mut self, backend: Arc<dyn PersistenceBackend>) -> Self {
        self.persistence = Some(backend);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn build(self) -> RuntimeResult<KeelRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let root = match self.working_dir.or_else(|| config.paths.working_dir.clone()) {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let paths = config.paths.host_paths(&root);

        let mut info = HostInfo::new(&config.host.name, &config.host.version);
        info.debug_mode = config.host.debug_mode;
        info.build = if cfg!(debug_assertions) {
            BuildType::Development
        } else {
            BuildType::Release
        };
        if root.join(INTERNAL_MARKER).exists() {
            info.build = BuildType::Internal;
            info.debug_mode = true;
            info!(marker = %root.join(INTERNAL_MARKER).display(), "Internal build marker found");
        }

        let versions = if config.persistence.enabled {
            let backend: Arc<dyn PersistenceBackend> = match self.persistence {
                Some(backend) => backend,
                None => Arc::new(MemoryBackend::new()),
            };
            VersionTable::with_backend(backend, &config.persistence.table)
        } else {
            if self.persistence.is_some() {
                debug!("Persistence backend supplied but persistence is disabled");
            }
            VersionTable::new()
        };

        let mut ctx = HostContext::new(
            info,
            paths,
            Arc::new(Registry::new()),
            Arc::new(versions),
            Arc::new(ReadinessBus::new()),
        );
        match (config.chat.enabled, self.chat) {
            (true, Some(client)) => ctx = ctx.with_chat_client(client),
            (true, None) => return Err(RuntimeError::MissingChatClient),
            (false, Some(client)) => {
                debug!(client = client.name(), "Chat client supplied but chat is disabled");
            }
            (false, None) => {}
        }

        let code: Arc<dyn CodeLoader> = match self.code {
            Some(code) => code,
            None => Arc::new(ComponentTable::linked()),
        };
        let ctx = Arc::new(ctx);
        let loader = Loader::new(Arc::clone(&ctx), code);

        info!(root = %root.display(), "Runtime configured");
        Ok(KeelRuntime {
            config,
            ctx,
            loader,
            booted: AtomicBool::new(false),
        })
    }
}
