//! The component registry.
//!
//! [`Registry`] is the authoritative, insertion-ordered catalogue of
//! components known to the running host.  Entries are added when a component
//! is registered (before it activates) and removed only by name, either by
//! rollback or by an explicit [`remove`](Registry::remove).
//!
//! Names are **not** required to be unique: [`add`](Registry::add) appends
//! duplicates and [`find`](Registry::find) / [`remove`](Registry::remove)
//! operate on the first match.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use keel_core::{ComponentDescriptor, ComponentKind, ManifestDocument, ReadinessBus, signals};

/// Insertion-ordered component catalogue.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<Vec<ComponentDescriptor>>,
    ready: AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Marks the registry ready and emits [`signals::REGISTRY_READY`].
    ///
    /// The signal is emitted at most once per registry.
    pub async fn init(&self, bus: &ReadinessBus) {
        if self.ready.swap(true, Ordering::SeqCst) {
            warn!("Registry already initialised");
            return;
        }
        info!("Registry initialised, accepting entries");
        bus.emit(signals::REGISTRY_READY, None).await;
    }

    /// Returns `true` once [`init`](Self::init) has run.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    // ─── Mutation ────────────────────────────────────────────────────────────

    /// Appends `descriptor`.
    ///
    /// A descriptor with an empty name is rejected with an error log.
    /// Returns `true` if the entry was added.
    pub fn add(&self, descriptor: ComponentDescriptor) -> bool {
        if descriptor.name.is_empty() {
            error!(kind = %descriptor.kind, "Refusing to register a component without a name");
            return false;
        }
        let name = descriptor.name.clone();
        let kind = descriptor.kind;
        self.entries.write().push(descriptor);
        info!(component = %name, kind = %kind, "Component registered");
        true
    }

    /// Reads the manifest at `path` and adds its descriptor.
    ///
    /// Read and parse failures are logged, never returned.
    pub async fn add_from_manifest(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match ManifestDocument::read(path).await {
            Ok(doc) => self.add(doc.into_descriptor()),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to register from manifest");
                false
            }
        }
    }

    /// Removes the first entry whose name matches `name`.
    pub fn remove(&self, name: &str) -> Option<ComponentDescriptor> {
        let mut entries = self.entries.write();
        match entries.iter().position(|e| e.name == name) {
            Some(pos) => {
                let removed = entries.remove(pos);
                info!(component = %name, "Component removed from registry");
                Some(removed)
            }
            None => {
                debug!(component = %name, "Component not in registry, nothing to remove");
                None
            }
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// Returns the first entry named `name`.
    pub fn find(&self, name: &str) -> Option<ComponentDescriptor> {
        self.entries.read().iter().find(|e| e.name == name).cloned()
    }

    /// Returns `true` if an entry named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().iter().any(|e| e.name == name)
    }

    /// Snapshot of all entries in insertion order.
    pub fn all(&self) -> Vec<ComponentDescriptor> {
        self.entries.read().clone()
    }

    /// Names of all entries in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.name.clone()).collect()
    }

    /// Number of entries of the given kind.
    pub fn count(&self, kind: ComponentKind) -> usize {
        self.entries.read().iter().filter(|e| e.kind == kind).count()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
