//! The version table.
//!
//! [`VersionTable`] keeps `name → version` for every registered component in
//! memory, and optionally mirrors `{ name, type, version }` rows into a
//! [`PersistenceBackend`].  The two copies are written one after the other
//! and are not transactionally linked.
//!
//! Two behaviours are deliberate and relied upon:
//!
//! - [`set`](VersionTable::set) writes the backend with
//!   [`upsert_if_absent`](PersistenceBackend::upsert_if_absent).  Setting the
//!   same name twice leaves the first persisted row in place while memory
//!   holds the latest version.
//! - The in-memory map does not store the kind.  [`get`](VersionTable::get)
//!   asks the backend for it and, without one, reports
//!   [`VersionKind::Unknown`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use keel_core::{ComponentKind, ReadinessBus, signals};

use crate::persistence::PersistenceBackend;

/// Default backend table name.
pub const VERSION_TABLE: &str = "versions";

// ─── VersionKind / VersionRecord ─────────────────────────────────────────────

/// The `type` column of a version row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionKind {
    /// The host process itself.
    Kernel,
    Framework,
    Module,
    /// Kind not known (in-memory lookups without a backend).
    Unknown,
}

impl From<ComponentKind> for VersionKind {
    fn from(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::ServiceProvider => Self::Framework,
            ComponentKind::FeatureUnit => Self::Module,
        }
    }
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Kernel => "Kernel",
            Self::Framework => "Framework",
            Self::Module => "Module",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// One version row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VersionKind,
    pub version: String,
}

impl VersionRecord {
    pub fn new(name: impl Into<String>, kind: VersionKind, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            version: version.into(),
        }
    }
}

/// Identity of the host process, seeded as the [`VersionKind::Kernel`] row.
#[derive(Debug, Clone)]
pub struct HostIdentity {
    pub name: String,
    pub version: String,
}

// ─── VersionTable ────────────────────────────────────────────────────────────

/// In-memory version map with an optional persistent mirror.
pub struct VersionTable {
    entries: RwLock<BTreeMap<String, String>>,
    backend: Option<Arc<dyn PersistenceBackend>>,
    table: String,
    ready: AtomicBool,
}

impl VersionTable {
    /// Name under which the table registers its own version.
    pub const COMPONENT_NAME: &'static str = "versions";

    /// Creates a memory-only table.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            backend: None,
            table: VERSION_TABLE.to_string(),
            ready: AtomicBool::new(false),
        }
    }

    /// Creates a table mirrored into `backend` under `table`.
    pub fn with_backend(backend: Arc<dyn PersistenceBackend>, table: impl Into<String>) -> Self {
        Self {
            backend: Some(backend),
            table: table.into(),
            ..Self::new()
        }
    }

    /// Returns `true` if a persistence backend is attached.
    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    /// Returns `true` once [`init`](Self::init) has run.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Seeds the host and table rows, then emits [`signals::VERSIONS_READY`].
    ///
    /// With a backend attached, the table is provisioned and truncated
    /// first, so every run starts from a fresh mirror.  Backend failures are
    /// logged and do not prevent the ready signal.
    pub async fn init(&self, host: &HostIdentity, bus: &ReadinessBus) {
        if self.ready.load(Ordering::SeqCst) {
            warn!("Version table already initialised");
            return;
        }

        let own_version = env!("CARGO_PKG_VERSION");
        let seeds = [
            VersionRecord::new(&host.name, VersionKind::Kernel, &host.version),
            VersionRecord::new(Self::COMPONENT_NAME, VersionKind::Framework, own_version),
        ];

        if let Some(backend) = &self.backend {
            info!(backend = backend.name(), table = %self.table, "Provisioning version table");
            if let Err(e) = backend.ensure_table(&self.table).await {
                error!(table = %self.table, error = %e, "Failed to provision version table");
            }
            if let Err(e) = backend.truncate(&self.table).await {
                error!(table = %self.table, error = %e, "Failed to reset version table");
            }
            for seed in &seeds {
                self.persist(seed).await;
            }
        } else {
            debug!("No persistence backend attached, versions are memory-only");
        }

        {
            let mut entries = self.entries.write();
            for seed in seeds {
                entries.insert(seed.name, seed.version);
            }
        }

        self.ready.store(true, Ordering::SeqCst);
        info!("Version table initialised");
        bus.emit(signals::VERSIONS_READY, None).await;
    }

    // ─── Mutation ────────────────────────────────────────────────────────────

    /// Records `version` for `name`.
    ///
    /// Memory is always updated.  The backend row is only written if none
    /// exists for `name` yet.
    pub async fn set(&self, name: &str, kind: VersionKind, version: &str) {
        self.entries
            .write()
            .insert(name.to_string(), version.to_string());
        debug!(component = %name, kind = %kind, version = %version, "Version recorded");

        if self.backend.is_some() {
            self.persist(&VersionRecord::new(name, kind, version)).await;
        }
    }

    /// Forgets `name` in memory and in the backend.
    ///
    /// A missing in-memory entry is logged; backend failures are logged and
    /// swallowed.
    pub async fn remove(&self, name: &str) {
        if self.entries.write().remove(name).is_some() {
            debug!(component = %name, "Version removed from memory");
        } else {
            warn!(component = %name, "Version not found in memory, skipping");
        }

        if let Some(backend) = &self.backend {
            match backend.delete_where(&self.table, name).await {
                Ok(_) => debug!(component = %name, "Version removed from backend"),
                Err(e) => error!(
                    component = %name,
                    error = %e,
                    "Persistence write failed while removing version"
                ),
            }
        }
    }

    async fn persist(&self, record: &VersionRecord) {
        let Some(backend) = &self.backend else {
            return;
        };
        let row = match serde_json::to_value(record) {
            Ok(row) => row,
            Err(e) => {
                error!(component = %record.name, error = %e, "Failed to encode version row");
                return;
            }
        };
        match backend.upsert_if_absent(&self.table, &record.name, row).await {
            Ok(true) => {}
            Ok(false) => debug!(
                component = %record.name,
                "Persisted version row already exists, leaving it untouched"
            ),
            Err(e) => error!(
                component = %record.name,
                error = %e,
                "Persistence write failed while recording version"
            ),
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// Looks up `name`.
    ///
    /// - Memory miss: the backend row if a backend is attached, else `None`.
    /// - Memory hit with a backend: the backend row, which carries the kind.
    /// - Memory hit otherwise: the in-memory version with
    ///   [`VersionKind::Unknown`].
    pub async fn get(&self, name: &str) -> Option<VersionRecord> {
        let in_memory = self.entries.read().get(name).cloned();

        let persisted = self.lookup(name).await;
        match (in_memory, persisted) {
            (_, Some(record)) => Some(record),
            (Some(version), None) => Some(VersionRecord::new(name, VersionKind::Unknown, version)),
            (None, None) => {
                debug!(component = %name, "Version not found");
                None
            }
        }
    }

    async fn lookup(&self, name: &str) -> Option<VersionRecord> {
        let backend = self.backend.as_ref()?;
        match backend.find_where(&self.table, name).await {
            Ok(Some(row)) => match serde_json::from_value(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(component = %name, error = %e, "Malformed version row");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                error!(component = %name, error = %e, "Failed to read version from backend");
                None
            }
        }
    }

    /// Version held in memory for `name`.
    pub fn version_of(&self, name: &str) -> Option<String> {
        self.entries.read().get(name).cloned()
    }

    /// In-memory snapshot as `(name, version)` pairs sorted by name.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.entries
            .read()
            .iter()
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect()
    }

    /// Every persisted row, or an empty list without a backend.
    pub async fn list_persisted(&self) -> Vec<VersionRecord> {
        let Some(backend) = &self.backend else {
            return Vec::new();
        };
        match backend.list_all(&self.table).await {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|row| serde_json::from_value(row).ok())
                .collect(),
            Err(e) => {
                error!(table = %self.table, error = %e, "Failed to list version rows");
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for VersionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VersionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionTable")
            .field("entries", &self.entries.read().len())
            .field("persistent", &self.is_persistent())
            .field("table", &self.table)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
