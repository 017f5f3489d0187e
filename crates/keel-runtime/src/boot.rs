//! The boot sequencer.
//!
//! Walks the three component roots in a fixed order and issues one load
//! request per top-level component directory:
//!
//! 1. private frameworks (built-in service names are reserved and skipped)
//! 2. public frameworks
//! 3. modules
//!
//! Entries are visited in lexical order.  Symlinks, plain files and ignored
//! names are skipped.  Every request issued counts toward the summary,
//! whether or not the component activated.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use tracing::{Instrument, debug, error, info, info_span};

use keel_core::ComponentKind;
use keel_framework::{HostPaths, Loader};

use crate::config::BootConfig;

/// Names reserved for services the runtime starts itself.
pub const BUILTIN_SERVICES: &[&str] = &[
    "registry",
    "versions",
    "loader",
    "persistence",
    "chat-client",
    "logging",
];

/// Directory names skipped in every root.
const ALWAYS_IGNORED: &[&str] = &[".DS_Store"];

/// One directory to scan.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    /// Plural label used in log lines, e.g. `"Modules"`.
    pub label: String,
    pub directory: PathBuf,
    pub kind: ComponentKind,
    pub ignore: Vec<String>,
}

impl ScanTarget {
    pub fn new(label: impl Into<String>, directory: impl Into<PathBuf>, kind: ComponentKind) -> Self {
        Self {
            label: label.into(),
            directory: directory.into(),
            kind,
            ignore: ALWAYS_IGNORED.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn ignoring<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(names.into_iter().map(Into::into));
        self
    }

    fn is_ignored(&self, name: impl AsRef<OsStr>) -> bool {
        let name = name.as_ref();
        self.ignore.iter().any(|ignored| OsStr::new(ignored) == name)
    }
}

/// Counts of load requests issued during boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootSummary {
    /// Framework requests issued, across both framework roots.
    pub frameworks: usize,
    /// Module requests issued.
    pub modules: usize,
    /// Requests that did not end in an activated component.
    pub failed: usize,
}

impl BootSummary {
    pub fn attempted(&self) -> usize {
        self.frameworks + self.modules
    }
}

#[derive(Debug, Clone, Default)]
pub struct BootSequencer {
    targets: Vec<ScanTarget>,
    manifest_file_name: String,
}

impl BootSequencer {
    pub fn new(manifest_file_name: impl Into<String>) -> Self {
        Self {
            targets: Vec::new(),
            manifest_file_name: manifest_file_name.into(),
        }
    }

    /// The standard three targets for `paths`.
    ///
    /// `reserved` names are skipped under the private framework root in
    /// addition to [`BUILTIN_SERVICES`].
    pub fn standard(paths: &HostPaths, boot: &BootConfig, reserved: &[&str]) -> Self {
        let private = ScanTarget::new(
            "Private Frameworks",
            &paths.private_frameworks,
            ComponentKind::ServiceProvider,
        )
        .ignoring(BUILTIN_SERVICES.iter().copied())
        .ignoring(reserved.iter().copied())
        .ignoring(boot.ignore_private.iter().cloned());

        let public = ScanTarget::new(
            "Public Frameworks",
            &paths.public_frameworks,
            ComponentKind::ServiceProvider,
        )
        .ignoring(boot.ignore_public.iter().cloned());

        let modules = ScanTarget::new("Modules", &paths.modules, ComponentKind::FeatureUnit)
            .ignoring(boot.ignore_modules.iter().cloned());

        Self::new(paths.manifest_file_name.clone())
            .target(private)
            .target(public)
            .target(modules)
    }

    pub fn target(mut self, target: ScanTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn targets(&self) -> &[ScanTarget] {
        &self.targets
    }

    /// Scans every target in order.
    pub async fn run(&self, loader: &Loader) -> BootSummary {
        let mut summary = BootSummary::default();

        for target in &self.targets {
            let span = info_span!("boot", target = %target.label);
            let (attempted, failed) = self.scan(target, loader).instrument(span).await;

            match target.kind {
                ComponentKind::ServiceProvider => summary.frameworks += attempted,
                ComponentKind::FeatureUnit => summary.modules += attempted,
            }
            summary.failed += failed;
        }

        info!(
            frameworks = summary.frameworks,
            modules = summary.modules,
            failed = summary.failed,
            "Boot scan complete"
        );
        summary
    }

    async fn scan(&self, target: &ScanTarget, loader: &Loader) -> (usize, usize) {
        info!(directory = %target.directory.display(), "Beginning scan for {}", target.label);

        let names = match list_directory(&target.directory).await {
            Ok(Some(names)) => names,
            Ok(None) => {
                info!("Nothing to load");
                return (0, 0);
            }
            Err(e) => {
                error!(
                    directory = %target.directory.display(),
                    error = %e,
                    "Failed to list directory"
                );
                return (0, 0);
            }
        };

        let mut attempted = 0;
        let mut failed = 0;
        for name in names {
            let label = name.to_string_lossy();
            if target.is_ignored(&name) {
                debug!(entry = %label, "Ignored");
                continue;
            }
            let item = target.directory.join(&name);
            if !is_plain_directory(&item).await {
                debug!(entry = %label, "Not a directory, skipping");
                continue;
            }

            info!(entry = %label, "Found component, sending load request");
            let manifest = item.join(&self.manifest_file_name);
            if !loader.load_request(&manifest).await {
                failed += 1;
            }
            attempted += 1;
        }

        info!(
            processed = attempted,
            "Finished scanning {}",
            target.label
        );
        (attempted, failed)
    }
}

/// Sorted entry names, or `None` if the directory does not exist. Names are
/// kept as the OS returned them so non UTF-8 entries still resolve.
async fn list_directory(dir: &std::path::Path) -> std::io::Result<Option<Vec<OsString>>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name());
    }
    names.sort();
    Ok(Some(names))
}

async fn is_plain_directory(path: &std::path::Path) -> bool {
    tokio::fs::symlink_metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir())
}
