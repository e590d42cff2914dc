// Lockfile-based package manager detection
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const PNPM_LOCKFILE: &str = "pnpm-lock.yaml";
pub const BUN_LOCKFILE: &str = "bun.lockb";
pub const YARN_LOCKFILE: &str = "yarn.lock";

/// Existence check for a path.
///
/// Errors (permission denied and the like) must be reported as "absent".
pub trait FileSystemProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

/// Probes the real filesystem on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystemProbe for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Memoizes another probe per path until invalidated.
///
/// For long-lived embedders that call the builder many times per root; the
/// cache must be invalidated when lockfiles may have changed.
pub struct CachingProbe {
    inner: Arc<dyn FileSystemProbe>,
    cache: RwLock<HashMap<PathBuf, bool>>,
}

impl CachingProbe {
    pub fn new(inner: Arc<dyn FileSystemProbe>) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn invalidate(&self) {
        let mut cache = self.cache.write();
        debug!(entries = cache.len(), "Clearing lockfile probe cache");
        cache.clear();
    }

    pub fn invalidate_path(&self, path: &Path) {
        self.cache.write().remove(path);
    }

    #[cfg(test)]
    fn cached_entries(&self) -> usize {
        self.cache.read().len()
    }
}

impl FileSystemProbe for CachingProbe {
    fn exists(&self, path: &Path) -> bool {
        if let Some(hit) = self.cache.read().get(path) {
            return *hit;
        }
        let exists = self.inner.exists(path);
        self.cache.write().insert(path.to_path_buf(), exists);
        exists
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerKind {
    Pnpm,
    Npm,
    Bun,
    Yarn,
}

impl PackageManagerKind {
    pub fn command(&self) -> &'static str {
        match self {
            PackageManagerKind::Pnpm => "pnpm",
            PackageManagerKind::Npm => "npm",
            PackageManagerKind::Bun => "bun",
            PackageManagerKind::Yarn => "yarn",
        }
    }

    pub fn lockfile(&self) -> &'static str {
        match self {
            PackageManagerKind::Pnpm => PNPM_LOCKFILE,
            PackageManagerKind::Npm => "package-lock.json",
            PackageManagerKind::Bun => BUN_LOCKFILE,
            PackageManagerKind::Yarn => YARN_LOCKFILE,
        }
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Lockfile predicates evaluated against a project root.
pub struct LockfileDetector<'a> {
    root: &'a Path,
    probe: &'a dyn FileSystemProbe,
}

impl<'a> LockfileDetector<'a> {
    pub fn new(root: &'a Path, probe: &'a dyn FileSystemProbe) -> Self {
        Self { root, probe }
    }

    fn has_lockfile(&self, kind: PackageManagerKind) -> bool {
        let name = kind.lockfile();
        let present = self.probe.exists(&self.root.join(name));
        debug!(root = %self.root.display(), lockfile = name, present, "Probed lockfile");
        present
    }

    pub fn is_pnpm(&self) -> bool {
        self.has_lockfile(PackageManagerKind::Pnpm)
    }

    pub fn is_bun(&self) -> bool {
        self.has_lockfile(PackageManagerKind::Bun)
    }

    pub fn is_yarn(&self) -> bool {
        self.has_lockfile(PackageManagerKind::Yarn)
    }

    /// Anything but bun is treated as a node runtime.
    pub fn is_standard_runtime(&self) -> bool {
        !self.is_bun()
    }

    /// Single reported kind: pnpm, then bun, then yarn, otherwise npm.
    pub fn detect(&self) -> PackageManagerKind {
        if self.is_pnpm() {
            PackageManagerKind::Pnpm
        } else if self.is_bun() {
            PackageManagerKind::Bun
        } else if self.is_yarn() {
            PackageManagerKind::Yarn
        } else {
            PackageManagerKind::Npm
        }
    }
}
