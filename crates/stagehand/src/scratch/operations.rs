//! Registry operations: root allocation, scratch creation, adoption, cleanup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use super::queries;
use super::types::{ResourceKind, RetryPolicy, ScratchRegistry, TrackedResource};
use crate::error::{Error, Result};

impl ScratchRegistry {
    /// Create a registry with no preferred root. The working root falls back
    /// to a fresh directory under the platform temp dir on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that roots scratch resources under `root`.
    ///
    /// Configured scratch roots are typically shared across concurrent jobs
    /// (a cluster-wide `/scratch`), so the registry never uses `root`
    /// directly: resolution carves out a private subdirectory inside it.
    #[must_use]
    pub fn with_preferred_root(root: impl Into<PathBuf>) -> Self {
        let mut registry = Self::default();
        registry.preferred_root = Some(root.into());
        registry
    }

    /// Replace the directory-removal retry policy used by cleanup.
    ///
    /// The policy is re-validated here because `RetryPolicy` fields are
    /// public: a zero-attempt policy would make cleanup skip owned
    /// directories without a word.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `retry.max_attempts` is zero.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Result<Self> {
        self.retry = RetryPolicy::new(retry.max_attempts, retry.pause)?;
        Ok(self)
    }

    /// The active working root, if one has been established.
    #[must_use]
    pub fn working_root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Whether nothing is currently tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Whether `path` (after normalization) is tracked as a file or directory.
    #[must_use]
    pub fn is_registered(&self, path: &Path) -> bool {
        self.is_registered_normalized(&queries::normalize(path))
    }

    fn is_registered_normalized(&self, path: &Path) -> bool {
        self.files.iter().chain(self.dirs.iter()).any(|r| r.path == path)
    }

    /// Track `path` without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRegistration` if the normalized path is already
    /// tracked in either collection.
    pub fn register(&mut self, path: &Path, kind: ResourceKind, owned: bool) -> Result<PathBuf> {
        let path = queries::normalize(path);
        self.register_normalized(path, kind, owned)
    }

    fn register_normalized(
        &mut self,
        path: PathBuf,
        kind: ResourceKind,
        owned: bool,
    ) -> Result<PathBuf> {
        if self.is_registered_normalized(&path) {
            return Err(Error::DuplicateRegistration { path });
        }
        let record = TrackedResource {
            path: path.clone(),
            kind,
            owned,
        };
        match kind {
            ResourceKind::File => self.files.push(record),
            ResourceKind::Directory => self.dirs.push(record),
        }
        Ok(path)
    }

    /// Resolve the working root, establishing it on first call.
    ///
    /// Resolution never fails observably short of the platform temp dir
    /// itself being unusable:
    ///
    /// 1. no preferred root: fresh directory under the platform temp dir
    /// 2. preferred root is an existing directory: fresh private
    ///    subdirectory inside it
    /// 3. preferred root absent: created (with parents) and used directly
    /// 4. any of the above failing: fresh directory under the platform
    ///    temp dir
    ///
    /// Whichever directory wins is registered as owned.
    ///
    /// # Errors
    ///
    /// Returns `RootAllocation` if every tier failed.
    pub fn resolve_root(&mut self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        let root = match self.preferred_root.clone() {
            Some(preferred) => self.root_from_preferred(&preferred)?,
            None => self.fallback_root()?,
        };
        debug!("working root established at {}", root.display());
        self.root = Some(root.clone());
        Ok(root)
    }

    fn root_from_preferred(&mut self, preferred: &Path) -> Result<PathBuf> {
        let preferred = queries::normalize(preferred);
        if preferred.is_dir() {
            match tempfile::Builder::new()
                .prefix("stagehand-")
                .tempdir_in(&preferred)
            {
                Ok(dir) => return self.register(&dir.keep(), ResourceKind::Directory, true),
                Err(err) => {
                    warn!(
                        "cannot create a private subdirectory under {}: {err}",
                        preferred.display()
                    );
                    return self.fallback_root();
                }
            }
        }
        if !preferred.exists() {
            match fs::create_dir_all(&preferred) {
                Ok(()) => return self.register(&preferred, ResourceKind::Directory, true),
                Err(err) => {
                    warn!(
                        "cannot create the configured root {}: {err}",
                        preferred.display()
                    );
                    return self.fallback_root();
                }
            }
        }
        // Exists but is not a directory (a plain file at the configured
        // path). Not usable as a root.
        warn!(
            "configured root {} exists and is not a directory",
            preferred.display()
        );
        self.fallback_root()
    }

    fn fallback_root(&mut self) -> Result<PathBuf> {
        let dir = tempfile::Builder::new()
            .prefix("stagehand-")
            .tempdir()
            .map_err(|source| Error::RootAllocation {
                path: std::env::temp_dir(),
                source,
            })?;
        self.register(&dir.keep(), ResourceKind::Directory, true)
    }

    /// Create and track a uniquely named scratch file under the working root.
    pub fn new_scratch_file(&mut self, suffix: &str, prefix: &str) -> Result<PathBuf> {
        self.new_scratch_in(ResourceKind::File, None, suffix, prefix)
    }

    /// Create and track a uniquely named scratch directory under the working
    /// root.
    pub fn new_scratch_dir(&mut self, suffix: &str, prefix: &str) -> Result<PathBuf> {
        self.new_scratch_in(ResourceKind::Directory, None, suffix, prefix)
    }

    /// Create and track a scratch resource, optionally under an explicit
    /// root instead of the working root.
    ///
    /// # Errors
    ///
    /// - `ScratchCreate` if the file or directory cannot be created
    /// - `RootAllocation` if no working root could be established
    /// - `DuplicateRegistration` if the fresh path is somehow already
    ///   tracked (unreachable given unique temp-name generation)
    pub fn new_scratch_in(
        &mut self,
        kind: ResourceKind,
        root: Option<&Path>,
        suffix: &str,
        prefix: &str,
    ) -> Result<PathBuf> {
        let root = match root {
            Some(explicit) => queries::normalize(explicit),
            None => self.resolve_root()?,
        };
        let path = match kind {
            ResourceKind::Directory => tempfile::Builder::new()
                .prefix(prefix)
                .suffix(suffix)
                .tempdir_in(&root)
                .map_err(|source| Error::ScratchCreate {
                    kind,
                    root: root.clone(),
                    source,
                })?
                .keep(),
            ResourceKind::File => {
                let (file, path) = tempfile::Builder::new()
                    .prefix(prefix)
                    .suffix(suffix)
                    .tempfile_in(&root)
                    .map_err(|source| Error::ScratchCreate {
                        kind,
                        root: root.clone(),
                        source,
                    })?
                    .keep()
                    .map_err(|persist| Error::ScratchCreate {
                        kind,
                        root: root.clone(),
                        source: persist.error,
                    })?;
                drop(file);
                path
            }
        };
        self.register_normalized(queries::normalize(&path), kind, true)
    }

    /// Bring an existing path under tracking.
    ///
    /// Used for outputs created by external programs, and for shared
    /// artifacts that must survive cleanup (`owned = false`).
    ///
    /// # Errors
    ///
    /// - `AdoptMissing` if the path does not exist
    /// - `AdoptKindMismatch` if `kind` disagrees with the filesystem
    /// - `DuplicateRegistration` if the path is already tracked
    pub fn adopt(&mut self, path: &Path, owned: bool, kind: ResourceKind) -> Result<PathBuf> {
        let path = queries::normalize(path);
        match queries::kind_of(&path) {
            None => Err(Error::AdoptMissing { path }),
            Some(actual) if actual != kind => Err(Error::AdoptKindMismatch {
                path,
                expected: kind,
            }),
            Some(_) => self.register_normalized(path, kind, owned),
        }
    }

    /// Drain the registry, deleting owned resources when `really_delete`.
    ///
    /// Never fails: cleanup frequently runs while the caller is unwinding
    /// from an unrelated error, and must not mask it. Files go first, in
    /// reverse insertion order, one removal attempt each. Directories
    /// follow, also reverse insertion order, retried per the registry's
    /// [`RetryPolicy`]; a directory that survives every attempt is abandoned
    /// with a warning. The working root is cleared afterwards.
    pub fn cleanup(&mut self, really_delete: bool) {
        while let Some(entry) = self.files.pop() {
            if really_delete && entry.owned && entry.path.exists() {
                debug!("removing scratch file {}", entry.path.display());
                if let Err(err) = fs::remove_file(&entry.path) {
                    warn!("failed to remove scratch file {}: {err}", entry.path.display());
                }
            }
        }

        let retry = self.retry;
        while let Some(entry) = self.dirs.pop() {
            if really_delete && entry.owned && entry.path.exists() {
                debug!("removing scratch directory {}", entry.path.display());
                remove_dir_with_retry(
                    &entry.path,
                    retry,
                    |p: &Path| fs::remove_dir_all(p),
                    std::thread::sleep,
                );
            }
        }

        self.root = None;
    }
}

impl Drop for ScratchRegistry {
    /// Leak backstop. The designated teardown path is an explicit
    /// [`ScratchRegistry::cleanup`] call; this only catches registries
    /// dropped with resources still tracked.
    fn drop(&mut self) {
        if !self.is_empty() {
            self.cleanup(true);
        }
    }
}

/// Recursive directory removal with bounded retries.
///
/// NFS clients can report "resource busy" briefly after all contained files
/// were deleted, while residual `.nfs*` handles drain. Retrying with a pause
/// absorbs that window; exhausting the attempts abandons the directory.
fn remove_dir_with_retry<R, S>(path: &Path, retry: RetryPolicy, mut remove: R, mut sleep: S)
where
    R: FnMut(&Path) -> io::Result<()>,
    S: FnMut(Duration),
{
    for attempt in 1..=retry.max_attempts {
        match remove(path) {
            Ok(()) => return,
            Err(err) if attempt < retry.max_attempts => {
                debug!(
                    "removal of {} failed (attempt {attempt}/{}): {err}",
                    path.display(),
                    retry.max_attempts
                );
                sleep(retry.pause);
            }
            Err(err) => {
                warn!(
                    "unable to remove scratch directory {} after {} attempts: {err}",
                    path.display(),
                    retry.max_attempts
                );
            }
        }
    }
}
