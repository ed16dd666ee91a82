//! Narrow filesystem interface for the lock protocol.
//!
//! The marker file is the entire protocol alphabet: its presence means
//! "build in progress", its absence plus the artifact's presence means
//! "built". Keeping the filesystem behind [`MarkerStore`] lets the protocol
//! logic run against an in-memory fake in tests.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Result of an atomic create-if-not-exists attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// This process created the marker and is now the builder.
    Created,
    /// Another process holds the marker; go back to polling.
    AlreadyExists,
}

/// The three filesystem operations the protocol needs.
pub trait MarkerStore {
    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Atomically create `path` if and only if it does not exist.
    ///
    /// `AlreadyExists` is contention, not an error: the caller lost the
    /// race and must resume polling.
    ///
    /// # Errors
    ///
    /// Any I/O failure other than the path already existing.
    fn create_marker(&self, path: &Path) -> io::Result<CreateOutcome>;

    /// Remove `path`.
    ///
    /// # Errors
    ///
    /// Any I/O failure, including the path being absent.
    fn remove_marker(&self, path: &Path) -> io::Result<()>;
}

/// Real filesystem store. Marker creation uses `O_EXCL` semantics, which
/// hold on local filesystems and on NFSv3+.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl MarkerStore for FsStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_marker(&self, path: &Path) -> io::Result<CreateOutcome> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(err) => Err(err),
        }
    }

    fn remove_marker(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// In-memory fake store: a set of "existing" paths.
///
/// Clones share state, so a test can mutate the store from a scripted
/// sleeper or builder while the coordinator runs against it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as existing.
    pub fn insert(&self, path: &Path) {
        self.lock().insert(path.to_path_buf());
    }

    /// Mark `path` as absent.
    pub fn remove(&self, path: &Path) {
        self.lock().remove(path);
    }

    /// Whether `path` is marked as existing.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        match self.paths.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl MarkerStore for MemoryStore {
    fn exists(&self, path: &Path) -> bool {
        self.contains(path)
    }

    fn create_marker(&self, path: &Path) -> io::Result<CreateOutcome> {
        let mut paths = self.lock();
        if paths.contains(path) {
            Ok(CreateOutcome::AlreadyExists)
        } else {
            paths.insert(path.to_path_buf());
            Ok(CreateOutcome::Created)
        }
    }

    fn remove_marker(&self, path: &Path) -> io::Result<()> {
        if self.lock().remove(path) {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such marker"))
        }
    }
}
