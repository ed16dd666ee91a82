//! Type definitions for scratch resource tracking.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Filesystem kind of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A regular file.
    File,
    /// A directory, removed recursively on cleanup.
    Directory,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// One filesystem path this process is accountable for.
///
/// `owned` decides whether cleanup may delete it. A shared artifact that was
/// merely discovered already built is tracked with `owned = false` so cleanup
/// leaves it for other jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedResource {
    /// Absolute, tilde-expanded path.
    pub path: PathBuf,
    /// Whether the path is a file or a directory.
    pub kind: ResourceKind,
    /// Whether cleanup is allowed to delete this path.
    pub owned: bool,
}

/// Retry behavior for directory removal during cleanup.
///
/// Directory removal is the step most exposed to network-filesystem
/// propagation delay: a client can briefly see residual lock metadata after
/// every contained file is gone. Single-file removals are not retried, a
/// stuck file delete does not self-resolve by waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum removal attempts per directory.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub pause: Duration,
}

impl RetryPolicy {
    /// Create a validated retry policy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `max_attempts` is zero.
    pub fn new(max_attempts: u32, pause: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::InvalidConfig {
                reason: "max_attempts must be > 0".to_string(),
            });
        }
        Ok(Self {
            max_attempts,
            pause,
        })
    }
}

impl Default for RetryPolicy {
    /// Five attempts, three seconds apart. Matches the tolerance window
    /// observed for NFS ack latency on cluster scratch volumes.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            pause: Duration::from_secs(3),
        }
    }
}

/// Ground-truth record of the scratch paths this process owns.
///
/// Files and directories are kept in separate insertion-ordered collections
/// so cleanup can drain files before the directories that contain them.
/// Membership is a set: a normalized path appears at most once across both.
#[derive(Debug, Default)]
pub struct ScratchRegistry {
    /// Caller-preferred base for the working root, if any.
    pub(super) preferred_root: Option<PathBuf>,
    /// Working root, established lazily on first scratch request.
    pub(super) root: Option<PathBuf>,
    /// Tracked files, insertion order.
    pub(super) files: Vec<TrackedResource>,
    /// Tracked directories, insertion order.
    pub(super) dirs: Vec<TrackedResource>,
    /// Directory-removal retry policy used by cleanup.
    pub(super) retry: RetryPolicy,
}
