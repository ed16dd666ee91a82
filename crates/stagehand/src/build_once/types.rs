//! Type definitions for build-once coordination.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fixed suffix appended to the artifact name to form the lock marker.
pub const MARKER_SUFFIX: &str = ".lock";

/// Default wait-loop poll interval. Builds take seconds to minutes, so a
/// coarse interval keeps waiters cheap without meaningfully delaying them.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Stable identity of a shared derived artifact: the directory it lives in
/// and its name within that directory.
///
/// The marker is always a sibling of the artifact, `root/name.lock`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    root: PathBuf,
    name: String,
}

impl ArtifactKey {
    /// Create a key from the artifact's parent directory and name.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    /// Directory the artifact lives in.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Artifact name within the root.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path of the artifact, `root/name`.
    #[must_use]
    pub fn artifact_path(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// Full path of the lock marker, `root/name.lock`.
    #[must_use]
    pub fn marker_path(&self) -> PathBuf {
        let mut file_name = self.name.clone();
        file_name.push_str(MARKER_SUFFIX);
        self.root.join(file_name)
    }
}

/// Configuration for the coordinator's wait loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Pause between marker re-checks while another process builds.
    pub poll_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Suspension point used by the wait loop. Injectable so tests run the
/// protocol without wall-clock delay.
pub trait Sleeper {
    /// Block the current thread for roughly `duration`.
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSleeper;

impl Sleeper for SystemSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
