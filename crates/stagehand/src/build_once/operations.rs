//! The lock protocol: poll the marker, become the builder, publish.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use super::builder::ArtifactBuilder;
use super::store::{CreateOutcome, FsStore, MarkerStore};
use super::types::{ArtifactKey, CoordinatorConfig, Sleeper, SystemSleeper};
use crate::error::{Error, Result};
use crate::scratch::{ResourceKind, ScratchRegistry};

/// Cross-process build-once coordinator.
///
/// Generic over the marker store and the sleeper so the protocol can run
/// against an in-memory store with no wall-clock delay in tests.
#[derive(Debug, Clone)]
pub struct Coordinator<S = FsStore, C = SystemSleeper> {
    store: S,
    sleeper: C,
    poll_interval: Duration,
}

impl Coordinator {
    /// Create a coordinator against the real filesystem.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the poll interval is zero.
    pub fn new(config: CoordinatorConfig) -> Result<Self> {
        Self::with_parts(FsStore, SystemSleeper, config)
    }
}

impl<S, C> Coordinator<S, C>
where
    S: MarkerStore,
    C: Sleeper,
{
    /// Create a coordinator with an explicit store and sleeper.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the poll interval is zero.
    pub fn with_parts(store: S, sleeper: C, config: CoordinatorConfig) -> Result<Self> {
        if config.poll_interval.is_zero() {
            return Err(Error::InvalidConfig {
                reason: "poll_interval must be > 0".to_string(),
            });
        }
        Ok(Self {
            store,
            sleeper,
            poll_interval: config.poll_interval,
        })
    }

    /// Ensure the artifact identified by `key` exists, building it at most
    /// once across racing processes.
    ///
    /// Readiness is never judged by the artifact's presence alone: an
    /// artifact with a live sibling marker is a build in progress. The
    /// protocol:
    ///
    /// 1. artifact present, marker absent: built, return
    /// 2. marker present: sleep `poll_interval`, re-check
    /// 3. marker absent, artifact absent: atomically create the marker;
    ///    losing that race resumes polling instead of trusting the earlier
    ///    observation. The winner runs the builder, then removes the marker
    ///    only after the builder has fully exited
    ///
    /// A `shared` artifact (one living in a long-lived repository) is left
    /// untracked so future jobs reuse it. An unshared artifact is adopted
    /// into `registry` as owned and is deleted at cleanup.
    ///
    /// The wait loop has no deadline; callers that must bound it layer a
    /// timeout externally.
    ///
    /// # Errors
    ///
    /// - `Build` if the builder failed (the marker is cleared first,
    ///   best effort, so other waiters do not poll forever)
    /// - `Marker` if marker creation failed for a reason other than
    ///   contention
    /// - registry errors from adopting an unshared artifact
    pub fn build_once<B>(
        &self,
        registry: &mut ScratchRegistry,
        key: &ArtifactKey,
        shared: bool,
        builder: &mut B,
    ) -> Result<ArtifactKey>
    where
        B: ArtifactBuilder + ?Sized,
    {
        let artifact = key.artifact_path();
        let marker = key.marker_path();

        loop {
            if self.store.exists(&artifact) && !self.store.exists(&marker) {
                info!("artifact {} already built, reusing", artifact.display());
                self.track(registry, &artifact, shared)?;
                return Ok(key.clone());
            }

            while self.store.exists(&marker) {
                info!(
                    "waiting for a concurrent build of {} (marker {} present)",
                    artifact.display(),
                    marker.display()
                );
                self.sleeper.sleep(self.poll_interval);
            }

            if self.store.exists(&artifact) {
                // Published while we waited; re-evaluate from the top so a
                // rewritten marker is still respected.
                continue;
            }

            match self
                .store
                .create_marker(&marker)
                .map_err(|source| Error::Marker {
                    path: marker.clone(),
                    source,
                })? {
                CreateOutcome::AlreadyExists => {
                    // Lost the admission race; the earlier observation is
                    // stale. Back to polling.
                    continue;
                }
                CreateOutcome::Created => {}
            }

            info!("building artifact {}", artifact.display());
            if let Err(err) = builder.build(&artifact) {
                self.clear_marker(&marker);
                return Err(err);
            }

            // Publish: the builder has fully exited, so removing the marker
            // is what makes the artifact observable as built.
            self.clear_marker(&marker);
            self.track(registry, &artifact, shared)?;
            return Ok(key.clone());
        }
    }

    fn clear_marker(&self, marker: &Path) {
        if let Err(err) = self.store.remove_marker(marker) {
            warn!("failed to clear build marker {}: {err}", marker.display());
        }
    }

    fn track(&self, registry: &mut ScratchRegistry, artifact: &Path, shared: bool) -> Result<()> {
        if shared || registry.is_registered(artifact) {
            return Ok(());
        }
        registry
            .adopt(artifact, true, ResourceKind::Directory)
            .map(|_| ())
    }
}

/// Convenience entry point against the real filesystem with the default
/// poll interval: ensure `root/name` exists, building it at most once.
///
/// # Errors
///
/// See [`Coordinator::build_once`].
pub fn build_once<B>(
    registry: &mut ScratchRegistry,
    root: &Path,
    name: &str,
    shared: bool,
    builder: &mut B,
) -> Result<ArtifactKey>
where
    B: ArtifactBuilder + ?Sized,
{
    let coordinator = Coordinator::new(CoordinatorConfig::default())?;
    coordinator.build_once(registry, &ArtifactKey::new(root, name), shared, builder)
}
