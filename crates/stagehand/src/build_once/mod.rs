//! Build-once coordination for shared derived artifacts.
//!
//! Many unrelated processes may race to build the same expensive artifact
//! (a derived index keyed by its input). Coordination happens purely through
//! the filesystem: a sibling marker file (`root/name.lock`) whose presence
//! means "build in progress". There is no lease, no fencing token, and no
//! network protocol; this targets coarse, seconds-to-minutes builds on
//! filesystems the racing processes share.
//!
//! # Guarantees
//!
//! - **At-most-one builder**: marker creation is an atomic
//!   create-if-not-exists; losing it sends the racer back to polling
//! - **Published means complete**: the marker is removed only after the
//!   builder has fully exited, so any process observing artifact-present,
//!   marker-absent sees a fully written artifact
//! - **No stranded waiters**: a failed build clears its marker (best
//!   effort) before surfacing the error
//!
//! A builder that dies without clearing its marker leaves waiters polling;
//! there is no staleness detection. Operators remove the marker by hand in
//! that case.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use stagehand::{build_once, CommandBuilder, ScratchRegistry};
//!
//! let mut registry = ScratchRegistry::with_preferred_root("/scratch");
//! let mut builder = CommandBuilder::new("gmap_build")
//!     .arg("-k").arg("12")
//!     .arg("--db=gmap_db")
//!     .arg("--dir=/refrepo")
//!     .arg("/refrepo/sequence/reference.fasta");
//!
//! // Shared: the index lives in the repository and outlives this job.
//! let key = build_once(&mut registry, Path::new("/refrepo"), "gmap_db", true, &mut builder)?;
//! println!("index ready at {}", key.artifact_path().display());
//! # Ok::<(), stagehand::Error>(())
//! ```

mod builder;
mod operations;
mod store;
pub mod types;

pub use builder::{ArtifactBuilder, CommandBuilder, FnBuilder};
pub use operations::{build_once, Coordinator};
pub use store::{CreateOutcome, FsStore, MarkerStore, MemoryStore};
pub use types::{ArtifactKey, CoordinatorConfig, Sleeper, SystemSleeper, MARKER_SUFFIX};
