//! # Stagehand
//!
//! Ephemeral resource lifecycle and build-once coordination for multi-stage
//! pipeline jobs.
//!
//! Two tightly coupled pieces:
//!
//! - [`ScratchRegistry`] tracks every temp file and directory a job creates
//!   (or adopts) and tears them all down in one deterministic, non-raising
//!   cleanup pass, files before directories, tolerant of network-filesystem
//!   removal latency.
//! - [`build_once`] guards construction of a shared derived artifact with a
//!   filesystem lock marker, so an index that many racing jobs need is
//!   built at most once and every racer ends up observing the same
//!   completed artifact.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, Error>`. Cleanup is the one
//! deliberate exception: it never fails, so teardown during unwind cannot
//! mask the error that triggered it.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod build_once;
mod error;
pub mod scratch;

pub use build_once::{
    build_once, ArtifactBuilder, ArtifactKey, CommandBuilder, Coordinator, CoordinatorConfig,
    CreateOutcome, FnBuilder, FsStore, MarkerStore, MemoryStore, Sleeper, SystemSleeper,
    MARKER_SUFFIX,
};
pub use error::{Error, Result};
pub use scratch::{ResourceKind, RetryPolicy, ScratchRegistry, TrackedResource};
