//! Scratch resource lifecycle: tracked temp files/directories with
//! deterministic teardown.
//!
//! A [`ScratchRegistry`] is the ground-truth record of every path the
//! current process is responsible for. Resources are created under a lazily
//! resolved working root (or adopted after the fact), and torn down in one
//! designated [`ScratchRegistry::cleanup`] call: files first, then
//! directories, most recent first, with bounded retries for directories on
//! network filesystems.
//!
//! # Guarantees
//!
//! - **Set membership**: a normalized path is tracked at most once
//! - **Ownership-gated deletion**: `owned = false` resources always survive
//! - **Non-raising teardown**: cleanup logs and continues, it never unwinds
//!
//! # Example
//!
//! ```no_run
//! use stagehand::ScratchRegistry;
//!
//! let mut registry = ScratchRegistry::with_preferred_root("/scratch");
//! let reads = registry.new_scratch_file(".fasta", "reads-")?;
//! let work = registry.new_scratch_dir("", "align-")?;
//! // ... run the pipeline stages ...
//! registry.cleanup(true);
//! # Ok::<(), stagehand::Error>(())
//! ```

mod operations;
mod queries;
pub mod types;

#[cfg(test)]
mod property_tests;

pub use types::{ResourceKind, RetryPolicy, ScratchRegistry, TrackedResource};
