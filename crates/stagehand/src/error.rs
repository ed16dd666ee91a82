//! Error types for scratch tracking and build coordination:
//!
//! - **Registration errors**: duplicate or impossible bookkeeping (logic bugs)
//! - **Allocation errors**: every working-root fallback tier failed
//! - **Build errors**: the external builder exited non-zero or never spawned
//!
//! Cleanup never surfaces errors through this type. Teardown runs while the
//! caller may already be unwinding from an unrelated failure, so directory
//! removal problems are logged as warnings instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::scratch::ResourceKind;

/// Top-level error type for all fatal failures in this crate.
///
/// Every variant carries the offending path so callers can report it without
/// reconstructing context.
#[derive(Debug, Error)]
pub enum Error {
    /// A path was registered twice. Registry membership is a set keyed by
    /// the normalized absolute path.
    #[error("{path} is already registered")]
    DuplicateRegistration {
        /// Normalized path that was already tracked.
        path: PathBuf,
    },

    /// No working root could be allocated, including the platform temp-dir
    /// fallback.
    #[error("failed to allocate a working root under {path}: {source}")]
    RootAllocation {
        /// Location of the last allocation attempt.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An adopted path does not exist on the filesystem.
    #[error("cannot adopt {path}: no such file or directory")]
    AdoptMissing {
        /// Path the caller tried to adopt.
        path: PathBuf,
    },

    /// An adopted path exists but its filesystem kind does not match the
    /// caller's expectation.
    #[error("cannot adopt {path} as a {expected}: filesystem kind differs")]
    AdoptKindMismatch {
        /// Path the caller tried to adopt.
        path: PathBuf,
        /// Kind the caller claimed the path to be.
        expected: ResourceKind,
    },

    /// Creating a scratch file or directory under the working root failed.
    #[error("failed to create a scratch {kind} under {root}: {source}")]
    ScratchCreate {
        /// Kind of resource that was requested.
        kind: ResourceKind,
        /// Root the resource was to be created under.
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A lock-marker operation failed for a reason other than contention.
    #[error("marker operation failed at {path}: {source}")]
    Marker {
        /// Marker path the operation targeted.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The external build command failed. The marker has already been
    /// cleared (best effort) by the time this surfaces.
    #[error("build of {artifact} failed: {detail}")]
    Build {
        /// Artifact the builder was producing.
        artifact: PathBuf,
        /// Exit status and captured stderr, or the spawn failure.
        detail: String,
    },

    /// A configuration precondition was violated.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the violated precondition.
        reason: String,
    },
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_the_offending_path() {
        let err = Error::DuplicateRegistration {
            path: PathBuf::from("/tmp/a"),
        };
        assert!(err.to_string().contains("/tmp/a"));

        let err = Error::AdoptKindMismatch {
            path: PathBuf::from("/tmp/b"),
            expected: ResourceKind::Directory,
        };
        assert!(err.to_string().contains("/tmp/b"));
        assert!(err.to_string().contains("directory"));
    }

    #[test]
    fn test_allocation_error_includes_os_text() {
        let err = Error::RootAllocation {
            path: PathBuf::from("/nope"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(err.to_string().contains("permission denied"));
    }
}
