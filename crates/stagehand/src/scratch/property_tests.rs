//! Property-based tests for registry invariants.
//!
//! These tests use proptest to verify invariants:
//! - No two scratch resources ever share a path
//! - Cleanup drains the registry regardless of the deletion flag
//! - Ownership gates deletion

use proptest::prelude::*;

use super::types::{ResourceKind, ScratchRegistry};

/// A scratch request as driven by the property tests.
#[derive(Debug, Clone)]
struct Request {
    is_dir: bool,
    suffix: String,
    prefix: String,
}

fn request_strategy() -> impl Strategy<Value = Request> {
    (any::<bool>(), "[a-z0-9]{0,4}", "[a-z0-9]{0,4}").prop_map(|(is_dir, suffix, prefix)| {
        Request {
            is_dir,
            suffix,
            prefix,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: every created scratch path is unique and registered,
    /// whatever mix of kinds, prefixes, and suffixes was requested.
    #[test]
    fn prop_scratch_paths_never_collide(requests in prop::collection::vec(request_strategy(), 1..8)) {
        let sandbox = tempfile::tempdir().expect("sandbox");
        let mut registry = ScratchRegistry::with_preferred_root(sandbox.path());
        let mut seen = Vec::new();

        for request in &requests {
            let kind = if request.is_dir {
                ResourceKind::Directory
            } else {
                ResourceKind::File
            };
            let path = registry
                .new_scratch_in(kind, None, &request.suffix, &request.prefix)
                .expect("scratch creation");
            prop_assert!(registry.is_registered(&path));
            prop_assert!(!seen.contains(&path));
            seen.push(path);
        }

        registry.cleanup(true);
        prop_assert!(registry.is_empty());
        for path in &seen {
            prop_assert!(!path.exists());
        }
    }

    /// Property: cleanup with deletion disabled still empties the registry
    /// and leaves every path on disk.
    #[test]
    fn prop_cleanup_false_preserves_disk_state(requests in prop::collection::vec(request_strategy(), 1..5)) {
        let sandbox = tempfile::tempdir().expect("sandbox");
        let mut registry = ScratchRegistry::with_preferred_root(sandbox.path());
        let mut seen = Vec::new();

        for request in &requests {
            let kind = if request.is_dir {
                ResourceKind::Directory
            } else {
                ResourceKind::File
            };
            seen.push(
                registry
                    .new_scratch_in(kind, None, &request.suffix, &request.prefix)
                    .expect("scratch creation"),
            );
        }

        registry.cleanup(false);
        prop_assert!(registry.is_empty());
        for path in &seen {
            prop_assert!(path.exists());
        }
    }
}
