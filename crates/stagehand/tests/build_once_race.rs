//! Build-once coordination against the real filesystem, including racing
//! threads standing in for independent process invocations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serial_test::serial;
use stagehand::{
    ArtifactKey, Coordinator, CoordinatorConfig, Error, FnBuilder, FsStore, Result,
    ScratchRegistry, SystemSleeper,
};

fn fast_coordinator() -> Coordinator {
    Coordinator::with_parts(
        FsStore,
        SystemSleeper,
        CoordinatorConfig {
            poll_interval: Duration::from_millis(5),
        },
    )
    .expect("coordinator")
}

fn write_index(artifact: &Path) -> io::Result<()> {
    fs::create_dir_all(artifact)?;
    fs::write(artifact.join("index.bin"), b"deterministic index payload")
}

fn build_error(artifact: &Path, err: &io::Error) -> Error {
    Error::Build {
        artifact: artifact.to_path_buf(),
        detail: err.to_string(),
    }
}

#[test]
#[serial]
fn unshared_artifact_is_owned_and_reclaimed() {
    let sandbox = tempfile::tempdir().expect("sandbox");
    let root: PathBuf = sandbox.path().to_path_buf();
    let coordinator = fast_coordinator();
    let mut registry = ScratchRegistry::new();

    let calls = Arc::new(AtomicU32::new(0));
    let calls_in_builder = Arc::clone(&calls);
    let mut builder = FnBuilder(move |artifact: &Path| -> Result<()> {
        calls_in_builder.fetch_add(1, Ordering::SeqCst);
        write_index(artifact).map_err(|err| build_error(artifact, &err))
    });

    let key = ArtifactKey::new(&root, "db");
    let built = coordinator
        .build_once(&mut registry, &key, false, &mut builder)
        .expect("first build");
    assert_eq!(built.artifact_path(), root.join("db"));
    assert!(root.join("db/index.bin").is_file());
    assert!(!root.join("db.lock").exists());
    assert!(registry.is_registered(&root.join("db")));

    // Second call in the same process: no rebuild, no double registration.
    coordinator
        .build_once(&mut registry, &key, false, &mut builder)
        .expect("second build");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    registry.cleanup(true);
    assert!(!root.join("db").exists());
}

#[test]
#[serial]
fn shared_artifact_survives_cleanup() {
    let repo = tempfile::tempdir().expect("repo");
    let coordinator = fast_coordinator();
    let mut registry = ScratchRegistry::new();

    let mut builder = FnBuilder(|artifact: &Path| -> Result<()> {
        write_index(artifact).map_err(|err| build_error(artifact, &err))
    });
    coordinator
        .build_once(
            &mut registry,
            &ArtifactKey::new(repo.path(), "gmap_db"),
            true,
            &mut builder,
        )
        .expect("shared build");

    assert!(!registry.is_registered(&repo.path().join("gmap_db")));
    registry.cleanup(true);
    assert!(repo.path().join("gmap_db/index.bin").is_file());
}

#[test]
#[serial]
fn failed_build_clears_marker_and_allows_retry() {
    let sandbox = tempfile::tempdir().expect("sandbox");
    let coordinator = fast_coordinator();
    let mut registry = ScratchRegistry::new();
    let key = ArtifactKey::new(sandbox.path(), "db");

    let mut failing = FnBuilder(|artifact: &Path| -> Result<()> {
        Err(Error::Build {
            artifact: artifact.to_path_buf(),
            detail: "exit code 1: out of memory".to_string(),
        })
    });
    let result = coordinator.build_once(&mut registry, &key, true, &mut failing);
    assert!(matches!(result, Err(Error::Build { .. })));
    assert!(!key.marker_path().exists());

    // The caller may retry the whole operation, re-entering at Absent.
    let mut succeeding = FnBuilder(|artifact: &Path| -> Result<()> {
        write_index(artifact).map_err(|err| build_error(artifact, &err))
    });
    coordinator
        .build_once(&mut registry, &key, true, &mut succeeding)
        .expect("retry succeeds");
    assert!(key.artifact_path().is_dir());
}

#[test]
#[serial]
fn racing_invocations_converge_on_one_artifact() {
    let repo = tempfile::tempdir().expect("repo");
    let builds = Arc::new(AtomicU32::new(0));
    let threads = 6;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let root = repo.path().to_path_buf();
            let builds = Arc::clone(&builds);
            thread::spawn(move || {
                let coordinator = fast_coordinator();
                let mut registry = ScratchRegistry::new();
                let builds_in_builder = Arc::clone(&builds);
                let mut builder = FnBuilder(move |artifact: &Path| -> Result<()> {
                    builds_in_builder.fetch_add(1, Ordering::SeqCst);
                    // An expensive build: long enough that the other racers
                    // reliably hit the wait loop.
                    thread::sleep(Duration::from_millis(40));
                    write_index(artifact).map_err(|err| build_error(artifact, &err))
                });
                let coord_result = coordinator.build_once(
                    &mut registry,
                    &ArtifactKey::new(&root, "shared_db"),
                    true,
                    &mut builder,
                );
                coord_result.map(|key| key.artifact_path())
            })
        })
        .collect();

    let mut artifact_paths = Vec::new();
    for handle in handles {
        let path = handle
            .join()
            .expect("thread join")
            .expect("build_once result");
        artifact_paths.push(path);
    }

    // Every racer observed the same completed artifact.
    let expected = repo.path().join("shared_db");
    assert!(artifact_paths.iter().all(|p| *p == expected));
    assert!(expected.join("index.bin").is_file());
    assert!(!repo.path().join("shared_db.lock").exists());

    // At most a small constant number of duplicate builds under adversarial
    // scheduling; with atomic marker creation this is one in practice.
    let build_count = builds.load(Ordering::SeqCst);
    assert!(build_count >= 1);
    assert!(
        build_count <= 3,
        "expected a small constant number of builds, saw {build_count}"
    );
}
