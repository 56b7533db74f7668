//! Unit tests for the dependency scope chain.

use std::fs;

use camino::Utf8PathBuf;
use netweave_config::{Version, VersionTuple};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

struct ChainDirs {
    _root: TempDir,
    paths: ModulePaths,
}

#[fixture]
fn chain_dirs() -> ChainDirs {
    let root = TempDir::new().expect("create temp root");
    let utf8_root =
        Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("utf-8 temp path");
    let tuple = VersionTuple::new(
        Version::new(2022, 3, 9),
        Version::new(1, 5, 2),
        Version::new(2, 0, 0),
        false,
    );
    let paths = ModulePaths::resolve(&utf8_root, &tuple);
    fs::create_dir_all(paths.version_dir()).expect("create version dir");
    ChainDirs { _root: root, paths }
}

fn place(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(shared_library_file_name(name));
    fs::write(&path, b"not really a library").expect("write dummy library");
    path
}

#[rstest]
fn version_dir_wins_over_common_dir(chain_dirs: ChainDirs) {
    let shared = SharedScope::new();
    let chain = ScopeChain::new(&chain_dirs.paths, &shared);
    place(chain.common_dir(), "netsync_cecil");
    let specific = place(chain.version_dir(), "netsync_cecil");
    assert_eq!(
        chain.resolve("netsync_cecil"),
        Some(Resolution::Isolated(specific))
    );
}

#[rstest]
fn common_dir_is_the_fallback(chain_dirs: ChainDirs) {
    let shared = SharedScope::new();
    let chain = ScopeChain::new(&chain_dirs.paths, &shared);
    let common = place(chain.common_dir(), "netsync_cecil");
    assert_eq!(
        chain.resolve("netsync_cecil"),
        Some(Resolution::Isolated(common))
    );
}

#[rstest]
fn unknown_names_resolve_nowhere(chain_dirs: ChainDirs) {
    let shared = SharedScope::new();
    let chain = ScopeChain::new(&chain_dirs.paths, &shared);
    assert_eq!(chain.resolve("netsync_cecil"), None);
}

#[rstest]
fn allow_listed_names_promote_on_first_use(chain_dirs: ChainDirs) {
    let shared = SharedScope::new();
    let chain = ScopeChain::new(&chain_dirs.paths, &shared);
    let bridge = place(chain.common_dir(), "netweave_log_bridge");
    assert_eq!(
        chain.resolve("netweave_log_bridge"),
        Some(Resolution::SharedPromote(bridge))
    );

    // Once loaded and promoted, every later scope reuses the shared copy.
    shared.promote("netweave_log_bridge");
    assert_eq!(
        chain.resolve("netweave_log_bridge"),
        Some(Resolution::SharedExisting)
    );
}

#[rstest]
fn promoted_names_shadow_local_copies(chain_dirs: ChainDirs) {
    let shared = SharedScope::new();
    shared.promote("netsync_cecil");
    let chain = ScopeChain::new(&chain_dirs.paths, &shared);
    place(chain.version_dir(), "netsync_cecil");
    assert_eq!(
        chain.resolve("netsync_cecil"),
        Some(Resolution::SharedExisting)
    );
}

#[test]
fn promotion_is_monotonic_and_idempotent() {
    let shared = SharedScope::new();
    assert!(shared.promote("netweave_log_bridge"));
    assert!(!shared.promote("netweave_log_bridge"));
    assert_eq!(shared.promoted_count(), 1);
    assert!(shared.is_promoted("netweave_log_bridge"));
}
