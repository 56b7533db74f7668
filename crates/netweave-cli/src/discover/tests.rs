//! Tests for input discovery.

use std::fs;
use std::path::Path;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::{DiscoverError, collect_assemblies, collect_references};

#[fixture]
fn plugin_tree() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    touch(&dir.path().join("PluginA.dll"));
    touch(&dir.path().join("PluginA.pdb"));
    touch(&dir.path().join("PluginA-original.dll"));
    touch(&dir.path().join("MMHOOK_Assembly-CSharp.dll"));
    touch(&dir.path().join("readme.txt"));
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).expect("create nested dir");
    touch(&nested.join("PluginB.dll"));
    dir
}

fn touch(path: &Path) {
    fs::write(path, b"").expect("write file");
}

#[rstest]
fn directory_scan_finds_assemblies_recursively(plugin_tree: TempDir) {
    let found = collect_assemblies(plugin_tree.path()).expect("scan succeeds");
    let names: Vec<_> = found
        .iter()
        .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
        .collect();
    assert_eq!(names, ["PluginA.dll", "PluginB.dll"]);
}

#[rstest]
fn backups_and_runtime_hooks_are_skipped(plugin_tree: TempDir) {
    let found = collect_assemblies(plugin_tree.path()).expect("scan succeeds");
    assert!(
        found
            .iter()
            .all(|path| !path.to_string_lossy().contains("-original"))
    );
    assert!(
        found
            .iter()
            .all(|path| !path.to_string_lossy().to_lowercase().contains("mmhook"))
    );
}

#[rstest]
fn file_input_is_taken_as_is(plugin_tree: TempDir) {
    let file = plugin_tree.path().join("PluginA.dll");
    let found = collect_assemblies(&file).expect("file input succeeds");
    assert_eq!(found, vec![file]);
}

#[rstest]
#[case::backup_from_an_earlier_run("PluginA-original.dll")]
#[case::runtime_hook("MMHOOK_Assembly-CSharp.dll")]
fn explicit_file_inputs_honour_the_stem_filters(plugin_tree: TempDir, #[case] name: &str) {
    let file = plugin_tree.path().join(name);
    let found = collect_assemblies(&file).expect("file input succeeds");
    assert!(found.is_empty());
}

#[test]
fn missing_input_is_an_error() {
    let dir = TempDir::new().expect("create temp dir");
    let missing = dir.path().join("does-not-exist");
    let error = collect_assemblies(&missing).expect_err("missing input fails");
    assert!(matches!(error, DiscoverError::Missing { .. }));
}

#[rstest]
fn references_mix_files_and_directories(plugin_tree: TempDir) {
    let extra = TempDir::new().expect("create temp dir");
    let framework = extra.path().join("Netsync.Runtime.dll");
    touch(&framework);

    let deps = vec![framework.clone(), plugin_tree.path().to_path_buf()];
    let references = collect_references(&deps).expect("collect succeeds");
    assert!(references.contains(&framework));
    assert!(references.iter().any(|path| path.ends_with("PluginB.dll")));
}

#[test]
fn missing_dependency_paths_are_skipped() {
    let dir = TempDir::new().expect("create temp dir");
    let deps = vec![dir.path().join("gone")];
    let references = collect_references(&deps).expect("collect succeeds");
    assert!(references.is_empty());
}
