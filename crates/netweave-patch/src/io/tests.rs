//! Unit tests for artifact I/O and path arithmetic.

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
#[case("Plugin.dll", "Plugin-original.dll")]
#[case("Plugin.pdb", "Plugin-original.pdb")]
#[case("Plugin", "Plugin-original")]
fn backup_path_inserts_the_suffix(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(backup_path(Path::new(input)), PathBuf::from(expected));
}

#[test]
fn symbol_sibling_swaps_the_extension() {
    assert_eq!(
        symbol_sibling(Path::new("/plugins/Plugin.dll")),
        PathBuf::from("/plugins/Plugin.pdb")
    );
}

#[rstest]
#[case("Plugin-original", true)]
#[case("Plugin", false)]
#[case("original", false)]
fn backup_stems_are_recognised(#[case] stem: &str, #[case] expected: bool) {
    assert_eq!(is_backup_stem(stem), expected);
}

#[test]
fn embedded_symbol_magic_is_detected_anywhere_in_the_buffer() {
    let mut bytecode = vec![0_u8; 64];
    assert!(!has_embedded_symbols(&bytecode));
    bytecode.extend_from_slice(b"MPDB");
    bytecode.extend_from_slice(&[0; 8]);
    assert!(has_embedded_symbols(&bytecode));
}

#[test]
fn reads_external_symbols_alongside_bytecode() {
    let dir = TempDir::new().expect("temp dir");
    let assembly = dir.path().join("Plugin.dll");
    std::fs::write(&assembly, b"bytecode").expect("write assembly");
    std::fs::write(dir.path().join("Plugin.pdb"), b"symbols").expect("write symbols");

    let artifact = read_artifact(&assembly, &[]).expect("read");
    assert_eq!(artifact.name(), "Plugin");
    assert_eq!(artifact.bytecode(), b"bytecode");
    assert_eq!(
        artifact.symbols(),
        &netweave_modules::SymbolStore::External(b"symbols".to_vec())
    );
}

#[test]
fn missing_symbol_store_is_fatal_for_the_assembly() {
    let dir = TempDir::new().expect("temp dir");
    let assembly = dir.path().join("Plugin.dll");
    std::fs::write(&assembly, b"no symbols anywhere").expect("write assembly");

    let err = read_artifact(&assembly, &[]).expect_err("should fail");
    assert!(matches!(err, PatchError::SymbolsNotFound { .. }));
}

#[test]
fn embedded_symbols_need_no_sibling_file() {
    let dir = TempDir::new().expect("temp dir");
    let assembly = dir.path().join("Plugin.dll");
    std::fs::write(&assembly, b"prefix MPDB suffix").expect("write assembly");

    let artifact = read_artifact(&assembly, &[]).expect("read");
    assert!(artifact.symbols().is_embedded());
}

#[test]
fn write_round_trips_external_buffers() {
    let dir = TempDir::new().expect("temp dir");
    let output = dir.path().join("out").join("Plugin.dll");
    let artifact = netweave_modules::Artifact::new(
        "Plugin",
        b"woven".to_vec(),
        netweave_modules::SymbolStore::External(b"woven-symbols".to_vec()),
        vec![],
    );

    write_artifact(&artifact, &output).expect("write");
    assert_eq!(std::fs::read(&output).expect("read back"), b"woven");
    assert_eq!(
        std::fs::read(symbol_sibling(&output)).expect("read symbols back"),
        b"woven-symbols"
    );
}

#[test]
fn write_embedded_store_emits_no_symbol_file() {
    let dir = TempDir::new().expect("temp dir");
    let output = dir.path().join("Plugin.dll");
    let artifact = netweave_modules::Artifact::new(
        "Plugin",
        b"woven MPDB".to_vec(),
        netweave_modules::SymbolStore::Embedded,
        vec![],
    );

    write_artifact(&artifact, &output).expect("write");
    assert!(output.is_file());
    assert!(!symbol_sibling(&output).exists());
}
