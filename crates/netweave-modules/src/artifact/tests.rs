//! Unit tests for the artifact type.

use std::path::PathBuf;

use super::*;

#[test]
fn with_buffers_preserves_identity_and_references() {
    let refs = vec![PathBuf::from("/deps")];
    let artifact = Artifact::new(
        "PluginA",
        vec![1, 2, 3],
        SymbolStore::External(vec![9]),
        refs.clone(),
    );
    let next = artifact.with_buffers(vec![4, 5], vec![6]);
    assert_eq!(next.name(), "PluginA");
    assert_eq!(next.bytecode(), &[4, 5]);
    assert_eq!(next.symbols(), &SymbolStore::External(vec![6]));
    assert_eq!(next.references(), refs.as_slice());
}

#[test]
fn with_buffers_keeps_embedded_store_embedded() {
    let artifact = Artifact::new("PluginA", vec![1], SymbolStore::Embedded, vec![]);
    let next = artifact.with_buffers(vec![2], vec![3, 4]);
    assert!(next.symbols().is_embedded());
}
