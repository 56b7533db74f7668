//! Unit tests for loader error rendering.

use std::path::PathBuf;

use super::*;

#[test]
fn unsupported_configuration_names_the_exact_tuple() {
    let err = ModuleError::UnsupportedConfiguration {
        tuple: "engine v2022.3.9, netsync v9.9.9, transport v2.0.0, native collections: false"
            .into(),
        module_file: PathBuf::from("/modules/libnetweave_module.so"),
    };
    let rendered = err.to_string();
    assert!(rendered.starts_with("unsupported configuration"));
    assert!(rendered.contains("netsync v9.9.9"));
    assert!(rendered.contains("libnetweave_module.so"));
}

#[test]
fn dependency_not_found_wraps_the_tuple() {
    let err = ModuleError::DependencyNotFound {
        name: "netsync_cecil".into(),
        tuple: "engine v2022.3.9, netsync v1.5.2, transport v2.0.0, native collections: true"
            .into(),
    };
    let rendered = err.to_string();
    assert!(rendered.contains("'netsync_cecil'"));
    assert!(rendered.contains("netsync v1.5.2"));
}
