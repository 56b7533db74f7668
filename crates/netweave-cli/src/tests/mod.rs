//! Unit tests for request planning.

use std::path::PathBuf;

use rstest::rstest;

use super::{CliError, build_requests};

fn assemblies(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[test]
fn no_output_patches_in_place() {
    let inputs = assemblies(&["plugins/PluginA.dll", "plugins/PluginB.dll"]);
    let refs = vec![PathBuf::from("deps/Netsync.Runtime.dll")];
    let requests = build_requests(&inputs, refs.clone(), None).expect("plan succeeds");
    assert_eq!(requests.len(), 2);
    for (request, input) in requests.iter().zip(&inputs) {
        assert!(request.is_in_place());
        assert_eq!(request.input(), input.as_path());
        assert_eq!(request.references(), refs.as_slice());
    }
}

#[test]
fn file_output_targets_a_single_input() {
    let inputs = assemblies(&["plugins/PluginA.dll"]);
    let output = PathBuf::from("out/Woven.dll");
    let requests =
        build_requests(&inputs, Vec::new(), Some(&output)).expect("plan succeeds");
    assert_eq!(requests.len(), 1);
    let request = requests.first().expect("one request");
    assert!(!request.is_in_place());
    assert_eq!(request.output(), output.as_path());
}

#[test]
fn file_output_with_many_inputs_is_rejected() {
    let inputs = assemblies(&["plugins/PluginA.dll", "plugins/PluginB.dll"]);
    let output = PathBuf::from("out/Woven.dll");
    let error = build_requests(&inputs, Vec::new(), Some(&output)).expect_err("plan fails");
    assert!(matches!(error, CliError::OutputConflict { inputs: 2, .. }));
}

#[rstest]
#[case::one_input(&["plugins/PluginA.dll"])]
#[case::many_inputs(&["plugins/PluginA.dll", "plugins/PluginB.dll"])]
fn directory_output_keeps_file_names(#[case] names: &[&str]) {
    let inputs = assemblies(names);
    let output = PathBuf::from("woven");
    let requests =
        build_requests(&inputs, Vec::new(), Some(&output)).expect("plan succeeds");
    assert_eq!(requests.len(), inputs.len());
    for (request, input) in requests.iter().zip(&inputs) {
        let name = input.file_name().expect("input has a file name");
        assert_eq!(request.output(), output.join(name).as_path());
        assert!(!request.is_in_place());
    }
}
