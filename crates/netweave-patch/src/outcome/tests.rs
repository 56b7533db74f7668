//! Unit tests for outcome classification.

use std::path::PathBuf;
use std::sync::Arc;

use netweave_modules::StageFailure;
use rstest::rstest;

use super::*;

fn io_error() -> Arc<std::io::Error> {
    Arc::new(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
}

#[rstest]
#[case(
    PatchError::Read { path: PathBuf::from("a.dll"), source: io_error() },
    FailureKind::Read
)]
#[case(
    PatchError::SymbolsNotFound {
        assembly: "a".into(),
        expected: PathBuf::from("a.pdb"),
    },
    FailureKind::Read
)]
#[case(
    PatchError::Stage(StageFailure::ModuleFault {
        stage: "network-behaviour".into(),
        message: "boom".into(),
    }),
    FailureKind::Transformation
)]
#[case(
    PatchError::RollbackFailed { assembly: "a".into(), message: "backup missing".into() },
    FailureKind::Unrecoverable
)]
fn errors_classify_into_failure_kinds(#[case] error: PatchError, #[case] expected: FailureKind) {
    match Outcome::from_error(&error) {
        Outcome::Failed { kind, reason } => {
            assert_eq!(kind, expected);
            assert!(!reason.is_empty());
        }
        other => panic!("expected a failure outcome, got {other}"),
    }
}

#[test]
fn skips_are_not_failures() {
    assert!(Outcome::SkippedAlreadyPatched.is_skip());
    assert!(Outcome::SkippedBlacklisted.is_skip());
    assert!(!Outcome::SkippedAlreadyPatched.is_failure());
    assert!(!Outcome::Success.is_failure());
    assert!(!Outcome::Success.is_skip());
}
