//! Failure types for a single patch transaction.
//!
//! Every variant here is scoped to one assembly: transaction errors never
//! propagate to sibling transactions. I/O sources are wrapped in `Arc` so
//! the error stays cheap to move through outcome aggregation.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use netweave_modules::{Diagnostic, StageFailure};

/// Errors that abort one assembly's transaction.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The input bytecode could not be read.
    #[error("cannot read assembly '{}': {source}", path.display())]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The assembly has neither a sibling symbol file nor embedded symbols.
    ///
    /// Deliberately fatal for the assembly: weaving without a symbol store
    /// would silently produce undebuggable output.
    #[error("no debug symbol store for '{assembly}': expected {} or embedded symbols", expected.display())]
    SymbolsNotFound {
        /// Logical assembly name.
        assembly: String,
        /// The external symbol path that was probed.
        expected: PathBuf,
    },

    /// The input path has no usable file stem.
    #[error("input path '{}' has no assembly name", path.display())]
    InvalidName {
        /// The offending path.
        path: PathBuf,
    },

    /// Creating or cleaning the backup pair failed.
    #[error("backup of '{}' failed: {source}", path.display())]
    Backup {
        /// The file being backed up.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A stage faulted outright.
    #[error(transparent)]
    Stage(#[from] StageFailure),

    /// A stage reported one or more `Error`-severity diagnostics.
    #[error("stage '{stage}' reported {} error diagnostic(s)", diagnostics.len())]
    StageDiagnostics {
        /// The stage that reported the errors.
        stage: String,
        /// The `Error`-severity diagnostics, in report order.
        diagnostics: Vec<Diagnostic>,
    },

    /// Writing the woven output failed.
    #[error("cannot write output '{}': {source}", path.display())]
    Write {
        /// The path that failed to write.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Rollback could not restore the original files.
    ///
    /// The assembly may be left inconsistent on disk; this is escalated as
    /// its own failure kind rather than absorbed into the triggering error.
    #[error("rollback failed for '{assembly}': {message}")]
    RollbackFailed {
        /// Logical assembly name.
        assembly: String,
        /// Description of what could not be restored.
        message: String,
    },
}

impl PatchError {
    /// Wraps an I/O error as a read failure.
    #[must_use]
    pub fn read(path: PathBuf, source: std::io::Error) -> Self {
        Self::Read {
            path,
            source: Arc::new(source),
        }
    }

    /// Wraps an I/O error as a backup failure.
    #[must_use]
    pub fn backup(path: PathBuf, source: std::io::Error) -> Self {
        Self::Backup {
            path,
            source: Arc::new(source),
        }
    }

    /// Wraps an I/O error as a write failure.
    #[must_use]
    pub fn write(path: PathBuf, source: std::io::Error) -> Self {
        Self::Write {
            path,
            source: Arc::new(source),
        }
    }
}
