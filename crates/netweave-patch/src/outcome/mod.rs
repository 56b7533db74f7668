//! Terminal outcomes of patch transactions and their batch aggregation.

use std::fmt;
use std::time::Duration;

use crate::error::PatchError;

/// Why a transaction ended in failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The input bytecode or symbol store could not be read.
    Read,
    /// A stage faulted or reported error diagnostics; rollback succeeded.
    Transformation,
    /// Rollback itself failed; the assembly may be inconsistent on disk.
    Unrecoverable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Transformation => "transformation",
            Self::Unrecoverable => "unrecoverable",
        })
    }
}

/// The terminal result of one assembly's transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The full chain ran and the woven output was committed.
    Success,
    /// A prior complete run already wove this assembly; nothing was touched.
    SkippedAlreadyPatched,
    /// The assembly is a framework-internal binary on the denylist; nothing
    /// was touched.
    SkippedBlacklisted,
    /// The transaction failed.
    Failed {
        /// Classification of the failure.
        kind: FailureKind,
        /// Human-readable cause.
        reason: String,
    },
}

impl Outcome {
    /// Whether this outcome marks the batch as failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether the transaction was skipped without touching the filesystem.
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::SkippedAlreadyPatched | Self::SkippedBlacklisted)
    }

    /// Classifies a transaction error into its failure outcome.
    #[must_use]
    pub fn from_error(error: &PatchError) -> Self {
        let kind = match error {
            PatchError::Read { .. }
            | PatchError::SymbolsNotFound { .. }
            | PatchError::InvalidName { .. } => FailureKind::Read,
            PatchError::RollbackFailed { .. } => FailureKind::Unrecoverable,
            PatchError::Backup { .. }
            | PatchError::Stage(_)
            | PatchError::StageDiagnostics { .. }
            | PatchError::Write { .. } => FailureKind::Transformation,
        };
        Self::Failed {
            kind,
            reason: error.to_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("patched"),
            Self::SkippedAlreadyPatched => f.write_str("skipped (already patched)"),
            Self::SkippedBlacklisted => f.write_str("skipped (framework assembly)"),
            Self::Failed { kind, reason } => write!(f, "failed ({kind}): {reason}"),
        }
    }
}

/// One assembly's outcome inside a batch report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutcome {
    /// Logical assembly name.
    pub assembly: String,
    /// The transaction's terminal outcome.
    pub outcome: Outcome,
}

/// Aggregated result of a batch run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Count of successful transactions.
    pub patched: usize,
    /// Count of skipped transactions.
    pub skipped: usize,
    /// Count of failed transactions.
    pub failed: usize,
    /// Wall-clock duration of the batch.
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests;
