//! The per-assembly patch transaction state machine.
//!
//! One transaction owns one assembly from read to commit:
//!
//! ```text
//! read → marker check → denylist check → backup (in-place only)
//!      → stage 1..n → write output → commit
//! ```
//!
//! Rollback is reachable from the backup step onward. The backup rename is
//! the sole rollback anchor and the only filesystem mutation before
//! transformation begins, so at return the disk is in exactly one of two
//! states: the original restored under its original name, or the woven
//! output committed with no backup left behind.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use netweave_modules::{Artifact, Severity, WeaverModule};

use crate::error::PatchError;
use crate::io;
use crate::outcome::Outcome;

/// Tracing target for transaction progress.
const TRANSACTION_TARGET: &str = "netweave_patch::transaction";

/// Framework-internal assemblies that ship pre-woven and must never be
/// rewoven. Matched against the logical assembly name, exactly and
/// case-insensitively.
pub const ASSEMBLY_DENYLIST: &[&str] = &[
    "Netsync.Runtime",
    "Netsync.Components",
    "Netsync.Transport",
    "Engine.CoreModule",
    "Assembly-CSharp",
];

/// Whether a logical assembly name is on the framework denylist.
#[must_use]
pub fn is_denylisted(name: &str) -> bool {
    ASSEMBLY_DENYLIST
        .iter()
        .any(|entry| entry.eq_ignore_ascii_case(name))
}

/// One assembly's patch request: where to read, where to write, and which
/// reference paths the stages resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRequest {
    input: PathBuf,
    output: PathBuf,
    references: Vec<PathBuf>,
}

impl PatchRequest {
    /// An in-place request: the woven output replaces the input file.
    #[must_use]
    pub fn in_place(input: PathBuf, references: Vec<PathBuf>) -> Self {
        Self {
            output: input.clone(),
            input,
            references,
        }
    }

    /// A copy-mode request writing the woven output elsewhere.
    #[must_use]
    pub const fn with_output(
        input: PathBuf,
        output: PathBuf,
        references: Vec<PathBuf>,
    ) -> Self {
        Self {
            input,
            output,
            references,
        }
    }

    /// The input assembly path.
    #[must_use]
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// The output assembly path; equals the input in in-place mode.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Reference search paths for the stage chain.
    #[must_use]
    pub fn references(&self) -> &[PathBuf] {
        &self.references
    }

    /// Whether the woven output replaces the input file.
    #[must_use]
    pub fn is_in_place(&self) -> bool {
        self.input == self.output
    }

    /// Logical assembly name derived from the input file stem.
    #[must_use]
    pub fn assembly_name(&self) -> String {
        self.input
            .file_stem()
            .map(OsStr::to_string_lossy)
            .map_or_else(|| String::from("<unnamed>"), |stem| stem.into_owned())
    }
}

/// Runs one assembly's transaction to its terminal outcome.
///
/// Every failure is contained: the return value reports it, the filesystem
/// is rolled back where possible, and nothing propagates to sibling
/// transactions.
#[must_use]
pub fn patch_assembly(module: &WeaverModule, request: &PatchRequest) -> Outcome {
    let assembly = request.assembly_name();
    match run(module, request, &assembly) {
        Ok(outcome) => outcome,
        Err(failure) => {
            error!(
                target: TRANSACTION_TARGET,
                assembly = assembly.as_str(),
                "failed to patch: {failure}"
            );
            Outcome::from_error(&failure)
        }
    }
}

fn run(
    module: &WeaverModule,
    request: &PatchRequest,
    assembly: &str,
) -> Result<Outcome, PatchError> {
    info!(target: TRANSACTION_TARGET, assembly, "reading");
    let artifact = io::read_artifact(request.input(), request.references())?;

    if module.is_patched(&artifact)? {
        info!(target: TRANSACTION_TARGET, assembly, "skipping: already patched");
        return Ok(Outcome::SkippedAlreadyPatched);
    }

    if is_denylisted(artifact.name()) {
        info!(target: TRANSACTION_TARGET, assembly, "skipping: framework assembly");
        return Ok(Outcome::SkippedBlacklisted);
    }

    // Sole rollback anchor; nothing before this point has touched the disk.
    let backup = if request.is_in_place() {
        Some(Backup::create(
            request.input(),
            artifact.symbols().is_embedded(),
            assembly,
        )?)
    } else {
        None
    };

    info!(target: TRANSACTION_TARGET, assembly, "patching");
    let woven = match apply_chain(module, artifact, assembly) {
        Ok(woven) => woven,
        // Nothing has been written yet; a pre-existing output from an
        // earlier run is not this transaction's to delete.
        Err(cause) => return Err(roll_back(request, backup, cause, assembly, false)),
    };

    match io::write_artifact(&woven, request.output()) {
        Ok(()) => {
            if let Some(anchor) = backup {
                anchor.discard(assembly);
            }
            info!(target: TRANSACTION_TARGET, assembly, "done");
            Ok(Outcome::Success)
        }
        Err(cause) => Err(roll_back(request, backup, cause, assembly, true)),
    }
}

/// Folds the artifact through the module's fixed-order stage chain.
///
/// Declining stages pass the artifact through unchanged. Warnings are
/// logged and accumulated; a single `Error`-severity diagnostic aborts the
/// chain.
fn apply_chain(
    module: &WeaverModule,
    mut artifact: Artifact,
    assembly: &str,
) -> Result<Artifact, PatchError> {
    for stage in module.stages() {
        if !stage.applies(&artifact) {
            debug!(
                target: TRANSACTION_TARGET,
                assembly,
                stage = stage.name(),
                "stage declined"
            );
            continue;
        }

        let output = stage.transform(&artifact)?;
        let (errors, warnings): (Vec<_>, Vec<_>) = output
            .diagnostics
            .into_iter()
            .partition(|diagnostic| diagnostic.severity == Severity::Error);

        for diagnostic in &warnings {
            warn!(
                target: TRANSACTION_TARGET,
                assembly,
                stage = stage.name(),
                "{}",
                diagnostic.render()
            );
        }
        if !errors.is_empty() {
            return Err(PatchError::StageDiagnostics {
                stage: stage.name().to_owned(),
                diagnostics: errors,
            });
        }
        artifact = output.artifact;
    }
    Ok(artifact)
}

/// Undoes a failed transaction: removes the partially written output when
/// the write step had started, then restores the backup when one exists.
/// Files this transaction never wrote are left alone, so a failure before
/// the write step preserves any output an earlier run committed. A rollback
/// that cannot restore the backup escalates to
/// [`PatchError::RollbackFailed`] instead of returning the original cause.
fn roll_back(
    request: &PatchRequest,
    backup: Option<Backup>,
    cause: PatchError,
    assembly: &str,
    output_written: bool,
) -> PatchError {
    if output_written {
        for partial in [request.output().to_path_buf(), io::symbol_sibling(request.output())] {
            if let Err(cleanup) = io::remove_if_exists(&partial) {
                warn!(
                    target: TRANSACTION_TARGET,
                    assembly,
                    path = %partial.display(),
                    "could not remove partial output: {cleanup}"
                );
            }
        }
    }

    if let Some(anchor) = backup {
        if let Err(restore_failure) = anchor.restore() {
            return restore_failure;
        }
        info!(target: TRANSACTION_TARGET, assembly, "rolled back to original");
    }
    cause
}

/// The `-original` backup pair created before an in-place transformation.
#[derive(Debug)]
struct Backup {
    assembly: String,
    bytecode: RenamedFile,
    symbols: Option<RenamedFile>,
}

#[derive(Debug)]
struct RenamedFile {
    live: PathBuf,
    stored: PathBuf,
}

impl Backup {
    /// Deletes any stale backup left by a previous crashed run, then renames
    /// the live files to their `-original` names.
    fn create(input: &Path, symbols_embedded: bool, assembly: &str) -> Result<Self, PatchError> {
        let bytecode = Self::rename_aside(input, assembly)?;
        let symbols = if symbols_embedded {
            None
        } else {
            let symbol_path = io::symbol_sibling(input);
            match Self::rename_aside(&symbol_path, assembly) {
                Ok(renamed) => Some(renamed),
                Err(failure) => {
                    // Keep the two-state invariant: undo the bytecode rename
                    // before reporting the half-made backup.
                    if let Err(undo) = std::fs::rename(&bytecode.stored, &bytecode.live) {
                        return Err(PatchError::RollbackFailed {
                            assembly: assembly.to_owned(),
                            message: format!(
                                "backup of symbols failed ({failure}) and the bytecode rename \
                                 could not be undone: {undo}"
                            ),
                        });
                    }
                    return Err(failure);
                }
            }
        };
        Ok(Self {
            assembly: assembly.to_owned(),
            bytecode,
            symbols,
        })
    }

    fn rename_aside(live: &Path, assembly: &str) -> Result<RenamedFile, PatchError> {
        let stored = io::backup_path(live);
        if stored.exists() {
            info!(
                target: TRANSACTION_TARGET,
                assembly,
                path = %stored.display(),
                "deleting stale backup"
            );
            io::remove_if_exists(&stored)
                .map_err(|err| PatchError::backup(stored.clone(), err))?;
        }
        std::fs::rename(live, &stored)
            .map_err(|err| PatchError::backup(live.to_path_buf(), err))?;
        Ok(RenamedFile {
            live: live.to_path_buf(),
            stored,
        })
    }

    /// Commit path: the woven output is in place, drop the backup pair.
    fn discard(self, assembly: &str) {
        for renamed in self.pairs() {
            if let Err(cleanup) = io::remove_if_exists(&renamed.stored) {
                warn!(
                    target: TRANSACTION_TARGET,
                    assembly,
                    path = %renamed.stored.display(),
                    "could not remove committed backup: {cleanup}"
                );
            }
        }
    }

    /// Rollback path: restore the pair under the original names.
    fn restore(self) -> Result<(), PatchError> {
        let assembly = self.assembly.clone();
        for renamed in self.pairs() {
            if !renamed.stored.exists() {
                return Err(PatchError::RollbackFailed {
                    assembly: assembly.clone(),
                    message: format!("backup '{}' is missing", renamed.stored.display()),
                });
            }
            std::fs::rename(&renamed.stored, &renamed.live).map_err(|err| {
                PatchError::RollbackFailed {
                    assembly: assembly.clone(),
                    message: format!(
                        "could not restore '{}': {err}",
                        renamed.live.display()
                    ),
                }
            })?;
        }
        Ok(())
    }

    fn pairs(self) -> Vec<RenamedFile> {
        let mut pairs = vec![self.bytecode];
        if let Some(symbols) = self.symbols {
            pairs.push(symbols);
        }
        pairs
    }
}
