//! The capability contract between the orchestrator and a weaver module.
//!
//! A loaded module exposes its transformation chain as a fixed-order list of
//! [`TransformStage`] implementations plus one [`MarkerProbe`] that detects
//! the idempotency marker a complete prior run leaves behind. Stage order
//! matters: later stages may rely on bytecode markers written by earlier
//! ones, and the final stage stamps the marker the probe looks for, so a run
//! that crashed mid-chain is never mistaken for a patched assembly.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::Artifact;

/// Severity of a stage diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Logged and accumulated; never aborts a transaction.
    Warning,
    /// Aborts the whole transaction and triggers rollback.
    Error,
}

/// A message emitted by a transformation stage.
///
/// # Example
///
/// ```
/// use netweave_modules::{Diagnostic, Severity};
///
/// let diagnostic = Diagnostic::new(
///     Severity::Warning,
///     "field is never serialised||  consider [NetsyncIgnore]",
///     Some("Plugin.cs".into()),
///     Some(42),
/// );
/// assert!(diagnostic.render().contains("Plugin.cs:42"));
/// assert!(!diagnostic.render().contains("||"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic severity.
    pub severity: Severity,
    /// Message text as produced by the weaver, `||` separators included.
    pub message: String,
    /// Source file the diagnostic points at, when known.
    #[serde(default)]
    pub file: Option<String>,
    /// Source line the diagnostic points at, when known.
    #[serde(default)]
    pub line: Option<u32>,
}

impl Diagnostic {
    /// Creates a diagnostic.
    #[must_use]
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        file: Option<String>,
        line: Option<u32>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            file,
            line,
        }
    }

    /// Renders the diagnostic for logging, normalising the `||` separators
    /// the upstream weaver embeds in its messages and appending the source
    /// location when present.
    #[must_use]
    pub fn render(&self) -> String {
        let text = self.message.replace("||  ", "\n").replace("||", " ");
        match (&self.file, self.line) {
            (Some(file), Some(line)) => format!("{text} ({file}:{line})"),
            (Some(file), None) => format!("{text} ({file})"),
            _ => text,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Result of one stage application: the successor artifact and any
/// diagnostics the stage produced.
#[derive(Debug, Clone)]
pub struct StageOutput {
    /// The transformed artifact, which becomes the next stage's input.
    pub artifact: Artifact,
    /// Diagnostics the stage emitted while transforming.
    pub diagnostics: Vec<Diagnostic>,
}

impl StageOutput {
    /// Creates an output with no diagnostics.
    #[must_use]
    pub const fn clean(artifact: Artifact) -> Self {
        Self {
            artifact,
            diagnostics: Vec::new(),
        }
    }
}

/// A stage failed outright, before it could report structured diagnostics.
#[derive(Debug, Clone, Error)]
pub enum StageFailure {
    /// The module's transform entry point reported a fault.
    #[error("weaver module fault in stage '{stage}': {message}")]
    ModuleFault {
        /// Name of the faulting stage.
        stage: String,
        /// Description from the module.
        message: String,
    },
    /// The module returned data the bridge could not decode.
    #[error("stage '{stage}' produced an undecodable result: {message}")]
    InvalidResult {
        /// Name of the offending stage.
        stage: String,
        /// Description of the decode failure.
        message: String,
    },
}

/// One opaque transformation capability of a loaded weaver module.
///
/// Stages are pure with respect to the filesystem: input buffers in, output
/// buffers out. A stage may decline an artifact via [`applies`], in which
/// case the chain passes the artifact through unchanged.
///
/// [`applies`]: TransformStage::applies
pub trait TransformStage: Send + Sync {
    /// Stable stage name, used in logs and failure reports.
    fn name(&self) -> &str;

    /// Whether this stage has anything to do for the artifact.
    fn applies(&self, artifact: &Artifact) -> bool;

    /// Transforms the artifact, resolving type references against the
    /// artifact's reference search paths.
    ///
    /// # Errors
    ///
    /// Returns a [`StageFailure`] when the module faults; `Error`-severity
    /// diagnostics in a successful return are the caller's to act on.
    fn transform(&self, artifact: &Artifact) -> Result<StageOutput, StageFailure>;
}

/// Detects the idempotency marker left by a *complete* prior run of the
/// full chain.
pub trait MarkerProbe: Send + Sync {
    /// Returns `true` when the artifact carries the completed-run marker.
    ///
    /// # Errors
    ///
    /// Returns a [`StageFailure`] when the module cannot inspect the
    /// artifact at all.
    fn is_patched(&self, artifact: &Artifact) -> Result<bool, StageFailure>;
}
