//! In-process weaver modules for exercising transactions without dynamic
//! libraries.
//!
//! The stages model the shipped modules faithfully: content stages append a
//! distinctive trailer to the bytecode, and a final marker stage stamps the
//! idempotency trailer the probe looks for. Because only the marker stage
//! writes the marker, an artifact from a crashed partial run (content
//! trailer present, marker absent) is never reported as patched.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use netweave_modules::{
    Artifact, Diagnostic, MarkerProbe, Severity, StageFailure, StageOutput, SymbolStore,
    TransformStage, WeaverModule,
};

/// Trailer appended by the content stage.
pub const CONTENT_TRAILER: &[u8] = b"[netweave:content]";

/// Idempotency marker appended by the final stage of a complete run.
pub const MARKER_TRAILER: &[u8] = b"[netweave:patched]";

fn append(artifact: &Artifact, trailer: &[u8]) -> Artifact {
    let mut bytecode = artifact.bytecode().to_vec();
    bytecode.extend_from_slice(trailer);
    let symbols = match artifact.symbols() {
        SymbolStore::Embedded => Vec::new(),
        SymbolStore::External(buffer) => buffer.clone(),
    };
    artifact.with_buffers(bytecode, symbols)
}

/// Appends [`CONTENT_TRAILER`]; declines artifacts that already carry it.
pub struct ContentStage;

impl TransformStage for ContentStage {
    fn name(&self) -> &str {
        "append-content"
    }

    fn applies(&self, artifact: &Artifact) -> bool {
        !artifact
            .bytecode()
            .windows(CONTENT_TRAILER.len())
            .any(|window| window == CONTENT_TRAILER)
    }

    fn transform(&self, artifact: &Artifact) -> Result<StageOutput, StageFailure> {
        Ok(StageOutput::clean(append(artifact, CONTENT_TRAILER)))
    }
}

/// Always applies; stamps [`MARKER_TRAILER`] as the final chain stage.
pub struct MarkerStage;

impl TransformStage for MarkerStage {
    fn name(&self) -> &str {
        "apply-patched-marker"
    }

    fn applies(&self, _artifact: &Artifact) -> bool {
        true
    }

    fn transform(&self, artifact: &Artifact) -> Result<StageOutput, StageFailure> {
        Ok(StageOutput::clean(append(artifact, MARKER_TRAILER)))
    }
}

/// Applies and reports an `Error`-severity diagnostic without transforming.
pub struct ErroringStage;

impl TransformStage for ErroringStage {
    fn name(&self) -> &str {
        "erroring-stage"
    }

    fn applies(&self, _artifact: &Artifact) -> bool {
        true
    }

    fn transform(&self, artifact: &Artifact) -> Result<StageOutput, StageFailure> {
        Ok(StageOutput {
            artifact: artifact.clone(),
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "unserialisable network variable",
                Some("Plugin.cs".into()),
                Some(12),
            )],
        })
    }
}

/// Applies, transforms, and emits a warning diagnostic.
pub struct WarningStage;

impl TransformStage for WarningStage {
    fn name(&self) -> &str {
        "warning-stage"
    }

    fn applies(&self, _artifact: &Artifact) -> bool {
        true
    }

    fn transform(&self, artifact: &Artifact) -> Result<StageOutput, StageFailure> {
        Ok(StageOutput {
            artifact: append(artifact, CONTENT_TRAILER),
            diagnostics: vec![Diagnostic::new(
                Severity::Warning,
                "field will not replicate||  mark it [NetsyncIgnore]",
                None,
                None,
            )],
        })
    }
}

/// Never applies.
pub struct DecliningStage;

impl TransformStage for DecliningStage {
    fn name(&self) -> &str {
        "declining-stage"
    }

    fn applies(&self, _artifact: &Artifact) -> bool {
        false
    }

    fn transform(&self, artifact: &Artifact) -> Result<StageOutput, StageFailure> {
        Ok(StageOutput::clean(artifact.clone()))
    }
}

/// Reports patched exactly when the bytecode ends with [`MARKER_TRAILER`].
pub struct TrailerProbe;

impl MarkerProbe for TrailerProbe {
    fn is_patched(&self, artifact: &Artifact) -> Result<bool, StageFailure> {
        Ok(artifact.bytecode().ends_with(MARKER_TRAILER))
    }
}

/// The standard two-stage test module: content then marker.
pub fn weaving_module() -> WeaverModule {
    WeaverModule::new(
        "test-weaver",
        vec![Box::new(ContentStage), Box::new(MarkerStage)],
        Box::new(TrailerProbe),
    )
}

/// A module whose middle stage reports an error diagnostic.
pub fn erroring_module() -> WeaverModule {
    WeaverModule::new(
        "test-weaver-erroring",
        vec![
            Box::new(ContentStage),
            Box::new(ErroringStage),
            Box::new(MarkerStage),
        ],
        Box::new(TrailerProbe),
    )
}

/// A module whose content stages all decline; only the marker stage runs.
pub fn declining_module() -> WeaverModule {
    WeaverModule::new(
        "test-weaver-declining",
        vec![Box::new(DecliningStage), Box::new(MarkerStage)],
        Box::new(TrailerProbe),
    )
}

/// Writes `name.dll` plus a sibling `name.pdb` into `dir` and returns the
/// assembly path.
pub fn place_assembly(dir: &Path, name: &str, bytecode: &[u8]) -> PathBuf {
    let assembly = dir.join(format!("{name}.dll"));
    fs::write(&assembly, bytecode).expect("write assembly");
    fs::write(
        dir.join(format!("{name}.pdb")),
        format!("symbols-of-{name}").as_bytes(),
    )
    .expect("write symbols");
    assembly
}

/// A fresh temporary plugin directory.
pub fn plugin_dir() -> TempDir {
    TempDir::new().expect("create temp plugin dir")
}
