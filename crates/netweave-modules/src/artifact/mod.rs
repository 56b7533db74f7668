//! In-memory representation of a managed assembly under transformation.

use std::path::PathBuf;

/// Where an assembly's debug symbols live.
///
/// Bytecode and symbol buffers travel together through the stage chain
/// except when the store is embedded, in which case the symbols are part of
/// the bytecode buffer itself and only that buffer is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolStore {
    /// Symbols are embedded in the bytecode buffer.
    Embedded,
    /// Symbols live in a sibling file; the buffer is carried alongside the
    /// bytecode for the whole transaction.
    External(Vec<u8>),
}

impl SymbolStore {
    /// Returns `true` for the embedded variant.
    #[must_use]
    pub const fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded)
    }
}

/// A managed assembly held in memory by exactly one patch transaction.
///
/// Produced by reading from disk or as the output of a prior
/// [`TransformStage`](crate::stage::TransformStage); a stage's output
/// artifact becomes the next stage's input. Artifacts are never shared
/// between assemblies or concurrent transactions.
///
/// # Example
///
/// ```
/// use netweave_modules::{Artifact, SymbolStore};
///
/// let artifact = Artifact::new("PluginA", vec![0x4d, 0x5a], SymbolStore::Embedded, vec![]);
/// assert_eq!(artifact.name(), "PluginA");
/// assert!(artifact.symbols().is_embedded());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    name: String,
    bytecode: Vec<u8>,
    symbols: SymbolStore,
    references: Vec<PathBuf>,
}

impl Artifact {
    /// Creates an artifact from its parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        bytecode: Vec<u8>,
        symbols: SymbolStore,
        references: Vec<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            bytecode,
            symbols,
            references,
        }
    }

    /// Logical assembly name (the file stem of the input path).
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The bytecode buffer.
    #[must_use]
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// The debug-symbol store.
    #[must_use]
    pub const fn symbols(&self) -> &SymbolStore {
        &self.symbols
    }

    /// Reference search paths the stages resolve against.
    #[must_use]
    pub fn references(&self) -> &[PathBuf] {
        &self.references
    }

    /// Returns a successor artifact with replaced buffers, keeping the name
    /// and reference paths of this one. The symbol store kind is preserved:
    /// an embedded store stays embedded regardless of `symbols`.
    #[must_use]
    pub fn with_buffers(&self, bytecode: Vec<u8>, symbols: Vec<u8>) -> Self {
        let store = match self.symbols {
            SymbolStore::Embedded => SymbolStore::Embedded,
            SymbolStore::External(_) => SymbolStore::External(symbols),
        };
        Self {
            name: self.name.clone(),
            bytecode,
            symbols: store,
            references: self.references.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
