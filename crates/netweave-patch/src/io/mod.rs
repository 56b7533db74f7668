//! Artifact I/O: reading assemblies with their symbol stores, writing woven
//! output, and the path arithmetic for symbol siblings and backups.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

use netweave_modules::{Artifact, SymbolStore};

use crate::error::PatchError;

/// Tracing target for artifact I/O.
const IO_TARGET: &str = "netweave_patch::io";

/// Magic bytes of an embedded portable symbol blob inside a managed
/// assembly.
const EMBEDDED_SYMBOL_MAGIC: &[u8; 4] = b"MPDB";

/// Suffix appended to a file stem to form its backup name.
pub const BACKUP_SUFFIX: &str = "-original";

/// Returns the external symbol path for an assembly path
/// (`Plugin.dll` → `Plugin.pdb`).
#[must_use]
pub fn symbol_sibling(path: &Path) -> PathBuf {
    path.with_extension("pdb")
}

/// Returns the backup path for a file (`Plugin.dll` → `Plugin-original.dll`).
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default();
    let file_name = match path.extension().and_then(OsStr::to_str) {
        Some(extension) => format!("{stem}{BACKUP_SUFFIX}.{extension}"),
        None => format!("{stem}{BACKUP_SUFFIX}"),
    };
    path.with_file_name(file_name)
}

/// Whether a file stem marks a backup left by a previous run.
#[must_use]
pub fn is_backup_stem(stem: &str) -> bool {
    stem.ends_with(BACKUP_SUFFIX)
}

/// Whether the bytecode buffer carries an embedded portable symbol store.
#[must_use]
pub fn has_embedded_symbols(bytecode: &[u8]) -> bool {
    bytecode
        .windows(EMBEDDED_SYMBOL_MAGIC.len())
        .any(|window| window == EMBEDDED_SYMBOL_MAGIC)
}

/// Reads an assembly and its symbol store from disk.
///
/// The symbol policy is deliberately strict: an assembly with neither a
/// sibling `.pdb` nor embedded symbols fails its transaction rather than
/// being woven without debug information.
///
/// # Errors
///
/// Returns [`PatchError::Read`] for I/O failures,
/// [`PatchError::InvalidName`] for paths without a file stem, and
/// [`PatchError::SymbolsNotFound`] when no symbol store can be located.
pub fn read_artifact(path: &Path, references: &[PathBuf]) -> Result<Artifact, PatchError> {
    let name = path
        .file_stem()
        .and_then(OsStr::to_str)
        .ok_or_else(|| PatchError::InvalidName {
            path: path.to_path_buf(),
        })?
        .to_owned();

    debug!(target: IO_TARGET, assembly = name.as_str(), "reading assembly");
    let bytecode =
        std::fs::read(path).map_err(|err| PatchError::read(path.to_path_buf(), err))?;

    let symbol_path = symbol_sibling(path);
    let symbols = if symbol_path.is_file() {
        let buffer = std::fs::read(&symbol_path)
            .map_err(|err| PatchError::read(symbol_path.clone(), err))?;
        SymbolStore::External(buffer)
    } else if has_embedded_symbols(&bytecode) {
        SymbolStore::Embedded
    } else {
        return Err(PatchError::SymbolsNotFound {
            assembly: name,
            expected: symbol_path,
        });
    };

    Ok(Artifact::new(name, bytecode, symbols, references.to_vec()))
}

/// Writes an artifact's buffers to the output path.
///
/// External symbol stores are written together with the bytecode as a
/// sibling `.pdb`; embedded stores travel inside the bytecode buffer and
/// produce no sibling file.
///
/// # Errors
///
/// Returns [`PatchError::Write`] when any file cannot be written.
pub fn write_artifact(artifact: &Artifact, output: &Path) -> Result<(), PatchError> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|err| PatchError::write(output.to_path_buf(), err))?;
        }
    }
    std::fs::write(output, artifact.bytecode())
        .map_err(|err| PatchError::write(output.to_path_buf(), err))?;

    if let SymbolStore::External(buffer) = artifact.symbols() {
        let symbol_path = symbol_sibling(output);
        std::fs::write(&symbol_path, buffer)
            .map_err(|err| PatchError::write(symbol_path.clone(), err))?;
    }
    Ok(())
}

/// Removes a file if it exists; missing files are not an error.
pub(crate) fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests;
