//! Discovery of patchable assemblies and reference search paths.
//!
//! Directory inputs are walked recursively. Backups left by earlier runs and
//! runtime-hook assemblies are skipped up front so they never enter a
//! transaction at all.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use netweave_patch::io::is_backup_stem;

/// Tracing target for input discovery.
const DISCOVER_TARGET: &str = "netweave_cli::discover";

/// Assemblies whose name contains this fragment hook into the runtime at
/// load time and must never be woven.
const RUNTIME_HOOK_FRAGMENT: &str = "mmhook";

/// Errors raised while scanning inputs.
#[derive(Debug, Error)]
pub enum DiscoverError {
    /// The input path does not exist.
    #[error("input path '{path}' does not exist")]
    Missing {
        /// The path that was not found.
        path: PathBuf,
    },
    /// A directory could not be read.
    #[error("failed to scan '{path}': {source}")]
    Scan {
        /// The directory that failed to enumerate.
        path: PathBuf,
        /// The underlying filesystem error.
        source: io::Error,
    },
}

/// Collects the assemblies to patch from a file or directory input.
///
/// A directory input is walked recursively for `*.dll` files. Backup files
/// from earlier runs and runtime-hook assemblies are skipped everywhere,
/// even when named explicitly as the input. Results are sorted so batch
/// order is deterministic.
///
/// # Errors
///
/// Returns [`DiscoverError`] when the input is missing or a directory
/// cannot be enumerated.
pub fn collect_assemblies(input: &Path) -> Result<Vec<PathBuf>, DiscoverError> {
    if input.is_file() {
        if is_patchable_assembly(input) {
            return Ok(vec![input.to_path_buf()]);
        }
        warn!(
            target: DISCOVER_TARGET,
            path = %input.display(),
            "input is not a patchable assembly; nothing to do",
        );
        return Ok(Vec::new());
    }
    if !input.is_dir() {
        return Err(DiscoverError::Missing {
            path: input.to_path_buf(),
        });
    }
    let mut found = Vec::new();
    walk_assemblies(input, &mut found)?;
    found.sort();
    Ok(found)
}

/// Collects reference search paths from dependency files and directories.
///
/// Dependency files contribute themselves; directories contribute every
/// `*.dll` beneath them. Missing dependency paths are skipped with a log
/// line rather than failing the run.
///
/// # Errors
///
/// Returns [`DiscoverError::Scan`] when a dependency directory cannot be
/// enumerated.
pub fn collect_references(dependencies: &[PathBuf]) -> Result<Vec<PathBuf>, DiscoverError> {
    let mut references = Vec::new();
    for dependency in dependencies {
        if dependency.is_file() {
            references.push(dependency.clone());
        } else if dependency.is_dir() {
            walk_references(dependency, &mut references)?;
        } else {
            debug!(
                target: DISCOVER_TARGET,
                path = %dependency.display(),
                "skipping missing dependency path",
            );
        }
    }
    references.sort();
    Ok(references)
}

fn walk_assemblies(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), DiscoverError> {
    for entry in read_dir(dir)? {
        let entry = entry.map_err(|source| DiscoverError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            walk_assemblies(&path, found)?;
        } else if is_patchable_assembly(&path) {
            found.push(path);
        }
    }
    Ok(())
}

fn walk_references(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), DiscoverError> {
    for entry in read_dir(dir)? {
        let entry = entry.map_err(|source| DiscoverError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            walk_references(&path, found)?;
        } else if has_assembly_extension(&path) {
            found.push(path);
        }
    }
    Ok(())
}

fn read_dir(dir: &Path) -> Result<std::fs::ReadDir, DiscoverError> {
    std::fs::read_dir(dir).map_err(|source| DiscoverError::Scan {
        path: dir.to_path_buf(),
        source,
    })
}

fn has_assembly_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dll"))
}

fn is_patchable_assembly(path: &Path) -> bool {
    if !has_assembly_extension(path) {
        return false;
    }
    let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
        return false;
    };
    if is_backup_stem(stem) {
        debug!(
            target: DISCOVER_TARGET,
            path = %path.display(),
            "skipping backup from an earlier run",
        );
        return false;
    }
    if stem.to_ascii_lowercase().contains(RUNTIME_HOOK_FRAGMENT) {
        debug!(
            target: DISCOVER_TARGET,
            path = %path.display(),
            "skipping runtime-hook assembly",
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests;
