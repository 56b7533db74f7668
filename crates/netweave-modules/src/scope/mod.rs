//! Dependency scope chain and the shared-promotion list.
//!
//! Every version tuple gets a private resolution scope, but a short
//! allow-list of crosscutting libraries is shared with the process default
//! scope so singleton state (the logging bridge above all) exists once
//! instead of once per tuple. Resolution order for a dependency name:
//!
//! 1. already promoted to the shared scope: reuse it;
//! 2. on the allow-list: load into the shared scope and promote for every
//!    future isolation scope;
//! 3. the tuple's version-specific directory;
//! 4. the tuple's common directory;
//! 5. nowhere, and resolution fails.
//!
//! Promotion is the only mutable shared state and it is one-way: names are
//! inserted, never removed, so concurrent first-use for different tuples can
//! at worst duplicate a load, never corrupt the scope.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use netweave_config::{ModulePaths, paths::shared_library_file_name};

/// Crosscutting dependency names shared with the process default scope.
///
/// `netweave_log_bridge` funnels module-side log events into the host's
/// sink; loading one copy per tuple would split that sink's state.
pub const SHARED_DEPENDENCIES: &[&str] = &["netweave_log_bridge"];

/// The process-wide record of names promoted into the default scope.
#[derive(Debug, Default)]
pub struct SharedScope {
    promoted: Mutex<HashSet<String>>,
}

impl SharedScope {
    /// Creates an empty shared scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` has been promoted into the default scope.
    #[must_use]
    pub fn is_promoted(&self, name: &str) -> bool {
        self.guard().contains(name)
    }

    /// Records `name` as promoted. Returns `true` on first promotion,
    /// `false` when the name was already present.
    pub fn promote(&self, name: &str) -> bool {
        self.guard().insert(name.to_owned())
    }

    /// Number of promoted names.
    #[must_use]
    pub fn promoted_count(&self) -> usize {
        self.guard().len()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // The set is insert-only, so a poisoned guard still holds a
        // consistent value.
        self.promoted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Where the scope chain found a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already loaded in the shared default scope; reuse it.
    SharedExisting,
    /// Allow-listed: load from this path into the shared scope and promote.
    SharedPromote(PathBuf),
    /// Load from this path into the tuple's private scope.
    Isolated(PathBuf),
}

/// Resolves dependency names for one tuple's load.
#[derive(Debug)]
pub struct ScopeChain<'scope> {
    version_dir: PathBuf,
    common_dir: PathBuf,
    shared: &'scope SharedScope,
}

impl<'scope> ScopeChain<'scope> {
    /// Creates a chain over the tuple's resolved directories.
    #[must_use]
    pub fn new(paths: &ModulePaths, shared: &'scope SharedScope) -> Self {
        Self {
            version_dir: paths.version_dir().as_std_path().to_path_buf(),
            common_dir: paths.common_dir().as_std_path().to_path_buf(),
            shared,
        }
    }

    /// Resolves a dependency name, or `None` when it is found nowhere.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Resolution> {
        if self.shared.is_promoted(name) {
            return Some(Resolution::SharedExisting);
        }
        if SHARED_DEPENDENCIES.contains(&name) {
            return self.locate(name).map(Resolution::SharedPromote);
        }
        self.locate(name).map(Resolution::Isolated)
    }

    /// Probes the version-specific directory, then the common directory,
    /// for the platform file name of `name`.
    #[must_use]
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let file_name = shared_library_file_name(name);
        [&self.version_dir, &self.common_dir]
            .into_iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
    }

    /// The version-specific directory this chain probes first.
    #[must_use]
    pub fn version_dir(&self) -> &Path {
        &self.version_dir
    }

    /// The common directory this chain probes second.
    #[must_use]
    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }
}

#[cfg(test)]
mod tests;
