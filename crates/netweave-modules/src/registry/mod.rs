//! The loaded-module handle and the process-wide module registry.
//!
//! [`WeaverModule`] is the callable representation of one version's weaver:
//! an ordered stage list plus the idempotency probe. [`ModuleRegistry`]
//! guarantees at most one handle per distinct tuple per process run; handles
//! live for the process lifetime and are never unloaded.
//!
//! Loading sits behind the [`ModuleLoader`] trait so tests can register
//! in-process modules without shipping dynamic libraries, mirroring how
//! production code goes through
//! [`DynamicModuleLoader`](crate::dynamic::DynamicModuleLoader).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use netweave_config::VersionTuple;
use tracing::debug;

use crate::artifact::Artifact;
use crate::error::ModuleError;
use crate::stage::{MarkerProbe, StageFailure, TransformStage};

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = "netweave_modules::registry";

/// A loaded weaver module: the fixed-order transformation chain for one
/// version tuple.
pub struct WeaverModule {
    name: String,
    stages: Vec<Box<dyn TransformStage>>,
    marker: Box<dyn MarkerProbe>,
}

impl WeaverModule {
    /// Assembles a module handle from its capabilities.
    ///
    /// Stage order is fixed at construction and significant: later stages
    /// may rely on markers left by earlier ones, and the final stage stamps
    /// the idempotency marker.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        stages: Vec<Box<dyn TransformStage>>,
        marker: Box<dyn MarkerProbe>,
    ) -> Self {
        Self {
            name: name.into(),
            stages,
            marker,
        }
    }

    /// Module name, for logging.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The transformation chain, in application order.
    #[must_use]
    pub fn stages(&self) -> &[Box<dyn TransformStage>] {
        &self.stages
    }

    /// Whether a prior complete run already wove this artifact.
    ///
    /// # Errors
    ///
    /// Returns a [`StageFailure`] when the module cannot inspect the
    /// artifact.
    pub fn is_patched(&self, artifact: &Artifact) -> Result<bool, StageFailure> {
        self.marker.is_patched(artifact)
    }
}

impl std::fmt::Debug for WeaverModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaverModule")
            .field("name", &self.name)
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

/// Loads the weaver module for a version tuple.
pub trait ModuleLoader: Send + Sync {
    /// Loads the module, resolving its dependencies in isolation.
    ///
    /// # Errors
    ///
    /// Returns a [`ModuleError`] when the tuple is unsupported or a
    /// dependency cannot be located.
    fn load(&self, tuple: &VersionTuple) -> Result<WeaverModule, ModuleError>;
}

/// Process-wide cache of loaded modules, one handle per version tuple.
///
/// The cache is check-then-act: a lookup miss releases the lock for the
/// duration of the load, so two threads racing on the same previously
/// unseen tuple may both load it. The loser's handle is dropped and the
/// winner's is returned to both, which keeps the "at most one handle per
/// tuple" invariant observable while never blocking one tuple's first load
/// on another's.
pub struct ModuleRegistry<L> {
    loader: L,
    modules: Mutex<HashMap<VersionTuple, Arc<WeaverModule>>>,
}

impl<L> ModuleRegistry<L> {
    /// Creates an empty registry around a loader.
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            modules: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct tuples loaded so far.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.guard().len()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<VersionTuple, Arc<WeaverModule>>> {
        // Entries are only ever inserted, so a poisoned map is still valid.
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<L: ModuleLoader> ModuleRegistry<L> {
    /// Returns the module handle for `tuple`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the loader's [`ModuleError`] when the tuple cannot be
    /// served. Failed loads are not cached; a later call retries.
    pub fn module_for(&self, tuple: &VersionTuple) -> Result<Arc<WeaverModule>, ModuleError> {
        if let Some(module) = self.guard().get(tuple) {
            return Ok(Arc::clone(module));
        }

        debug!(target: REGISTRY_TARGET, %tuple, "loading weaver module");
        let loaded = Arc::new(self.loader.load(tuple)?);

        let mut modules = self.guard();
        let module = modules.entry(*tuple).or_insert(loaded);
        Ok(Arc::clone(module))
    }
}
