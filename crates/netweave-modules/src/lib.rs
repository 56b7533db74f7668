//! Weaver module loading and the transformation stage contract.
//!
//! The `netweave-modules` crate owns the two halves of the version-isolation
//! problem. The *loader* half ([`registry`], [`scope`], [`dynamic`]) maps a
//! [`netweave_config::VersionTuple`] to a loaded [`WeaverModule`]: one
//! dynamic library per tuple, opened into a private symbol scope whose
//! dependency resolution never leaks into another tuple's scope, with a short
//! allow-list of crosscutting libraries promoted to the shared process scope
//! instead. The *contract* half ([`artifact`], [`stage`], [`manifest`])
//! defines what a loaded module exposes: an ordered list of
//! [`TransformStage`] capabilities and an idempotency probe that recognises
//! assemblies a prior complete run has already woven.
//!
//! Stage capabilities are a fixed list built at module-load time from the
//! module's exported vtable; nothing is discovered by scanning loaded code at
//! run time.

pub mod artifact;
pub mod dynamic;
pub mod error;
pub mod manifest;
pub mod registry;
pub mod scope;
pub mod stage;

pub use self::artifact::{Artifact, SymbolStore};
pub use self::dynamic::DynamicModuleLoader;
pub use self::error::ModuleError;
pub use self::manifest::ModuleManifest;
pub use self::registry::{ModuleLoader, ModuleRegistry, WeaverModule};
pub use self::stage::{
    Diagnostic, MarkerProbe, Severity, StageFailure, StageOutput, TransformStage,
};
