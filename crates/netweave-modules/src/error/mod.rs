//! Domain errors raised while resolving and loading weaver modules.
//!
//! All variants carry the version tuple in string form so a failure names
//! the exact configuration that could not be served. Module errors are fatal
//! for the whole run: they occur before any assembly is touched.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the isolation loader.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// No weaver module exists at the path the tuple resolves to.
    #[error(
        "unsupported configuration: no weaver module for {tuple} (looked for {})",
        module_file.display()
    )]
    UnsupportedConfiguration {
        /// String form of the requested version tuple.
        tuple: String,
        /// The module library path that was probed.
        module_file: PathBuf,
    },

    /// The module manifest sidecar is missing or invalid.
    #[error("invalid module manifest for {tuple}: {message}")]
    Manifest {
        /// String form of the requested version tuple.
        tuple: String,
        /// Description of the manifest problem.
        message: String,
    },

    /// A declared module dependency resolved nowhere in the scope chain.
    #[error("dependency '{name}' not found for {tuple}")]
    DependencyNotFound {
        /// The dependency name that failed to resolve.
        name: String,
        /// String form of the requested version tuple.
        tuple: String,
    },

    /// The dynamic library could not be opened.
    #[error("failed to load '{}' for {tuple}: {message}", library.display())]
    Load {
        /// The library that failed to open.
        library: PathBuf,
        /// String form of the requested version tuple.
        tuple: String,
        /// Loader description of the failure.
        message: String,
    },

    /// The module library does not export the expected entry symbol.
    #[error("weaver module for {tuple} does not export '{symbol}': {message}")]
    MissingEntrySymbol {
        /// The symbol that was looked up.
        symbol: String,
        /// String form of the requested version tuple.
        tuple: String,
        /// Loader description of the failure.
        message: String,
    },

    /// The module speaks a different bridge ABI revision.
    #[error("weaver module for {tuple} has ABI revision {found}, host expects {expected}")]
    AbiMismatch {
        /// Revision reported by the module.
        found: u32,
        /// Revision this host was built against.
        expected: u32,
        /// String form of the requested version tuple.
        tuple: String,
    },
}

#[cfg(test)]
mod tests;
