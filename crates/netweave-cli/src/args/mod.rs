//! Command-line argument surface.
//!
//! Argument *semantics* stay out of the core crates: this module only turns
//! flags into the version tuple, the input set, and the batch options the
//! orchestrator consumes.

use std::path::PathBuf;

use camino::Utf8PathBuf;
use clap::Parser;

use netweave_config::{Version, VersionTuple};

/// Weaves netsync runtime plumbing into compiled plugin assemblies.
#[derive(Debug, Clone, Parser)]
#[command(name = "netweave", version, about)]
pub struct Args {
    /// Assembly file or directory to patch (directories are scanned
    /// recursively for `*.dll`).
    pub input: PathBuf,

    /// Dependency files or directories to resolve references against.
    pub dependencies: Vec<PathBuf>,

    /// Host engine version the plugins target.
    #[arg(long, default_value = "2022.3.9")]
    pub host_version: Version,

    /// Netsync library version the plugins target.
    #[arg(long, default_value = "1.5.2")]
    pub netsync_version: Version,

    /// Transport version the plugins target.
    #[arg(long, default_value = "2.0.0")]
    pub transport_version: Version,

    /// Select the module variant built with native-collection support.
    #[arg(long)]
    pub native_collections: bool,

    /// Write woven output here instead of overwriting the inputs.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Patch assemblies one at a time instead of in parallel.
    #[arg(long)]
    pub disable_parallel: bool,

    /// Directory holding the shipped weaver modules (defaults to the
    /// executable's directory).
    #[arg(long)]
    pub modules_dir: Option<Utf8PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Also write logs to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// The version tuple selecting which weaver module loads.
    #[must_use]
    pub const fn version_tuple(&self) -> VersionTuple {
        VersionTuple::new(
            self.host_version,
            self.netsync_version,
            self.transport_version,
            self.native_collections,
        )
    }
}
