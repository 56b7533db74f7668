//! Command-line entrypoint for the netweave assembly patcher.
//!
//! The binary delegates to [`netweave_cli::run`], which installs telemetry,
//! loads the weaver module for the requested version tuple, and drives the
//! batch of patch transactions.

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    netweave_cli::run(&netweave_cli::Args::parse())
}
