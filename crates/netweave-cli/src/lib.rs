//! Command-line runtime for the netweave assembly weaver.
//!
//! The crate owns argument parsing, telemetry bootstrapping, input
//! discovery, and the wiring from a resolved version tuple to a batch of
//! patch transactions. The binary entrypoint delegates everything to
//! [`run`] so the runtime can also be exercised from integration tests.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::{error, info};

use netweave_modules::{DynamicModuleLoader, ModuleError, ModuleRegistry, WeaverModule};
use netweave_patch::{BatchReport, PatchRequest, batch};

pub mod args;
pub mod discover;
pub mod telemetry;

pub use args::Args;
use discover::DiscoverError;

/// Tracing target for the CLI runtime.
const CLI_TARGET: &str = "netweave_cli";

/// Errors that end a run before any transaction starts.
#[derive(Debug, Error)]
enum CliError {
    /// The modules directory could not be determined.
    #[error("failed to locate the modules directory: {0}")]
    ModulesDir(String),
    /// The weaver module for the requested tuple could not be loaded.
    #[error(transparent)]
    Module(#[from] ModuleError),
    /// Input discovery failed.
    #[error(transparent)]
    Discover(#[from] DiscoverError),
    /// A single output file was requested for more than one input.
    #[error("output '{output}' is a file path but {inputs} assemblies were discovered")]
    OutputConflict {
        /// The requested output path.
        output: PathBuf,
        /// How many assemblies the input scan produced.
        inputs: usize,
    },
}

/// Runs the full patcher pipeline and maps the result to an exit code.
///
/// The batch driver attempts every assembly; the exit code is a failure
/// exactly when at least one transaction failed or the pipeline could not
/// start at all.
#[must_use]
pub fn run(args: &Args) -> ExitCode {
    if let Err(err) = telemetry::initialise(&args.log_level, args.log_file.as_deref()) {
        // Telemetry is not up yet, so report the failure directly.
        let mut stderr = std::io::stderr().lock();
        #[expect(
            clippy::let_underscore_must_use,
            reason = "a failed stderr write has no remaining sink to report to"
        )]
        let _ = writeln!(stderr, "netweave: {err}");
        return ExitCode::FAILURE;
    }

    match execute(args) {
        Ok(report) if report.failed() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target: CLI_TARGET, error = %err, "run aborted");
            ExitCode::FAILURE
        }
    }
}

fn execute(args: &Args) -> Result<BatchReport, CliError> {
    let tuple = args.version_tuple();
    let modules_root = modules_root(args)?;
    info!(
        target: CLI_TARGET,
        %tuple,
        modules_root = %modules_root,
        "loading weaver module",
    );

    let registry = ModuleRegistry::new(DynamicModuleLoader::new(modules_root));
    let module = registry.module_for(&tuple)?;

    let assemblies = discover::collect_assemblies(&args.input)?;
    let references = discover::collect_references(&args.dependencies)?;
    let requests = build_requests(&assemblies, references, args.output.as_deref())?;
    info!(
        target: CLI_TARGET,
        module = module.name(),
        assemblies = requests.len(),
        "starting batch",
    );

    let report = batch::run(&module, &requests, !args.disable_parallel);
    report_outcomes(&module, &report);
    Ok(report)
}

/// Resolves the directory holding the shipped weaver modules.
///
/// Defaults to the executable's own directory, matching how module
/// variants are laid out next to the installed binary.
fn modules_root(args: &Args) -> Result<Utf8PathBuf, CliError> {
    if let Some(dir) = &args.modules_dir {
        return Ok(dir.clone());
    }
    let exe = std::env::current_exe()
        .map_err(|err| CliError::ModulesDir(err.to_string()))?;
    let dir = exe
        .parent()
        .ok_or_else(|| CliError::ModulesDir(String::from("executable has no parent directory")))?
        .to_path_buf();
    Utf8PathBuf::from_path_buf(dir)
        .map_err(|dir| CliError::ModulesDir(format!("non-UTF-8 path '{}'", dir.display())))
}

/// Builds one patch request per discovered assembly.
///
/// Without `--output` every assembly is patched in place. An output path
/// with an extension is a single-file target and only valid for a single
/// input; anything else is treated as a directory the woven copies land in.
fn build_requests(
    assemblies: &[PathBuf],
    references: Vec<PathBuf>,
    output: Option<&Path>,
) -> Result<Vec<PatchRequest>, CliError> {
    let Some(output) = output else {
        return Ok(assemblies
            .iter()
            .map(|input| PatchRequest::in_place(input.clone(), references.clone()))
            .collect());
    };

    if output.extension().is_some() {
        let [input] = assemblies else {
            return Err(CliError::OutputConflict {
                output: output.to_path_buf(),
                inputs: assemblies.len(),
            });
        };
        return Ok(vec![PatchRequest::with_output(
            input.clone(),
            output.to_path_buf(),
            references,
        )]);
    }

    Ok(assemblies
        .iter()
        .map(|input| {
            let target = input
                .file_name()
                .map_or_else(|| output.to_path_buf(), |name| output.join(name));
            PatchRequest::with_output(input.clone(), target, references.clone())
        })
        .collect())
}

fn report_outcomes(module: &WeaverModule, report: &BatchReport) {
    for entry in report.outcomes() {
        if entry.outcome.is_failure() {
            error!(
                target: CLI_TARGET,
                assembly = entry.assembly.as_str(),
                "{}",
                entry.outcome,
            );
        } else {
            info!(
                target: CLI_TARGET,
                assembly = entry.assembly.as_str(),
                "{}",
                entry.outcome,
            );
        }
    }
    let summary = report.summary();
    info!(
        target: CLI_TARGET,
        module = module.name(),
        patched = summary.patched,
        skipped = summary.skipped,
        failed = summary.failed,
        elapsed = ?summary.elapsed,
        "batch complete",
    );
}

#[cfg(test)]
mod tests;
