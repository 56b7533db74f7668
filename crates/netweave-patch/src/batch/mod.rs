//! Fan-out of a batch of assemblies across patch transactions.
//!
//! The driver attempts every request regardless of earlier failures, then
//! aggregates per-assembly outcomes. With parallelism enabled and more than
//! one request, each transaction runs on its own scoped worker thread; the
//! only shared state is the read-only module handle, and no two requests
//! ever target the same path, so workers never contend.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use netweave_modules::WeaverModule;

use crate::outcome::{AssemblyOutcome, BatchSummary, FailureKind, Outcome};
use crate::transaction::{PatchRequest, patch_assembly};

/// Tracing target for batch orchestration.
const BATCH_TARGET: &str = "netweave_patch::batch";

/// Aggregated result of one batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    outcomes: Vec<AssemblyOutcome>,
    elapsed: Duration,
}

impl BatchReport {
    /// Per-assembly outcomes, in input order for sequential runs.
    #[must_use]
    pub fn outcomes(&self) -> &[AssemblyOutcome] {
        &self.outcomes
    }

    /// Total number of assemblies attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Wall-clock duration of the whole batch.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether the batch failed: true exactly when any transaction ended in
    /// a failure outcome. Skips never fail a batch.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.outcomes.iter().any(|entry| entry.outcome.is_failure())
    }

    /// Outcome counts plus elapsed time, for the end-of-run summary.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        let mut patched = 0;
        let mut skipped = 0;
        let mut failed = 0;
        for entry in &self.outcomes {
            match &entry.outcome {
                Outcome::Success => patched += 1,
                Outcome::SkippedAlreadyPatched | Outcome::SkippedBlacklisted => skipped += 1,
                Outcome::Failed { .. } => failed += 1,
            }
        }
        BatchSummary {
            patched,
            skipped,
            failed,
            elapsed: self.elapsed,
        }
    }
}

/// Runs every request against the module's chain and aggregates outcomes.
///
/// `parallel` is honoured only for batches of more than one request; a
/// single assembly always runs on the calling thread.
#[must_use]
pub fn run(module: &WeaverModule, requests: &[PatchRequest], parallel: bool) -> BatchReport {
    let started = Instant::now();
    info!(
        target: BATCH_TARGET,
        count = requests.len(),
        parallel = parallel && requests.len() > 1,
        "patching batch"
    );

    let outcomes = if parallel && requests.len() > 1 {
        run_parallel(module, requests)
    } else {
        requests
            .iter()
            .map(|request| attempt(module, request))
            .collect()
    };

    BatchReport {
        outcomes,
        elapsed: started.elapsed(),
    }
}

fn run_parallel(module: &WeaverModule, requests: &[PatchRequest]) -> Vec<AssemblyOutcome> {
    std::thread::scope(|scope| {
        let workers: Vec<_> = requests
            .iter()
            .map(|request| scope.spawn(move || attempt(module, request)))
            .collect();
        workers
            .into_iter()
            .zip(requests)
            .map(|(worker, request)| {
                worker.join().unwrap_or_else(|_| {
                    // A panicking stage must not take the batch down with it.
                    warn!(
                        target: BATCH_TARGET,
                        assembly = request.assembly_name().as_str(),
                        "transaction worker panicked"
                    );
                    AssemblyOutcome {
                        assembly: request.assembly_name(),
                        outcome: Outcome::Failed {
                            kind: FailureKind::Unrecoverable,
                            reason: String::from("transaction worker panicked"),
                        },
                    }
                })
            })
            .collect()
    })
}

fn attempt(module: &WeaverModule, request: &PatchRequest) -> AssemblyOutcome {
    AssemblyOutcome {
        assembly: request.assembly_name(),
        outcome: patch_assembly(module, request),
    }
}
