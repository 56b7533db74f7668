//! Per-assembly patch transactions and the batch concurrency driver.
//!
//! A [`transaction`] takes one assembly through
//! read → marker check → denylist check → backup → stage chain → write →
//! commit, rolling the filesystem back to its pre-transaction state on any
//! failure once the backup anchor exists. The [`batch`] driver fans a set of
//! requests across transactions, sequentially or in parallel, and aggregates
//! every [`Outcome`] into a [`BatchReport`]. The driver attempts every
//! request; it never fails fast.

pub mod batch;
pub mod error;
pub mod io;
pub mod outcome;
pub mod transaction;

#[cfg(test)]
mod tests;

pub use self::batch::BatchReport;
pub use self::error::PatchError;
pub use self::outcome::{AssemblyOutcome, BatchSummary, FailureKind, Outcome};
pub use self::transaction::{ASSEMBLY_DENYLIST, PatchRequest, patch_assembly};
