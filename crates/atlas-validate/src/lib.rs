//! # atlas-validate — Admission Gates
//!
//! Nothing reaches the committed tree without passing through this
//! crate. Two gatekeepers:
//!
//! - [`TessellationValidator`] decides, per (jurisdiction, layer) group,
//!   whether a boundary set actually partitions its jurisdiction. A
//!   failing group is quarantined whole: tessellation failure almost
//!   always means the wrong data layer was scraped (precincts confused
//!   for council districts, partial exports), and committing it would
//!   poison the root.
//!
//! - [`IntegrityVerifier`] re-checks geometry invariants at intake,
//!   compares layer counts against the expected-count table, and flags
//!   cross-source discrepancies.
//!
//! Validation findings are data, not control flow: they accumulate into
//! reports that travel with the snapshot, and only integrity *errors*
//! stop a commit.

pub mod integrity;
pub mod tessellation;

pub use integrity::{IntegrityReport, IntegrityVerifier};
pub use tessellation::{TessellationValidator, TessellationVerdict, ValidationIssue};
