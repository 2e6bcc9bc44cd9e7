//! # ghsnap-sync
//!
//! Reconciliation engine and fetch-cycle orchestration.
//!
//! Call [`run_list`] to run one cycle for a user: issue the next fetch
//! sequence, fetch and [`normalize`] when a refetch is due, [`Reconciler::merge`]
//! the batch into the stored snapshot, then persist.

pub mod error;
pub mod fetch_log;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod source;

pub use error::{MalformedReason, SyncError};
pub use normalize::normalize;
pub use pipeline::{run_list, setup, ListOptions, ListOutcome};
pub use reconcile::{DiffItem, MergeOutcome, MergeSummary, Reconciler, RecordDiff, RecordOutcome};
pub use source::{GhCli, ListQuery, RepoSource};
