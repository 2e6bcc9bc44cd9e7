//! Error types for ghsnap-sync.

use std::fmt;
use std::process::ExitStatus;

use thiserror::Error;

use ghsnap_core::error::StoreError;

/// Why a raw entity was rejected by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// The entity is not a key-value object.
    NotAnObject,
    /// The key field is absent.
    MissingKey { key_field: String },
    /// The key field holds `null`, an array, or an object.
    NonScalarKey { key_field: String },
    /// The key field is an empty string.
    EmptyKey { key_field: String },
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::NotAnObject => write!(f, "entity is not an object"),
            MalformedReason::MissingKey { key_field } => {
                write!(f, "key field '{key_field}' is missing")
            }
            MalformedReason::NonScalarKey { key_field } => write!(
                f,
                "key field '{key_field}' must be a string, number, or boolean"
            ),
            MalformedReason::EmptyKey { key_field } => {
                write!(f, "key field '{key_field}' is empty")
            }
        }
    }
}

/// All errors that can arise from a fetch cycle.
///
/// No variant is retried; every one aborts the cycle before anything is
/// persisted.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A raw entity failed structural validation.
    #[error("malformed entity at index {index}: {reason}")]
    MalformedEntity { index: usize, reason: MalformedReason },

    /// The listing command could not be started.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The listing command exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The listing command produced output that is not what was asked for.
    #[error("unusable output from `{command}`: {reason}")]
    InvalidOutput { command: String, reason: String },

    /// The fetch log's highest sequence cannot be incremented.
    #[error("fetch log is exhausted at sequence {last}; run `ghsnap setup` to reset it")]
    SequenceExhausted { last: u64 },

    /// An error from the snapshot store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// `true` for failures of the external listing command.
    pub fn is_external_source_failure(&self) -> bool {
        matches!(
            self,
            SyncError::Spawn { .. } | SyncError::CommandFailed { .. } | SyncError::InvalidOutput { .. }
        )
    }
}

pub(crate) fn malformed(index: usize, reason: MalformedReason) -> SyncError {
    SyncError::MalformedEntity { index, reason }
}
