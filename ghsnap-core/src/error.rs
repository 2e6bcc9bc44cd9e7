//! Error types for ghsnap-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from snapshot store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, with the path it happened on.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// `config.yml` is missing — `ghsnap setup` has not run for this user.
    #[error("config not found at {path}; run `ghsnap setup` first")]
    NotInitialized { path: PathBuf },

    /// The login cannot name a store directory (empty, `.`/`..`, or holds a
    /// path separator).
    #[error("'{user}' is not a usable GitHub login")]
    InvalidUserName { user: String },

    /// `config.yml` parsed but holds a value ghsnap cannot use.
    #[error("invalid config at {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
