//! ghsnap core library — domain types, snapshot store persistence, errors.
//!
//! - [`types`] — records, snapshot / fetch-log aliases, settings
//! - [`error`] — [`StoreError`]
//! - [`store`] — per-user config / db / fetch files: paths, load, atomic save, setup

pub mod error;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use types::{
    AppConfig, Batch, FetchLog, FieldMap, Record, Settings, Snapshot, UserName,
    DEFAULT_TRACKED_FIELDS,
};
