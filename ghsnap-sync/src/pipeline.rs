//! One fetch cycle: sequence → (maybe) fetch → normalize → merge → persist.
//!
//! Persistence happens only after a successful merge. A failed fetch,
//! a malformed entity, or a merge that never ran leaves `db.yml` and
//! `fetch.yml` exactly as they were.

use std::path::Path;

use ghsnap_core::{
    store, StoreError,
    types::{AppConfig, FetchLog, Settings, Snapshot, UserName},
};

use crate::{
    fetch_log,
    normalize::normalize,
    reconcile::{summarize, MergeSummary, Reconciler, RecordOutcome},
    source::{ListQuery, RepoSource},
    SyncError,
};

/// Caller-supplied knobs for [`run_list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Store (and listing owner) to use; defaults to the signed-in account.
    pub user: Option<String>,
    /// Refetch even when a snapshot already exists.
    pub force: bool,
    /// Overrides the configured `--limit`.
    pub limit: Option<u32>,
    /// Overrides the configured tracked fields for this run.
    pub fields: Option<Vec<String>>,
}

/// Result of one [`run_list`] cycle.
#[derive(Debug, Clone)]
pub struct ListOutcome {
    pub user: UserName,
    /// Sequence number issued for this cycle. Only persisted when fetched.
    pub sequence: u64,
    pub settings: Settings,
    /// Snapshot as it now stands on disk.
    pub snapshot: Snapshot,
    /// Fetch log as it now stands on disk.
    pub log: FetchLog,
    /// Per-key merge results; `None` when the stored snapshot was reused.
    pub records: Option<Vec<RecordOutcome>>,
}

impl ListOutcome {
    pub fn fetched(&self) -> bool {
        self.records.is_some()
    }

    pub fn summary(&self) -> Option<MergeSummary> {
        self.records.as_deref().map(summarize)
    }
}

/// Explicit `user` (trimmed) if given, otherwise the source's signed-in account.
pub fn resolve_user(source: &dyn RepoSource, user: Option<&str>) -> Result<UserName, SyncError> {
    match user.map(str::trim).filter(|u| !u.is_empty()) {
        Some(raw) => UserName::normalize(raw).ok_or_else(|| {
            StoreError::InvalidUserName {
                user: raw.to_owned(),
            }
            .into()
        }),
        None => source.current_user(),
    }
}

/// Initialise the store for `user` (or the signed-in account).
///
/// Resets any existing snapshot and fetch log for that user.
pub fn setup(
    home: &Path,
    source: &dyn RepoSource,
    user: Option<&str>,
    fields: Option<Vec<String>>,
) -> Result<AppConfig, SyncError> {
    let user = resolve_user(source, user)?;
    let config = store::setup_at(home, &user, fields)?;
    tracing::info!("initialised store for {user}");
    Ok(config)
}

/// Run one list cycle.
///
/// The listing command runs only on the first cycle ever or when
/// `options.force` is set; otherwise the stored snapshot is returned and
/// nothing is written.
pub fn run_list(
    home: &Path,
    source: &dyn RepoSource,
    options: &ListOptions,
) -> Result<ListOutcome, SyncError> {
    let user = resolve_user(source, options.user.as_deref())?;
    let config = store::load_config_at(home, &user)?;
    let mut settings = config.settings();
    if let Some(fields) = options.fields.clone() {
        settings = settings.with_tracked_fields(fields);
    }

    let stored_log = store::load_fetch_log_at(home, &user)?;
    let stored_snapshot = store::load_snapshot_at(home, &user)?;
    let (sequence, next_log) = fetch_log::next(stored_log.clone(), settings.utc_offset())?;

    if !fetch_log::needs_refetch(sequence, options.force) {
        tracing::info!(
            "reusing stored snapshot for {user} ({} records); pass -f to refetch",
            stored_snapshot.len()
        );
        return Ok(ListOutcome {
            user,
            sequence,
            settings,
            snapshot: stored_snapshot,
            log: stored_log,
            records: None,
        });
    }

    tracing::info!("fetch #{sequence} for {user}");
    let query = ListQuery {
        owner: Some(user.0.clone()),
        limit: Some(options.limit.unwrap_or(settings.default_limit)),
        fields: requested_fields(&settings),
    };
    let raw = source.list_repos(&query)?;
    let batch = normalize(raw, sequence, &settings)?;
    let merged = Reconciler::new(&settings).merge(stored_snapshot, batch);

    store::save_snapshot_at(home, &user, &merged.snapshot)?;
    store::save_fetch_log_at(home, &user, &next_log)?;

    let summary = merged.summary();
    tracing::info!(
        "fetch #{sequence} for {user}: {} new, {} updated, {} unchanged, {} retained",
        summary.discovered,
        summary.updated,
        summary.unchanged,
        summary.retained
    );

    Ok(ListOutcome {
        user,
        sequence,
        settings,
        snapshot: merged.snapshot,
        log: next_log,
        records: Some(merged.records),
    })
}

/// Tracked fields the listing command knows about, with the key field
/// prepended when missing so every returned entity can be keyed.
///
/// `count`, `valid` and scratch fields are local and never requested.
fn requested_fields(settings: &Settings) -> Vec<String> {
    let mut fields: Vec<String> = settings
        .tracked_fields
        .iter()
        .filter(|f| !matches!(f.as_str(), "count" | "valid"))
        .filter(|f| !settings.scratch_fields.contains(f))
        .cloned()
        .collect();
    if !fields.contains(&settings.key_field) {
        fields.insert(0, settings.key_field.clone());
    }
    fields
}
