//! Reconciler — merges the stored snapshot with a freshly normalized batch.
//!
//! Per key:
//!
//! | old | new | merged record                                   |
//! |-----|-----|-------------------------------------------------|
//! | ✓   | ✓   | new if any tracked field differs, else old as-is |
//! | ✗   | ✓   | new, `valid = true`                             |
//! | ✓   | ✗   | old as-is (absence never deletes)               |
//!
//! Comparison is exact `serde_json::Value` equality over the tracked fields
//! only. Scratch fields and the `count`/`valid` provenance are dropped from
//! the compared list even when configured as tracked.
//! Keeping the old record on an unchanged match preserves its `count`, so
//! `count` reads as "first observed / last changed", not "last seen".

use serde_json::Value;

use ghsnap_core::types::{Batch, Record, Settings, Snapshot};

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// One tracked field compared between the stored and fetched record.
/// An absent field is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffItem {
    pub field: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub changed: bool,
}

/// Field-by-field comparison of one record present on both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDiff {
    pub key: String,
    pub items: Vec<DiffItem>,
}

impl RecordDiff {
    /// `true` if any tracked field changed.
    pub fn is_updated(&self) -> bool {
        self.items.iter().any(|item| item.changed)
    }

    pub fn changed_items(&self) -> impl Iterator<Item = &DiffItem> {
        self.items.iter().filter(|item| item.changed)
    }
}

/// Compare the stored attributes of `old` and `new` over `tracked_fields`,
/// in that order.
pub fn diff_record(key: &str, old: &Record, new: &Record, tracked_fields: &[String]) -> RecordDiff {
    let items = tracked_fields
        .iter()
        .map(|field| {
            let old_value = old.fields.get(field).cloned();
            let new_value = new.fields.get(field).cloned();
            DiffItem {
                field: field.clone(),
                changed: old_value != new_value,
                old_value,
                new_value,
            }
        })
        .collect();
    RecordDiff {
        key: key.to_owned(),
        items,
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// What happened to a single key during a merge.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Key only in the batch; the fetched record was added.
    Discovered { key: String },
    /// Key on both sides with at least one tracked field changed; the fetched
    /// record replaced the stored one.
    Updated { diff: RecordDiff },
    /// Key on both sides with identical tracked fields; the stored record was kept.
    Unchanged { key: String },
    /// Key only in the stored snapshot; kept verbatim.
    Retained { key: String },
}

impl RecordOutcome {
    pub fn key(&self) -> &str {
        match self {
            RecordOutcome::Discovered { key }
            | RecordOutcome::Unchanged { key }
            | RecordOutcome::Retained { key } => key,
            RecordOutcome::Updated { diff } => &diff.key,
        }
    }
}

/// Counts per [`RecordOutcome`] kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub discovered: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub retained: usize,
}

/// Result of [`Reconciler::merge`].
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub snapshot: Snapshot,
    pub records: Vec<RecordOutcome>,
}

impl MergeOutcome {
    pub fn summary(&self) -> MergeSummary {
        summarize(&self.records)
    }
}

/// Count outcomes by kind.
pub fn summarize(records: &[RecordOutcome]) -> MergeSummary {
    let mut summary = MergeSummary::default();
    for record in records {
        match record {
            RecordOutcome::Discovered { .. } => summary.discovered += 1,
            RecordOutcome::Updated { .. } => summary.updated += 1,
            RecordOutcome::Unchanged { .. } => summary.unchanged += 1,
            RecordOutcome::Retained { .. } => summary.retained += 1,
        }
    }
    summary
}

/// Provenance stamped by the normalizer on every fetch.
const PROVENANCE_FIELDS: [&str; 2] = ["count", "valid"];

/// Merges snapshots over a fixed list of compared fields.
#[derive(Debug, Clone)]
pub struct Reconciler {
    compared_fields: Vec<String>,
}

impl Reconciler {
    pub fn new(settings: &Settings) -> Self {
        let compared_fields = settings
            .tracked_fields
            .iter()
            .filter(|f| !PROVENANCE_FIELDS.contains(&f.as_str()))
            .filter(|f| !settings.scratch_fields.contains(f))
            .cloned()
            .collect();
        Self { compared_fields }
    }

    /// Merge `old` with `new`. Pure: no I/O, inputs are consumed.
    pub fn merge(&self, old: Snapshot, new: Batch) -> MergeOutcome {
        let mut fresh = new;
        let mut snapshot = Snapshot::new();
        let mut records = Vec::with_capacity(old.len() + fresh.len());

        for (key, stored) in old {
            let Some(fetched) = fresh.remove(&key) else {
                tracing::debug!("retained: {key} (absent from this fetch)");
                records.push(RecordOutcome::Retained { key: key.clone() });
                snapshot.insert(key, stored);
                continue;
            };

            let diff = diff_record(&key, &stored, &fetched, &self.compared_fields);
            if diff.is_updated() {
                for item in diff.changed_items() {
                    tracing::debug!(
                        "changed: {key}.{} {} -> {}",
                        item.field,
                        display_value(item.old_value.as_ref()),
                        display_value(item.new_value.as_ref()),
                    );
                }
                tracing::debug!("updated: {key} (count {} -> {})", stored.count, fetched.count);
                snapshot.insert(key, fetched);
                records.push(RecordOutcome::Updated { diff });
            } else {
                tracing::debug!("unchanged: {key} (count stays {})", stored.count);
                records.push(RecordOutcome::Unchanged { key: key.clone() });
                snapshot.insert(key, stored);
            }
        }

        for (key, mut fetched) in fresh {
            fetched.valid = true;
            tracing::debug!("discovered: {key} (count {})", fetched.count);
            records.push(RecordOutcome::Discovered { key: key.clone() });
            snapshot.insert(key, fetched);
        }

        MergeOutcome { snapshot, records }
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<absent>".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
