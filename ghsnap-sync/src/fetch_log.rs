//! Fetch counter — monotonic sequence numbers correlated with timestamps.
//!
//! The very first entry is `1: ""`: sequence 1 is handed out before any fetch
//! has actually completed, so it carries no time. Every later entry records
//! when its sequence was issued.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

use ghsnap_core::types::FetchLog;

use crate::SyncError;

/// Issue the next sequence number, stamping it with the current time in
/// `offset`.
pub fn next(log: FetchLog, offset: FixedOffset) -> Result<(u64, FetchLog), SyncError> {
    next_at(log, Utc::now().with_timezone(&offset))
}

/// [`next`] with an explicit clock.
pub fn next_at(mut log: FetchLog, now: DateTime<FixedOffset>) -> Result<(u64, FetchLog), SyncError> {
    let Some(&last) = log.keys().next_back() else {
        log.insert(1, String::new());
        return Ok((1, log));
    };
    let sequence = last
        .checked_add(1)
        .ok_or(SyncError::SequenceExhausted { last })?;
    log.insert(sequence, format_timestamp(now));
    Ok((sequence, log))
}

/// A full refetch happens on the first run ever or when forced; otherwise
/// the stored snapshot is reused as-is.
pub fn needs_refetch(sequence: u64, force: bool) -> bool {
    sequence == 1 || force
}

/// ISO-8601 with microseconds and the fixed offset, e.g.
/// `2024-01-01T09:00:00.000000+09:00`.
pub fn format_timestamp(now: DateTime<FixedOffset>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Timestamp recorded for `sequence`; `None` when unknown or the sentinel.
pub fn issued_at(log: &FetchLog, sequence: u64) -> Option<&str> {
    log.get(&sequence)
        .map(String::as_str)
        .filter(|ts| !ts.is_empty())
}
