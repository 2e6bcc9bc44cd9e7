//! Domain types for the ghsnap snapshot store.
//!
//! A [`Snapshot`] maps a repository key to its latest reconciled [`Record`];
//! a [`FetchLog`] maps each fetch sequence number to the time it ran.
//! All types are serializable via serde + serde_yaml.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Field whose value identifies a repository within a snapshot.
pub const DEFAULT_KEY_FIELD: &str = "name";

/// Fields requested from the listing command and compared during reconciliation.
pub const DEFAULT_TRACKED_FIELDS: [&str; 11] = [
    "name",
    "url",
    "owner",
    "nameWithOwner",
    "parent",
    "pullRequests",
    "createdAt",
    "description",
    "diskUsage",
    "hasProjectsEnabled",
    "homepageUrl",
];

/// Free-form per-record fields, initialised empty and never diffed.
pub const DEFAULT_SCRATCH_FIELDS: [&str; 3] = ["field_1", "field_2", "field_3"];

/// Offset applied to fetch-log timestamps (JST).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

/// `--limit` handed to the listing command when the caller gives none.
pub const DEFAULT_LIMIT: u32 = 400;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A GitHub login, trimmed of surrounding whitespace. It names the per-user
/// store directories, so it must be a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserName(pub String);

impl UserName {
    /// Trim `raw`; `None` when nothing is left or the result is not
    /// [path safe](Self::is_path_safe).
    ///
    /// Command output such as `gh api user --jq .login` ends with a newline,
    /// so every login passes through here before it names a directory.
    pub fn normalize(raw: &str) -> Option<Self> {
        let name = Self(raw.trim().to_owned());
        name.is_path_safe().then_some(name)
    }

    /// Non-empty, not `.` or `..`, and free of path separators and NUL.
    pub fn is_path_safe(&self) -> bool {
        let s = self.0.as_str();
        !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\', '\0'])
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Attribute map of a single repository: tracked fields plus scratch fields.
pub type FieldMap = serde_json::Map<String, Value>;

/// One repository as stored in the snapshot.
///
/// `count` is the fetch sequence that discovered or last superseded the
/// record; it is not bumped when a fetch re-observes identical data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub count: u64,
    pub valid: bool,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl Record {
    /// Value of `field`, with `count` and `valid` resolved from the record
    /// itself. `None` when the field is absent.
    pub fn value_of(&self, field: &str) -> Option<Value> {
        match field {
            "count" => Some(Value::from(self.count)),
            "valid" => Some(Value::from(self.valid)),
            _ => self.fields.get(field).cloned(),
        }
    }
}

/// Durable mapping of repository key to its latest reconciled record.
pub type Snapshot = BTreeMap<String, Record>;

/// One fetch cycle's normalized records, keyed like a [`Snapshot`].
/// Never persisted on its own.
pub type Batch = Snapshot;

/// Fetch sequence number → timestamp. The first entry carries an empty
/// timestamp.
pub type FetchLog = BTreeMap<u64, String>;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Explicit configuration handed to the normalizer and reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub key_field: String,
    pub tracked_fields: Vec<String>,
    pub scratch_fields: Vec<String>,
    pub utc_offset_hours: i32,
    pub default_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_field: default_key_field(),
            tracked_fields: default_tracked_fields(),
            scratch_fields: default_scratch_fields(),
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl Settings {
    /// Replace the tracked-field list (e.g. from `--json a,b,c`).
    pub fn with_tracked_fields(mut self, fields: Vec<String>) -> Self {
        self.tracked_fields = fields;
        self
    }

    /// Fixed offset for fetch-log timestamps. Out-of-range hours fall back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

/// On-disk `config.yml` document.
///
/// `USER` and `JSON_FIELDS` keep the key names the file has always used;
/// every other key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "USER")]
    pub user: UserName,
    #[serde(rename = "JSON_FIELDS", default = "default_tracked_fields")]
    pub tracked_fields: Vec<String>,
    #[serde(default = "default_key_field")]
    pub key_field: String,
    #[serde(default = "default_scratch_fields")]
    pub scratch_fields: Vec<String>,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl AppConfig {
    /// Fresh config for `user` with every other key at its default.
    pub fn new(user: UserName, tracked_fields: Option<Vec<String>>) -> Self {
        Self {
            user,
            tracked_fields: tracked_fields.unwrap_or_else(default_tracked_fields),
            key_field: default_key_field(),
            scratch_fields: default_scratch_fields(),
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            key_field: self.key_field.clone(),
            tracked_fields: self.tracked_fields.clone(),
            scratch_fields: self.scratch_fields.clone(),
            utc_offset_hours: self.utc_offset_hours,
            default_limit: self.limit,
        }
    }
}

/// Parse a comma-separated field list, dropping blanks.
pub fn parse_field_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_owned)
        .collect()
}

fn default_key_field() -> String {
    DEFAULT_KEY_FIELD.to_owned()
}

fn default_tracked_fields() -> Vec<String> {
    DEFAULT_TRACKED_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_scratch_fields() -> Vec<String> {
    DEFAULT_SCRATCH_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_utc_offset_hours() -> i32 {
    DEFAULT_UTC_OFFSET_HOURS
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
