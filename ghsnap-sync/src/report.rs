//! Report projection — flattens a snapshot into rows for TSV or JSON output.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use ghsnap_core::types::{Record, Snapshot};

/// Snapshot records ordered by `createdAt`, newest first; ties by key.
pub fn flatten(snapshot: &Snapshot) -> Vec<(&str, &Record)> {
    let mut rows: Vec<(&str, &Record)> = snapshot.iter().map(|(k, r)| (k.as_str(), r)).collect();
    rows.sort_by(|(ka, a), (kb, b)| match created_at(b).cmp(&created_at(a)) {
        Ordering::Equal => ka.cmp(kb),
        other => other,
    });
    rows
}

/// Header line plus one tab-separated row per record.
///
/// Missing and `null` fields render empty; arrays and objects render as
/// compact JSON.
pub fn to_tsv(records: &[(&str, &Record)], headers: &[String]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(headers.join("\t"));
    for (_, record) in records {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| render_cell(record.value_of(h).as_ref()))
            .collect();
        lines.push(cells.join("\t"));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Pretty JSON array of objects holding only `headers`. Missing fields are
/// `null`.
pub fn to_json(records: &[(&str, &Record)], headers: &[String]) -> Result<String, serde_json::Error> {
    let rows: Vec<Value> = records
        .iter()
        .map(|(_, record)| {
            let mut row = Map::new();
            for h in headers {
                row.insert(h.clone(), record.value_of(h).unwrap_or(Value::Null));
            }
            Value::Object(row)
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}

fn created_at(record: &Record) -> &str {
    record
        .fields
        .get("createdAt")
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}
