//! `ghsnap list` — run one fetch cycle and report the snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use ghsnap_core::{store, types::FetchLog};
use ghsnap_sync::{
    fetch_log, report, run_list, GhCli, ListOptions, ListOutcome, RecordOutcome,
};

use super::FieldListArg;

/// Arguments for `ghsnap list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Refetch even when a snapshot already exists.
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Print every record in the snapshot.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Store to use; defaults to the signed-in account.
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Maximum number of repositories to request.
    #[arg(long)]
    pub limit: Option<u32>,

    /// Comma-separated fields to request and compare for this run.
    #[arg(long = "json", value_name = "FIELDS")]
    pub fields: Option<FieldListArg>,

    /// Write the snapshot to a file: JSON for `.json`, TSV otherwise.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Tabled)]
struct SnapshotTableRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "count")]
    count: u64,
    #[tabled(rename = "fetched at")]
    fetched_at: String,
    #[tabled(rename = "valid")]
    valid: bool,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let home = store::home().context("could not determine home directory")?;
        let options = ListOptions {
            user: self.user,
            force: self.force,
            limit: self.limit,
            fields: self.fields.map(Into::into),
        };
        let outcome = run_list(&home, &GhCli::default(), &options).context("list failed")?;

        print_summary(&outcome);
        if self.verbose {
            print_table(&outcome);
        }
        if let Some(path) = self.output.as_deref() {
            write_report(path, &outcome)?;
        }
        Ok(())
    }
}

fn print_summary(outcome: &ListOutcome) {
    let (Some(summary), Some(records)) = (outcome.summary(), outcome.records.as_ref()) else {
        println!(
            "{} using stored snapshot for '{}' ({} repositories); pass -f to refetch",
            "•".bright_black(),
            outcome.user,
            outcome.snapshot.len()
        );
        return;
    };

    println!(
        "{} fetch #{}: {} new, {} updated, {} unchanged, {} retained",
        "✓".green(),
        outcome.sequence,
        summary.discovered,
        summary.updated,
        summary.unchanged,
        summary.retained
    );
    for record in records {
        match record {
            RecordOutcome::Discovered { key } => println!("  {} {key}", "+".green()),
            RecordOutcome::Updated { diff } => {
                let fields: Vec<&str> = diff.changed_items().map(|i| i.field.as_str()).collect();
                println!("  {} {} ({})", "~".yellow(), diff.key, fields.join(", "));
            }
            RecordOutcome::Unchanged { .. } | RecordOutcome::Retained { .. } => {}
        }
    }
}

fn print_table(outcome: &ListOutcome) {
    if outcome.snapshot.is_empty() {
        println!("No repositories in snapshot.");
        return;
    }
    let rows: Vec<SnapshotTableRow> = report::flatten(&outcome.snapshot)
        .into_iter()
        .map(|(key, record)| SnapshotTableRow {
            name: key.to_string(),
            count: record.count,
            fetched_at: fetched_at(&outcome.log, record.count),
            valid: record.valid,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn fetched_at(log: &FetchLog, count: u64) -> String {
    fetch_log::issued_at(log, count)
        .unwrap_or("-")
        .to_string()
}

fn write_report(path: &Path, outcome: &ListOutcome) -> Result<()> {
    let rows = report::flatten(&outcome.snapshot);
    let headers = &outcome.settings.tracked_fields;
    let body = if is_json_path(path) {
        report::to_json(&rows, headers).context("failed to serialize report JSON")?
    } else {
        report::to_tsv(&rows, headers)
    };
    fs::write(path, body).with_context(|| format!("failed to write '{}'", path.display()))?;
    println!("  Wrote {} repositories to {}", rows.len(), path.display());
    Ok(())
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
