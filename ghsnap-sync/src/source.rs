//! External repository source — the `gh` CLI boundary.
//!
//! The reconciler never talks to GitHub; it receives the parsed JSON array
//! this module returns. Calls block until the command exits, with no timeout
//! and no retry.

use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

use ghsnap_core::types::UserName;

use crate::error::SyncError;

/// Parameters for one `gh repo list` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Account whose repositories are listed; `None` lists the signed-in user's.
    pub owner: Option<String>,
    pub limit: Option<u32>,
    /// Fields requested through `--json`.
    pub fields: Vec<String>,
}

/// Anything that can list repositories as raw JSON entities.
pub trait RepoSource {
    fn list_repos(&self, query: &ListQuery) -> Result<Vec<Value>, SyncError>;

    /// Login of the signed-in account.
    fn current_user(&self) -> Result<UserName, SyncError>;
}

/// [`RepoSource`] backed by the GitHub CLI.
#[derive(Debug, Clone)]
pub struct GhCli {
    program: PathBuf,
}

impl Default for GhCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("gh"),
        }
    }
}

impl GhCli {
    /// Use a specific `gh` executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[String]) -> Result<String, SyncError> {
        let command = self.describe(args);
        tracing::debug!("running: {command}");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| SyncError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(SyncError::CommandFailed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| SyncError::InvalidOutput {
            command,
            reason: "stdout is not valid UTF-8".to_string(),
        })
    }

    fn describe(&self, args: &[String]) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(args.iter().cloned());
        parts.join(" ")
    }
}

impl RepoSource for GhCli {
    fn list_repos(&self, query: &ListQuery) -> Result<Vec<Value>, SyncError> {
        let args = repo_list_args(query);
        let stdout = self.run(&args)?;
        let command = self.describe(&args);
        match serde_json::from_str::<Value>(&stdout) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(_) => Err(SyncError::InvalidOutput {
                command,
                reason: "expected a JSON array".to_string(),
            }),
            Err(err) => Err(SyncError::InvalidOutput {
                command,
                reason: err.to_string(),
            }),
        }
    }

    fn current_user(&self) -> Result<UserName, SyncError> {
        let args: Vec<String> = ["api", "user", "--jq", ".login"]
            .iter()
            .map(|a| a.to_string())
            .collect();
        let stdout = self.run(&args)?;
        UserName::normalize(&stdout).ok_or_else(|| SyncError::InvalidOutput {
            command: self.describe(&args),
            reason: "empty or unusable login".to_string(),
        })
    }
}

/// `repo list [<owner>] [--limit N] [--json a,b,c]`
pub fn repo_list_args(query: &ListQuery) -> Vec<String> {
    let mut args = vec!["repo".to_string(), "list".to_string()];
    if let Some(owner) = &query.owner {
        args.push(owner.clone());
    }
    if let Some(limit) = query.limit {
        args.push("--limit".to_string());
        args.push(limit.to_string());
    }
    if !query.fields.is_empty() {
        args.push("--json".to_string());
        args.push(query.fields.join(","));
    }
    args
}
