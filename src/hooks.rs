use std::process::Stdio;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::HookEntryConfig;
use crate::error::GuardError;

/// What a hook child says on stdout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum HookResponse {
    Accept,
    Modify { value: String },
    Reject { reason: String },
}

struct HookEntry {
    pattern: Regex,
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

/// One ordered chain of external hook processes. The payload flows forward:
/// each entry whose pattern matches the *current* value is invoked with it
/// and may accept, rewrite, or veto.
pub struct HookChain {
    kind: &'static str,
    entries: Vec<HookEntry>,
}

impl HookChain {
    pub fn from_config(
        kind: &'static str,
        entries: &[HookEntryConfig],
        default_timeout: Duration,
    ) -> Result<Self, GuardError> {
        if !entries.is_empty() && default_timeout.is_zero() {
            return Err(GuardError::Config(format!(
                "default hook timeout must be positive when {kind} hooks are configured"
            )));
        }
        let entries = entries
            .iter()
            .map(|entry| {
                let pattern = Regex::new(&entry.pattern).map_err(|e| {
                    GuardError::Config(format!(
                        "invalid {kind} hook pattern {:?}: {e}",
                        entry.pattern
                    ))
                })?;
                Ok(HookEntry {
                    pattern,
                    command: entry.command.clone(),
                    args: entry.args.clone(),
                    timeout: entry
                        .timeout_seconds
                        .map(Duration::from_secs)
                        .unwrap_or(default_timeout),
                })
            })
            .collect::<Result<Vec<_>, GuardError>>()?;
        Ok(Self { kind, entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Traverse the chain over `payload`, returning the final (possibly
    /// rewritten) value. Patterns are re-evaluated against the latest value
    /// so a later hook can match what an earlier one produced.
    pub async fn run(&self, payload: String) -> Result<String, GuardError> {
        let mut current = payload;
        for (idx, entry) in self.entries.iter().enumerate() {
            if !entry.pattern.is_match(&current) {
                continue;
            }
            let label = self.label(idx);
            tracing::debug!(hook = %label, "invoking hook");
            match invoke(&label, entry, &current).await? {
                HookResponse::Accept => {}
                HookResponse::Modify { value } => current = value,
                HookResponse::Reject { reason } => {
                    return Err(GuardError::HookRejected { hook: label, reason });
                }
            }
        }
        Ok(current)
    }

    /// Verify each configured command resolves to something executable.
    /// Used by `doctor`; never runs the hooks.
    pub fn probe(&self) -> Vec<(String, Result<(), String>)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (self.label(idx), resolve_command(&entry.command)))
            .collect()
    }

    fn label(&self, idx: usize) -> String {
        format!("{} hook #{} ({})", self.kind, idx + 1, self.entries[idx].command)
    }
}

async fn invoke(
    label: &str,
    entry: &HookEntry,
    payload: &str,
) -> Result<HookResponse, GuardError> {
    let mut child = Command::new(&entry.command)
        .args(&entry.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| GuardError::HookFailed {
            hook: label.to_string(),
            detail: format!("spawn failed: {e}"),
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| GuardError::HookFailed {
        hook: label.to_string(),
        detail: "stdin unavailable".to_string(),
    })?;
    stdin
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| GuardError::HookFailed {
            hook: label.to_string(),
            detail: format!("stdin write failed: {e}"),
        })?;
    // Closing the pipe: the child sees EOF on stdin.
    drop(stdin);

    let output = match timeout(entry.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(GuardError::HookFailed {
                hook: label.to_string(),
                detail: format!("wait failed: {e}"),
            })
        }
        // Dropping the elapsed future drops the child handle, which kills
        // the process (kill_on_drop).
        Err(_) => {
            return Err(GuardError::HookTimeout {
                hook: label.to_string(),
                seconds: entry.timeout.as_secs(),
            })
        }
    };

    if !output.stderr.is_empty() {
        tracing::debug!(
            hook = label,
            stderr = %String::from_utf8_lossy(&output.stderr),
            "hook stderr"
        );
    }

    if !output.status.success() {
        return Err(GuardError::HookFailed {
            hook: label.to_string(),
            detail: format!("exited with {}", output.status),
        });
    }

    parse_response(label, &output.stdout)
}

fn parse_response(label: &str, stdout: &[u8]) -> Result<HookResponse, GuardError> {
    serde_json::from_slice(stdout).map_err(|e| GuardError::HookUnparseable {
        hook: label.to_string(),
        detail: e.to_string(),
    })
}

fn resolve_command(command: &str) -> Result<(), String> {
    let path = std::path::Path::new(command);
    if path.components().count() > 1 {
        if path.is_file() {
            return Ok(());
        }
        return Err(format!("{command}: no such file"));
    }
    let paths = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&paths) {
        if dir.join(command).is_file() {
            return Ok(());
        }
    }
    Err(format!("{command}: not found in PATH"))
}
