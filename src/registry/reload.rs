//! Load balancer reload invocation.
//!
//! # Responsibilities
//! - Run the configured reload command once per regeneration
//! - Capture combined stdout/stderr for diagnostics
//!
//! # Design Decisions
//! - The outcome is binary: exit status zero or not; output is never parsed
//! - No retries and no timeout; a slow reload delays only its own group
//! - Exposed as a trait so tests substitute a fake

use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// Captured output of a successful reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadOutput {
    pub output: String,
}

/// A reload that did not succeed.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("failed to start reload command `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("reload command exited with {}: {}", exit_code_label(.code), .output.trim())]
    NonZeroExit { code: Option<i32>, output: String },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Makes the consuming load balancer pick up regenerated artifacts.
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self) -> Result<ReloadOutput, ReloadError>;
}

/// Runs an external command without a shell.
#[derive(Debug, Clone)]
pub struct CommandReloader {
    program: String,
    args: Vec<String>,
}

impl CommandReloader {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a `[program, args...]` vector. Returns `None` when empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl Reloader for CommandReloader {
    async fn reload(&self) -> Result<ReloadOutput, ReloadError> {
        let result = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ReloadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut output = String::from_utf8_lossy(&result.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&result.stderr));

        if result.status.success() {
            Ok(ReloadOutput { output })
        } else {
            Err(ReloadError::NonZeroExit {
                code: result.status.code(),
                output,
            })
        }
    }
}
