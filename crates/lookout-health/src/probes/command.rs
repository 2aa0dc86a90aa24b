//! Probe that checks an external tool responds.

use std::process::Stdio;

use async_trait::async_trait;
use lookout_types::HealthResult;
use tokio::process::Command;
use tracing::debug;

use super::HealthProbe;

/// Runs a command (e.g. `duckdb --version`) and reports healthy when it
/// exits successfully.
///
/// The child is spawned with `kill_on_drop`, so a probe abandoned by the
/// scheduler's timeout takes its process down with it.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
    description: String,
}

impl CommandProbe {
    /// Probe `program` invoked with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        let description = std::iter::once(program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            program,
            args,
            description,
        }
    }

    /// Build from an argv-style list; `None` when the list is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl HealthProbe for CommandProbe {
    async fn check(&self) -> Result<HealthResult, String> {
        debug!(command = %self.description, "Running command probe");

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to spawn '{}': {}", self.program, e))?;

        let first_line = |bytes: &[u8]| {
            String::from_utf8_lossy(bytes)
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        };

        let exit_code = output.status.code();
        if output.status.success() {
            Ok(HealthResult::healthy()
                .with_detail("command", self.description.clone())
                .with_detail("output", first_line(&output.stdout)))
        } else {
            let stderr = first_line(&output.stderr);
            let reason = match exit_code {
                Some(code) => format!("exited with status {}: {}", code, stderr),
                None => format!("terminated by signal: {}", stderr),
            };
            Ok(HealthResult::unhealthy(reason).with_detail("command", self.description.clone()))
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}
