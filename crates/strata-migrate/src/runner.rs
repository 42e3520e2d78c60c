//! External migration runner wrapper.
//!
//! Versioned, file-based migrations are handled by a separate tool. It runs
//! as a child process via `tokio::process::Command`, receives the server
//! connection in `ORIENTDB_*` environment variables, and gets every
//! argument strata does not consume itself.

use tokio::process::Command;

use strata_graph::ServerConfig;

use crate::config::RunnerConfig;
use crate::error::{MigrateError, Result};

/// Options that belong to strata and are never forwarded. All take a value.
const OWN_OPTIONS: &[&str] = &[
    "-c",
    "--config",
    "--odb-host",
    "--odb-port",
    "--odb-username",
    "--odb-password",
];

/// Wrapper around the migration runner binary.
pub struct MigrationRunner {
    program: String,
    template_file: Option<String>,
    server: ServerConfig,
}

impl MigrationRunner {
    pub fn new(config: &RunnerConfig, server: &ServerConfig) -> Self {
        Self {
            program: config.program.clone(),
            template_file: config.template_file.clone(),
            server: server.clone(),
        }
    }

    /// Connection settings handed to the runner.
    pub fn env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ORIENTDB_HOST", self.server.host.clone()),
            ("ORIENTDB_PORT", self.server.port.to_string()),
            ("ORIENTDB_USERNAME", self.server.username.clone()),
            ("ORIENTDB_PASSWORD", self.server.password.clone()),
        ]
    }

    /// Arguments forwarded to the runner: strata's own options removed, and
    /// the configured template added to `create` when none was given.
    pub fn args(&self, raw: &[String]) -> Vec<String> {
        let mut args = passthrough_args(raw);
        if let Some(template) = &self.template_file {
            let is_create = args.first().is_some_and(|a| a == "create");
            let has_template = args
                .iter()
                .any(|a| a == "--template-file" || a.starts_with("--template-file="));
            if is_create && !has_template {
                args.push("--template-file".to_string());
                args.push(template.clone());
            }
        }
        args
    }

    /// Run the migration tool and return its standard output.
    pub async fn run(&self, raw: &[String]) -> Result<String> {
        let args = self.args(raw);
        tracing::info!(program = %self.program, args = ?args, "Running migrations");

        let output = Command::new(&self.program)
            .args(&args)
            .envs(self.env())
            .output()
            .await
            .map_err(|e| MigrateError::RunnerNotFound {
                program: format!("{}: {e}", self.program),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MigrateError::Runner {
                code: output.status.code().unwrap_or(-1),
                output: format!("{}{stdout}", stderr.trim_end()),
            });
        }
        Ok(stdout)
    }
}

/// Remove strata's own options (`-c`, `--config`, `--odb-*`), in both the
/// `--flag value` and `--flag=value` forms.
pub fn passthrough_args(raw: &[String]) -> Vec<String> {
    let mut args = Vec::with_capacity(raw.len());
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        if OWN_OPTIONS.contains(&arg.as_str()) {
            iter.next();
            continue;
        }
        let inline = arg
            .split_once('=')
            .is_some_and(|(flag, _)| OWN_OPTIONS.contains(&flag));
        if !inline {
            args.push(arg.clone());
        }
    }
    args
}
