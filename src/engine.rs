// Preview engine seam: an isolated stack per verification, then a preview.
//
// The production engine drives the `pulumi` CLI through the process runner
// with a file backend rooted in the run's temporary directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::PreviewConfig;
use crate::error::{PreviewError, Result};
use crate::process::{ProcessConfig, ProcessRunner};

pub const PASSPHRASE_ENV: &str = "PULUMI_CONFIG_PASSPHRASE";
pub const BACKEND_URL_ENV: &str = "PULUMI_BACKEND_URL";
pub const IGNORE_AMBIENT_PLUGINS_ENV: &str = "PULUMI_IGNORE_AMBIENT_PLUGINS";
pub const SECRETS_PROVIDER: &str = "passphrase";

/// Captured output of a successful preview
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewOutput {
    pub stdout: String,
    pub stderr: String,
}

/// How to create the throwaway stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOptions {
    pub name: String,
    pub secrets_provider: String,
    pub environment: HashMap<String, String>,
}

impl StackOptions {
    /// Options that keep the engine away from the caller's login, state and
    /// plugin cache: passphrase secrets and a file backend under `temp_root`.
    pub fn isolated(temp_root: &Path, preview: &PreviewConfig) -> Self {
        Self {
            name: preview.stack_name.clone(),
            secrets_provider: SECRETS_PROVIDER.to_string(),
            environment: isolation_env(temp_root, &preview.passphrase),
        }
    }
}

pub fn isolation_env(temp_root: &Path, passphrase: &str) -> HashMap<String, String> {
    HashMap::from([
        (PASSPHRASE_ENV.to_string(), passphrase.to_string()),
        (BACKEND_URL_ENV.to_string(), backend_url(temp_root)),
        (IGNORE_AMBIENT_PLUGINS_ENV.to_string(), "true".to_string()),
    ])
}

/// `file://` backend URL for a local directory
pub fn backend_url(dir: &Path) -> String {
    file_backend_url(&dir.to_string_lossy(), cfg!(windows))
}

fn file_backend_url(path: &str, windows: bool) -> String {
    if windows {
        format!("file://{}", path.replace('\\', "//"))
    } else {
        format!("file://{path}")
    }
}

#[async_trait]
pub trait Stack: Send + Sync {
    fn name(&self) -> &str;

    async fn preview(&self) -> Result<PreviewOutput>;
}

#[async_trait]
pub trait PreviewEngine: Send + Sync {
    /// Create a fresh stack for the program in `work_dir`
    async fn create_isolated_stack(
        &self,
        work_dir: &Path,
        options: &StackOptions,
    ) -> Result<Box<dyn Stack>>;
}

/// `pulumi` CLI backed engine
pub struct PulumiCli {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    command_timeout: Duration,
}

impl PulumiCli {
    pub fn new(runner: Arc<dyn ProcessRunner>, command_timeout: Duration) -> Self {
        Self {
            runner,
            program: "pulumi".to_string(),
            command_timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl PreviewEngine for PulumiCli {
    async fn create_isolated_stack(
        &self,
        work_dir: &Path,
        options: &StackOptions,
    ) -> Result<Box<dyn Stack>> {
        let command = ProcessConfig::new(&self.program)
            .with_args([
                "stack",
                "init",
                options.name.as_str(),
                "--secrets-provider",
                options.secrets_provider.as_str(),
                "--non-interactive",
            ])
            .with_working_dir(work_dir)
            .with_environment(options.environment.clone())
            .with_timeout(self.command_timeout);

        tracing::debug!(stack = %options.name, work_dir = %work_dir.display(), "Creating stack");
        let result = self.runner.run(command).await?;
        if !result.success() {
            return Err(PreviewError::StackCreationFailed {
                stack: options.name.clone(),
                work_dir: work_dir.to_path_buf(),
                exit_code: result.exit_code,
                stderr: result.stderr,
            }
            .into());
        }

        Ok(Box::new(PulumiStack {
            runner: Arc::clone(&self.runner),
            program: self.program.clone(),
            work_dir: work_dir.to_path_buf(),
            name: options.name.clone(),
            environment: options.environment.clone(),
            command_timeout: self.command_timeout,
        }))
    }
}

struct PulumiStack {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    work_dir: PathBuf,
    name: String,
    environment: HashMap<String, String>,
    command_timeout: Duration,
}

#[async_trait]
impl Stack for PulumiStack {
    fn name(&self) -> &str {
        &self.name
    }

    async fn preview(&self) -> Result<PreviewOutput> {
        let command = ProcessConfig::new(&self.program)
            .with_args(["preview", "--stack", self.name.as_str(), "--non-interactive"])
            .with_working_dir(&self.work_dir)
            .with_environment(self.environment.clone())
            .with_timeout(self.command_timeout);

        let result = self.runner.run(command).await?;
        if !result.success() {
            return Err(PreviewError::PreviewFailed {
                stack: self.name.clone(),
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            }
            .into());
        }

        Ok(PreviewOutput {
            stdout: result.stdout,
            stderr: result.stderr,
        })
    }
}
