// Process management for package-manager and engine commands: timeout handling,
// output capture and environment overrides behind a narrow runner trait.

use crate::error::{ProcessError, Result, VerifyError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Process execution configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessConfig {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub environment: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl ProcessConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            environment: HashMap::new(),
            timeout: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_environment(mut self, env: HashMap<String, String>) -> Self {
        self.environment = env;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shell-style rendering used in logs and error messages
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ProcessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Process execution result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

/// Anything that can run a command to completion and hand back its output.
///
/// Installers and the preview engine only ever talk to this trait, so tests can
/// substitute a scripted fake.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the command. A non-zero exit is an `Ok` result; only failing to
    /// spawn, capture or finish in time is an error.
    async fn run(&self, config: ProcessConfig) -> Result<ProcessResult>;
}

/// Main process manager backed by `tokio::process`
#[derive(Debug, Clone)]
pub struct ProcessManager {
    default_timeout: Duration,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(30 * 60),
        }
    }

    pub fn with_default_timeout(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    #[tracing::instrument(level = "debug", name = "process", skip_all, fields(command = %config.command_line()))]
    pub async fn execute_async(&self, config: ProcessConfig) -> Result<ProcessResult> {
        use std::process::Stdio;
        use tokio::process::Command;
        use tokio::time::timeout;

        let start_time = Instant::now();
        let command_line = config.command_line();

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);
        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &config.environment {
            cmd.env(key, value);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);

        tracing::debug!(
            working_dir = ?config.working_dir,
            "Running command"
        );

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VerifyError::from(ProcessError::CommandNotFound {
                    command: config.command.clone(),
                    suggestion: Some(install_suggestion(&config.command)),
                })
            } else {
                VerifyError::from(ProcessError::SpawnFailed {
                    command: command_line.clone(),
                    error: e.to_string(),
                })
            }
        })?;

        let timeout_duration = config.timeout.unwrap_or(self.default_timeout);

        // wait_with_output drains both pipes concurrently, so chatty
        // commands can't deadlock on a full stderr buffer.
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| {
                VerifyError::from(ProcessError::OutputCaptureFailed {
                    message: e.to_string(),
                    command: command_line.clone(),
                })
            })?,
            // The child is killed when its future is dropped.
            Err(_) => {
                return Err(ProcessError::Timeout {
                    command: command_line,
                    duration: timeout_duration,
                }
                .into())
            }
        };

        let result = ProcessResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start_time.elapsed(),
        };
        tracing::debug!(
            exit_code = ?result.exit_code,
            duration_ms = result.duration.as_millis(),
            "Command finished"
        );
        Ok(result)
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRunner for ProcessManager {
    async fn run(&self, config: ProcessConfig) -> Result<ProcessResult> {
        self.execute_async(config).await
    }
}

fn install_suggestion(command: &str) -> String {
    match which::which(command) {
        Ok(path) => format!("{command} resolved to {} but could not be started", path.display()),
        Err(_) => format!("Install {command} and make sure it is on PATH"),
    }
}
