// Per-ecosystem installers that swap the sample program's SDK dependency for
// the freshly published version.
//
// The set of ecosystems is closed, so dispatch is a plain match over
// `Ecosystem` rather than a plugin registry.

pub mod dotnet;
pub mod golang;
pub mod nodejs;
pub mod python;

use std::path::Path;
use std::sync::Arc;

use crate::availability::PollOutcome;
use crate::config::VerifyConfig;
use crate::error::{InstallError, Result};
use crate::process::{ProcessConfig, ProcessResult, ProcessRunner};
use crate::request::{Ecosystem, VerificationRequest};

pub use dotnet::DotnetInstaller;
pub use golang::GoInstaller;
pub use nodejs::NodejsInstaller;
pub use python::PythonInstaller;

/// What an installer did to the staged project
#[derive(Debug, Clone, PartialEq)]
pub enum InstallOutcome {
    Installed {
        ecosystem: Ecosystem,
        package: String,
        version: String,
        /// `None` when the ecosystem has no availability check (Go).
        availability: Option<PollOutcome>,
    },
    /// Accepted ecosystem without an installer; the preview runs against the
    /// sample as-is.
    Unsupported { ecosystem: Ecosystem },
}

impl InstallOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, InstallOutcome::Installed { .. })
    }
}

/// Entry point the orchestrator uses to install into a staged project
pub struct Installers {
    runner: Arc<dyn ProcessRunner>,
    http: reqwest::Client,
    config: VerifyConfig,
}

impl Installers {
    pub fn new(runner: Arc<dyn ProcessRunner>, http: reqwest::Client, config: VerifyConfig) -> Self {
        Self {
            runner,
            http,
            config,
        }
    }

    pub async fn install(
        &self,
        work_dir: &Path,
        request: &VerificationRequest,
    ) -> Result<InstallOutcome> {
        let runner = self.runner.as_ref();
        match request.ecosystem {
            Ecosystem::Nodejs => {
                NodejsInstaller::new(runner, &self.config)
                    .install(work_dir, request)
                    .await
            }
            Ecosystem::Python => {
                PythonInstaller::new(runner, &self.config)
                    .install(work_dir, request)
                    .await
            }
            Ecosystem::Dotnet => {
                DotnetInstaller::new(runner, self.http.clone(), &self.config)
                    .install(work_dir, request)
                    .await
            }
            Ecosystem::Go => GoInstaller::new(runner, &self.config).install(work_dir, request).await,
            ecosystem @ (Ecosystem::Java | Ecosystem::Yaml) => {
                tracing::warn!(
                    %ecosystem,
                    "No installer for this language; previewing the sample program unchanged"
                );
                Ok(InstallOutcome::Unsupported { ecosystem })
            }
        }
    }
}

/// Command runner shared by the installers: one place decides which failures
/// are tolerated and which abort the verification.
pub(crate) struct Step<'a> {
    runner: &'a dyn ProcessRunner,
    ecosystem: Ecosystem,
    work_dir: &'a Path,
    config: &'a VerifyConfig,
}

impl<'a> Step<'a> {
    pub(crate) fn new(
        runner: &'a dyn ProcessRunner,
        ecosystem: Ecosystem,
        work_dir: &'a Path,
        config: &'a VerifyConfig,
    ) -> Self {
        Self {
            runner,
            ecosystem,
            work_dir,
            config,
        }
    }

    pub(crate) fn command<I, S>(&self, program: impl Into<String>, args: I) -> ProcessConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcessConfig::new(program)
            .with_args(args)
            .with_working_dir(self.work_dir)
            .with_timeout(self.config.commands.timeout())
    }

    /// Run a best-effort command. Neither a non-zero exit nor a runner error
    /// (missing binary, timeout) stops the install; both are logged at debug.
    pub(crate) async fn tolerated(&self, description: &str, command: ProcessConfig) {
        tracing::debug!(ecosystem = %self.ecosystem, "{description}: {command}");
        match self.runner.run(command.clone()).await {
            Ok(result) if result.success() => {}
            Ok(result) => tracing::debug!(
                ecosystem = %self.ecosystem,
                exit_code = ?result.exit_code,
                "Ignoring failure to {description}: {command}\n{}\n{}",
                result.stderr,
                result.stdout
            ),
            Err(e) => tracing::debug!(
                ecosystem = %self.ecosystem,
                error = %e,
                "Ignoring failure to {description}: {command}"
            ),
        }
    }

    /// Run a command whose failure aborts the verification
    pub(crate) async fn fatal(&self, description: &str, command: ProcessConfig) -> Result<ProcessResult> {
        tracing::debug!(ecosystem = %self.ecosystem, "{description}: {command}");
        let result = self.runner.run(command.clone()).await?;
        if !result.success() {
            return Err(InstallError::CommandFailed {
                ecosystem: self.ecosystem.to_string(),
                step: description.to_string(),
                command: command.command_line(),
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            }
            .into());
        }
        Ok(result)
    }
}

/// Package reference for ecosystems that compose one from publisher and provider
pub(crate) fn package_ref(request: &VerificationRequest) -> String {
    request
        .package_ref()
        .unwrap_or_else(|| format!("{}/{}", request.publisher, request.provider))
}
