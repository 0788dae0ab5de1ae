// Verification orchestrator: stage, configure, install, preview, clean up.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::config::VerifyConfig;
use crate::engine::{PreviewEngine, PreviewOutput, StackOptions};
use crate::error::Result;
use crate::installer::{InstallOutcome, Installers};
use crate::logging::utils;
use crate::process::ProcessRunner;
use crate::request::{Ecosystem, VerificationRequest};
use crate::staging::StagedWorkspace;

/// Result of one successful verification
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub ecosystem: Ecosystem,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub install: InstallOutcome,
    pub preview: PreviewOutput,
    pub duration: Duration,
}

pub struct ReleaseVerifier {
    installers: Installers,
    engine: Arc<dyn PreviewEngine>,
    config: VerifyConfig,
    staging_root: Option<PathBuf>,
}

impl ReleaseVerifier {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        engine: Arc<dyn PreviewEngine>,
        http: reqwest::Client,
        config: VerifyConfig,
    ) -> Self {
        Self {
            installers: Installers::new(runner, http, config.clone()),
            engine,
            config,
            staging_root: None,
        }
    }

    /// Create temporary directories under `dir` instead of the system temp location
    pub fn with_staging_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(dir.into());
        self
    }

    pub async fn verify(&self, request: &VerificationRequest) -> Result<VerificationReport> {
        let span = utils::verification_span(request.ecosystem.as_str(), &request.provider);
        self.verify_inner(request).instrument(span).await
    }

    async fn verify_inner(&self, request: &VerificationRequest) -> Result<VerificationReport> {
        let started_at = chrono::Utc::now();
        let start = Instant::now();
        let workspace = match &self.staging_root {
            Some(root) => StagedWorkspace::stage_in(root, &request.source_directory)?,
            None => StagedWorkspace::stage(&request.source_directory)?,
        };

        let outcome = self
            .run_staged(workspace.temp_root(), workspace.work_dir(), request)
            .await;

        // The workspace is removed on drop as well; the explicit call is
        // only there to surface failures in the log.
        if let Err(e) = workspace.cleanup() {
            tracing::warn!(error = %e, "Failed to remove temporary directory");
        }

        let (install, preview) = match outcome {
            Ok(staged) => staged,
            Err(e) => {
                utils::log_verification_completion(
                    request.ecosystem.as_str(),
                    false,
                    start.elapsed().as_millis(),
                );
                return Err(e);
            }
        };
        let duration = start.elapsed();
        utils::log_verification_completion(request.ecosystem.as_str(), true, duration.as_millis());
        Ok(VerificationReport {
            ecosystem: request.ecosystem,
            started_at,
            install,
            preview,
            duration,
        })
    }

    async fn run_staged(
        &self,
        temp_root: &Path,
        work_dir: &Path,
        request: &VerificationRequest,
    ) -> Result<(InstallOutcome, PreviewOutput)> {
        let options = StackOptions::isolated(temp_root, &self.config.preview);
        let stack = self.engine.create_isolated_stack(work_dir, &options).await?;
        tracing::debug!(stack = stack.name(), "Stack ready");

        let install = self.installers.install(work_dir, request).await?;
        if let InstallOutcome::Installed {
            package,
            version,
            availability,
            ..
        } = &install
        {
            tracing::info!(
                %package,
                %version,
                attempts = availability.map(|a| a.attempts),
                "Installed published SDK"
            );
        }

        tracing::info!(stack = stack.name(), "Running preview");
        let preview = stack.preview().await?;
        tracing::debug!("preview stdout:\n{}", preview.stdout);
        tracing::debug!("preview stderr:\n{}", preview.stderr);

        Ok((install, preview))
    }
}
