// NuGet installer: exact-version package reference plus a cleared `obj/`
// so the next restore can't reuse stale assets.

use std::path::{Path, PathBuf};

use super::{package_ref, InstallOutcome, Step};
use crate::availability::AvailabilityPoller;
use crate::config::VerifyConfig;
use crate::error::Result;
use crate::process::ProcessRunner;
use crate::registry::NugetFeedCheck;
use crate::request::{Ecosystem, VerificationRequest};
use crate::version::dotnet_exact_version;

pub const BUILD_ASSETS_DIR: &str = "obj";

pub struct DotnetInstaller<'a> {
    runner: &'a dyn ProcessRunner,
    http: reqwest::Client,
    config: &'a VerifyConfig,
}

impl<'a> DotnetInstaller<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, http: reqwest::Client, config: &'a VerifyConfig) -> Self {
        Self {
            runner,
            http,
            config,
        }
    }

    fn poller(&self) -> AvailabilityPoller {
        AvailabilityPoller::new(self.config.polling.nuget_timeout())
            .with_interval(self.config.polling.interval())
    }

    pub async fn install(
        &self,
        work_dir: &Path,
        request: &VerificationRequest,
    ) -> Result<InstallOutcome> {
        let step = Step::new(self.runner, Ecosystem::Dotnet, work_dir, self.config);
        let package = package_ref(request);
        let version = request.package_version.clone();

        step.tolerated(
            "remove any existing dotnet package",
            step.command("dotnet", ["remove", "package", package.as_str()]),
        )
        .await;

        let check = NugetFeedCheck::new(
            self.http.clone(),
            &self.config.registries.nuget_flat_container,
            &package,
            &version,
        )?;
        tracing::debug!(url = %check.url(), "Polling NuGet flat container");
        let availability = self
            .poller()
            .wait_until_available(&package, &version, &check)
            .await?;

        let exact_version = dotnet_exact_version(&version);
        step.fatal(
            "install dotnet package",
            step.command(
                "dotnet",
                [
                    "add",
                    "package",
                    package.as_str(),
                    "--version",
                    exact_version.as_str(),
                ],
            ),
        )
        .await?;

        clear_build_assets(work_dir).await;

        Ok(InstallOutcome::Installed {
            ecosystem: Ecosystem::Dotnet,
            package,
            version,
            availability: Some(availability),
        })
    }
}

/// Delete `obj/` so the preview's build resolves dependencies from scratch.
/// Failures are logged only.
pub async fn clear_build_assets(work_dir: &Path) -> Option<PathBuf> {
    let assets = work_dir.join(BUILD_ASSETS_DIR);
    match tokio::fs::remove_dir_all(&assets).await {
        Ok(()) => {
            tracing::debug!(path = %assets.display(), "Cleared build assets cache");
            Some(assets)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::debug!(
                path = %assets.display(),
                error = %e,
                "Failed to clear build assets cache"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_clear_build_assets_removes_obj() {
        let dir = tempdir().unwrap();
        let obj = dir.path().join("obj");
        std::fs::create_dir_all(obj.join("Debug")).unwrap();
        std::fs::write(obj.join("project.assets.json"), "{}").unwrap();

        assert_eq!(clear_build_assets(dir.path()).await, Some(obj.clone()));
        assert!(!obj.exists());
    }

    #[tokio::test]
    async fn test_clear_build_assets_tolerates_missing_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(clear_build_assets(dir.path()).await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clear_build_assets_tolerates_removal_failure() {
        let dir = tempdir().unwrap();
        let obj = dir.path().join("obj");
        std::fs::write(&obj, "not a directory").unwrap();

        assert_eq!(clear_build_assets(dir.path()).await, None);
        assert!(obj.is_file());
    }
}
