// npm installer: swaps `@publisher/provider` in the sample's package.json

use std::path::Path;

use super::{package_ref, InstallOutcome, Step};
use crate::availability::AvailabilityPoller;
use crate::config::VerifyConfig;
use crate::error::Result;
use crate::process::ProcessRunner;
use crate::registry::NpmRegistryCheck;
use crate::request::{Ecosystem, VerificationRequest};

/// npm ships as a batch script on Windows
pub fn npm_program() -> &'static str {
    if cfg!(windows) {
        "npm.cmd"
    } else {
        "npm"
    }
}

pub struct NodejsInstaller<'a> {
    runner: &'a dyn ProcessRunner,
    config: &'a VerifyConfig,
}

impl<'a> NodejsInstaller<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, config: &'a VerifyConfig) -> Self {
        Self { runner, config }
    }

    fn poller(&self) -> AvailabilityPoller {
        AvailabilityPoller::new(self.config.polling.npm_timeout())
            .with_interval(self.config.polling.interval())
    }

    pub async fn install(
        &self,
        work_dir: &Path,
        request: &VerificationRequest,
    ) -> Result<InstallOutcome> {
        let step = Step::new(self.runner, Ecosystem::Nodejs, work_dir, self.config);
        let package = package_ref(request);
        let version = request.package_version.clone();

        step.tolerated(
            "remove any existing npm package",
            step.command(npm_program(), ["remove", package.as_str()]),
        )
        .await;

        let check = NpmRegistryCheck::new(
            self.runner,
            npm_program(),
            work_dir,
            &package,
            &version,
            self.config.commands.timeout(),
        );
        let availability = self
            .poller()
            .wait_until_available(&package, &version, &check)
            .await?;

        let package_version_ref = format!("{package}@{version}");
        step.fatal(
            "install npm package",
            step.command(npm_program(), ["install", package_version_ref.as_str()]),
        )
        .await?;

        Ok(InstallOutcome::Installed {
            ecosystem: Ecosystem::Nodejs,
            package,
            version,
            availability: Some(availability),
        })
    }
}
