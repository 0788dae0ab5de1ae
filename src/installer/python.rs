// pip installer: fresh virtualenv per run, then pin `publisher-provider==version`

use std::path::{Path, PathBuf};

use super::{package_ref, InstallOutcome, Step};
use crate::availability::AvailabilityPoller;
use crate::config::VerifyConfig;
use crate::error::Result;
use crate::process::ProcessRunner;
use crate::registry::PypiIndexCheck;
use crate::request::{Ecosystem, VerificationRequest};

pub const VENV_DIR: &str = "venv";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

pub fn python_program() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

/// pip inside the run's virtualenv
pub fn venv_pip(work_dir: &Path) -> PathBuf {
    let venv = work_dir.join(VENV_DIR);
    if cfg!(windows) {
        venv.join("Scripts").join("pip.exe")
    } else {
        venv.join("bin").join("pip")
    }
}

pub struct PythonInstaller<'a> {
    runner: &'a dyn ProcessRunner,
    config: &'a VerifyConfig,
}

impl<'a> PythonInstaller<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, config: &'a VerifyConfig) -> Self {
        Self { runner, config }
    }

    fn poller(&self) -> AvailabilityPoller {
        AvailabilityPoller::new(self.config.polling.pypi_timeout())
            .with_interval(self.config.polling.interval())
    }

    pub async fn install(
        &self,
        work_dir: &Path,
        request: &VerificationRequest,
    ) -> Result<InstallOutcome> {
        let step = Step::new(self.runner, Ecosystem::Python, work_dir, self.config);
        let package = package_ref(request);
        let version = request.package_version.clone();
        let pip = venv_pip(work_dir);
        let pip_program = pip.to_string_lossy().to_string();

        step.fatal(
            "create virtualenv",
            step.command(python_program(), ["-m", "venv", VENV_DIR]),
        )
        .await?;

        step.tolerated(
            "remove any existing pip package",
            step.command(pip_program.as_str(), ["uninstall", "-y", package.as_str()]),
        )
        .await;

        let check = PypiIndexCheck::new(
            self.runner,
            &pip,
            work_dir,
            &package,
            &version,
            self.config.commands.timeout(),
        );
        let availability = self
            .poller()
            .wait_until_available(&package, &version, &check)
            .await?;

        let package_version_ref = format!("{package}=={version}");
        step.fatal(
            "install pip package",
            step.command(pip_program.as_str(), ["install", package_version_ref.as_str()]),
        )
        .await?;

        step.fatal(
            "install requirements.txt",
            step.command(pip_program.as_str(), ["install", "-r", REQUIREMENTS_FILE]),
        )
        .await?;

        Ok(InstallOutcome::Installed {
            ecosystem: Ecosystem::Python,
            package,
            version,
            availability: Some(availability),
        })
    }
}
