// Go installer: pins the module in go.mod and tidies.
//
// The requirement is written with `go mod edit` instead of fetched with
// `go get`, so a module proxy that hasn't indexed the tag yet doesn't fail the
// edit; `go mod tidy` then resolves it.

use std::path::Path;

use super::{InstallOutcome, Step};
use crate::config::VerifyConfig;
use crate::error::Result;
use crate::process::ProcessRunner;
use crate::request::{Ecosystem, VerificationRequest};
use crate::version::{go_module_path, go_module_version};

pub struct GoInstaller<'a> {
    runner: &'a dyn ProcessRunner,
    config: &'a VerifyConfig,
}

impl<'a> GoInstaller<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, config: &'a VerifyConfig) -> Self {
        Self { runner, config }
    }

    pub async fn install(
        &self,
        work_dir: &Path,
        request: &VerificationRequest,
    ) -> Result<InstallOutcome> {
        let step = Step::new(self.runner, Ecosystem::Go, work_dir, self.config);
        let module = go_module_path(
            &request.go_module_template,
            &request.publisher,
            &request.provider,
            &request.provider_version_string(),
        )?;
        let version = go_module_version(&request.package_version);
        tracing::debug!(%module, %version, "Resolved Go module");

        let requirement = format!("-require={module}@{version}");
        step.fatal(
            "require go module",
            step.command("go", ["mod", "edit", requirement.as_str()]),
        )
        .await?;

        step.fatal("tidy go modules", step.command("go", ["mod", "tidy"]))
            .await?;

        Ok(InstallOutcome::Installed {
            ecosystem: Ecosystem::Go,
            package: module,
            version,
            availability: None,
        })
    }
}
