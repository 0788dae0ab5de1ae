// Registry lookups answering "is this exact version published yet?"

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::availability::AvailabilityCheck;
use crate::config::RegistryConfig;
use crate::error::{AvailabilityError, Result, VerifyError};
use crate::process::{ProcessConfig, ProcessRunner};
use crate::version::{same_pep440_version, same_version};

/// `npm view <pkg>@<version> version --json`
pub struct NpmRegistryCheck<'a> {
    runner: &'a dyn ProcessRunner,
    npm: String,
    work_dir: PathBuf,
    package: String,
    version: String,
    command_timeout: Duration,
}

impl<'a> NpmRegistryCheck<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        npm: impl Into<String>,
        work_dir: &Path,
        package: impl Into<String>,
        version: impl Into<String>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            npm: npm.into(),
            work_dir: work_dir.to_path_buf(),
            package: package.into(),
            version: version.into(),
            command_timeout,
        }
    }
}

#[async_trait]
impl AvailabilityCheck for NpmRegistryCheck<'_> {
    async fn check(&self) -> Result<bool> {
        let package_version = format!("{}@{}", self.package, self.version);
        let result = self
            .runner
            .run(
                ProcessConfig::new(&self.npm)
                    .with_args(["view", package_version.as_str(), "version", "--json"])
                    .with_working_dir(&self.work_dir)
                    .with_timeout(self.command_timeout),
            )
            .await?;

        // npm exits non-zero with E404 until the version is visible.
        if !result.success() {
            tracing::debug!(
                package = %self.package,
                stderr = %result.stderr.trim(),
                "npm registry does not list the version yet"
            );
            return Ok(false);
        }

        let reported = parse_npm_versions(&result.stdout);
        if reported.is_empty() {
            return Ok(false);
        }
        if reported.iter().any(|v| same_version(v, &self.version)) {
            return Ok(true);
        }
        Err(AvailabilityError::VersionMismatch {
            package: self.package.clone(),
            expected: self.version.clone(),
            reported: reported.join(", "),
        }
        .into())
    }
}

/// `npm view --json` prints a JSON string for one match, an array for several,
/// and nothing at all for none.
pub fn parse_npm_versions(stdout: &str) -> Vec<String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(version)) => vec![version],
        Ok(serde_json::Value::Array(values)) => values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Ok(other) => vec![other.to_string()],
        Err(_) => vec![trimmed.to_string()],
    }
}

/// `pip index versions <pkg> --pre` run with the verification's own virtualenv
pub struct PypiIndexCheck<'a> {
    runner: &'a dyn ProcessRunner,
    pip: PathBuf,
    work_dir: PathBuf,
    package: String,
    version: String,
    command_timeout: Duration,
}

impl<'a> PypiIndexCheck<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        pip: &Path,
        work_dir: &Path,
        package: impl Into<String>,
        version: impl Into<String>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            pip: pip.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            package: package.into(),
            version: version.into(),
            command_timeout,
        }
    }
}

#[async_trait]
impl AvailabilityCheck for PypiIndexCheck<'_> {
    async fn check(&self) -> Result<bool> {
        let result = self
            .runner
            .run(
                ProcessConfig::new(self.pip.to_string_lossy())
                    .with_args(["index", "versions", self.package.as_str(), "--pre"])
                    .with_working_dir(&self.work_dir)
                    .with_timeout(self.command_timeout),
            )
            .await?;

        if !result.success() {
            tracing::debug!(
                package = %self.package,
                stderr = %result.stderr.trim(),
                "pip index query failed"
            );
            return Ok(false);
        }

        let versions = parse_pip_index_versions(&result.stdout);
        Ok(versions
            .iter()
            .any(|v| same_pep440_version(v, &self.version)))
    }
}

/// Pull the list out of pip's `Available versions: 4.16.2, 4.16.1, ...` line.
pub fn parse_pip_index_versions(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("Available versions:"))
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Client for registry HTTP checks. Every request is bounded by
/// `registries.request_timeout_secs`.
pub fn http_client(config: &RegistryConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("{}/{}", crate::NAME, crate::VERSION))
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| VerifyError::Io(std::io::Error::other(e)))
}

/// HEAD against NuGet's flat-container `.nupkg` URL
pub struct NugetFeedCheck {
    client: reqwest::Client,
    url: url::Url,
}

impl NugetFeedCheck {
    pub fn new(
        client: reqwest::Client,
        flat_container: &str,
        package: &str,
        version: &str,
    ) -> Result<Self> {
        Ok(Self {
            client,
            url: nuget_package_url(flat_container, package, version)?,
        })
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

#[async_trait]
impl AvailabilityCheck for NugetFeedCheck {
    async fn check(&self) -> Result<bool> {
        match self.client.head(self.url.clone()).send().await {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(url = %self.url, %status, "NuGet feed responded");
                Ok(status == reqwest::StatusCode::OK)
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "NuGet feed request failed");
                Ok(false)
            }
        }
    }
}

/// `{base}/{id}/{version}/{id}.{version}.nupkg`, lower-cased as the feed requires
pub fn nuget_package_url(flat_container: &str, package: &str, version: &str) -> Result<url::Url> {
    let id = package.to_lowercase();
    let version = version.to_lowercase();
    let base = if flat_container.ends_with('/') {
        flat_container.to_string()
    } else {
        format!("{flat_container}/")
    };
    url::Url::parse(&base)
        .and_then(|base| base.join(&format!("{id}/{version}/{id}.{version}.nupkg")))
        .map_err(|e| {
            VerifyError::from(crate::error::ConfigError::InvalidValue {
                field: "registries.nuget_flat_container".to_string(),
                value: flat_container.to_string(),
                message: e.to_string(),
            })
        })
}
