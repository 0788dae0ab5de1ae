// Configuration handling for verify-release
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, Result, VerifyError};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_NPM_TIMEOUT_SECS: u64 = 15 * 60;
pub const DEFAULT_PYPI_TIMEOUT_SECS: u64 = 15 * 60;
// NuGet's CDN propagates much more slowly than the other registries.
pub const DEFAULT_NUGET_TIMEOUT_SECS: u64 = 60 * 60;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30 * 60;
pub const DEFAULT_NUGET_FLAT_CONTAINER: &str = "https://api.nuget.org/v3-flatcontainer/";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STACK_NAME: &str = "verify-release";
pub const DEFAULT_PASSPHRASE: &str = "correct-horse-battery-staple";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    pub polling: PollingConfig,
    pub registries: RegistryConfig,
    pub commands: CommandConfig,
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub npm_timeout_secs: u64,
    pub pypi_timeout_secs: u64,
    pub nuget_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub nuget_flat_container: String,
    /// Per-request limit for registry HTTP calls
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub stack_name: String,
    /// Only isolates the throwaway stack's secrets; it protects nothing real.
    pub passphrase: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            npm_timeout_secs: DEFAULT_NPM_TIMEOUT_SECS,
            pypi_timeout_secs: DEFAULT_PYPI_TIMEOUT_SECS,
            nuget_timeout_secs: DEFAULT_NUGET_TIMEOUT_SECS,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn npm_timeout(&self) -> Duration {
        Duration::from_secs(self.npm_timeout_secs)
    }

    pub fn pypi_timeout(&self) -> Duration {
        Duration::from_secs(self.pypi_timeout_secs)
    }

    pub fn nuget_timeout(&self) -> Duration {
        Duration::from_secs(self.nuget_timeout_secs)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            nuget_flat_container: DEFAULT_NUGET_FLAT_CONTAINER.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl RegistryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

impl CommandConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            passphrase: DEFAULT_PASSPHRASE.to_string(),
        }
    }
}

impl VerifyConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
                suggestion: Some(
                    "Pass --config only when a verify-release YAML file exists".to_string(),
                ),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_with_context(&content, Some(path))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_yaml_with_context(yaml, None)
    }

    fn from_yaml_with_context(yaml: &str, file_path: Option<&Path>) -> Result<Self> {
        let config: VerifyConfig = serde_yaml::from_str(yaml).map_err(|e| {
            let mut config_error = Box::<ConfigError>::from(e);
            if let ConfigError::InvalidYaml {
                file_path: ref mut path,
                ..
            } = *config_error
            {
                *path = file_path.map(Path::to_path_buf);
            }
            VerifyError::Config(config_error)
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file, falling back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("polling.interval_secs", self.polling.interval_secs),
            ("polling.npm_timeout_secs", self.polling.npm_timeout_secs),
            ("polling.pypi_timeout_secs", self.polling.pypi_timeout_secs),
            ("polling.nuget_timeout_secs", self.polling.nuget_timeout_secs),
            ("registries.request_timeout_secs", self.registries.request_timeout_secs),
            ("commands.timeout_secs", self.commands.timeout_secs),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    message: "must be greater than zero".to_string(),
                }
                .into());
            }
        }

        url::Url::parse(&self.registries.nuget_flat_container).map_err(|e| {
            VerifyError::from(ConfigError::InvalidValue {
                field: "registries.nuget_flat_container".to_string(),
                value: self.registries.nuget_flat_container.clone(),
                message: e.to_string(),
            })
        })?;

        if self.preview.stack_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "preview.stack_name".to_string(),
                value: self.preview.stack_name.clone(),
                message: "must not be empty".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VerifyConfig::default();
        assert_eq!(config.polling.interval(), Duration::from_secs(5));
        assert_eq!(config.polling.npm_timeout(), Duration::from_secs(900));
        assert_eq!(config.polling.pypi_timeout(), Duration::from_secs(900));
        assert_eq!(config.polling.nuget_timeout(), Duration::from_secs(3600));
        assert_eq!(config.registries.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.preview.stack_name, "verify-release");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = VerifyConfig::from_yaml(
            r#"
polling:
  nuget_timeout_secs: 120
registries:
  nuget_flat_container: http://localhost:8080/flat/
"#,
        )
        .unwrap();
        assert_eq!(config.polling.nuget_timeout_secs, 120);
        assert_eq!(config.polling.interval_secs, 5);
        assert_eq!(
            config.registries.nuget_flat_container,
            "http://localhost:8080/flat/"
        );
        assert_eq!(config.commands.timeout_secs, DEFAULT_COMMAND_TIMEOUT_SECS);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = VerifyConfig::from_yaml("polling:\n  interval_secs: 0\n").unwrap_err();
        assert!(err.to_string().contains("polling.interval_secs"));
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let err =
            VerifyConfig::from_yaml("registries:\n  request_timeout_secs: 0\n").unwrap_err();
        assert!(err.to_string().contains("registries.request_timeout_secs"));
    }

    #[test]
    fn test_bad_url_rejected() {
        let err =
            VerifyConfig::from_yaml("registries:\n  nuget_flat_container: not a url\n").unwrap_err();
        assert!(err.to_string().contains("nuget_flat_container"));
    }

    #[test]
    fn test_unknown_field_is_yaml_error() {
        let err = VerifyConfig::from_yaml("polling:\n  intervall_secs: 3\n").unwrap_err();
        assert!(matches!(err, VerifyError::Config(ref e) if matches!(**e, ConfigError::InvalidYaml { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = VerifyConfig::from_file(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
