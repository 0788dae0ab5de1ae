// Verification inputs: the closed set of ecosystems and the validated request
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{InputError, Result, VerifyError};
use crate::version;

/// Packaging ecosystems a release can be verified against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ecosystem {
    Nodejs,
    Python,
    Dotnet,
    Go,
    /// Accepted input with no installer yet.
    Java,
    /// Accepted input with no installer yet.
    Yaml,
}

impl Ecosystem {
    pub const ALL: [Ecosystem; 6] = [
        Ecosystem::Python,
        Ecosystem::Nodejs,
        Ecosystem::Dotnet,
        Ecosystem::Go,
        Ecosystem::Java,
        Ecosystem::Yaml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Nodejs => "nodejs",
            Ecosystem::Python => "python",
            Ecosystem::Dotnet => "dotnet",
            Ecosystem::Go => "go",
            Ecosystem::Java => "java",
            Ecosystem::Yaml => "yaml",
        }
    }

    /// Whether an installer exists for this ecosystem
    pub fn has_installer(&self) -> bool {
        !matches!(self, Ecosystem::Java | Ecosystem::Yaml)
    }

    /// Package identifier the ecosystem's package manager knows the provider SDK by.
    /// Go is absent because its identifier comes from the module template.
    pub fn package_ref(&self, publisher: &str, provider: &str) -> Option<String> {
        match self {
            Ecosystem::Nodejs => Some(format!("@{publisher}/{provider}")),
            Ecosystem::Python => Some(format!("{publisher}-{provider}")),
            Ecosystem::Dotnet => Some(format!("{publisher}.{provider}")),
            Ecosystem::Go | Ecosystem::Java | Ecosystem::Yaml => None,
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self> {
        Ecosystem::ALL
            .into_iter()
            .find(|ecosystem| ecosystem.as_str() == s)
            .ok_or_else(|| {
                InputError::UnsupportedLanguage {
                    language: s.to_string(),
                    supported: Ecosystem::ALL.iter().map(|e| e.as_str().to_string()).collect(),
                }
                .into()
            })
    }
}

/// A fully validated verification request
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub ecosystem: Ecosystem,
    pub source_directory: PathBuf,
    pub provider: String,
    pub publisher: String,
    pub provider_version: semver::Version,
    /// Version requested from the package manager; may differ from the provider version.
    pub package_version: String,
    pub go_module_template: String,
}

impl VerificationRequest {
    pub fn builder(ecosystem: Ecosystem, source_directory: impl Into<PathBuf>) -> RequestBuilder {
        RequestBuilder {
            ecosystem,
            source_directory: source_directory.into(),
            provider: String::new(),
            publisher: String::new(),
            provider_version: semver::Version::new(0, 0, 0),
            package_version: None,
            go_module_template: String::new(),
        }
    }

    pub fn package_ref(&self) -> Option<String> {
        self.ecosystem.package_ref(&self.publisher, &self.provider)
    }

    /// Provider version rendered the way it was released
    pub fn provider_version_string(&self) -> String {
        self.provider_version.to_string()
    }
}

/// Builder for requests whose inputs are already known to be valid
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    ecosystem: Ecosystem,
    source_directory: PathBuf,
    provider: String,
    publisher: String,
    provider_version: semver::Version,
    package_version: Option<String>,
    go_module_template: String,
}

impl RequestBuilder {
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    pub fn provider_version(mut self, version: semver::Version) -> Self {
        self.provider_version = version;
        self
    }

    pub fn package_version(mut self, version: impl Into<String>) -> Self {
        self.package_version = Some(version.into());
        self
    }

    pub fn go_module_template(mut self, template: impl Into<String>) -> Self {
        self.go_module_template = template.into();
        self
    }

    pub fn build(self) -> VerificationRequest {
        let package_version = self
            .package_version
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.provider_version.to_string());
        VerificationRequest {
            ecosystem: self.ecosystem,
            source_directory: self.source_directory,
            provider: self.provider,
            publisher: self.publisher,
            provider_version: self.provider_version,
            package_version,
            go_module_template: self.go_module_template,
        }
    }
}

/// Unvalidated inputs exactly as received from flags or the action environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInputs {
    pub language: String,
    pub directory: String,
    pub provider: String,
    pub provider_version: String,
    pub package_version: Option<String>,
    pub publisher: String,
    pub go_module_template: Option<String>,
}

impl RawInputs {
    /// Validate in a fixed order: language, directory, provider version.
    /// Nothing is written and no command is run before all three pass.
    pub fn validate(&self) -> Result<VerificationRequest> {
        let ecosystem: Ecosystem = self.language.parse()?;
        check_directory_access(Path::new(&self.directory))?;
        let provider_version = version::parse_provider_version(&self.provider_version)?;
        let go_module_template = self.go_module_template.clone().unwrap_or_default();
        if ecosystem == Ecosystem::Go && go_module_template.trim().is_empty() {
            return Err(InputError::MissingGoModuleTemplate.into());
        }

        let mut builder = VerificationRequest::builder(ecosystem, &self.directory)
            .provider(&self.provider)
            .publisher(&self.publisher)
            .provider_version(provider_version)
            .go_module_template(go_module_template);
        if let Some(package_version) = &self.package_version {
            builder = builder.package_version(package_version);
        }
        Ok(builder.build())
    }
}

fn check_directory_access(path: &Path) -> Result<()> {
    let access = std::fs::metadata(path).and_then(|metadata| {
        if metadata.is_dir() {
            std::fs::read_dir(path).map(|_| ())
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a directory",
            ))
        }
    });

    access.map_err(|e| {
        InputError::DirectoryAccess {
            path: path.to_path_buf(),
            error: e.to_string(),
        }
        .into()
    })
}
