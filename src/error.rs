// Error handling framework for verify-release
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VerifyError>;

/// Main error type for verify-release with a flat-ish error hierarchy
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Invalid caller input. Rendered verbatim so the failure message names the bad value.
    #[error("{0}")]
    Input(#[from] Box<InputError>),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<ConfigError>),

    #[error("{0}")]
    Availability(#[from] Box<AvailabilityError>),

    #[error("{0}")]
    Install(#[from] Box<InstallError>),

    #[error("Process execution failed: {0}")]
    Process(#[from] Box<ProcessError>),

    #[error("Preview failed: {0}")]
    Preview(#[from] Box<PreviewError>),

    #[error("Staging failed: {0}")]
    Staging(#[from] Box<StagingError>),

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Precondition failures detected before any installer runs
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Unsupported language: {language}")]
    UnsupportedLanguage {
        language: String,
        supported: Vec<String>,
    },

    #[error("Can't access directory {}: {error}", path.display())]
    DirectoryAccess { path: PathBuf, error: String },

    #[error("Invalid provider version: {version}")]
    InvalidProviderVersion { version: String, error: String },

    #[error("Invalid module version: {version}")]
    InvalidModuleVersion { version: String, reason: String },

    #[error("Missing Go module template: expected placeholders {{publisher}}, {{provider}} and {{moduleVersionSuffix}}")]
    MissingGoModuleTemplate,
}

/// Configuration-file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", path.display())]
    NotFound {
        path: PathBuf,
        suggestion: Option<String>,
    },

    #[error("Invalid YAML syntax: {message}")]
    InvalidYaml {
        message: String,
        line: Option<u32>,
        column: Option<u32>,
        file_path: Option<PathBuf>,
    },

    #[error("Invalid configuration value for {field}: {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },
}

/// Registry availability failures
#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error("Timed out after {timeout:?} waiting for {package}@{version} to become available")]
    Timeout {
        package: String,
        version: String,
        timeout: Duration,
        attempts: u32,
    },

    #[error("Registry reported version {reported} for {package}, expected {expected}")]
    VersionMismatch {
        package: String,
        expected: String,
        reported: String,
    },
}

/// Fatal package-manager failures
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Failed to {step} for {ecosystem}: {command}\n{stderr}\n{stdout}")]
    CommandFailed {
        ecosystem: String,
        step: String,
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

/// Process execution errors
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Command not found: {command}")]
    CommandNotFound {
        command: String,
        suggestion: Option<String>,
    },

    #[error("Process spawn failed: {command}: {error}")]
    SpawnFailed { command: String, error: String },

    #[error("Process timeout after {duration:?}: {command}")]
    Timeout { command: String, duration: Duration },

    #[error("Output capture failed: {message}")]
    OutputCaptureFailed { message: String, command: String },
}

/// Preview engine errors
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("could not create stack {stack} in {}: {stderr}", work_dir.display())]
    StackCreationFailed {
        stack: String,
        work_dir: PathBuf,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("preview of stack {stack} exited with {exit_code:?}\n{stderr}\n{stdout}")]
    PreviewFailed {
        stack: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

/// Temporary workspace errors
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("could not create temporary directory: {error}")]
    TempDirFailed { error: String },

    #[error("could not copy {} to {}: {error}", from.display(), to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Format errors with colors and context
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Format an error with context and colors
    pub fn format_error(&self, error: &VerifyError) -> String {
        let mut output = String::new();

        if self.use_colors {
            output.push_str("\x1b[31m");
        }
        output.push_str("Error: ");
        if self.use_colors {
            output.push_str("\x1b[0m");
        }

        output.push_str(&error.to_string());

        match error {
            VerifyError::Input(input_err) => self.add_input_context(&mut output, input_err),
            VerifyError::Config(config_err) => self.add_config_context(&mut output, config_err),
            VerifyError::Process(process_err) => {
                self.add_process_context(&mut output, process_err)
            }
            VerifyError::Availability(availability_err) => {
                if let AvailabilityError::Timeout { attempts, .. } = availability_err.as_ref() {
                    output.push_str(&format!("\n  Attempts: {attempts}"));
                }
            }
            _ => {}
        }

        output
    }

    fn add_input_context(&self, output: &mut String, error: &InputError) {
        if let InputError::UnsupportedLanguage { supported, .. } = error {
            output.push_str(&format!("\n  Help: expected one of {}", supported.join(", ")));
        }
    }

    fn add_config_context(&self, output: &mut String, error: &ConfigError) {
        match error {
            ConfigError::InvalidYaml {
                file_path: Some(path),
                line: Some(line),
                ..
            } => {
                output.push_str(&format!("\n  --> {}:{}", path.display(), line));
            }
            ConfigError::NotFound {
                suggestion: Some(suggestion),
                ..
            } => {
                output.push_str(&format!("\n  Help: {suggestion}"));
            }
            _ => {}
        }
    }

    fn add_process_context(&self, output: &mut String, error: &ProcessError) {
        match error {
            ProcessError::CommandNotFound {
                suggestion: Some(suggestion),
                ..
            } => {
                output.push_str(&format!("\n  Help: {suggestion}"));
            }
            ProcessError::Timeout { duration, .. } => {
                output.push_str(&format!("\n  Timeout: {duration:?}"));
            }
            _ => {}
        }
    }
}

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INPUT_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const INSTALL_FAILURE: i32 = 4;
    pub const PREVIEW_FAILURE: i32 = 5;
    pub const TIMEOUT_ERROR: i32 = 6;
    pub const PROCESS_ERROR: i32 = 7;
    pub const REGISTRY_ERROR: i32 = 8;
}

impl VerifyError {
    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            VerifyError::Input(_) => exit_codes::INPUT_ERROR,
            VerifyError::Config(_) => exit_codes::CONFIG_ERROR,
            VerifyError::Availability(err) => match err.as_ref() {
                AvailabilityError::Timeout { .. } => exit_codes::TIMEOUT_ERROR,
                AvailabilityError::VersionMismatch { .. } => exit_codes::REGISTRY_ERROR,
            },
            VerifyError::Install(_) => exit_codes::INSTALL_FAILURE,
            VerifyError::Process(err) => match err.as_ref() {
                ProcessError::Timeout { .. } => exit_codes::TIMEOUT_ERROR,
                _ => exit_codes::PROCESS_ERROR,
            },
            VerifyError::Preview(_) => exit_codes::PREVIEW_FAILURE,
            VerifyError::Staging(_) | VerifyError::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }

    /// Create a user-friendly error message with context
    pub fn user_message(&self, use_colors: bool) -> String {
        ErrorFormatter::new(use_colors).format_error(self)
    }

    /// Whether this is a precondition failure raised before any side effect
    pub fn is_precondition(&self) -> bool {
        matches!(self, VerifyError::Input(_))
    }
}

macro_rules! boxed_from {
    ($($inner:ident),* $(,)?) => {
        $(
            impl From<$inner> for VerifyError {
                fn from(error: $inner) -> Self {
                    VerifyError::from(Box::new(error))
                }
            }
        )*
    };
}

boxed_from!(
    InputError,
    ConfigError,
    AvailabilityError,
    InstallError,
    ProcessError,
    PreviewError,
    StagingError,
);

// Conversion from serde_yaml::Error to ConfigError
impl From<serde_yaml::Error> for Box<ConfigError> {
    fn from(error: serde_yaml::Error) -> Self {
        let location = error.location();
        Box::new(ConfigError::InvalidYaml {
            message: error.to_string(),
            line: location.as_ref().map(|l| l.line() as u32),
            column: location.as_ref().map(|l| l.column() as u32),
            file_path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display_is_verbatim() {
        let error = VerifyError::from(InputError::UnsupportedLanguage {
            language: "this is not a language".to_string(),
            supported: vec!["go".to_string()],
        });
        assert_eq!(error.to_string(), "Unsupported language: this is not a language");
        assert!(error.is_precondition());
        assert_eq!(error.exit_code(), exit_codes::INPUT_ERROR);
    }

    #[test]
    fn test_directory_access_names_path_and_cause() {
        let error = VerifyError::from(InputError::DirectoryAccess {
            path: PathBuf::from("tests/programs/nonexistent"),
            error: "No such file or directory (os error 2)".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Can't access directory tests/programs/nonexistent: No such file or directory (os error 2)"
        );
    }

    #[test]
    fn test_timeout_exit_code() {
        let error = VerifyError::from(AvailabilityError::Timeout {
            package: "@pulumi/random".to_string(),
            version: "4.16.2".to_string(),
            timeout: Duration::from_secs(900),
            attempts: 181,
        });
        assert_eq!(error.exit_code(), exit_codes::TIMEOUT_ERROR);
        assert!(error.to_string().contains("@pulumi/random@4.16.2"));
        assert!(error.user_message(false).contains("Attempts: 181"));
    }

    #[test]
    fn test_install_error_includes_captured_output() {
        let error = VerifyError::from(InstallError::CommandFailed {
            ecosystem: "nodejs".to_string(),
            step: "install package".to_string(),
            command: "npm install @pulumi/random@4.16.2".to_string(),
            exit_code: Some(1),
            stdout: "some stdout".to_string(),
            stderr: "npm ERR! 404".to_string(),
        });
        let message = error.to_string();
        assert!(message.contains("npm ERR! 404"));
        assert!(message.contains("some stdout"));
        assert_eq!(error.exit_code(), exit_codes::INSTALL_FAILURE);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = VerifyError::from(io_error);
        assert!(error.to_string().contains("IO operation failed"));
        assert!(!error.is_precondition());
    }
}
