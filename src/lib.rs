// verify-release: checks that a freshly published provider SDK can be
// installed into a sample program and previewed.

pub mod availability;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod installer;
pub mod logging;
pub mod process;
pub mod registry;
pub mod request;
pub mod staging;
pub mod verify;
pub mod version;

pub use availability::{AvailabilityCheck, AvailabilityPoller, PollOutcome, PollState};
pub use config::VerifyConfig;
pub use engine::{PreviewEngine, PreviewOutput, PulumiCli, Stack, StackOptions};
pub use error::{
    exit_codes, AvailabilityError, ConfigError, InputError, InstallError, PreviewError,
    ProcessError, Result, StagingError, VerifyError,
};
pub use installer::{InstallOutcome, Installers};
pub use logging::{ColorConfig, LogConfig, LogFormat};
pub use process::{ProcessConfig, ProcessManager, ProcessResult, ProcessRunner};
pub use registry::{NpmRegistryCheck, NugetFeedCheck, PypiIndexCheck};
pub use request::{Ecosystem, RawInputs, VerificationRequest};
pub use staging::StagedWorkspace;
pub use verify::{ReleaseVerifier, VerificationReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

// Build information (set by build script)
pub const BUILD_DATE: &str = env!("BUILD_DATE");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const RUST_VERSION: &str = env!("RUST_VERSION");

/// Get formatted version string with build information
pub fn version_info() -> String {
    format!("{NAME} {VERSION} (commit: {GIT_COMMIT}, built: {BUILD_DATE}, rustc: {RUST_VERSION})")
}
