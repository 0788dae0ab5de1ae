// CLI interface for verify-release using clap.
//
// Every input can also come from the `INPUT_*` variables GitHub Actions sets
// for action inputs, so the binary runs unchanged as an action step.
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::VerifyConfig;
use crate::engine::PulumiCli;
use crate::error::{exit_codes, Result, VerifyError};
use crate::logging::{init_logging, LogConfig};
use crate::process::{ProcessManager, ProcessRunner};
use crate::registry::http_client;
use crate::request::RawInputs;
use crate::verify::ReleaseVerifier;

#[derive(Parser, Debug)]
#[command(
    name = "verify-release",
    about = "Verify that a published provider SDK installs into a sample program and previews cleanly",
    version = crate::VERSION
)]
pub struct Cli {
    /// Language of the sample program (python, nodejs, dotnet, go, java, yaml)
    #[arg(long, env = "INPUT_LANGUAGE")]
    pub language: Option<String>,

    /// Directory containing the sample program
    #[arg(long, env = "INPUT_DIRECTORY")]
    pub directory: Option<String>,

    /// Provider name, e.g. `random`
    #[arg(long, env = "INPUT_PROVIDER")]
    pub provider: Option<String>,

    /// Released provider version (semver)
    #[arg(long, env = "INPUT_PROVIDERVERSION")]
    pub provider_version: Option<String>,

    /// Published SDK version; defaults to the provider version
    #[arg(long, env = "INPUT_PACKAGEVERSION")]
    pub package_version: Option<String>,

    /// Package publisher, e.g. `pulumi`
    #[arg(long, env = "INPUT_PUBLISHER")]
    pub publisher: Option<String>,

    /// Go module path template with {publisher}, {provider} and {moduleVersionSuffix}
    #[arg(long, env = "INPUT_GOMODULETEMPLATE")]
    pub go_module_template: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "VERIFY_RELEASE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Log output format (pretty, json, compact)
    #[arg(long, value_name = "FORMAT", value_parser = ["pretty", "json", "compact"])]
    pub log_format: Option<String>,

    /// Control color output (auto, always, never)
    #[arg(long, value_name = "WHEN", value_parser = ["auto", "always", "never"])]
    pub color: Option<String>,
}

impl Cli {
    pub fn log_config(&self) -> LogConfig {
        LogConfig::from_cli(
            self.verbose,
            self.quiet,
            self.log_format.clone(),
            self.color.clone(),
        )
    }

    /// Inputs as received. Missing values become empty strings and are
    /// rejected by validation with the same message an empty action input gets.
    pub fn raw_inputs(&self) -> RawInputs {
        RawInputs {
            language: self.language.clone().unwrap_or_default(),
            directory: self.directory.clone().unwrap_or_default(),
            provider: self.provider.clone().unwrap_or_default(),
            provider_version: self.provider_version.clone().unwrap_or_default(),
            package_version: non_empty(&self.package_version),
            publisher: self.publisher.clone().unwrap_or_default(),
            go_module_template: non_empty(&self.go_module_template),
        }
    }

    pub fn run(&self) -> Result<i32> {
        if let Err(e) = init_logging(self.log_config()) {
            eprintln!("Failed to initialize logging: {e}");
        }
        tracing::debug!(version = %crate::version_info(), "Starting");

        let request = self.raw_inputs().validate()?;
        let config = VerifyConfig::load(self.config.as_deref())?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let runner: Arc<dyn ProcessRunner> =
                Arc::new(ProcessManager::with_default_timeout(config.commands.timeout()));
            let engine = Arc::new(PulumiCli::new(
                Arc::clone(&runner),
                config.commands.timeout(),
            ));
            let http = http_client(&config.registries)?;
            let verifier = ReleaseVerifier::new(runner, engine, http, config);
            verifier.verify(&request).await
        })?;

        Ok(exit_codes::SUCCESS)
    }

    /// Emit the single failure line for a run
    pub fn report_failure(&self, error: &VerifyError) {
        let github_actions = std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");
        let use_colors = self.log_config().should_use_colors();
        let report = failure_report(error, github_actions, use_colors);
        if github_actions {
            println!("{report}");
        } else {
            eprintln!("{report}");
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

/// `::error::` workflow command under GitHub Actions, the formatted error otherwise
pub fn failure_report(error: &VerifyError, github_actions: bool, use_colors: bool) -> String {
    if github_actions {
        format!("::error::{}", escape_workflow_data(&error.to_string()))
    } else {
        error.user_message(use_colors)
    }
}

/// Workflow command data escaping; `%` must go first
fn escape_workflow_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
