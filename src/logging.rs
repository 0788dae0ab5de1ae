// Tracing subscriber setup. Events always go to stderr: under GitHub Actions
// stdout carries the workflow commands.
use std::io::{self, IsTerminal};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Result, VerifyError};

/// Filter target for this crate's events
pub const LOG_TARGET: &str = "verify_release";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub color: ColorConfig,
    /// Print module paths next to each event
    pub show_targets: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    /// One JSON object per line
    Json,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorConfig {
    /// Colors on an interactive stderr unless `NO_COLOR` or `TERM=dumb` says otherwise
    Auto,
    Always,
    Never,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl FromStr for ColorConfig {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ColorConfig::Auto),
            "always" => Ok(ColorConfig::Always),
            "never" => Ok(ColorConfig::Never),
            other => Err(format!("unknown color mode: {other}")),
        }
    }
}

impl ColorConfig {
    pub fn enabled(self) -> bool {
        match self {
            ColorConfig::Always => true,
            ColorConfig::Never => false,
            ColorConfig::Auto => {
                io::stderr().is_terminal()
                    && std::env::var_os("NO_COLOR").is_none()
                    && std::env::var("TERM").map_or(true, |term| term != "dumb")
            }
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            color: ColorConfig::Auto,
            show_targets: false,
        }
    }
}

impl LogConfig {
    /// Build from the `--verbose/--quiet/--log-format/--color` flags.
    /// Unrecognised format or color values fall back to the defaults.
    pub fn from_cli(
        verbose: bool,
        quiet: bool,
        format: Option<String>,
        color: Option<String>,
    ) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => Level::ERROR,
            (false, true) => Level::DEBUG,
            (false, false) => Level::INFO,
        };

        Self {
            level,
            format: format
                .and_then(|f| f.parse().ok())
                .unwrap_or(LogFormat::Pretty),
            color: color
                .and_then(|c| c.parse().ok())
                .unwrap_or(ColorConfig::Auto),
            show_targets: verbose,
        }
    }

    pub fn should_use_colors(&self) -> bool {
        self.color.enabled()
    }

    /// `RUST_LOG` wins over the CLI level when set
    pub fn env_filter(&self) -> EnvFilter {
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
            _ => EnvFilter::new(format!(
                "{LOG_TARGET}={}",
                self.level.as_str().to_lowercase()
            )),
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let ansi = config.should_use_colors();
    let builder = fmt()
        .with_env_filter(config.env_filter())
        .with_writer(io::stderr)
        .with_target(config.show_targets);

    let installed = match config.format {
        LogFormat::Pretty => builder.with_ansi(ansi).try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().with_ansi(ansi).try_init(),
    };

    installed.map_err(|e| VerifyError::Io(io::Error::other(e)))
}

/// Spans and events shared by the orchestrator and the CLI
pub mod utils {
    use tracing::{info, span, warn, Level, Span};

    pub fn verification_span(ecosystem: &str, provider: &str) -> Span {
        span!(Level::INFO, "verification", ecosystem = %ecosystem, provider = %provider)
    }

    pub fn log_verification_completion(ecosystem: &str, success: bool, duration_ms: u128) {
        if success {
            info!(%ecosystem, duration_ms, "Release verified");
        } else {
            // The failure itself is reported once by the caller
            warn!(%ecosystem, duration_ms, "Release verification failed");
        }
    }
}
