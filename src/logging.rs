// Logging setup for vitepm
use std::io::{self, IsTerminal};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::Result;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Level,
    /// Output format (pretty for terminals, json for programmatic use)
    pub format: LogFormat,
    /// Color output configuration
    pub color: ColorConfig,
    /// Whether to show targets (module names)
    pub show_targets: bool,
}

/// Log output format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Color output configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ColorConfig {
    Auto,
    Always,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Pretty,
            color: ColorConfig::Auto,
            show_targets: false,
        }
    }
}

impl LogConfig {
    /// Create logging configuration from CLI arguments.
    ///
    /// Logs go to stderr; the default level stays at WARN so stdout carries
    /// only the rendered command.
    pub fn from_cli(verbose: bool, quiet: bool, color: Option<String>, json: bool) -> Self {
        let level = if quiet {
            Level::ERROR
        } else if verbose {
            Level::DEBUG
        } else {
            Level::WARN
        };

        let color_config = match color.as_deref() {
            Some("always") => ColorConfig::Always,
            Some("never") => ColorConfig::Never,
            _ => ColorConfig::Auto,
        };

        Self {
            level,
            format: if json {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            color: color_config,
            show_targets: verbose,
        }
    }

    /// Check if colors should be used based on configuration and terminal
    pub fn should_use_colors(&self) -> bool {
        match self.color {
            ColorConfig::Always => true,
            ColorConfig::Never => false,
            ColorConfig::Auto => {
                io::stderr().is_terminal()
                    && std::env::var("TERM").map_or(true, |term| term != "dumb")
                    && std::env::var("NO_COLOR").is_err()
            }
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env("VITEPM_LOG")
            .unwrap_or_else(|_| EnvFilter::new(format!("vitepm={}", self.level)))
    }
}

/// Initialize the logging system with the given configuration.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env_filter = config.env_filter();
    let use_colors = config.should_use_colors();

    let _ = match config.format {
        LogFormat::Pretty => fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .with_ansi(use_colors)
            .with_target(config.show_targets)
            .try_init(),
        LogFormat::Json => fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .json()
            .try_init(),
    };

    Ok(())
}
