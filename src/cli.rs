// CLI interface for vitepm using clap
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::config::{ConfigOptions, ProjectConfig, ViteConfig};
use crate::error::{CliError, Result, VitePmError};
use crate::package_manager::{ArgumentVector, CommandBuilder, PackageManagerKind, RuntimeInfo};
use crate::process::ProcessManager;

#[derive(Parser)]
#[command(
    name = "vitepm",
    about = "vitepm - Package manager detection and Vite command construction",
    version = crate::VERSION,
    long_about = "vitepm inspects a project's lockfiles to decide which JavaScript package manager is in use and prints the commands that install dependencies or invoke Vite."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root (defaults to VITE_RUBY_ROOT or the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Mode passed to Vite (defaults to VITE_RUBY_MODE, RAILS_ENV, RACK_ENV or development)
    #[arg(long)]
    pub mode: Option<String>,

    /// Configuration file, relative to the root (defaults to config/vite.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format for printed commands
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Control color output (auto, always, never)
    #[arg(long, value_name = "WHEN")]
    pub color: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One shell line per command
    Text,
    /// JSON array of argument tokens
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the package manager detected from the project's lockfiles
    Detect,

    /// Print the command that installs the project's dependencies
    InstallCommand {
        /// Allow the lockfile to be updated
        #[arg(long)]
        no_frozen: bool,

        /// Override npm version detection (true for npm < 7)
        #[arg(long, value_name = "BOOL")]
        legacy_npm: Option<bool>,
    },

    /// Print the command that adds dependencies to the project
    AddCommand,

    /// Print the Vite invocation for the given arguments
    Command {
        /// Arguments forwarded to Vite
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
        args: Vec<String>,
    },

    /// Generate shell completion scripts
    GenerateCompletion {
        /// Shell to generate completion for
        shell: Shell,
    },
}

impl Cli {
    pub fn run(&self) -> Result<i32> {
        self.init_logging();

        if self.verbose && self.quiet {
            return Err(VitePmError::Cli(Box::new(CliError::ConflictingArguments {
                first: "--verbose".to_string(),
                second: "--quiet".to_string(),
                suggestion: "Use either --verbose for more output or --quiet for less output, but not both".to_string(),
            })));
        }

        let stdout = io::stdout();
        let mut out = stdout.lock();

        match &self.command {
            Commands::Detect => {
                let config = self.resolve_config()?;
                let kind = CommandBuilder::new(&config).detect();
                self.write_kind(&mut out, kind)?;
            }
            Commands::InstallCommand {
                no_frozen,
                legacy_npm,
            } => {
                let config = self.resolve_config()?;
                let frozen = !no_frozen;
                let builder = CommandBuilder::new(&config);

                // npm is only consulted when its answer can change the result.
                let runtime = match legacy_npm {
                    Some(legacy) => RuntimeInfo::new(*legacy),
                    None if frozen && builder.detect() != PackageManagerKind::Pnpm => {
                        RuntimeInfo::detect(&ProcessManager::new(), config.root())
                    }
                    None => RuntimeInfo::default(),
                };

                let command = builder
                    .with_runtime(runtime)
                    .install_dependencies_command(frozen);
                self.write_optional(&mut out, command.as_ref())?;
            }
            Commands::AddCommand => {
                let config = self.resolve_config()?;
                let command = CommandBuilder::new(&config).add_dependencies_command();
                self.write_optional(&mut out, Some(&command))?;
            }
            Commands::Command { args } => {
                let config = self.resolve_config()?;
                let command = CommandBuilder::new(&config).command_for(args.as_slice())?;
                let line = command.to_shell_line();
                let argv = command.require_executable()?;
                match self.format {
                    OutputFormat::Text => writeln!(out, "{line}")?,
                    OutputFormat::Json => writeln!(out, "{}", to_json(&argv)?)?,
                }
            }
            // Completion needs no project, so no configuration is resolved.
            Commands::GenerateCompletion { shell } => {
                let mut cmd = Self::command();
                let name = cmd.get_name().to_string();
                generate(*shell, &mut cmd, name, &mut out);
            }
        }

        out.flush()?;
        Ok(0)
    }

    fn resolve_config(&self) -> Result<ViteConfig> {
        ViteConfig::resolve(ConfigOptions {
            root: self.root.clone(),
            mode: self.mode.clone(),
            config_file: self.config.clone(),
        })
    }

    fn write_kind(&self, out: &mut impl Write, kind: PackageManagerKind) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(out, "{kind}")?,
            OutputFormat::Json => writeln!(out, "{}", to_json(&kind)?)?,
        }
        Ok(())
    }

    /// Text output prints nothing for an absent command; JSON prints `null`.
    fn write_optional(&self, out: &mut impl Write, command: Option<&ArgumentVector>) -> Result<()> {
        match (self.format, command) {
            (OutputFormat::Text, Some(command)) => writeln!(out, "{command}")?,
            (OutputFormat::Text, None) => {}
            (OutputFormat::Json, command) => writeln!(out, "{}", to_json(&command)?)?,
        }
        Ok(())
    }

    fn init_logging(&self) {
        use crate::logging::{init_logging, LogConfig};

        let log_config = LogConfig::from_cli(
            self.verbose,
            self.quiet,
            self.color.clone(),
            self.format == OutputFormat::Json,
        );

        if let Err(e) = init_logging(log_config) {
            eprintln!("Failed to initialize logging: {e}");
        }
    }

    /// Whether error messages on stderr should be colored.
    pub fn use_colors(&self) -> bool {
        crate::logging::LogConfig::from_cli(false, false, self.color.clone(), false)
            .should_use_colors()
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| {
        VitePmError::Cli(Box::new(CliError::OutputFailed {
            message: e.to_string(),
        }))
    })
}
