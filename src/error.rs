// Error handling framework for vitepm
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VitePmError>;

/// Main error type for vitepm
#[derive(Debug, Error)]
pub enum VitePmError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<ConfigError>),

    #[error("Process execution failed: {0}")]
    Process(#[from] Box<ProcessError>),

    #[error("CLI argument error: {0}")]
    Cli(#[from] Box<CliError>),

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JSON syntax: {message}")]
    InvalidJson {
        message: String,
        line: Option<u32>,
        column: Option<u32>,
        file_path: Option<PathBuf>,
    },

    #[error("Invalid YAML syntax: {message}")]
    InvalidYaml {
        message: String,
        line: Option<u32>,
        column: Option<u32>,
        file_path: Option<PathBuf>,
    },

    #[error("Configuration file not found: {path}")]
    NotFound {
        path: PathBuf,
        suggestion: Option<String>,
    },

    #[error("Invalid configuration value: {message}")]
    InvalidValue {
        message: String,
        field: String,
        value: String,
        expected: String,
    },

    #[error("Vite executable not found for {package_manager} project at {root}")]
    ExecutableNotFound {
        root: PathBuf,
        executable_path: PathBuf,
        package_manager: String,
        suggestion: Option<String>,
    },
}

/// Process execution errors with detailed context
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Process execution failed: {command}")]
    ExecutionFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Process timeout after {duration:?}: {command}")]
    Timeout {
        command: String,
        duration: std::time::Duration,
    },

    #[error("Command not found: {command}")]
    CommandNotFound {
        command: String,
        suggestion: Option<String>,
    },

    #[error("Process spawn failed: {command}")]
    SpawnFailed { command: String, error: String },

    #[error("Output capture failed: {message}")]
    OutputCaptureFailed { message: String, command: String },
}

/// CLI argument and command-line interface errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Conflicting arguments: {first} and {second}")]
    ConflictingArguments {
        first: String,
        second: String,
        suggestion: String,
    },

    #[error("Output write failed: {message}")]
    OutputFailed { message: String },
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
    pub fn format_error(&self, error: &VitePmError) -> String {
        use tracing::error;

        match error {
            VitePmError::Config(_) => {
                error!(error_type = "config", error = %error, "Configuration error occurred");
            }
            VitePmError::Process(_) => {
                error!(error_type = "process", error = %error, "Process execution failed");
            }
            VitePmError::Cli(_) => {
                error!(error_type = "cli", error = %error, "CLI error occurred");
            }
            VitePmError::Io(_) => {
                error!(error_type = "io", error = %error, "IO operation failed");
            }
        }

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
            VitePmError::Config(config_err) => {
                self.add_config_context(&mut output, config_err.as_ref());
            }
            VitePmError::Process(process_err) => {
                self.add_process_context(&mut output, process_err.as_ref());
            }
            VitePmError::Cli(cli_err) => {
                self.add_cli_context(&mut output, cli_err.as_ref());
            }
            VitePmError::Io(_) => {}
        }

        output
    }

    fn add_config_context(&self, output: &mut String, error: &ConfigError) {
        match error {
            ConfigError::InvalidJson {
                file_path: Some(path),
                line: Some(line),
                ..
            }
            | ConfigError::InvalidYaml {
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
            ConfigError::InvalidValue {
                field, expected, ..
            } => {
                output.push_str(&format!("\n  Field: {field} (expected {expected})"));
            }
            ConfigError::ExecutableNotFound {
                executable_path,
                suggestion,
                ..
            } => {
                output.push_str(&format!("\n  Looked for: {}", executable_path.display()));
                if let Some(suggestion) = suggestion {
                    output.push_str(&format!("\n  Help: {suggestion}"));
                }
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
            ProcessError::ExecutionFailed { stderr, .. } if !stderr.is_empty() => {
                output.push_str(&format!("\n  Process error: {stderr}"));
            }
            _ => {}
        }
    }

    fn add_cli_context(&self, output: &mut String, error: &CliError) {
        if let CliError::ConflictingArguments { suggestion, .. } = error {
            output.push_str(&format!("\n  Help: {suggestion}"));
        }
    }
}

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const TIMEOUT_ERROR: i32 = 6;
    pub const CLI_ERROR: i32 = 7;
    pub const PROCESS_ERROR: i32 = 9;
}

impl VitePmError {
    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            VitePmError::Config(_) => exit_codes::CONFIG_ERROR,
            VitePmError::Process(process_err) => match process_err.as_ref() {
                ProcessError::Timeout { .. } => exit_codes::TIMEOUT_ERROR,
                _ => exit_codes::PROCESS_ERROR,
            },
            VitePmError::Cli(_) => exit_codes::CLI_ERROR,
            VitePmError::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }

    /// Create a user-friendly error message with context
    pub fn user_message(&self, use_colors: bool) -> String {
        let formatter = ErrorFormatter::new(use_colors);
        formatter.format_error(self)
    }
}

impl From<ConfigError> for VitePmError {
    fn from(error: ConfigError) -> Self {
        VitePmError::Config(Box::new(error))
    }
}

impl From<ProcessError> for VitePmError {
    fn from(error: ProcessError) -> Self {
        VitePmError::Process(Box::new(error))
    }
}

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

// Conversion from serde_json::Error to ConfigError
impl From<serde_json::Error> for Box<ConfigError> {
    fn from(error: serde_json::Error) -> Self {
        let (line, column) = if error.line() == 0 {
            (None, None)
        } else {
            (Some(error.line() as u32), Some(error.column() as u32))
        };
        Box::new(ConfigError::InvalidJson {
            message: error.to_string(),
            line,
            column,
            file_path: None,
        })
    }
}
