// Process utilities for the few subprocess calls vitepm makes itself
// (`npm bin`, `npm --version`): timeout handling and output capture.

use crate::error::{ProcessError, Result, VitePmError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tracing::debug;

/// Synchronous program execution returning captured standard output.
///
/// This is the seam the command builder uses for `npm bin`; tests substitute
/// their own implementation.
pub trait CommandRunner: Send + Sync {
    fn capture_stdout(&self, program: &str, args: &[&str], working_dir: &Path) -> Result<String>;
}

/// Process execution configuration
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub command: String,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ProcessConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    pub fn with_args(mut self, args: Vec<impl Into<OsString>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The command line as it would be typed, for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.command.clone()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().to_string()));
        parts.join(" ")
    }
}

/// Process execution result
#[derive(Debug)]
pub struct ProcessResult {
    pub exit_status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_status.success()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_status.code()
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Main process manager
#[derive(Debug, Clone)]
pub struct ProcessManager {
    default_timeout: Duration,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    // Synchronous execution
    pub fn execute(&self, config: ProcessConfig) -> Result<ProcessResult> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(VitePmError::Io)?
            .block_on(self.execute_async(config))
    }

    // Asynchronous execution
    pub async fn execute_async(&self, config: ProcessConfig) -> Result<ProcessResult> {
        use std::process::Stdio;
        use tokio::io::AsyncReadExt;
        use tokio::process::Command;
        use tokio::time::timeout;

        let start_time = std::time::Instant::now();

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            VitePmError::Process(Box::new(ProcessError::SpawnFailed {
                command: config.display_command(),
                error: e.to_string(),
            }))
        })?;

        let timeout_duration = config.timeout.unwrap_or(self.default_timeout);
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let execution_result = timeout(timeout_duration, async {
            let read_stdout = async {
                let mut data = Vec::new();
                if let Some(mut pipe) = stdout_pipe {
                    pipe.read_to_end(&mut data).await?;
                }
                Ok::<Vec<u8>, std::io::Error>(data)
            };
            let read_stderr = async {
                let mut data = Vec::new();
                if let Some(mut pipe) = stderr_pipe {
                    pipe.read_to_end(&mut data).await?;
                }
                Ok::<Vec<u8>, std::io::Error>(data)
            };

            // Drain both pipes concurrently so a chatty stderr cannot block stdout.
            let (stdout_data, stderr_data) = tokio::try_join!(read_stdout, read_stderr)
                .map_err(|e| {
                    VitePmError::Process(Box::new(ProcessError::OutputCaptureFailed {
                        message: format!("Failed to read process output: {e}"),
                        command: config.display_command(),
                    }))
                })?;

            let exit_status = child.wait().await.map_err(|e| {
                VitePmError::Process(Box::new(ProcessError::ExecutionFailed {
                    command: config.display_command(),
                    exit_code: None,
                    stderr: format!("Failed to wait for process: {e}"),
                }))
            })?;

            Ok::<ProcessResult, VitePmError>(ProcessResult {
                exit_status,
                stdout: stdout_data,
                stderr: stderr_data,
                duration: start_time.elapsed(),
            })
        })
        .await;

        match execution_result {
            Ok(result) => result,
            Err(_) => Err(VitePmError::Process(Box::new(ProcessError::Timeout {
                command: config.display_command(),
                duration: timeout_duration,
            }))),
        }
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ProcessManager {
    fn capture_stdout(&self, program: &str, args: &[&str], working_dir: &Path) -> Result<String> {
        let executable = which::which(program).map_err(|_| {
            VitePmError::Process(Box::new(ProcessError::CommandNotFound {
                command: program.to_string(),
                suggestion: Some(format!(
                    "Ensure `{program}` is installed and available on PATH"
                )),
            }))
        })?;

        let config = ProcessConfig::new(executable.to_string_lossy().to_string())
            .with_args(args.to_vec())
            .with_working_dir(working_dir.to_path_buf());
        let shown = format!("{program} {}", args.join(" "));

        debug!(command = %shown, cwd = %working_dir.display(), "Running subprocess");
        let result = self.execute(config)?;
        debug!(
            command = %shown,
            exit_code = ?result.exit_code(),
            duration_ms = result.duration.as_millis(),
            "Subprocess finished"
        );

        if !result.success() {
            return Err(VitePmError::Process(Box::new(ProcessError::ExecutionFailed {
                command: shown,
                exit_code: result.exit_code(),
                stderr: result.stderr().trim().to_string(),
            })));
        }

        Ok(result.stdout())
    }
}
