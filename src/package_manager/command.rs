// Argument vectors for installing dependencies and invoking the Vite executable
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::detection::{FileSystemProbe, LockfileDetector, PackageManagerKind, StdFileSystem};
use super::runtime::RuntimeInfo;
use crate::config::ProjectConfig;
use crate::error::{ConfigError, Result, VitePmError};
use crate::process::{CommandRunner, ProcessManager};

const INSPECT_FLAG: &str = "--inspect";
const INSPECT_BRK_FLAG: &str = "--inspect-brk";
const TRACE_DEPRECATION_ARG: &str = "--trace_deprecation";
const TRACE_DEPRECATION_FLAG: &str = "--trace-deprecation";

/// An ordered command line, one token per element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArgumentVector(Vec<String>);

impl ArgumentVector {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    pub fn push(&mut self, token: impl Into<String>) {
        self.0.push(token.into());
    }

    pub fn extend<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(tokens.into_iter().map(Into::into));
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// Render as a single shell line, quoting tokens that need it.
    pub fn to_shell_line(&self) -> String {
        self.0
            .iter()
            .map(|token| shell_quote(token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Deref for ArgumentVector {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for ArgumentVector {
    fn from(tokens: Vec<String>) -> Self {
        Self(tokens)
    }
}

impl fmt::Display for ArgumentVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_line())
    }
}

fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:@+,%".contains(c));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', "'\\''"))
    }
}

/// Outcome of looking up the Vite executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableResolution {
    Found(PathBuf),
    /// bun or yarn project without a local binary; no path is guessed.
    NotFound,
}

impl ExecutableResolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ExecutableResolution::Found(path) => Some(path),
            ExecutableResolution::NotFound => None,
        }
    }
}

/// A bundler invocation together with how its executable was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlerCommand {
    args: ArgumentVector,
    env: BTreeMap<String, String>,
    executable: ExecutableResolution,
    root: PathBuf,
    expected_path: PathBuf,
    package_manager: PackageManagerKind,
}

impl BundlerCommand {
    pub fn args(&self) -> &ArgumentVector {
        &self.args
    }

    pub fn executable(&self) -> &ExecutableResolution {
        &self.executable
    }

    pub fn package_manager(&self) -> PackageManagerKind {
        self.package_manager
    }

    /// The leading `KEY=VALUE` assignment.
    pub fn env_assignment(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }

    /// The argument vector as built, whether or not an executable was found.
    pub fn into_args(self) -> ArgumentVector {
        self.args
    }

    /// The argument vector, or a configuration error when no executable was found.
    pub fn require_executable(self) -> Result<ArgumentVector> {
        match self.executable {
            ExecutableResolution::Found(_) => Ok(self.args),
            ExecutableResolution::NotFound => {
                Err(VitePmError::Config(Box::new(ConfigError::ExecutableNotFound {
                    root: self.root,
                    executable_path: self.expected_path,
                    package_manager: self.package_manager.to_string(),
                    suggestion: Some(format!(
                        "Run `{} install` so that vite is available locally",
                        self.package_manager.command()
                    )),
                })))
            }
        }
    }

    /// Variables carried by the env assignment.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Shell rendering with each variable value quoted as an assignment.
    pub fn to_shell_line(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(key, value)| format!("{key}={}", shell_quote(value)))
            .collect();
        parts.extend(self.args.iter().skip(1).map(|token| shell_quote(token)));
        parts.join(" ")
    }
}

/// Builds install and bundler command lines for a project.
///
/// Every call re-probes the project root; no state is kept between calls.
pub struct CommandBuilder<'a> {
    config: &'a dyn ProjectConfig,
    runtime: RuntimeInfo,
    probe: Arc<dyn FileSystemProbe>,
    runner: Arc<dyn CommandRunner>,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(config: &'a dyn ProjectConfig) -> Self {
        Self {
            config,
            runtime: RuntimeInfo::default(),
            probe: Arc::new(StdFileSystem),
            runner: Arc::new(ProcessManager::new()),
        }
    }

    pub fn with_runtime(mut self, runtime: RuntimeInfo) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn FileSystemProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    fn detector(&self) -> LockfileDetector<'_> {
        LockfileDetector::new(self.config.root(), self.probe.as_ref())
    }

    /// The package manager the lockfiles point at.
    pub fn detect(&self) -> PackageManagerKind {
        self.detector().detect()
    }

    /// Command that installs the project's dependencies.
    ///
    /// Returns `None` for a non-frozen install outside pnpm projects: there is
    /// nothing to force in that case.
    pub fn install_dependencies_command(&self, frozen: bool) -> Option<ArgumentVector> {
        if self.detector().is_pnpm() {
            let command = if frozen {
                ArgumentVector::from_tokens(["pnpm", "install", "--frozen-lockfile"])
            } else {
                ArgumentVector::from_tokens(["pnpm", "install"])
            };
            return Some(command);
        }

        if !frozen {
            debug!("Skipping install command for non-frozen npm project");
            return None;
        }

        // npm < 7 only accepts the flag after the subcommand.
        let command = if self.runtime.legacy_npm_version {
            ArgumentVector::from_tokens(["npm", "ci", "--yes"])
        } else {
            ArgumentVector::from_tokens(["npm", "--yes", "ci"])
        };
        Some(command)
    }

    /// Command that adds dependencies to the project.
    pub fn add_dependencies_command(&self) -> ArgumentVector {
        if self.detector().is_pnpm() {
            ArgumentVector::from_tokens(["pnpm", "install"])
        } else {
            ArgumentVector::from_tokens(["npm", "install"])
        }
    }

    /// Full Vite invocation for the given caller arguments.
    ///
    /// Fails only when the `npm bin` fallback lookup fails.
    pub fn command_for<S: AsRef<str>>(&self, args: &[S]) -> Result<BundlerCommand> {
        let detector = self.detector();
        let mode = self.config.mode();

        let env = self.config.mode_to_env(mode, self.config.env());
        let mut cmd = ArgumentVector::new();
        cmd.push(self.config.mode_to_env_string(mode, self.config.env()));

        let mut args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();

        let wants_debug = args
            .iter()
            .any(|a| a == INSPECT_FLAG || a == TRACE_DEPRECATION_ARG);
        if wants_debug && detector.is_standard_runtime() {
            cmd.push("node");
            if take_flag(&mut args, INSPECT_FLAG) {
                cmd.push(INSPECT_BRK_FLAG);
            }
            if take_flag(&mut args, TRACE_DEPRECATION_ARG) {
                cmd.push(TRACE_DEPRECATION_FLAG);
            }
        }

        let executable = self.resolve_executable(&detector)?;
        if let ExecutableResolution::Found(ref path) = executable {
            cmd.push(path.display().to_string());
        }

        cmd.extend(args);

        if !cmd.contains_token("--mode") && !cmd.contains_token("-m") {
            cmd.push("--mode");
            cmd.push(mode);
        }

        debug!(command = %cmd, "Built vite command");

        Ok(BundlerCommand {
            args: cmd,
            env,
            executable,
            root: self.config.root().to_path_buf(),
            expected_path: self.config.executable_path(),
            package_manager: detector.detect(),
        })
    }

    fn resolve_executable(&self, detector: &LockfileDetector<'_>) -> Result<ExecutableResolution> {
        let bin_path = self.config.executable_path();
        if self.probe.exists(&bin_path) {
            return Ok(ExecutableResolution::Found(bin_path));
        }

        if detector.is_bun() || detector.is_yarn() {
            warn!(
                expected = %bin_path.display(),
                "No local vite binary and no npm bin fallback for bun/yarn projects"
            );
            return Ok(ExecutableResolution::NotFound);
        }

        let output = self
            .runner
            .capture_stdout("npm", &["bin"], self.config.root())?;
        let bin_dir = output.trim_end();
        debug!(bin_dir, "Resolved vite through npm bin");
        Ok(ExecutableResolution::Found(PathBuf::from(format!(
            "{bin_dir}/vite"
        ))))
    }
}

/// Removes every occurrence of `flag`, reporting whether any was present.
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_flag_removes_all_occurrences() {
        let mut args = vec![
            "--inspect".to_string(),
            "build".to_string(),
            "--inspect".to_string(),
        ];
        assert!(take_flag(&mut args, "--inspect"));
        assert_eq!(args, vec!["build".to_string()]);
        assert!(!take_flag(&mut args, "--inspect"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("--mode"), "--mode");
        assert_eq!(shell_quote("/app/node_modules/.bin/vite"), "/app/node_modules/.bin/vite");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_argument_vector_rendering() {
        let argv = ArgumentVector::from_tokens(["npm", "--yes", "ci"]);
        assert_eq!(argv.to_string(), "npm --yes ci");
        assert!(argv.contains_token("ci"));
        assert_eq!(serde_json::to_string(&argv).unwrap(), r#"["npm","--yes","ci"]"#);
    }

    #[test]
    fn test_bundler_command_shell_line_quotes_env_values() {
        let mut env = BTreeMap::new();
        env.insert("A".to_string(), "1".to_string());
        env.insert("B".to_string(), "My App; rm -rf x".to_string());
        env.insert("C".to_string(), String::new());
        let command = BundlerCommand {
            args: ArgumentVector::from_tokens([
                "A=1 B=My App; rm -rf x C=",
                "/bin/vite",
                "build",
                "--base",
                "a b",
            ]),
            env,
            executable: ExecutableResolution::Found(PathBuf::from("/bin/vite")),
            root: PathBuf::from("/app"),
            expected_path: PathBuf::from("/bin/vite"),
            package_manager: PackageManagerKind::Npm,
        };
        assert_eq!(command.env_assignment(), "A=1 B=My App; rm -rf x C=");
        assert_eq!(
            command.to_shell_line(),
            "A=1 B='My App; rm -rf x' C='' /bin/vite build --base 'a b'"
        );
    }
}
