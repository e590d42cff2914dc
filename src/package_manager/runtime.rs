// npm runtime facts that influence the generated commands
use std::path::Path;
use tracing::{debug, warn};

use crate::process::CommandRunner;

/// npm releases before this major parse `npm --yes ci` differently.
pub const MODERN_NPM_MAJOR: u64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub legacy_npm_version: bool,
}

impl RuntimeInfo {
    pub fn new(legacy_npm_version: bool) -> Self {
        Self { legacy_npm_version }
    }

    /// Ask `npm --version`; any failure counts as a modern npm.
    pub fn detect(runner: &dyn CommandRunner, root: &Path) -> Self {
        let legacy_npm_version = match runner.capture_stdout("npm", &["--version"], root) {
            Ok(output) => is_legacy_npm(&output),
            Err(e) => {
                warn!(error = %e, "Could not determine npm version, assuming npm >= 7");
                false
            }
        };
        debug!(legacy_npm_version, "Detected npm runtime");
        Self { legacy_npm_version }
    }
}

/// Parses `npm --version` output. Unparseable output is not legacy.
pub fn is_legacy_npm(version_output: &str) -> bool {
    let trimmed = version_output.trim().trim_start_matches('v');
    match semver::Version::parse(trimmed) {
        Ok(version) => version.major < MODERN_NPM_MAJOR,
        Err(_) => trimmed
            .split('.')
            .next()
            .and_then(|major| major.parse::<u64>().ok())
            .is_some_and(|major| major < MODERN_NPM_MAJOR),
    }
}
