// vitepm - Library module
// Package manager detection and Vite command construction

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod package_manager;
pub mod process;

// Re-export main types for easier access
pub use config::{ConfigFile, ConfigOptions, ConfigSection, ProjectConfig, ViteConfig};
pub use error::{exit_codes, CliError, ConfigError, ProcessError, Result, VitePmError};
pub use logging::{ColorConfig, LogConfig, LogFormat};
pub use package_manager::{
    ArgumentVector, BundlerCommand, CachingProbe, CommandBuilder, ExecutableResolution,
    FileSystemProbe, LockfileDetector, PackageManagerKind, RuntimeInfo, StdFileSystem,
};
pub use process::{CommandRunner, ProcessConfig, ProcessManager, ProcessResult};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

// Build information (set by build script)
pub const BUILD_DATE: &str = env!("BUILD_DATE");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const RUST_VERSION: &str = env!("RUST_VERSION");

/// Get formatted version string with build information
pub fn version_info() -> String {
    format!("{NAME} {VERSION} (commit: {GIT_COMMIT}, built: {BUILD_DATE}, rustc: {RUST_VERSION})")
}
