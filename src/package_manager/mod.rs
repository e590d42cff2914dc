// Package manager detection and command construction
//
// Decides from a project's lockfiles which JavaScript package manager is in
// use and builds the argument vectors for installing dependencies and for
// running the Vite executable.

pub mod command;
pub mod detection;
pub mod runtime;

pub use command::{ArgumentVector, BundlerCommand, CommandBuilder, ExecutableResolution};
pub use detection::{
    CachingProbe, FileSystemProbe, LockfileDetector, PackageManagerKind, StdFileSystem,
    BUN_LOCKFILE, PNPM_LOCKFILE, YARN_LOCKFILE,
};
pub use runtime::{is_legacy_npm, RuntimeInfo};
