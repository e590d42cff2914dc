// Project configuration for vitepm
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, Result, VitePmError};

/// Default location of the project configuration file, relative to the root.
pub const DEFAULT_CONFIG_FILE: &str = "config/vite.json";

/// Default location of the locally installed Vite binary, relative to the root.
pub const DEFAULT_VITE_BIN_PATH: &str = "node_modules/.bin/vite";

pub const DEFAULT_MODE: &str = "development";

/// Prefix of the variables exported to the Vite process.
pub const ENV_PREFIX: &str = "VITE_RUBY";

/// The project settings the command builder reads.
///
/// Implementations must be immutable for the duration of a call.
pub trait ProjectConfig: Send + Sync {
    /// Project root; lockfiles are probed here.
    fn root(&self) -> &Path;

    /// Current mode, e.g. `development` or `production`.
    fn mode(&self) -> &str;

    /// Extra variables to export to the bundler process.
    fn env(&self) -> &BTreeMap<String, String>;

    /// Path to the locally installed bundler binary.
    fn executable_path(&self) -> PathBuf;

    /// Variables exported to the bundler process for `mode`.
    fn mode_to_env(&self, mode: &str, env: &BTreeMap<String, String>) -> BTreeMap<String, String>;

    /// Renders the environment assignment that prefixes a bundler invocation.
    fn mode_to_env_string(&self, mode: &str, env: &BTreeMap<String, String>) -> String {
        self.mode_to_env(mode, env)
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Variables derived from the resolved root, mode and bin path.
const DERIVED_VARS: [&str; 3] = [
    "VITE_RUBY_MODE",
    "VITE_RUBY_ROOT",
    "VITE_RUBY_VITE_BIN_PATH",
];

/// Settings that may appear in a config file section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSection {
    pub vite_bin_path: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ConfigSection {
    fn merge(mut self, other: &ConfigSection) -> Self {
        if other.vite_bin_path.is_some() {
            self.vite_bin_path = other.vite_bin_path.clone();
        }
        self.env
            .extend(other.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

/// Config file contents: an `all` section plus one section per mode.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub all: ConfigSection,
    #[serde(flatten)]
    pub modes: BTreeMap<String, ConfigSection>,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(VitePmError::Config(Box::new(ConfigError::NotFound {
                path: path.to_path_buf(),
                suggestion: Some(format!(
                    "Create {DEFAULT_CONFIG_FILE} in your project root or pass --config"
                )),
            })));
        }

        let content = std::fs::read_to_string(path).map_err(VitePmError::Io)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );

        if is_yaml {
            Self::from_yaml_with_context(&content, Some(path))
        } else {
            Self::from_json_with_context(&content, Some(path))
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_context(json, None)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_yaml_with_context(yaml, None)
    }

    fn from_json_with_context(json: &str, path: Option<&Path>) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            let mut config_error = *Box::<ConfigError>::from(e);
            if let ConfigError::InvalidJson {
                ref mut file_path, ..
            } = config_error
            {
                *file_path = path.map(Path::to_path_buf);
            }
            VitePmError::Config(Box::new(config_error))
        })
    }

    fn from_yaml_with_context(yaml: &str, path: Option<&Path>) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            let mut config_error = *Box::<ConfigError>::from(e);
            if let ConfigError::InvalidYaml {
                ref mut file_path, ..
            } = config_error
            {
                *file_path = path.map(Path::to_path_buf);
            }
            VitePmError::Config(Box::new(config_error))
        })
    }

    /// The `all` section overlaid with the section for `mode`.
    pub fn section_for(&self, mode: &str) -> ConfigSection {
        match self.modes.get(mode) {
            Some(section) => self.all.clone().merge(section),
            None => self.all.clone(),
        }
    }
}

/// Explicit values that take precedence over the environment and config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub root: Option<PathBuf>,
    pub mode: Option<String>,
    pub config_file: Option<PathBuf>,
}

/// Resolved project configuration.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ViteConfig {
    root: PathBuf,
    mode: String,
    env: BTreeMap<String, String>,
    vite_bin_path: PathBuf,
}

impl ViteConfig {
    /// Build a configuration directly, without consulting files or the process environment.
    pub fn new(root: impl Into<PathBuf>, mode: impl Into<String>) -> Self {
        let root = root.into();
        let vite_bin_path = root.join(DEFAULT_VITE_BIN_PATH);
        Self {
            root,
            mode: mode.into(),
            env: BTreeMap::new(),
            vite_bin_path,
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Relative paths are resolved against the root.
    pub fn with_vite_bin_path(mut self, path: impl AsRef<Path>) -> Self {
        self.vite_bin_path = self.root.join(path);
        self
    }

    /// Resolve from explicit options, then the process environment, then the config file.
    pub fn resolve(options: ConfigOptions) -> Result<Self> {
        let vars: BTreeMap<String, String> = std::env::vars().collect();
        Self::resolve_with_vars(options, &vars)
    }

    /// Same as [`ViteConfig::resolve`] with an explicit variable map instead of the process environment.
    pub fn resolve_with_vars(
        options: ConfigOptions,
        vars: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let root = match options.root {
            Some(root) => root,
            None => match vars.get("VITE_RUBY_ROOT") {
                Some(root) => PathBuf::from(root),
                None => std::env::current_dir().map_err(VitePmError::Io)?,
            },
        };

        let mode = options
            .mode
            .or_else(|| resolve_mode(vars))
            .unwrap_or_else(|| DEFAULT_MODE.to_string());

        if mode.trim().is_empty() {
            return Err(VitePmError::Config(Box::new(ConfigError::InvalidValue {
                message: "mode must not be empty".to_string(),
                field: "mode".to_string(),
                value: mode,
                expected: "a mode name such as development or production".to_string(),
            })));
        }

        // An explicitly named file must exist; the default one is optional.
        let file = match options.config_file {
            Some(path) => {
                let path = root.join(path);
                ConfigFile::from_file(&path)?
            }
            None => {
                let path = root.join(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    ConfigFile::from_file(&path)?
                } else {
                    ConfigFile::default()
                }
            }
        };
        let section = file.section_for(&mode);

        // Derived variables were consumed above and are re-exported from the resolved values.
        let mut env: BTreeMap<String, String> = vars
            .iter()
            .filter(|(key, _)| key.starts_with("VITE_") && !DERIVED_VARS.contains(&key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.extend(section.env);

        let vite_bin_path = root.join(
            section
                .vite_bin_path
                .as_deref()
                .unwrap_or(DEFAULT_VITE_BIN_PATH),
        );

        debug!(
            root = %root.display(),
            mode = %mode,
            vite_bin_path = %vite_bin_path.display(),
            env_count = env.len(),
            "Resolved project configuration"
        );

        Ok(Self {
            root,
            mode,
            env,
            vite_bin_path,
        })
    }

    /// Variables exported to the bundler process; entries in `env` win.
    pub fn to_env(&self, mode: &str, env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert(format!("{ENV_PREFIX}_MODE"), mode.to_string());
        vars.insert(
            format!("{ENV_PREFIX}_ROOT"),
            self.root.display().to_string(),
        );
        vars.insert(
            format!("{ENV_PREFIX}_VITE_BIN_PATH"),
            self.vite_bin_path.display().to_string(),
        );
        vars.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }
}

fn resolve_mode(vars: &BTreeMap<String, String>) -> Option<String> {
    ["VITE_RUBY_MODE", "RAILS_ENV", "RACK_ENV"]
        .iter()
        .filter_map(|key| vars.get(*key))
        .find(|value| !value.is_empty())
        .cloned()
}

impl ProjectConfig for ViteConfig {
    fn root(&self) -> &Path {
        &self.root
    }

    fn mode(&self) -> &str {
        &self.mode
    }

    fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    fn executable_path(&self) -> PathBuf {
        self.vite_bin_path.clone()
    }

    fn mode_to_env(&self, mode: &str, env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        self.to_env(mode, env)
    }
}
