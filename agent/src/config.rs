//! Instrument configuration.
//!
//! Read once at activation: an optional YAML file named by `SNARE_CONFIG`,
//! then `SNARE_*` environment overrides. Never reloaded.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snare_host::path;
use thiserror::Error;

pub const CONFIG_ENV: &str = "SNARE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}")]
    InvalidOverride { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub show_stack: bool,
    pub save_file_writes: bool,
    pub log_http_requests: bool,
    pub skip_sleeps: bool,
    pub trace_errors: bool,
    /// Dotted surface-path substrings left unhooked and unlogged.
    pub ignored_apis: Vec<String>,
    /// Report `*.lock` paths as absent from `existsSync`.
    pub hide_lock_files: bool,
    /// Where captures and `requests.txt` land; the current directory if unset.
    pub work_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_stack: true,
            save_file_writes: true,
            log_http_requests: true,
            skip_sleeps: false,
            trace_errors: false,
            ignored_apis: Vec::new(),
            hide_lock_files: false,
            work_dir: None,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Configuration for this process, from `SNARE_CONFIG` and `SNARE_*`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `SNARE_*` overrides supplied by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let toggles: [(&str, &mut bool); 6] = [
            ("SNARE_SHOW_STACK", &mut self.show_stack),
            ("SNARE_SAVE_FILE_WRITES", &mut self.save_file_writes),
            ("SNARE_LOG_HTTP_REQUESTS", &mut self.log_http_requests),
            ("SNARE_SKIP_SLEEPS", &mut self.skip_sleeps),
            ("SNARE_TRACE_ERRORS", &mut self.trace_errors),
            ("SNARE_HIDE_LOCK_FILES", &mut self.hide_lock_files),
        ];
        for (key, slot) in toggles {
            if let Some(value) = lookup(key) {
                *slot = parse_bool(key, &value)?;
            }
        }
        if let Some(list) = lookup("SNARE_IGNORED_APIS") {
            self.ignored_apis = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(dir) = lookup("SNARE_WORK_DIR") {
            if !dir.is_empty() {
                self.work_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(())
    }

    /// The capture directory as an absolute, normalized path. A relative
    /// setting is taken from the current directory.
    pub fn resolve_work_dir(&self) -> PathBuf {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match &self.work_dir {
            Some(dir) => PathBuf::from(path::normalize(&cwd.join(dir).to_string_lossy())),
            None => cwd,
        }
    }
}
