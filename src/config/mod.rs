// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod server;

pub use server::{FailureStatus, ServerConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the watermark font comes from.
///
/// An explicit `path` is tried first; the system font directories are
/// searched next. Empty `search_dirs` / `candidates` mean platform defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontConfig {
    /// Font file to use (TrueType/OpenType, or a collection with `index`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Face index inside a font collection (default: 0)
    #[serde(default)]
    pub index: u32,

    /// Directories to search instead of the platform font directories
    #[serde(default)]
    pub search_dirs: Vec<PathBuf>,

    /// File names to look for, in order of preference
    #[serde(default)]
    pub candidates: Vec<String>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output (default)
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        let mut missing = None;
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            })
        });

        if let Some(var_name) = missing {
            return Err(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            ));
        }

        // An empty document means "all defaults"
        if substituted.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.address.trim().is_empty() {
            return Err("Server address cannot be empty".to_string());
        }

        if self.server.port == 0 {
            return Err("Server port must be between 1 and 65535".to_string());
        }

        if self.server.max_body_size_mb == 0 {
            return Err("max_body_size_mb must be greater than 0".to_string());
        }

        if self.server.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }

        if let Some(dir) = &self.server.static_dir {
            if !dir.is_dir() {
                return Err(format!(
                    "static_dir '{}' does not exist or is not a directory",
                    dir.display()
                ));
            }
        }

        if let Some(path) = &self.fonts.path {
            if !path.is_file() {
                return Err(format!("Font file '{}' does not exist", path.display()));
            }
        }

        if self.fonts.candidates.iter().any(|c| c.trim().is_empty()) {
            return Err("Font candidate names cannot be empty".to_string());
        }

        if self.logging.level.trim().is_empty() {
            return Err("Logging level cannot be empty".to_string());
        }

        Ok(())
    }
}
