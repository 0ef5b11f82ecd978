//! Configuration for termguard.
//!
//! Settings are read from `~/.termguard/config.toml`. Every section is
//! optional; missing keys take their defaults.
//!
//! ```toml
//! [session]
//! # Reject duplicate window and color names
//! unique_names = false
//! # invisible, normal, highly-visible
//! cursor = "normal"
//!
//! [border]
//! # single, double, rounded, ascii
//! style = "single"
//!
//! [log]
//! # error, warn, info, debug, trace (RUST_LOG takes precedence)
//! level = "info"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::state::{NamePolicy, SessionOptions};
use crate::core::types::{BorderGlyphs, CursorVisibility};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub border: BorderConfig,
    pub log: LogConfig,
}

/// Session settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub unique_names: bool,
    pub cursor: CursorVisibility,
}

/// Window border settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    pub style: String,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            style: "single".to_string(),
        }
    }
}

/// Log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                warn!("Could not read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), String> {
        let path = Self::config_path().ok_or("Could not determine config path")?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
        Ok(())
    }

    /// Directory holding the config and log files
    pub fn config_dir() -> Option<PathBuf> {
        let dir = home_dir()?.join(".termguard");
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir)
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            names: if self.session.unique_names {
                NamePolicy::Unique
            } else {
                NamePolicy::Permissive
            },
        }
    }

    /// Border glyphs for the configured style
    pub fn border_glyphs(&self) -> BorderGlyphs {
        BorderGlyphs::by_name(&self.border.style)
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
