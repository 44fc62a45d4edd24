//! Configuration for splitterm.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.splitterm/config.toml`
//! - Reserved hotkey parsing
//! - Pane border colours
//!
//! # Configuration File
//!
//! ```toml
//! # Shell for new panes (optional, else $SHELL, else /bin/sh)
//! shell = "/bin/zsh"
//!
//! # Log file (optional)
//! log_file = "/tmp/splitterm.log"
//!
//! # Max bytes drained per output channel per tick
//! read_chunk = 4096
//!
//! # Milliseconds to wait for a key each tick (0 never blocks)
//! poll_timeout_ms = 0
//!
//! [keys]
//! split_vertical = "ctrl+]"
//! split_horizontal = "ctrl+\\"
//! cycle = "ctrl+t"
//! console = "ctrl+g"
//!
//! [pane]
//! border_active = { r = 100, g = 150, b = 255 }
//! border_inactive = { r = 80, g = 80, b = 80 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid hotkey `{0}` (expected \"ctrl+<char>\" or \"0xNN\")")]
    InvalidHotkey(String),

    #[error("hotkey `{key}` is bound to both {first} and {second}")]
    DuplicateHotkey {
        key: String,
        first: &'static str,
        second: &'static str,
    },
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell command for new panes
    pub shell: Option<String>,
    /// Log file path
    pub log_file: Option<PathBuf>,
    /// Max bytes read from each output channel per tick
    pub read_chunk: usize,
    /// Longest wait for host input per tick, in milliseconds
    pub poll_timeout_ms: u64,
    /// Reserved multiplexer hotkeys
    pub keys: KeysConfig,
    /// Pane border settings
    pub pane: PaneConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            log_file: None,
            read_chunk: 4096,
            poll_timeout_ms: 0,
            keys: KeysConfig::default(),
            pane: PaneConfig::default(),
        }
    }
}

/// Hotkey bindings as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub split_vertical: String,
    pub split_horizontal: String,
    pub cycle: String,
    pub console: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            split_vertical: "ctrl+]".to_string(),
            split_horizontal: "ctrl+\\".to_string(),
            cycle: "ctrl+t".to_string(),
            console: "ctrl+g".to_string(),
        }
    }
}

/// Pane border configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaneConfig {
    pub border_active: Color,
    pub border_inactive: Color,
}

impl Default for PaneConfig {
    fn default() -> Self {
        Self {
            border_active: Color::new(100, 150, 255),
            border_inactive: Color::new(80, 80, 80),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::get_config_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Log file location, `~/.splitterm/splitterm.log` unless configured
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join("splitterm.log")))
            .unwrap_or_else(|| PathBuf::from("splitterm.log"))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    fn get_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.splitterm`, created on first use
pub fn config_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".splitterm");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Reserved hotkeys resolved to the byte a keystroke produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkeys {
    pub split_vertical: u8,
    pub split_horizontal: u8,
    pub cycle: u8,
    pub console: u8,
}

impl Default for Hotkeys {
    fn default() -> Self {
        Self {
            split_vertical: 0x1D,
            split_horizontal: 0x1C,
            cycle: 0x14,
            console: 0x07,
        }
    }
}

impl Hotkeys {
    pub fn from_config(keys: &KeysConfig) -> Result<Self, ConfigError> {
        let bound = [
            ("split_vertical", keys.split_vertical.as_str()),
            ("split_horizontal", keys.split_horizontal.as_str()),
            ("cycle", keys.cycle.as_str()),
            ("console", keys.console.as_str()),
        ];
        let mut bytes = [0u8; 4];
        for (i, (name, spec)) in bound.iter().enumerate() {
            let byte = parse_hotkey(spec)?;
            if let Some(j) = bytes[..i].iter().position(|b| *b == byte) {
                return Err(ConfigError::DuplicateHotkey {
                    key: spec.to_string(),
                    first: bound[j].0,
                    second: name,
                });
            }
            bytes[i] = byte;
        }
        Ok(Self {
            split_vertical: bytes[0],
            split_horizontal: bytes[1],
            cycle: bytes[2],
            console: bytes[3],
        })
    }
}

/// Parse `"ctrl+<char>"` or `"0xNN"` into the byte the key sends
pub fn parse_hotkey(spec: &str) -> Result<u8, ConfigError> {
    let invalid = || ConfigError::InvalidHotkey(spec.to_string());
    let trimmed = spec.trim();

    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u8::from_str_radix(hex, 16).map_err(|_| invalid());
    }

    let lower = trimmed.to_ascii_lowercase();
    let key = lower.strip_prefix("ctrl+").ok_or_else(invalid)?;
    let mut chars = key.chars();
    let ch = match (chars.next(), chars.next()) {
        (Some(ch), None) => ch,
        _ => return Err(invalid()),
    };
    match ch {
        'a'..='z' => Ok(ch as u8 - b'a' + 1),
        '@' | ' ' => Ok(0x00),
        '[' => Ok(0x1B),
        '\\' => Ok(0x1C),
        ']' => Ok(0x1D),
        '^' => Ok(0x1E),
        '_' => Ok(0x1F),
        _ => Err(invalid()),
    }
}
