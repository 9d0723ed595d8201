//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (for the `kolibri` binary)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::analyzer::{
    DEFAULT_MAX_PATTERNS, DEFAULT_MAX_PATTERN_LENGTH, DEFAULT_MAX_TRACKED,
    DEFAULT_MIN_PATTERN_LENGTH, DEFAULT_PATTERN_LENGTH_STEP, DEFAULT_SAMPLE_TARGET,
};
use crate::codec::deflate::{DEFAULT_LEVEL, MAX_LEVEL};
use crate::codec::token::MAX_TABLE_SIZE;
use crate::error::{KolibriError, Result};

/// Informational processing block size
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Codec configuration
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            KolibriError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;

        let config: Config = toml::from_str(&content)?;
        config.codec.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `KOLIBRI_*` environment variables on top of this config
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var("KOLIBRI_LEVEL") {
            self.codec.compression_level = level
                .parse()
                .map_err(|_| KolibriError::Config(format!("Invalid KOLIBRI_LEVEL: {level}")))?;
        }
        if let Ok(size) = std::env::var("KOLIBRI_BLOCK_SIZE") {
            self.codec.block_size = size
                .parse()
                .map_err(|_| KolibriError::Config(format!("Invalid KOLIBRI_BLOCK_SIZE: {size}")))?;
        }
        if let Ok(policy) = std::env::var("KOLIBRI_VERSION_POLICY") {
            self.codec.version_policy = policy.parse()?;
        }
        if let Ok(level) = std::env::var("KOLIBRI_LOG") {
            self.logging.level = level;
        }

        self.codec.validate()?;
        Ok(self)
    }

    /// Default config file location (`<config_dir>/kolibri/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("kolibri").join("config.toml"))
    }

    /// Load from `path`, else the default location if it exists, else
    /// defaults; environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };
        base.with_env_overrides()
    }
}

/// How to react to a frame written by another format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Reject the frame
    Strict,
    /// Log a warning and continue
    #[default]
    Warn,
    /// Continue silently
    Ignore,
}

impl FromStr for VersionPolicy {
    type Err = KolibriError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(VersionPolicy::Strict),
            "warn" => Ok(VersionPolicy::Warn),
            "ignore" => Ok(VersionPolicy::Ignore),
            other => Err(KolibriError::Config(format!(
                "Unknown version policy: {other} (expected strict, warn or ignore)"
            ))),
        }
    }
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VersionPolicy::Strict => "strict",
            VersionPolicy::Warn => "warn",
            VersionPolicy::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

/// Codec configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// DEFLATE level (0-9)
    pub compression_level: u32,

    /// Block size reported by the capability query
    pub block_size: usize,

    /// Shortest pattern length
    pub min_pattern_length: usize,

    /// Longest pattern length (inclusive)
    pub max_pattern_length: usize,

    /// Increment between pattern lengths
    pub pattern_length_step: usize,

    /// Distinct substrings tracked while scanning
    pub max_tracked_patterns: usize,

    /// Patterns kept for encoding
    pub max_patterns: usize,

    /// Buffer length divisor that sets the scan stride
    pub sample_target: usize,

    /// Store the pattern table in frame metadata
    pub embed_table: bool,

    /// Check the CRC-32 on decompress
    pub verify_checksum: bool,

    /// Reaction to frames from another format version
    pub version_policy: VersionPolicy,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_LEVEL,
            block_size: DEFAULT_BLOCK_SIZE,
            min_pattern_length: DEFAULT_MIN_PATTERN_LENGTH,
            max_pattern_length: DEFAULT_MAX_PATTERN_LENGTH,
            pattern_length_step: DEFAULT_PATTERN_LENGTH_STEP,
            max_tracked_patterns: DEFAULT_MAX_TRACKED,
            max_patterns: DEFAULT_MAX_PATTERNS,
            sample_target: DEFAULT_SAMPLE_TARGET,
            embed_table: true,
            verify_checksum: true,
            version_policy: VersionPolicy::Warn,
        }
    }
}

impl CodecConfig {
    /// Reject settings the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > MAX_LEVEL {
            return Err(KolibriError::Config(format!(
                "compression_level must be 0-{MAX_LEVEL}, got {}",
                self.compression_level
            )));
        }
        if self.min_pattern_length == 0 || self.min_pattern_length > self.max_pattern_length {
            return Err(KolibriError::Config(format!(
                "pattern lengths must satisfy 0 < min <= max, got {}..={}",
                self.min_pattern_length, self.max_pattern_length
            )));
        }
        if self.pattern_length_step == 0 {
            return Err(KolibriError::Config(
                "pattern_length_step must be positive".to_string(),
            ));
        }
        if self.sample_target == 0 {
            return Err(KolibriError::Config(
                "sample_target must be positive".to_string(),
            ));
        }
        if self.max_patterns > MAX_TABLE_SIZE {
            return Err(KolibriError::Config(format!(
                "max_patterns must be at most {MAX_TABLE_SIZE}, got {}",
                self.max_patterns
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by `RUST_LOG`)
    pub level: String,

    /// Emit JSON log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
