use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod throttle;

pub use throttle::ThrottleConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Request pacing and retry settings
    pub throttle: ThrottleSettings,

    /// Where and how transcripts are written
    pub output: OutputSettings,

    /// Transcript source settings
    pub fetch: FetchSettings,
}

/// Throttle values as written in the config file, validated by [`ThrottleConfig::resolve`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    pub min_delay_ms: Option<f64>,
    pub max_retries: Option<f64>,
    pub backoff_multiplier: Option<f64>,
    pub jitter: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Root directory every destination must stay inside (current directory if unset)
    pub root_dir: Option<PathBuf>,

    /// Segments rendered per write
    pub chunk_size: usize,

    /// Prefix each line with its start time
    pub include_timestamps: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Caption language to request
    pub language: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            root_dir: None,
            chunk_size: 1000,
            include_timestamps: false,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            language: "en".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults when none exists
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            tracing::debug!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("scribe-batch.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("scribe-batch").join("config.yaml"))
    }

    /// Throttle configuration from the file merged with environment overrides
    pub fn throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig::resolve(&self.throttle, |key| std::env::var(key).ok())
    }

    /// Sandbox root for output destinations
    pub fn output_root(&self) -> Result<PathBuf> {
        match &self.output.root_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Could not determine current directory"),
        }
    }

    /// Display current configuration
    pub fn display(&self) {
        let throttle = self.throttle_config();
        println!("Current Configuration:");
        println!("  Min Delay: {}ms", throttle.min_delay_ms);
        println!("  Max Retries: {}", throttle.max_retries);
        println!("  Backoff Multiplier: {}", throttle.backoff_multiplier);
        println!("  Jitter: {}", throttle.jitter_enabled);
        match &self.output.root_dir {
            Some(dir) => println!("  Output Root: {}", dir.display()),
            None => println!("  Output Root: (current directory)"),
        }
        println!("  Chunk Size: {}", self.output.chunk_size);
        println!("  Timestamps: {}", self.output.include_timestamps);
        println!("  yt-dlp: {}", self.fetch.yt_dlp_path);
        println!("  Language: {}", self.fetch.language);
        if let Ok(path) = Self::config_path() {
            println!("  Config File: {}", path.display());
        }
    }
}
