//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/grader.sqlite"
//!
//! [grading]
//! default_threshold = 0.70
//!
//! [extractor]
//! provider = "sidecar"        # or "http"
//! endpoint = "http://127.0.0.1:8001/extract"
//! timeout_secs = 30
//! max_retries = 2
//! image_root = "./uploads"
//!
//! [server]
//! bind = "127.0.0.1:5000"
//! ```
//!
//! Only `[db]` and `[server]` are required; see [`load_config`] for the
//! validation rules.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GradingConfig {
    /// Threshold applied when a request does not carry one.
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    0.70
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractorConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base directory for relative image references.
    #[serde(default)]
    pub image_root: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            image_root: None,
        }
    }
}

fn default_provider() -> String {
    "sidecar".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Config {
    /// Config used when no file is available: local database, sidecar
    /// extraction, loopback server.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/grader.sqlite"),
            },
            grading: GradingConfig::default(),
            extractor: ExtractorConfig::default(),
            server: ServerConfig {
                bind: "127.0.0.1:5000".to_string(),
            },
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let t = config.grading.default_threshold;
    if !t.is_finite() || !(0.0..=1.0).contains(&t) {
        anyhow::bail!("grading.default_threshold must be in [0.0, 1.0]");
    }

    match config.extractor.provider.as_str() {
        "sidecar" => {}
        "http" => {
            if config
                .extractor
                .endpoint
                .as_deref()
                .map_or(true, |e| e.trim().is_empty())
            {
                anyhow::bail!("extractor.endpoint must be set when provider is 'http'");
            }
        }
        other => anyhow::bail!(
            "Unknown extractor provider: '{}'. Must be sidecar or http.",
            other
        ),
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(())
}
