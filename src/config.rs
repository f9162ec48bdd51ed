use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::tags::TagPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub tags: TagsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Where assets are served from; defaults to `{base_url}/assets/`.
    #[serde(default)]
    pub asset_prefix: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    pub fn asset_prefix(&self) -> String {
        let prefix = match &self.asset_prefix {
            Some(p) => p.clone(),
            None => format!("{}/assets/", self.base_url.trim_end_matches('/')),
        };
        if prefix.ends_with('/') {
            prefix
        } else {
            format!("{}/", prefix)
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TagsConfig {
    #[serde(default)]
    pub normalize: bool,
}

impl TagsConfig {
    pub fn policy(&self) -> TagPolicy {
        TagPolicy::from_normalize_flag(self.normalize)
    }
}

impl Config {
    /// Settings used when no config file exists: the service on localhost.
    pub fn minimal() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: default_timeout_secs(),
                asset_prefix: None,
            },
            query: QueryConfig::default(),
            tags: TagsConfig::default(),
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

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        log::debug!("no config at {}, using defaults", path.display());
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    let url = &config.api.base_url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("api.base_url must start with http:// or https://, got '{}'", url);
    }

    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }

    if config.query.default_top_k < 1 {
        anyhow::bail!("query.default_top_k must be >= 1");
    }

    Ok(())
}
