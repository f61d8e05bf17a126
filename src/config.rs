//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section is optional and falls back to the defaults the service
//! currently expects. Catalog identifiers (theme, items, excluded quests)
//! live here rather than in the policy so a catalog change is a config edit.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::Intensity;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub intensity: Intensity,
    pub tokens_file: String,
    pub proxies_file: String,
    pub run_log_file: String,
    /// Fixed delay between task launches. `None` means random jitter.
    pub launch_delay_secs: Option<f64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            intensity: Intensity::Short,
            tokens_file: "tokens.txt".to_string(),
            proxies_file: "proxies.txt".to_string(),
            run_log_file: "angler_runs.jsonl".to_string(),
            launch_delay_secs: None,
        }
    }
}

impl AgentConfig {
    /// The configured fixed launch delay, if any. Negative or non-finite
    /// values are treated as unset.
    pub fn launch_delay(&self) -> Option<Duration> {
        self.launch_delay_secs
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(Duration::from_secs_f64)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EndpointsConfig {
    pub api_base: String,
    pub ws_base: String,
    pub origin: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.fishingfrenzy.co/v1".to_string(),
            ws_base: "wss://api.fishingfrenzy.co/".to_string(),
            origin: "https://fishingfrenzy.co".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    /// Scenario identifier sent in the session `prepare` message.
    pub theme_id: String,
    /// Item bought and consumed when gold exceeds `gold_threshold`.
    pub exp_scroll_item_id: String,
    pub gold_threshold: f64,
    /// Social quests that can never be verified and are skipped.
    pub excluded_quests: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            theme_id: "6752b7a7ef93f2489cfef709".to_string(),
            exp_scroll_item_id: "66b1f692aaa0b594511c2db2".to_string(),
            gold_threshold: 1500.0,
            excluded_quests: vec![
                "670f3bb8193d51c460247600".to_string(),
                "670f3c40193d51c460247623".to_string(),
                "670f3c76193d51c46024762c".to_string(),
            ],
        }
    }
}

impl CatalogConfig {
    pub fn is_excluded_quest(&self, quest_id: &str) -> bool {
        self.excluded_quests.iter().any(|q| q == quest_id)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }
}
