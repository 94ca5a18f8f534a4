use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    #[serde(default)]
    pub settings: PricingSettings,
}

impl Config {
    /// Load the configuration file (YAML).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(
            File::open(path)
                .with_context(|| format!("Failed to open config file {}", path.display()))?,
        );
        serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    pub token: String,
    pub webhook_secret: Option<String>,
}

/// Price label configuration. The price of a (time, priority) pair is
/// `base_rate * time.weight * priority.weight`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingSettings {
    #[serde(default)]
    pub labels: PriceLabelGroups,
    #[serde(default = "default_base_rate")]
    pub base_rate: f64,
    #[serde(default)]
    pub global_config_update: GlobalConfigUpdate,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            labels: PriceLabelGroups::default(),
            base_rate: default_base_rate(),
            global_config_update: GlobalConfigUpdate::default(),
        }
    }
}

fn default_base_rate() -> f64 { 1.0 }

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PriceLabelGroups {
    #[serde(default)]
    pub time: Vec<PriceLabel>,
    #[serde(default)]
    pub priority: Vec<PriceLabel>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceLabel {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GlobalConfigUpdate {
    #[serde(default)]
    pub exclude_repos: Vec<String>,
}
