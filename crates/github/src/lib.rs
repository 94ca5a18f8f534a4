pub mod dispatch;
pub mod webhook;

use std::sync::Arc;

use anyhow::{Context, Result};
use octocrab::Octocrab;
use pricing_bot_core::config::GitHubConfig;

/// Shared GitHub client bundle built from the configured token.
#[derive(Clone)]
pub struct GitHub {
    pub client: Octocrab,
}

impl GitHub {
    pub async fn new(config: &GitHubConfig) -> Result<Arc<Self>> {
        let client = Octocrab::builder()
            .personal_token(config.token.clone())
            .build()
            .context("Failed to create GitHub client")?;
        octocrab::initialise(client.clone());
        // Installation tokens have no user behind them, so a failure here is
        // not fatal.
        match client.current().user().await {
            Ok(profile) => tracing::info!("Logged in as {}", profile.login),
            Err(_) => tracing::debug!("Token has no resolvable user identity"),
        }
        Ok(Arc::new(Self { client }))
    }
}
