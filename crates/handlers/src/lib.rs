pub mod pricing;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use pricing_bot_core::{
    Context, PriceHandlers,
    config::PricingSettings,
    event::{Event, Repository},
};

const PRICE_LABEL_COLOR: &str = "1f883d";

/// Reference implementation of the label operations behind the
/// [`PriceHandlers`] seam.
pub struct LabelOps;

#[async_trait]
impl PriceHandlers for LabelOps {
    async fn sync_price_labels_to_config(&self, ctx: &Context) -> Result<()> {
        let (owner, repo) = repo_coordinates(ctx.event.repository())?;
        sync_labels(&ctx.client, &ctx.settings, owner, repo, false).await
    }

    async fn on_label_change_set_pricing(&self, ctx: &Context) -> Result<()> {
        let (Event::IssuesLabeled(payload) | Event::IssuesUnlabeled(payload)) = &ctx.event else {
            return Ok(());
        };
        let Some(changed) = &payload.label else {
            return Ok(());
        };
        if !pricing::affects_pricing(&ctx.settings, &changed.name) {
            tracing::debug!("Label {} does not affect pricing", changed.name);
            return Ok(());
        }
        let (owner, repo) = repo_coordinates(&payload.repository)?;
        let number = payload.issue.number;
        // The payload's label list already reflects the change.
        let desired = pricing::price_from_labels(
            &ctx.settings,
            payload.issue.labels.iter().map(|l| l.name.as_str()),
        )
        .map(pricing::price_label);
        let issues = ctx.client.issues(owner, repo);
        for label in &payload.issue.labels {
            if pricing::is_price_label(&label.name) && desired.as_deref() != Some(label.name.as_str()) {
                tracing::info!("Removing {} from {owner}/{repo}#{number}", label.name);
                issues
                    .remove_label(number, &label.name)
                    .await
                    .with_context(|| format!("Failed to remove label {}", label.name))?;
            }
        }
        if let Some(desired) = desired {
            if !payload.issue.labels.iter().any(|l| l.name == desired) {
                tracing::info!("Setting {desired} on {owner}/{repo}#{number}");
                issues
                    .add_labels(number, &[desired.clone()])
                    .await
                    .with_context(|| format!("Failed to add label {desired}"))?;
            }
        }
        Ok(())
    }

    async fn global_label_update(&self, ctx: &Context) -> Result<()> {
        let Event::Push(payload) = &ctx.event else {
            return Ok(());
        };
        // Only the default branch carries the authoritative configuration.
        let default_branch = payload.repository.default_branch.as_deref().unwrap_or("main");
        if payload.git_ref != format!("refs/heads/{default_branch}") {
            tracing::debug!("Ignoring push to {}", payload.git_ref);
            return Ok(());
        }
        let (owner, repo) = repo_coordinates(&payload.repository)?;
        let excluded = ctx.settings.global_config_update.exclude_repos.iter().any(|excluded| {
            excluded == repo || Some(excluded.as_str()) == payload.repository.full_name.as_deref()
        });
        if excluded {
            tracing::info!("Repository {owner}/{repo} is excluded from global label updates");
            return Ok(());
        }
        sync_labels(&ctx.client, &ctx.settings, owner, repo, true).await
    }
}

fn repo_coordinates(repository: &Repository) -> Result<(&str, &str)> {
    let owner = repository.owner.as_ref().context("Repository has no owner")?;
    Ok((owner.login.as_str(), repository.name.as_str()))
}

/// Create configured price labels that are missing from the repository.
/// When `prune` is set, also delete price labels the configuration no longer
/// implies. Labels unrelated to pricing are never touched.
async fn sync_labels(
    client: &Octocrab,
    settings: &PricingSettings,
    owner: &str,
    repo: &str,
    prune: bool,
) -> Result<()> {
    let configured = pricing::configured_price_labels(settings);
    let existing = list_labels(client, owner, repo).await?;
    let issues = client.issues(owner, repo);
    for name in &configured {
        if !existing.iter().any(|e| e.eq_ignore_ascii_case(name)) {
            tracing::info!("Creating label {name} in {owner}/{repo}");
            issues
                .create_label(name, PRICE_LABEL_COLOR, "")
                .await
                .with_context(|| format!("Failed to create label {name}"))?;
        }
    }
    if prune {
        for name in &existing {
            if pricing::is_price_label(name)
                && !configured.iter().any(|c| c.eq_ignore_ascii_case(name))
            {
                tracing::info!("Deleting stale label {name} in {owner}/{repo}");
                issues
                    .delete_label(name)
                    .await
                    .with_context(|| format!("Failed to delete label {name}"))?;
            }
        }
    }
    Ok(())
}

async fn list_labels(client: &Octocrab, owner: &str, repo: &str) -> Result<Vec<String>> {
    let page = client
        .issues(owner, repo)
        .list_labels_for_repo()
        .per_page(100)
        .send()
        .await
        .context("Failed to list labels")?;
    let labels = client.all_pages(page).await.context("Failed to list labels")?;
    Ok(labels.into_iter().map(|l| l.name).collect())
}
