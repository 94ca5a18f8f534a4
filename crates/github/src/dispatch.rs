use std::{str::FromStr, sync::OnceLock};

use anyhow::{Context as _, Result, bail};
use jsonwebtoken::EncodingKey;
use octocrab::{Octocrab, models::InstallationId};
use pricing_bot_core::{
    Context,
    env::{AppCredentials, DispatchConfig},
};
use regex::Regex;

/// The workflow re-invoked for events the worker cannot handle itself.
pub const COMPUTE_WORKFLOW: &str = "compute.yml";

/// A parsed `owner/repo@ref` action reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRef {
    pub owner: String,
    pub repo: String,
    pub git_ref: String,
}

impl FromStr for ActionRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        static REGEX: OnceLock<Regex> = OnceLock::new();
        let regex =
            REGEX.get_or_init(|| Regex::new(r"^([\w-]+)/([\w.-]+)@([\w./-]+)$").unwrap());
        let caps = regex
            .captures(s)
            .with_context(|| format!("Action reference {s:?} is not in owner/repo@ref format"))?;
        Ok(Self {
            owner: caps[1].to_string(),
            repo: caps[2].to_string(),
            git_ref: caps[3].to_string(),
        })
    }
}

/// Which identity performs the dispatch call.
#[derive(Debug)]
pub enum DispatchAuth<'a> {
    /// Reuse the ambient default client. Appropriate for same-repository,
    /// default-permission operations.
    Ambient,
    /// Mint a fresh client scoped to the configured installation.
    App(&'a AppCredentials),
}

/// The fallback decision, separated from client construction so it stays a
/// pure function of the credential set.
pub fn resolve_auth(app: Option<&AppCredentials>) -> DispatchAuth<'_> {
    match app {
        Some(credentials) => DispatchAuth::App(credentials),
        None => DispatchAuth::Ambient,
    }
}

fn dispatch_client(ambient: &Octocrab, auth: DispatchAuth<'_>) -> Result<Octocrab> {
    match auth {
        DispatchAuth::Ambient => {
            tracing::debug!("App credentials missing from the environment, using default client");
            Ok(ambient.clone())
        }
        DispatchAuth::App(credentials) => {
            let app_client = Octocrab::builder()
                .app(
                    credentials.app_id.into(),
                    EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
                        .context("Failed to parse APP_PRIVATE_KEY")?,
                )
                .build()
                .context("Failed to create app client")?;
            app_client
                .installation(InstallationId(credentials.installation_id))
                .context("Failed to scope client to installation")
        }
    }
}

/// Re-dispatch the compute workflow at the configured action reference,
/// forwarding `inputs` (the raw body of the triggering request) verbatim.
///
/// Missing owner, missing `ACTION_REF`, and a malformed reference are fatal
/// configuration errors raised before any remote call.
pub async fn trigger_compute_workflow(
    ctx: &Context,
    dispatch: &DispatchConfig,
    inputs: serde_json::Value,
) -> Result<()> {
    if ctx.event.repository().owner.is_none() {
        bail!("Owner is missing from payload");
    }
    let Some(action_ref) = dispatch.action_ref.as_deref() else {
        bail!("ACTION_REF is missing from the environment");
    };
    let target: ActionRef = action_ref.parse()?;
    tracing::info!(
        "Will try to dispatch a workflow at {}/{}@{}",
        target.owner,
        target.repo,
        target.git_ref
    );
    let client = dispatch_client(&ctx.client, resolve_auth(dispatch.app.as_ref()))?;
    client
        .actions()
        .create_workflow_dispatch(&target.owner, &target.repo, COMPUTE_WORKFLOW, &target.git_ref)
        .inputs(inputs)
        .send()
        .await
        .context("Failed to dispatch workflow")?;
    Ok(())
}
