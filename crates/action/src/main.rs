use std::path::PathBuf;

use anyhow::{Context as _, Result};
use argp::FromArgs;
use pricing_bot_core::{Context, config::Config, env::RuntimeEnv, event::Event, router};
use pricing_bot_github::GitHub;
use pricing_bot_handlers::LabelOps;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Run the pricing bot against the event in the GitHub Actions environment.
#[derive(FromArgs, Debug)]
struct Args {
    /// path to the configuration file
    #[argp(option, short = 'c', default = "PathBuf::from(\"config.yml\")")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let default_level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy(),
        )
        .init();

    let args: Args = argp::parse_args_or_exit(argp::DEFAULT);
    let config = Config::load(&args.config)?;
    let runtime = RuntimeEnv::from_env();

    let event_name =
        std::env::var("GITHUB_EVENT_NAME").context("GITHUB_EVENT_NAME is not set")?;
    let event_path =
        std::env::var("GITHUB_EVENT_PATH").context("GITHUB_EVENT_PATH is not set")?;
    let body = std::fs::read(&event_path)
        .with_context(|| format!("Failed to read event payload {event_path}"))?;
    let Some(event) = Event::decode(&event_name, &body)? else {
        tracing::warn!("Event {} is not handled by this bot", event_name);
        return Ok(());
    };

    let github = GitHub::new(&config.github).await?;
    let ctx = Context { event, settings: config.settings, client: github.client.clone() };
    let ack = router::run(&ctx, runtime, &LabelOps).await?;
    tracing::info!("{}", ack.message);
    Ok(())
}
