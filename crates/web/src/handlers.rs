use anyhow::Context as _;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use pricing_bot_core::{
    Ack, AppError, Context,
    event::{Event, EventKind},
    router,
};
use pricing_bot_github::{dispatch, webhook::WebhookDelivery};
use pricing_bot_handlers::LabelOps;

use crate::AppState;

pub fn build_router() -> Router<AppState> {
    Router::new().route("/", post(webhook)).route("/health", get(health))
}

async fn health() -> &'static str { "OK" }

/// Worker entry: verify, decode, then either re-dispatch the compute
/// workflow or route to a handler.
async fn webhook(
    State(state): State<AppState>,
    delivery: WebhookDelivery,
) -> Result<Json<Ack>, AppError> {
    let event = match Event::decode(&delivery.event, &delivery.body) {
        Ok(Some(event)) => event,
        Ok(None) => {
            tracing::debug!("Ignoring {} delivery", delivery.event);
            return Ok(Json(Ack::ok()));
        }
        Err(err) => {
            tracing::error!("{:?}", err);
            return Err(AppError::Status(StatusCode::BAD_REQUEST));
        }
    };
    tracing::info!(
        "Received {} from {}",
        event.kind(),
        event.repository().full_name.as_deref().unwrap_or("[unknown]")
    );
    let ctx = Context {
        event,
        settings: state.config.settings.clone(),
        client: state.github.client.clone(),
    };
    // Config-affecting events are handled by the CI action, so outside local
    // development the worker forwards them to the compute workflow with the
    // original request body as inputs.
    let forwarded = matches!(
        ctx.event.kind(),
        EventKind::IssuesOpened | EventKind::RepositoryCreated | EventKind::Push
    );
    if forwarded && !state.runtime.is_local() {
        let inputs =
            serde_json::from_slice(&delivery.body).context("Failed to parse request body")?;
        dispatch::trigger_compute_workflow(&ctx, &state.dispatch, inputs).await?;
        return Ok(Json(Ack::ok()));
    }
    let ack = router::run(&ctx, state.runtime, &LabelOps).await?;
    Ok(Json(ack))
}
