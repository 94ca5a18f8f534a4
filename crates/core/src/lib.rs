pub mod config;
pub mod env;
pub mod event;
pub mod router;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use octocrab::Octocrab;
use serde::Serialize;

use crate::{config::PricingSettings, event::Event};

/// Per-invocation execution context. Owned by the entrypoint, read-only for
/// the router and handlers.
pub struct Context {
    pub event: Event,
    pub settings: PricingSettings,
    /// The pre-authenticated default client.
    pub client: Octocrab,
}

/// The three label operations the router delegates to. Kept behind a trait so
/// the router stays a pure mapping from events to operations.
#[async_trait]
pub trait PriceHandlers {
    /// Ensure the repository's price labels match the configured set.
    async fn sync_price_labels_to_config(&self, ctx: &Context) -> Result<()>;
    /// Recompute an issue's price after a label change.
    async fn on_label_change_set_pricing(&self, ctx: &Context) -> Result<()>;
    /// Re-apply the configured label set after a config push.
    async fn global_label_update(&self, ctx: &Context) -> Result<()>;
}

/// Uniform acknowledgement returned for every completed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn ok() -> Self { Self { message: "OK".to_string() } }
}

pub enum AppError {
    Status(StatusCode),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Status(status) => status.into_response(),
            Self::Internal(err) => {
                tracing::error!("{:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Something went wrong: {}", err))
                    .into_response()
            }
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self { Self::Internal(err.into()) }
}
