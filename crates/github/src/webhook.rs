use std::{fmt::Display, sync::Arc};

use axum::{
    body::Bytes,
    extract::{FromRef, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use pricing_bot_core::config::Config;
use sha2::Sha256;

/// Verify and extract a GitHub event delivery.
///
/// The body is kept as raw bytes: the worker forwards it verbatim as the
/// workflow-dispatch inputs, so it must survive untouched alongside the
/// decoded event.
#[derive(Clone)]
#[must_use]
pub struct WebhookDelivery {
    /// The `X-GitHub-Event` header value.
    pub event: String,
    pub body: Bytes,
}

impl<S> FromRequest<S> for WebhookDelivery
where
    Arc<Config>: FromRef<S>,
    S: Send + Sync + Clone,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        fn err(m: impl Display) -> Response {
            tracing::error!("{m}");
            (StatusCode::BAD_REQUEST, m.to_string()).into_response()
        }
        let event = req
            .headers()
            .get("X-GitHub-Event")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| err("X-GitHub-Event header missing"))?
            .to_string();
        let config = <Arc<Config>>::from_ref(state);
        let body = if let Some(secret) = &config.github.webhook_secret {
            let signature_sha256 = req
                .headers()
                .get("X-Hub-Signature-256")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| err("X-Hub-Signature-256 missing"))?
                .strip_prefix("sha256=")
                .ok_or_else(|| err("X-Hub-Signature-256 sha256= prefix missing"))?;
            let signature =
                hex::decode(signature_sha256).map_err(|_| err("X-Hub-Signature-256 malformed"))?;
            let body =
                Bytes::from_request(req, state).await.map_err(|_| err("error reading body"))?;
            let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
                .expect("HMAC can take key of any size");
            mac.update(&body);
            if mac.verify_slice(&signature).is_err() {
                return Err(err("signature mismatch"));
            }
            body
        } else {
            Bytes::from_request(req, state).await.map_err(|_| err("error reading body"))?
        };
        Ok(WebhookDelivery { event, body })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::{FromRef, FromRequest, Request},
    };
    use hmac::{Hmac, Mac};
    use pricing_bot_core::config::{Config, GitHubConfig, ServerConfig};
    use sha2::Sha256;

    use super::WebhookDelivery;

    #[derive(Clone)]
    struct TestState {
        config: Arc<Config>,
    }

    impl FromRef<TestState> for Arc<Config> {
        fn from_ref(state: &TestState) -> Self { state.config.clone() }
    }

    fn state(webhook_secret: Option<&str>) -> TestState {
        TestState {
            config: Arc::new(Config {
                server: ServerConfig { port: 0 },
                github: GitHubConfig {
                    token: "token".to_string(),
                    webhook_secret: webhook_secret.map(str::to_string),
                },
                settings: Default::default(),
            }),
        }
    }

    fn request(event: Option<&str>, signature: Option<String>, body: &str) -> Request {
        let mut builder = Request::builder();
        if let Some(event) = event {
            builder = builder.header("X-GitHub-Event", event);
        }
        if let Some(signature) = signature {
            builder = builder.header("X-Hub-Signature-256", signature);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn sign(secret: &str, body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[tokio::test]
    async fn accepts_valid_signature() {
        let body = r#"{"action":"opened"}"#;
        let req = request(Some("issues"), Some(sign("secret", body)), body);
        let delivery = WebhookDelivery::from_request(req, &state(Some("secret"))).await.unwrap();
        assert_eq!(delivery.event, "issues");
        assert_eq!(&delivery.body[..], body.as_bytes());
    }

    #[tokio::test]
    async fn rejects_signature_mismatch() {
        let req =
            request(Some("issues"), Some(sign("secret", "tampered")), r#"{"action":"opened"}"#);
        assert!(WebhookDelivery::from_request(req, &state(Some("secret"))).await.is_err());
    }

    #[tokio::test]
    async fn rejects_missing_event_header() {
        let req = request(None, None, "{}");
        assert!(WebhookDelivery::from_request(req, &state(None)).await.is_err());
    }

    #[tokio::test]
    async fn skips_verification_without_secret() {
        let req = request(Some("push"), None, "{}");
        let delivery = WebhookDelivery::from_request(req, &state(None)).await.unwrap();
        assert_eq!(delivery.event, "push");
    }
}
