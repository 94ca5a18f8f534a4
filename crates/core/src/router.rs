use anyhow::Result;

use crate::{Ack, Context, PriceHandlers, env::RuntimeEnv, event::Event};

/// Dispatch an event to at most one handler.
///
/// A matched event whose environment guard is false is a silent no-op: the
/// other deployment variant is responsible for it. Events outside the routing
/// table log an error and still acknowledge. Handler failures propagate to
/// the host, which owns user-visible surfacing.
pub async fn run<H>(ctx: &Context, env: RuntimeEnv, handlers: &H) -> Result<Ack>
where H: PriceHandlers + Sync {
    match &ctx.event {
        Event::IssuesOpened(_) | Event::RepositoryCreated(_) => {
            if env.is_github_or_local() {
                handlers.sync_price_labels_to_config(ctx).await?;
            }
        }
        Event::IssuesLabeled(payload) | Event::IssuesUnlabeled(payload) => {
            if payload.label.is_some() && env.is_worker_or_local() {
                handlers.on_label_change_set_pricing(ctx).await?;
            }
        }
        Event::Push(_) => {
            if env.is_github_or_local() {
                handlers.global_label_update(ctx).await?;
            }
        }
        event => tracing::error!("Event {} is not supported", event.kind()),
    }
    Ok(Ack::ok())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, bail};
    use async_trait::async_trait;

    use super::run;
    use crate::{
        Ack, Context, PriceHandlers,
        config::PricingSettings,
        env::RuntimeEnv,
        event::{
            Event, Issue, IssueLabelPayload, IssuesPayload, Label, LabelPayload, PushPayload,
            Repository,
        },
    };

    #[derive(Default)]
    struct Recorder {
        sync: AtomicUsize,
        pricing: AtomicUsize,
        global: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PriceHandlers for Recorder {
        async fn sync_price_labels_to_config(&self, _ctx: &Context) -> Result<()> {
            self.sync.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                bail!("sync failed");
            }
            Ok(())
        }

        async fn on_label_change_set_pricing(&self, _ctx: &Context) -> Result<()> {
            self.pricing.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn global_label_update(&self, _ctx: &Context) -> Result<()> {
            self.global.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    impl Recorder {
        fn calls(&self) -> (usize, usize, usize) {
            (
                self.sync.load(Ordering::Relaxed),
                self.pricing.load(Ordering::Relaxed),
                self.global.load(Ordering::Relaxed),
            )
        }
    }

    const WORKER: RuntimeEnv = RuntimeEnv { local: false, github_actions: false };
    const ACTION: RuntimeEnv = RuntimeEnv { local: false, github_actions: true };
    const LOCAL: RuntimeEnv = RuntimeEnv { local: true, github_actions: false };

    fn repository() -> Repository {
        Repository {
            name: "my-repo".to_string(),
            owner: Some(crate::event::Account { login: "my-org".to_string() }),
            full_name: Some("my-org/my-repo".to_string()),
            default_branch: Some("main".to_string()),
        }
    }

    fn context(event: Event) -> Context {
        Context {
            event,
            settings: PricingSettings::default(),
            client: octocrab::Octocrab::default(),
        }
    }

    fn push() -> Event {
        Event::Push(PushPayload { git_ref: "refs/heads/main".to_string(), repository: repository() })
    }

    fn labeled(label: Option<&str>) -> Event {
        Event::IssuesLabeled(IssueLabelPayload {
            issue: Issue { number: 1, labels: vec![] },
            label: label.map(|name| Label { name: name.to_string() }),
            repository: repository(),
        })
    }

    #[tokio::test]
    async fn push_is_suppressed_outside_github() {
        let recorder = Recorder::default();
        let ack = run(&context(push()), WORKER, &recorder).await.unwrap();
        assert_eq!(ack, Ack::ok());
        assert_eq!(recorder.calls(), (0, 0, 0));
    }

    #[tokio::test]
    async fn push_runs_global_update_on_github() {
        let recorder = Recorder::default();
        run(&context(push()), ACTION, &recorder).await.unwrap();
        assert_eq!(recorder.calls(), (0, 0, 1));
    }

    #[tokio::test]
    async fn opened_syncs_labels_on_github_and_local() {
        let event = || {
            Event::IssuesOpened(IssuesPayload {
                issue: Issue { number: 1, labels: vec![] },
                repository: repository(),
            })
        };
        let recorder = Recorder::default();
        run(&context(event()), ACTION, &recorder).await.unwrap();
        run(&context(event()), LOCAL, &recorder).await.unwrap();
        run(&context(event()), WORKER, &recorder).await.unwrap();
        assert_eq!(recorder.calls(), (2, 0, 0));
    }

    #[tokio::test]
    async fn labeled_prices_on_worker_only_with_label() {
        let recorder = Recorder::default();
        run(&context(labeled(Some("Time: <1 Hour"))), WORKER, &recorder).await.unwrap();
        run(&context(labeled(None)), WORKER, &recorder).await.unwrap();
        run(&context(labeled(Some("Time: <1 Hour"))), ACTION, &recorder).await.unwrap();
        assert_eq!(recorder.calls(), (0, 1, 0));
    }

    #[tokio::test]
    async fn unrouted_event_still_acknowledges() {
        let recorder = Recorder::default();
        let event = Event::LabelEdited(LabelPayload {
            label: Label { name: "bug".to_string() },
            repository: repository(),
        });
        let ack = run(&context(event), LOCAL, &recorder).await.unwrap();
        assert_eq!(ack, Ack::ok());
        assert_eq!(recorder.calls(), (0, 0, 0));
    }

    #[tokio::test]
    async fn handler_failure_propagates() {
        let recorder = Recorder { fail: true, ..Recorder::default() };
        let event = Event::IssuesOpened(IssuesPayload {
            issue: Issue { number: 1, labels: vec![] },
            repository: repository(),
        });
        assert!(run(&context(event), LOCAL, &recorder).await.is_err());
    }
}
