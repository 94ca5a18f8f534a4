use std::fmt;

use anyhow::{Context as _, Result};
use serde::Deserialize;

/// The fixed set of events the bot subscribes to, named the way the webhook
/// configuration names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    IssuesOpened,
    IssuesLabeled,
    IssuesUnlabeled,
    IssueCommentCreated,
    LabelEdited,
    RepositoryCreated,
    Push,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IssuesOpened => "issues.opened",
            Self::IssuesLabeled => "issues.labeled",
            Self::IssuesUnlabeled => "issues.unlabeled",
            Self::IssueCommentCreated => "issue_comment.created",
            Self::LabelEdited => "label.edited",
            Self::RepositoryCreated => "repository.created",
            Self::Push => "push",
        }
    }

    /// Map a delivery's `X-GitHub-Event` header (or `GITHUB_EVENT_NAME`) and
    /// the payload's `action` discriminator to a kind. Combinations outside
    /// the subscribed set map to `None`.
    fn from_webhook(event: &str, action: Option<&str>) -> Option<Self> {
        match (event, action) {
            ("issues", Some("opened")) => Some(Self::IssuesOpened),
            ("issues", Some("labeled")) => Some(Self::IssuesLabeled),
            ("issues", Some("unlabeled")) => Some(Self::IssuesUnlabeled),
            ("issue_comment", Some("created")) => Some(Self::IssueCommentCreated),
            ("label", Some("edited")) => Some(Self::LabelEdited),
            ("repository", Some("created")) => Some(Self::RepositoryCreated),
            ("push", _) => Some(Self::Push),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub owner: Option<Account>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuesPayload {
    pub issue: Issue,
    pub repository: Repository,
}

/// `issues.labeled` / `issues.unlabeled`. GitHub omits `label` when the
/// delivery was triggered with several labels at once, so it stays optional
/// and the router narrows on it.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueLabelPayload {
    pub issue: Issue,
    #[serde(default)]
    pub label: Option<Label>,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentPayload {
    pub issue: Issue,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelPayload {
    pub label: Label,
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryPayload {
    pub repository: Repository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: Repository,
}

/// A decoded inbound event, keyed by [`EventKind`] with the payload shape
/// narrowed per variant.
#[derive(Debug, Clone)]
pub enum Event {
    IssuesOpened(IssuesPayload),
    IssuesLabeled(IssueLabelPayload),
    IssuesUnlabeled(IssueLabelPayload),
    IssueCommentCreated(IssueCommentPayload),
    LabelEdited(LabelPayload),
    RepositoryCreated(RepositoryPayload),
    Push(PushPayload),
}

#[derive(Deserialize)]
struct Discriminator {
    #[serde(default)]
    action: Option<String>,
}

impl Event {
    /// Decode a delivery into a typed event. Returns `None` for deliveries
    /// outside the subscribed set; those are acknowledged and ignored by the
    /// caller.
    pub fn decode(event: &str, body: &[u8]) -> Result<Option<Self>> {
        fn parse<T: serde::de::DeserializeOwned>(kind: EventKind, body: &[u8]) -> Result<T> {
            serde_json::from_slice(body)
                .with_context(|| format!("Failed to decode {kind} payload"))
        }
        let Discriminator { action } =
            serde_json::from_slice(body).context("Failed to decode event payload")?;
        let Some(kind) = EventKind::from_webhook(event, action.as_deref()) else {
            return Ok(None);
        };
        let event = match kind {
            EventKind::IssuesOpened => Self::IssuesOpened(parse(kind, body)?),
            EventKind::IssuesLabeled => Self::IssuesLabeled(parse(kind, body)?),
            EventKind::IssuesUnlabeled => Self::IssuesUnlabeled(parse(kind, body)?),
            EventKind::IssueCommentCreated => Self::IssueCommentCreated(parse(kind, body)?),
            EventKind::LabelEdited => Self::LabelEdited(parse(kind, body)?),
            EventKind::RepositoryCreated => Self::RepositoryCreated(parse(kind, body)?),
            EventKind::Push => Self::Push(parse(kind, body)?),
        };
        Ok(Some(event))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::IssuesOpened(_) => EventKind::IssuesOpened,
            Self::IssuesLabeled(_) => EventKind::IssuesLabeled,
            Self::IssuesUnlabeled(_) => EventKind::IssuesUnlabeled,
            Self::IssueCommentCreated(_) => EventKind::IssueCommentCreated,
            Self::LabelEdited(_) => EventKind::LabelEdited,
            Self::RepositoryCreated(_) => EventKind::RepositoryCreated,
            Self::Push(_) => EventKind::Push,
        }
    }

    pub fn repository(&self) -> &Repository {
        match self {
            Self::IssuesOpened(p) => &p.repository,
            Self::IssuesLabeled(p) | Self::IssuesUnlabeled(p) => &p.repository,
            Self::IssueCommentCreated(p) => &p.repository,
            Self::LabelEdited(p) => &p.repository,
            Self::RepositoryCreated(p) => &p.repository,
            Self::Push(p) => &p.repository,
        }
    }
}
