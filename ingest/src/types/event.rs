use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Event type of the push events fanned out into commit jobs.
pub const PUSH_EVENT_TYPE: &str = "PushEvent";

/// An event as listed by an [`crate::source::EventSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEvent {
    pub id: String,
    pub event_type: String,
    pub created_at: Option<DateTime<Utc>>,
    pub actor_login: Option<String>,
    /// Repository in `owner/repo` form.
    pub repo_name: Option<String>,
    /// Raw JSON payload, empty when the event carried none.
    pub payload: Bytes,
}

impl SourceEvent {
    pub fn is_push(&self) -> bool {
        self.event_type == PUSH_EVENT_TYPE
    }

    /// Splits the repository name into owner and repository.
    ///
    /// Returns [`None`] unless the name has the `owner/repo` shape with both parts non-empty.
    pub fn owner_and_repo(&self) -> Option<(&str, &str)> {
        let (owner, repo) = self.repo_name.as_deref()?.split_once('/')?;
        if owner.is_empty() || repo.is_empty() {
            return None;
        }

        Some((owner, repo))
    }
}

/// Opaque conditional marker returned by an [`crate::source::EventSource`].
///
/// Passing it back lets the source answer "unchanged" instead of listing the same events again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsCursor(Option<String>);

impl EventsCursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Some(value.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Events returned by one fetch together with the cursor to use for the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBatch {
    pub events: Vec<SourceEvent>,
    pub cursor: EventsCursor,
}

impl EventBatch {
    /// Batch answering "nothing changed since `cursor`".
    pub fn unchanged(cursor: EventsCursor) -> Self {
        Self {
            events: Vec::new(),
            cursor,
        }
    }
}

/// Persisted form of a push event.
///
/// Its insertion is the deduplication gate for fanning the event out into commit jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEventRow {
    pub id: String,
    pub event_type: String,
    pub created_at: Option<DateTime<Utc>>,
    pub actor_login: Option<String>,
    pub repo_name: Option<String>,
    pub raw_payload: Bytes,
}

impl From<&SourceEvent> for PushEventRow {
    fn from(event: &SourceEvent) -> Self {
        Self {
            id: event.id.clone(),
            event_type: event.event_type.clone(),
            created_at: event.created_at,
            actor_login: event.actor_login.clone(),
            repo_name: event.repo_name.clone(),
            raw_payload: event.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_for(repo_name: Option<&str>) -> SourceEvent {
        SourceEvent {
            id: "1".to_owned(),
            event_type: PUSH_EVENT_TYPE.to_owned(),
            created_at: None,
            actor_login: None,
            repo_name: repo_name.map(str::to_owned),
            payload: Bytes::new(),
        }
    }

    #[test]
    fn repo_name_is_split_on_first_slash() {
        assert_eq!(
            event_for(Some("octo/hello")).owner_and_repo(),
            Some(("octo", "hello"))
        );
        assert_eq!(
            event_for(Some("octo/hello/extra")).owner_and_repo(),
            Some(("octo", "hello/extra"))
        );
    }

    #[test]
    fn malformed_repo_names_are_rejected() {
        assert_eq!(event_for(Some("no-slash")).owner_and_repo(), None);
        assert_eq!(event_for(Some("/repo")).owner_and_repo(), None);
        assert_eq!(event_for(Some("owner/")).owner_and_repo(), None);
        assert_eq!(event_for(None).owner_and_repo(), None);
    }
}
