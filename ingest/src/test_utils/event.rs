use bytes::Bytes;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use crate::types::{CommitStats, EventBatch, EventsCursor, PUSH_EVENT_TYPE, SourceEvent};

/// Builds a push event on `repo_name` carrying `payload`.
pub fn push_event(id: &str, repo_name: &str, payload: Value) -> SourceEvent {
    SourceEvent {
        id: id.to_owned(),
        event_type: PUSH_EVENT_TYPE.to_owned(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single(),
        actor_login: Some("octocat".to_owned()),
        repo_name: Some(repo_name.to_owned()),
        payload: Bytes::from(payload.to_string()),
    }
}

/// Builds a push event whose payload is the raw `payload` bytes, valid JSON or not.
pub fn push_event_with_raw_payload(
    id: &str,
    repo_name: &str,
    payload: &'static [u8],
) -> SourceEvent {
    SourceEvent {
        payload: Bytes::from_static(payload),
        ..push_event(id, repo_name, Value::Null)
    }
}

/// Builds an event of a type other than push.
pub fn other_event(id: &str, event_type: &str, repo_name: &str) -> SourceEvent {
    SourceEvent {
        event_type: event_type.to_owned(),
        ..push_event(id, repo_name, commits_payload(&["ignored"]))
    }
}

/// Payload listing `shas` as the pushed commits.
pub fn commits_payload(shas: &[&str]) -> Value {
    let commits: Vec<Value> = shas.iter().map(|sha| json!({ "sha": sha })).collect();

    json!({
        "before": "0000000000000000000000000000000000000000",
        "after": shas.last().copied().unwrap_or_default(),
        "commits": commits,
    })
}

/// Payload without a commit list, only pointing at the tip of the push.
pub fn tip_payload(head: Option<&str>, after: Option<&str>) -> Value {
    json!({
        "before": "0000000000000000000000000000000000000000",
        "head": head,
        "after": after,
        "commits": [],
    })
}

/// Batch of `events` carrying the etag `cursor`.
pub fn batch(events: Vec<SourceEvent>, cursor: &str) -> EventBatch {
    EventBatch {
        events,
        cursor: EventsCursor::new(cursor),
    }
}

/// Commit statistics whose total is consistent with the given counts.
pub fn commit_stats(sha: &str, additions: i64, deletions: i64) -> CommitStats {
    CommitStats {
        sha: sha.to_owned(),
        author: Some("Octo Cat".to_owned()),
        committed_at: Utc.with_ymd_and_hms(2024, 5, 1, 11, 59, 0).single(),
        additions,
        deletions,
        total: additions + deletions,
    }
}
