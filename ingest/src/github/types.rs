//! Wire formats of the GitHub REST API responses.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::types::{CommitStats, SourceEvent};

#[derive(Debug, Deserialize)]
pub(crate) struct GithubEvent {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) event_type: String,
    #[serde(default)]
    pub(crate) created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) actor: Option<GithubActor>,
    #[serde(default)]
    pub(crate) repo: Option<GithubRepo>,
    #[serde(default)]
    pub(crate) payload: Option<Box<RawValue>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubActor {
    #[serde(default)]
    pub(crate) login: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubRepo {
    #[serde(default, alias = "full_name")]
    pub(crate) name: Option<String>,
}

impl From<GithubEvent> for SourceEvent {
    fn from(event: GithubEvent) -> Self {
        let payload = event
            .payload
            .map(|raw| Bytes::from(raw.get().to_owned()))
            .unwrap_or_default();

        SourceEvent {
            id: event.id,
            event_type: event.event_type,
            created_at: event.created_at,
            actor_login: event.actor.and_then(|actor| actor.login),
            repo_name: event.repo.and_then(|repo| repo.name),
            payload,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubCommit {
    #[serde(default)]
    pub(crate) sha: String,
    #[serde(default)]
    pub(crate) commit: Option<GithubCommitDetail>,
    #[serde(default)]
    pub(crate) stats: Option<GithubCommitStats>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubCommitDetail {
    #[serde(default)]
    pub(crate) author: Option<GithubCommitAuthor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GithubCommitAuthor {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GithubCommitStats {
    #[serde(default)]
    pub(crate) additions: Option<i64>,
    #[serde(default)]
    pub(crate) deletions: Option<i64>,
    #[serde(default)]
    pub(crate) total: Option<i64>,
}

impl From<GithubCommit> for CommitStats {
    fn from(commit: GithubCommit) -> Self {
        let author = commit.commit.and_then(|detail| detail.author);
        let stats = commit.stats.unwrap_or_default();

        CommitStats {
            sha: commit.sha,
            author: author.as_ref().and_then(|author| author.name.clone()),
            committed_at: author.and_then(|author| author.date),
            additions: stats.additions.unwrap_or(0),
            deletions: stats.deletions.unwrap_or(0),
            total: stats.total.unwrap_or(0),
        }
    }
}
