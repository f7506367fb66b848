use chrono::Utc;
use config::shared::GithubConfig;
use reqwest::header::{ACCEPT, AUTHORIZATION, ETAG, IF_NONE_MATCH};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{ErrorKind, IngestResult};
use crate::github::retry::{ResponseClass, RetryPolicy, classify_response};
use crate::github::types::{GithubCommit, GithubEvent};
use crate::source::{CommitSource, EventSource};
use crate::types::{CommitStats, EventBatch, EventsCursor, SourceEvent};
use crate::{bail, ingest_error};

/// Media type recommended by GitHub for REST v3 calls.
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// GitHub REST client implementing [`EventSource`] and [`CommitSource`].
///
/// Every call goes through a bounded retry loop: server errors are retried with exponential
/// backoff, a rate limit resetting soon enough is waited out once, and everything else is returned
/// to the caller as is. When built with [`GithubClient::with_shutdown_rx`], a shutdown observed
/// after a sleep abandons the remaining attempts.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<SecretString>,
    retry_policy: RetryPolicy,
    shutdown_rx: Option<ShutdownRx>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> IngestResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        let token = config
            .token
            .clone()
            .filter(|token| !token.expose_secret().is_empty());

        if token.is_none() {
            warn!("no github token configured, requests are subject to the anonymous rate limit");
        }

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            token,
            retry_policy: RetryPolicy::DEFAULT,
            shutdown_rx: None,
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_shutdown_rx(mut self, shutdown_rx: ShutdownRx) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown_rx
            .as_ref()
            .is_some_and(|shutdown_rx| shutdown_rx.is_shutdown())
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let mut request = self.http.get(url).header(ACCEPT, GITHUB_MEDIA_TYPE);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token.expose_secret()));
        }

        request
    }

    /// Sends the request built by `build_request` until it yields a final response.
    ///
    /// The returned response may carry any non-5xx status; interpreting it is up to the caller.
    async fn send_with_retries<F>(
        &self,
        operation: &'static str,
        build_request: F,
    ) -> IngestResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 1;
        let mut rate_limit_retries = 0;

        loop {
            let response = build_request().send().await?;
            let status = response.status();

            match classify_response(status, response.headers(), Utc::now()) {
                ResponseClass::Final => return Ok(response),
                ResponseClass::RateLimited { resume_in } => {
                    let wait = if rate_limit_retries < self.retry_policy.max_rate_limit_retries {
                        self.retry_policy.rate_limit_wait(resume_in)
                    } else {
                        None
                    };

                    let Some(wait) = wait else {
                        bail!(
                            ErrorKind::SourceRateLimited,
                            "GitHub rate limit exceeded",
                            format!("{operation} answered {status}, resume in {resume_in:?}")
                        );
                    };

                    warn!(
                        operation,
                        wait_secs = wait.as_secs(),
                        "github rate limit exceeded, waiting for the reset before retrying"
                    );
                    sleep(wait).await;
                    rate_limit_retries += 1;

                    if self.is_shutting_down() {
                        bail!(
                            ErrorKind::SourceRateLimited,
                            "GitHub rate limit exceeded",
                            format!("{operation} not retried after rate limit, shutting down")
                        );
                    }
                }
                ResponseClass::ServerError => {
                    let error = ingest_error!(
                        ErrorKind::SourceServerError,
                        "GitHub server error",
                        format!("{operation} answered {status} on attempt {attempt}")
                    );

                    if attempt >= self.retry_policy.max_attempts {
                        return Err(error);
                    }

                    let backoff = self.retry_policy.backoff_after(attempt);
                    warn!(
                        operation,
                        %status,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "github server error, retrying"
                    );
                    sleep(backoff).await;

                    if self.is_shutting_down() {
                        info!(operation, "shutdown requested, abandoning github retries");
                        return Err(error);
                    }

                    attempt += 1;
                }
            }
        }
    }
}

impl EventSource for GithubClient {
    async fn fetch_events(&self, cursor: &EventsCursor) -> IngestResult<EventBatch> {
        let url = format!("{}/events", self.api_url);

        let response = self
            .send_with_retries("list events", || {
                let request = self.get(&url);
                match cursor.as_str() {
                    Some(etag) => request.header(IF_NONE_MATCH, etag),
                    None => request,
                }
            })
            .await?;

        // A response without an etag keeps the previous cursor, so the next call stays conditional.
        let next_cursor = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .filter(|etag| !etag.is_empty())
            .map(EventsCursor::new)
            .unwrap_or_else(|| cursor.clone());

        match response.status() {
            StatusCode::NOT_MODIFIED => {
                debug!("github events unchanged since last fetch");

                Ok(EventBatch::unchanged(next_cursor))
            }
            status if status.is_success() => {
                let body = response.bytes().await?;
                let events: Vec<GithubEvent> = serde_json::from_slice(&body)?;

                Ok(EventBatch {
                    events: events.into_iter().map(SourceEvent::from).collect(),
                    cursor: next_cursor,
                })
            }
            status => bail!(
                ErrorKind::SourceUnexpectedStatus,
                "Unexpected GitHub events response",
                format!("events API answered {status}")
            ),
        }
    }
}

impl CommitSource for GithubClient {
    async fn get_commit_stats(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> IngestResult<CommitStats> {
        let url = format!("{}/repos/{owner}/{repo}/commits/{reference}", self.api_url);

        let response = self
            .send_with_retries("get commit", || self.get(&url))
            .await?;

        match response.status() {
            // 422 is returned for references that do not resolve to a commit.
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => bail!(
                ErrorKind::SourceNotFound,
                "Commit not found",
                format!("{owner}/{repo}@{reference}")
            ),
            status if status.is_success() => {
                let body = response.bytes().await?;
                let commit: GithubCommit = serde_json::from_slice(&body)?;

                Ok(CommitStats::from(commit))
            }
            status => bail!(
                ErrorKind::SourceUnexpectedStatus,
                "Unexpected GitHub commit response",
                format!("commit API answered {status} for {owner}/{repo}@{reference}")
            ),
        }
    }
}
