#![cfg(feature = "test-utils")]

use std::time::Duration;

use config::shared::GithubConfig;
use ingest::concurrency::shutdown::create_shutdown_channel;
use ingest::error::ErrorKind;
use ingest::github::{GithubClient, RetryPolicy};
use ingest::source::{CommitSource, EventSource};
use ingest::types::EventsCursor;
use secrecy::SecretString;
use serde_json::json;
use telemetry::tracing::init_test_tracing;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAST_RETRY_POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 3,
    initial_backoff: Duration::from_millis(10),
    max_rate_limit_wait: Duration::from_secs(5),
    max_rate_limit_retries: 1,
};

fn github_config(server: &MockServer, token: Option<&str>) -> GithubConfig {
    GithubConfig {
        api_url: server.uri(),
        token: token.map(|token| SecretString::new(token.to_owned())),
        user_agent: GithubConfig::DEFAULT_USER_AGENT.to_owned(),
        request_timeout_ms: 5_000,
    }
}

fn client(server: &MockServer) -> GithubClient {
    GithubClient::new(&github_config(server, None))
        .unwrap()
        .with_retry_policy(FAST_RETRY_POLICY)
}

fn events_body() -> serde_json::Value {
    json!([
        {
            "id": "101",
            "type": "PushEvent",
            "created_at": "2024-05-01T12:00:00Z",
            "actor": { "login": "octocat" },
            "repo": { "name": "octo/repo" },
            "payload": { "head": "abc", "commits": [{ "sha": "abc" }] }
        },
        {
            "id": "102",
            "type": "WatchEvent",
            "created_at": "2024-05-01T12:00:01Z",
            "actor": { "login": "hubot" },
            "repo": { "name": "octo/other" },
            "payload": { "action": "started" }
        }
    ])
}

#[tokio::test]
async fn events_are_listed_with_their_etag() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "W/\"abc\"")
                .set_body_json(events_body()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let batch = client(&server)
        .fetch_events(&EventsCursor::default())
        .await
        .unwrap();

    assert_eq!(batch.cursor, EventsCursor::new("W/\"abc\""));
    assert_eq!(batch.events.len(), 2);

    let push = &batch.events[0];
    assert!(push.is_push());
    assert_eq!(push.id, "101");
    assert_eq!(push.actor_login.as_deref(), Some("octocat"));
    assert_eq!(push.owner_and_repo(), Some(("octo", "repo")));

    let payload: serde_json::Value = serde_json::from_slice(&push.payload).unwrap();
    assert_eq!(payload["commits"][0]["sha"], "abc");

    assert!(!batch.events[1].is_push());
}

#[tokio::test]
async fn cursor_is_sent_back_and_not_modified_yields_an_empty_batch() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header("if-none-match", "W/\"abc\""))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let cursor = EventsCursor::new("W/\"abc\"");
    let batch = client(&server).fetch_events(&cursor).await.unwrap();

    assert!(batch.events.is_empty());
    assert_eq!(batch.cursor, cursor);
}

#[tokio::test]
async fn token_is_sent_as_authorization() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header("authorization", "token s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = GithubClient::new(&github_config(&server, Some("s3cr3t"))).unwrap();
    let batch = client.fetch_events(&EventsCursor::default()).await.unwrap();

    assert!(batch.events.is_empty());
    assert_eq!(batch.cursor, EventsCursor::default());
}

#[tokio::test]
async fn server_errors_are_retried_until_attempts_run_out() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_events(&EventsCursor::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceServerError);
}

#[tokio::test]
async fn server_error_followed_by_success_recovers() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/commits/abc"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/commits/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "abc",
            "commit": { "author": { "name": "Octo Cat", "date": "2024-05-01T11:59:00Z" } },
            "stats": { "additions": 10, "deletions": 3, "total": 13 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stats = client(&server)
        .get_commit_stats("octo", "repo", "abc")
        .await
        .unwrap();

    assert_eq!(stats.sha, "abc");
    assert_eq!(stats.author.as_deref(), Some("Octo Cat"));
    assert_eq!(stats.additions, 10);
    assert_eq!(stats.deletions, 3);
    assert_eq!(stats.total, 13);
    assert_eq!(stats.net(), 7);
}

#[tokio::test]
async fn missing_commit_statistics_default_to_zero() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/commits/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sha": "abc" })))
        .mount(&server)
        .await;

    let stats = client(&server)
        .get_commit_stats("octo", "repo", "abc")
        .await
        .unwrap();

    assert_eq!(stats.additions, 0);
    assert_eq!(stats.deletions, 0);
    assert_eq!(stats.total, 0);
    assert_eq!(stats.author, None);
}

#[tokio::test]
async fn missing_commit_is_not_found_and_not_retried() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/commits/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/commits/not-a-ref"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);

    let err = client
        .get_commit_stats("octo", "repo", "gone")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceNotFound);

    let err = client
        .get_commit_stats("octo", "repo", "not-a-ref")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceNotFound);
}

#[tokio::test]
async fn rate_limit_resetting_too_late_is_surfaced_immediately() {
    init_test_tracing();
    let server = MockServer::start().await;

    let reset = chrono::Utc::now().timestamp() + 3600;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", reset.to_string().as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_events(&EventsCursor::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceRateLimited);
}

#[tokio::test]
async fn rate_limit_with_short_wait_is_retried_once() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/commits/abc"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server)
        .get_commit_stats("octo", "repo", "abc")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceRateLimited);
}

#[tokio::test]
async fn forbidden_without_rate_limit_is_unexpected() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "42"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_events(&EventsCursor::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceUnexpectedStatus);
}

#[tokio::test]
async fn shutdown_abandons_remaining_retries() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    shutdown_tx.shutdown();

    let err = client(&server)
        .with_shutdown_rx(shutdown_rx)
        .fetch_events(&EventsCursor::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceServerError);
}

#[tokio::test]
async fn malformed_body_is_a_deserialization_error() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_events(&EventsCursor::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeserializationError);
}
