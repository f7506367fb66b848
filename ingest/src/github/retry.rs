//! Retry policy and response classification for GitHub API calls.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Number of requests left in the current rate-limit window.
const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Unix timestamp, in seconds, at which the rate-limit window resets.
const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Bounds on how often and how long a single call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made on server errors, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt, doubled after each further one.
    pub initial_backoff: Duration,
    /// Longest rate-limit wait honoured before giving up with a rate-limit error.
    pub max_rate_limit_wait: Duration,
    /// How many times a call is repeated after waiting for a rate-limit reset.
    pub max_rate_limit_retries: u32,
}

impl RetryPolicy {
    /// 3 attempts with 1s and 2s backoffs, one retry after a rate-limit wait under 5 minutes.
    pub const DEFAULT: Self = Self {
        max_attempts: 3,
        initial_backoff: Duration::from_secs(1),
        max_rate_limit_wait: Duration::from_secs(5 * 60),
        max_rate_limit_retries: 1,
    };

    /// Delay to sleep after `failed_attempts` attempts have failed (1-based).
    pub fn backoff_after(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }

    /// Returns the wait to honour before retrying a rate-limited call, if any.
    ///
    /// Only strictly positive waits below [`RetryPolicy::max_rate_limit_wait`] are honoured.
    pub fn rate_limit_wait(&self, resume_in: Option<Duration>) -> Option<Duration> {
        resume_in.filter(|wait| !wait.is_zero() && *wait < self.max_rate_limit_wait)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How a response must be handled by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Handed to the caller, which interprets the status.
    Final,
    /// Quota exhausted; `resume_in` is how long until requests are accepted again, if known.
    RateLimited { resume_in: Option<Duration> },
    /// 5xx answer, retried with backoff.
    ServerError,
}

/// Classifies a response by status and rate-limit headers.
///
/// A 429 is always a rate limit. A 403 is one only when the quota is reported exhausted or a
/// `Retry-After` is present, otherwise it is a plain permission failure.
pub fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> ResponseClass {
    if status.is_server_error() {
        return ResponseClass::ServerError;
    }

    let quota_exhausted = header_value::<u64>(headers, RATE_LIMIT_REMAINING_HEADER) == Some(0);
    let retry_after = header_value::<u64>(headers, RETRY_AFTER.as_str()).map(Duration::from_secs);

    // A reset header alone does not make a 403 a rate limit, it is sent on every response.
    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (quota_exhausted || retry_after.is_some()));
    if !rate_limited {
        return ResponseClass::Final;
    }

    let resume_in = retry_after.or_else(|| {
        header_value::<i64>(headers, RATE_LIMIT_RESET_HEADER)
            .and_then(|reset| DateTime::<Utc>::from_timestamp(reset, 0))
            .map(|reset_at| (reset_at - now).to_std().unwrap_or(Duration::ZERO))
    });

    ResponseClass::RateLimited { resume_in }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn backoff_doubles_from_one_second() {
        let policy = RetryPolicy::DEFAULT;

        assert_eq!(policy.backoff_after(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_after(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_after(3), Duration::from_secs(4));
    }

    #[test]
    fn forbidden_with_only_a_reset_header_is_final() {
        let now = Utc::now();
        let reset = (now.timestamp() + 60).to_string();

        let class = classify_response(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-reset", &reset)]),
            now,
        );

        assert_eq!(class, ResponseClass::Final);
    }

    #[test]
    fn rate_limit_wait_is_capped() {
        let policy = RetryPolicy::DEFAULT;

        assert_eq!(
            policy.rate_limit_wait(Some(Duration::from_secs(30))),
            Some(Duration::from_secs(30))
        );
        assert_eq!(policy.rate_limit_wait(Some(Duration::from_secs(300))), None);
        assert_eq!(policy.rate_limit_wait(Some(Duration::ZERO)), None);
        assert_eq!(policy.rate_limit_wait(None), None);
    }

    #[test]
    fn server_errors_are_retryable() {
        let now = Utc::now();

        assert_eq!(
            classify_response(StatusCode::BAD_GATEWAY, &HeaderMap::new(), now),
            ResponseClass::ServerError
        );
        assert_eq!(
            classify_response(StatusCode::NOT_FOUND, &HeaderMap::new(), now),
            ResponseClass::Final
        );
    }

    #[test]
    fn exhausted_quota_resumes_at_reset() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let headers = headers(&[
            (RATE_LIMIT_REMAINING_HEADER, "0"),
            (RATE_LIMIT_RESET_HEADER, "1700000042"),
        ]);

        assert_eq!(
            classify_response(StatusCode::FORBIDDEN, &headers, now),
            ResponseClass::RateLimited {
                resume_in: Some(Duration::from_secs(42))
            }
        );
    }

    #[test]
    fn reset_in_the_past_resumes_immediately() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let headers = headers(&[
            (RATE_LIMIT_REMAINING_HEADER, "0"),
            (RATE_LIMIT_RESET_HEADER, "1699999990"),
        ]);

        assert_eq!(
            classify_response(StatusCode::FORBIDDEN, &headers, now),
            ResponseClass::RateLimited {
                resume_in: Some(Duration::ZERO)
            }
        );
    }

    #[test]
    fn retry_after_takes_precedence() {
        let now = Utc::now();
        let headers = headers(&[("retry-after", "7"), (RATE_LIMIT_RESET_HEADER, "1")]);

        assert_eq!(
            classify_response(StatusCode::TOO_MANY_REQUESTS, &headers, now),
            ResponseClass::RateLimited {
                resume_in: Some(Duration::from_secs(7))
            }
        );
    }

    #[test]
    fn forbidden_with_remaining_quota_is_final() {
        let headers = headers(&[
            (RATE_LIMIT_REMAINING_HEADER, "4999"),
            (RATE_LIMIT_RESET_HEADER, "1700000042"),
        ]);

        assert_eq!(
            classify_response(StatusCode::FORBIDDEN, &headers, Utc::now()),
            ResponseClass::Final
        );
    }
}
