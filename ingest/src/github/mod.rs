//! GitHub REST implementation of the event and commit sources.

mod client;
mod retry;
mod types;

pub use client::GithubClient;
pub use retry::{ResponseClass, RetryPolicy, classify_response};
