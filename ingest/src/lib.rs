//! Ingestion pipeline turning GitHub push events into persisted commit line statistics.
//!
//! The [`pipeline::Pipeline`] runs one producer that polls an [`source::EventSource`], records every
//! new push event in a [`store::StatsStore`] and fans it out into commit jobs on a bounded queue.
//! A pool of consumer workers drains the queue, resolves each job through a
//! [`source::CommitSource`] and stores the resulting [`types::CommitStatsRow`].

pub mod concurrency;
pub mod error;
pub mod github;
mod macros;
pub mod migrations;
pub mod pipeline;
pub mod source;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod workers;
