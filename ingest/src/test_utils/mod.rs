//! Utilities for testing the pipeline without network or database access.
//!
//! - [`source`] provides scripted [`crate::source::EventSource`] and
//!   [`crate::source::CommitSource`] doubles that record how they were called.
//! - [`store`] provides [`store::NotifyingStore`], a [`crate::store::MemoryStore`] with failure
//!   injection and notifications on row counts.
//! - [`event`] builds events, payloads and commit statistics.
//! - [`pipeline`] wires a [`crate::pipeline::Pipeline`] with a configuration suited to tests.
//! - [`notify`] wraps [`tokio::sync::Notify`] with a timeout so waiting tests fail instead of hanging.

pub mod event;
pub mod notify;
pub mod pipeline;
pub mod source;
pub mod store;
