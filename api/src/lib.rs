//! Read-only reporting surface over the statistics store.
//!
//! Exposes `GET /health`, backed by [`ingest::store::StatsStore::ping`], and `GET /stats`,
//! backed by the store aggregates.

pub mod routes;
pub mod startup;
