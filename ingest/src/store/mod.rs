//! Persistence of push events and commit statistics.
//!
//! [`StatsStore`] is the only surface the pipeline and the reporting API use. [`MemoryStore`] keeps
//! everything in process and is used by tests, [`PostgresStore`] is the production implementation.

mod base;
mod memory;
mod postgres;

pub use base::StatsStore;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
