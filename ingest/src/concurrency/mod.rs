//! Concurrency primitives shared by the producer and the consumer workers.
//!
//! The [`shutdown`] module broadcasts a single cooperative cancellation signal to every worker.
//! The [`queue`] module implements the bounded job queue, the only structure shared between the
//! producer and the workers and the only source of backpressure in the pipeline.

pub mod queue;
pub mod shutdown;
