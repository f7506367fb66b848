//! Long-running tasks of the pipeline.
//!
//! A single [`producer::ProducerWorker`] turns polled push events into commit jobs and a
//! [`pool::ConsumerWorkerPool`] of [`consumer::ConsumerWorker`]s resolves and stores them.

pub mod base;
pub mod consumer;
pub mod pool;
pub mod producer;
