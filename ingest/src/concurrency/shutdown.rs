//! Cooperative shutdown signal.
//!
//! The signal is a watch channel holding a flag that only ever goes from `false` to `true`, so a
//! worker that checks it late still observes a shutdown requested earlier.

use tokio::sync::watch;

/// Outcome of an operation that may be interrupted by shutdown.
///
/// [`ShutdownResult::Shutdown`] hands back the input that was not consumed, so the caller can
/// account for it.
#[derive(Debug, PartialEq, Eq)]
pub enum ShutdownResult<T, I> {
    Ok(T),
    Shutdown(I),
}

impl<T, I> ShutdownResult<T, I> {
    pub fn should_shutdown(&self) -> bool {
        matches!(self, ShutdownResult::Shutdown(_))
    }
}

/// Sending side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

impl ShutdownTx {
    /// Requests shutdown of every current and future subscriber.
    ///
    /// Calling it more than once has no further effect.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

/// Receiving side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    /// Returns `true` once shutdown was requested or every [`ShutdownTx`] was dropped.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow() || self.0.has_changed().is_err()
    }

    /// Completes once shutdown was requested or every [`ShutdownTx`] was dropped.
    ///
    /// Cancel safe, which makes it suitable as a `tokio::select!` branch.
    pub async fn signaled(&mut self) {
        // An error means all senders are gone, which we treat like a shutdown.
        let _ = self.0.wait_for(|shutdown| *shutdown).await;
    }
}

/// Creates a shutdown channel in the running state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn late_subscribers_observe_shutdown() {
        let (tx, rx) = create_shutdown_channel();
        assert!(!rx.is_shutdown());

        tx.shutdown();

        let mut late = tx.subscribe();
        assert!(rx.is_shutdown());
        assert!(late.is_shutdown());
        timeout(Duration::from_secs(1), late.signaled())
            .await
            .expect("shutdown should already be signaled");
    }

    #[tokio::test]
    async fn signaled_waits_for_shutdown() {
        let (tx, mut rx) = create_shutdown_channel();

        let waiter = tokio::spawn(async move {
            rx.signaled().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        tx.shutdown();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should complete after shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn dropping_all_senders_counts_as_shutdown() {
        let (tx, mut rx) = create_shutdown_channel();
        drop(tx);

        assert!(rx.is_shutdown());
        timeout(Duration::from_secs(1), rx.signaled())
            .await
            .expect("closed channel should resolve immediately");
    }
}
