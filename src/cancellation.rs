//! Cooperative cancellation for in-flight prediction requests.
//!
//! A [`CancellationSource`] is held by whoever may abort the request (the
//! form controller on reset or teardown); the request itself awaits a
//! [`CancellationToken`]. Dropping the source does **not** cancel.
use tokio::sync::watch;

/// Control side of a cancellation signal.
#[derive(Debug)]
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

/// Observer side; cheap to clone.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Signals every token. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the source is cancelled.
    ///
    /// If the source is dropped without cancelling, this never resolves.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiting_token() {
        let source = CancellationSource::new();
        let mut token = source.token();

        let waiter = tokio::spawn(async move {
            token.cancelled().await;
        });

        source.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("token should observe cancellation")
            .unwrap();
        assert!(source.is_cancelled());
    }

    #[tokio::test]
    async fn test_token_created_after_cancel_is_cancelled() {
        let source = CancellationSource::new();
        source.cancel();
        source.cancel();
        let mut token = source.token();
        assert!(token.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_dropped_source_never_resolves() {
        let source = CancellationSource::new();
        let mut token = source.token();
        drop(source);

        let waited = tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(waited.is_err());
        assert!(!token.is_cancelled());
    }
}
