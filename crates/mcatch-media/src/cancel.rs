//! Cooperative cancellation over a `watch` channel.
//!
//! A run is cancelled once the sender publishes `true`. Dropping the sender
//! without publishing never cancels.

use tokio::sync::watch;

use crate::error::{MediaError, MediaResult};

/// Receiving half of a cancellation channel.
pub type CancelReceiver = watch::Receiver<bool>;

/// Create a cancellation channel in the "running" state.
pub fn cancel_channel() -> (watch::Sender<bool>, CancelReceiver) {
    watch::channel(false)
}

/// Whether cancellation has been requested.
pub fn is_cancelled(cancel: Option<&CancelReceiver>) -> bool {
    cancel.is_some_and(|rx| *rx.borrow())
}

/// Fail with [`MediaError::Cancelled`] if cancellation has been requested.
pub fn ensure_active(cancel: Option<&CancelReceiver>) -> MediaResult<()> {
    if is_cancelled(cancel) {
        Err(MediaError::Cancelled)
    } else {
        Ok(())
    }
}

/// Resolve once cancellation is requested; pend forever otherwise.
pub async fn cancelled(cancel: Option<CancelReceiver>) {
    if let Some(mut rx) = cancel {
        if rx.wait_for(|c| *c).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ensure_active() {
        let (tx, rx) = cancel_channel();
        assert!(ensure_active(None).is_ok());
        assert!(ensure_active(Some(&rx)).is_ok());

        tx.send(true).unwrap();
        assert!(matches!(ensure_active(Some(&rx)), Err(MediaError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_resolves_on_signal() {
        let (tx, rx) = cancel_channel();
        let waiter = tokio::spawn(cancelled(Some(rx)));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancel future did not resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_sender_never_cancels() {
        let (tx, rx) = cancel_channel();
        drop(tx);
        let result = tokio::time::timeout(Duration::from_millis(50), cancelled(Some(rx))).await;
        assert!(result.is_err());
    }
}
