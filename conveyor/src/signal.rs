//! One-shot cancellation broadcast.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// One-shot, idempotent, multi-reader cancellation flag.
///
/// Clones share the same flag. Once fired it stays fired. Readers can poll
/// [`is_fired`](Self::is_fired) or await [`fired`](Self::fired), which is
/// cancel-safe and therefore usable as a `tokio::select!` branch.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the signal. Returns `true` if this call performed the transition,
    /// `false` if it had already fired.
    pub fn fire(&self) -> bool {
        let already_fired = self.tx.send_replace(true);
        if !already_fired {
            tracing::debug!("Cancellation signal fired");
        }
        !already_fired
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once the signal has fired; immediately if it already has.
    pub async fn fired(&self) {
        let mut rx = self.tx.subscribe();
        // The sender is owned by `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|fired| *fired).await;
    }

    /// Fire the signal after `delay`. Dropping the handle does not cancel the timer.
    pub fn fire_after(&self, delay: Duration) -> JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            signal.fire();
        })
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unfired() {
        let signal = CancelSignal::new();
        assert!(!signal.is_fired());
    }

    #[test]
    fn test_fire_is_idempotent() {
        let signal = CancelSignal::new();
        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(!signal.fire());
        assert!(signal.is_fired());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = CancelSignal::new();
        let observer = signal.clone();
        signal.fire();
        assert!(observer.is_fired());
    }

    #[tokio::test]
    async fn test_fired_returns_immediately_when_prefired() {
        let signal = CancelSignal::new();
        signal.fire();
        tokio::time::timeout(Duration::from_millis(100), signal.fired())
            .await
            .expect("pre-fired signal must not block");
    }

    #[tokio::test]
    async fn test_fired_wakes_every_waiter() {
        let signal = CancelSignal::new();
        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.fired().await })
            })
            .collect();

        tokio::task::yield_now().await;
        signal.fire();

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter was not woken")
                .unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_after_delay() {
        let signal = CancelSignal::new();
        let timer = signal.fire_after(Duration::from_millis(200));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!signal.is_fired());

        timer.await.unwrap();
        assert!(signal.is_fired());
    }
}
