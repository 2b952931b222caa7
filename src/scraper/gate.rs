//! Request spacing shared by every outbound request
//!
//! The marketplace starts serving block pages when requests arrive in quick
//! succession, so all sessions and workers pass through one [`RateGate`]
//! before touching the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Fixed-interval gate with optional random jitter
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    jitter: Duration,
    next_slot: Mutex<Option<Instant>>,
    admitted: AtomicUsize,
}

impl RateGate {
    /// Create a gate that spaces requests at least `interval` apart
    pub fn new(interval: Duration) -> Self {
        Self::with_jitter(interval, Duration::ZERO)
    }

    /// Create a gate that adds up to `jitter` of random delay on top of `interval`
    pub fn with_jitter(interval: Duration, jitter: Duration) -> Self {
        Self {
            interval,
            jitter,
            next_slot: Mutex::new(None),
            admitted: AtomicUsize::new(0),
        }
    }

    /// A gate that never waits
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait for the next free slot
    ///
    /// The lock is held while sleeping so waiters are released one at a time,
    /// in arrival order.
    pub async fn wait(&self) {
        let mut next_slot = self.next_slot.lock().await;

        if let Some(slot) = *next_slot {
            if slot > Instant::now() {
                sleep_until(slot).await;
            }
        }

        *next_slot = Some(Instant::now() + self.interval + self.random_jitter());
        let admitted = self.admitted.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(admitted, "Request admitted");
    }

    /// Number of requests let through so far
    #[cfg(test)]
    pub(crate) fn admitted(&self) -> usize {
        self.admitted.load(Ordering::SeqCst)
    }

    fn random_jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_request_passes_immediately() {
        let gate = RateGate::new(Duration::from_secs(5));
        let start = std::time::Instant::now();
        gate.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(gate.admitted(), 1);
    }

    #[tokio::test]
    async fn test_requests_are_spaced() {
        let gate = RateGate::new(Duration::from_millis(40));
        let start = std::time::Instant::now();
        gate.wait().await;
        gate.wait().await;
        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(80));
        assert_eq!(gate.admitted(), 3);
    }

    #[tokio::test]
    async fn test_spacing_is_shared_between_tasks() {
        let gate = Arc::new(RateGate::new(Duration::from_millis(30)));
        let start = std::time::Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move { gate.wait().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(90));
        assert_eq!(gate.admitted(), 4);
    }

    #[test]
    fn test_jitter_bounds() {
        let gate = RateGate::with_jitter(Duration::ZERO, Duration::from_millis(20));
        for _ in 0..50 {
            assert!(gate.random_jitter() <= Duration::from_millis(20));
        }
        assert_eq!(RateGate::unlimited().random_jitter(), Duration::ZERO);
    }
}
