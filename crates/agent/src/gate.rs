//! Request serializer.
//!
//! One gate per process: at most one agent invocation runs at a time, since
//! concurrent runs against the same session store corrupt it. Waiters queue
//! up (tokio's mutex is FIFO) and are never rejected. The permit is an RAII
//! guard, so every exit path of the holder releases it.

use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
pub struct RequestGate {
    inner: Mutex<()>,
}

/// Proof that the holder is the only request talking to the agent.
#[derive(Debug)]
pub struct GatePermit<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access.
    pub async fn acquire(&self) -> GatePermit<'_> {
        if self.is_busy() {
            debug!("Agent busy, waiting for the gate");
        }
        GatePermit {
            _guard: self.inner.lock().await,
        }
    }

    /// Take the gate only if it is free right now.
    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        self.inner
            .try_lock()
            .ok()
            .map(|guard| GatePermit { _guard: guard })
    }

    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn second_caller_waits_for_release() {
        let gate = Arc::new(RequestGate::new());
        let permit = gate.acquire().await;
        assert!(gate.is_busy());

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(permit);
        waiter.await.unwrap();
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn try_acquire_fails_while_held() {
        let gate = RequestGate::new();
        let held = gate.try_acquire();
        assert!(held.is_some());
        assert!(gate.try_acquire().is_none());
        drop(held);
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn never_more_than_one_holder() {
        let gate = Arc::new(RequestGate::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let (gate, active, peak) = (gate.clone(), active.clone(), peak.clone());
                tokio::spawn(async move {
                    let _permit = gate.acquire().await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn released_when_holder_panics() {
        let gate = Arc::new(RequestGate::new());
        let holder = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
                panic!("request failed");
            })
        };
        assert!(holder.await.is_err());
        assert!(gate.try_acquire().is_some());
    }
}
