//! Cancellable background polling timer.
//!
//! REDESIGN FLAGS: the source's timer + mutating-callback-list becomes an
//! explicit `std::thread` driven by an `mpsc` stop channel, matching this
//! crate's general preference for explicit schedulers over implicit runtime
//! timers.

use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Owns a background thread that invokes `tick` every `interval` until
/// stopped. Dropping without calling [`PollHandle::stop`] leaves the thread
/// running (mirrors teacher/stdlib join-handle semantics); callers that need
/// deterministic teardown should call `stop` explicitly.
pub struct PollHandle {
    stop_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Spawn a poller that calls `tick` every `interval`, skipping ticks
    /// entirely while `should_tick` returns `false` (used to skip polling
    /// when no subscriptions exist).
    pub fn spawn<F, S>(interval: Duration, should_tick: S, tick: F) -> Self
    where
        F: Fn() + Send + 'static,
        S: Fn() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("nfig-poll".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if should_tick() {
                            tick();
                        }
                    }
                }
            })
            .expect("failed to spawn nfig-poll thread");

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the poller to stop and block until its thread exits.
    pub fn stop(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn ticks_until_stopped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let handle = PollHandle::spawn(Duration::from_millis(10), || true, move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(55));
        handle.stop();
        assert!(counter.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn should_tick_false_skips_every_tick() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let handle = PollHandle::spawn(Duration::from_millis(10), || false, move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(40));
        handle.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
