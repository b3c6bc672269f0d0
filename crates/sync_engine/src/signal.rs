//! Wake-up primitives shared by producers and the coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct SignalState {
    raised: bool,
    closed: bool,
}

/// "New base data" flag.
///
/// Raised by the base producer after every append, cleared by the
/// coordinator before it drains. Raises coalesce: several raises between two
/// waits are observed once.
#[derive(Debug, Default)]
pub struct LivenessSignal {
    state: Mutex<SignalState>,
    cond: Condvar,
}

impl LivenessSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.lock().raised = true;
        self.cond.notify_all();
    }

    pub fn is_raised(&self) -> bool {
        self.lock().raised
    }

    /// Wait up to `timeout` for a raise, then clear it.
    ///
    /// Returns whether the signal was observed set. Returns early without
    /// consuming anything once the signal is closed.
    pub fn wait_and_clear(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (mut state, _) = self
            .cond
            .wait_timeout_while(state, timeout, |s| !s.raised && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut state.raised)
    }

    /// Release current and future waiters immediately
    pub fn close(&self) {
        self.lock().closed = true;
        self.cond.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable stop request shared by the CLI, producers and coordinator.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    signal: Arc<LivenessSignal>,
}

impl ShutdownHandle {
    pub fn new(signal: Arc<LivenessSignal>) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            signal,
        }
    }

    /// Request a stop and wake the coordinator.
    ///
    /// Returns `true` only for the first request.
    pub fn request_stop(&self) -> bool {
        let first = !self.requested.swap(true, Ordering::SeqCst);
        if first {
            self.signal.close();
        }
        first
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_raise_then_wait_clears() {
        let signal = LivenessSignal::new();
        signal.raise();
        signal.raise();
        assert!(signal.wait_and_clear(Duration::from_millis(10)));
        assert!(!signal.is_raised());
        assert!(!signal.wait_and_clear(Duration::from_millis(10)));
    }

    #[test]
    fn test_wait_is_bounded() {
        let signal = LivenessSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_and_clear(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_raise_wakes_waiter() {
        let signal = Arc::new(LivenessSignal::new());
        let raiser = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                signal.raise();
            })
        };
        assert!(signal.wait_and_clear(Duration::from_secs(5)));
        raiser.join().unwrap();
    }

    #[test]
    fn test_stop_is_idempotent_and_wakes() {
        let signal = Arc::new(LivenessSignal::new());
        let shutdown = ShutdownHandle::new(Arc::clone(&signal));

        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                let start = Instant::now();
                signal.wait_and_clear(Duration::from_secs(5));
                start.elapsed()
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(shutdown.request_stop());
        assert!(!shutdown.clone().request_stop());
        assert!(shutdown.is_requested());
        assert!(waiter.join().unwrap() < Duration::from_secs(5));
    }
}
