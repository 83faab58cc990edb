//! Shared meter snapshot for services running beside the update loop.
//!
//! The update loop owns the [`Hlw8012`](crate::Hlw8012) and pushes a
//! [`MeterState`] after every tick. Reporting services read the latest copy
//! without ever touching the driver.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rs_hlw8012::services::SharedMeterState;
//! use rs_hlw8012::MeterState;
//!
//! let shared = Arc::new(SharedMeterState::new());
//!
//! // Update loop
//! shared.store(MeterState { power: Some(12.0), ..MeterState::default() });
//!
//! // Reporting task
//! assert_eq!(shared.state().power, Some(12.0));
//! assert_eq!(shared.updates(), 1);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::MeterState;

struct Inner {
    state: MeterState,
    updates: u64,
}

/// Latest [`MeterState`] behind a mutex.
///
/// The lock is held only to copy the snapshot in or out.
pub struct SharedMeterState {
    inner: Mutex<Inner>,
    start_time: Instant,
}

impl Default for SharedMeterState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMeterState {
    /// Create with an empty snapshot.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: MeterState::default(),
                updates: 0,
            }),
            start_time: Instant::now(),
        }
    }

    // A panicking writer cannot leave a Copy snapshot half-written.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the snapshot.
    pub fn store(&self, state: MeterState) {
        let mut inner = self.lock();
        inner.state = state;
        inner.updates += 1;
    }

    /// Copy of the latest snapshot.
    pub fn state(&self) -> MeterState {
        self.lock().state
    }

    /// Number of snapshots stored so far.
    pub fn updates(&self) -> u64 {
        self.lock().updates
    }

    /// Milliseconds since creation. Time base for heartbeats.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cf1Mode;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_empty() {
        let shared = SharedMeterState::new();
        assert_eq!(shared.state(), MeterState::default());
        assert_eq!(shared.updates(), 0);
        assert!(shared.now_ms() < 1_000);
    }

    #[test]
    fn store_replaces_snapshot() {
        let shared = SharedMeterState::new();
        shared.store(MeterState {
            voltage: Some(230.0),
            mode: Cf1Mode::Current,
            ..MeterState::default()
        });
        let s = shared.state();
        assert_eq!(s.voltage, Some(230.0));
        assert_eq!(s.mode, Cf1Mode::Current);
    }

    #[test]
    fn visible_across_threads() {
        let shared = Arc::new(SharedMeterState::new());
        let writer = Arc::clone(&shared);
        thread::spawn(move || {
            for i in 0..10 {
                writer.store(MeterState {
                    power: Some(i as f32),
                    ..MeterState::default()
                });
            }
        })
        .join()
        .unwrap();

        assert_eq!(shared.updates(), 10);
        assert_eq!(shared.state().power, Some(9.0));
    }
}
