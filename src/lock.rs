//! The per-client serialization lock.

use crate::cancel::{Wait, POLL_SLICE};
use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};

/// Mutex held for a whole request/response round trip. A caller that panicked
/// mid-request poisons it; the next caller recovers the guard instead of
/// propagating the panic, since the transport reports its own state.
///
/// Waiters park on `released`, which every guard signals on drop, so a
/// queued caller can give up at its own deadline.
pub(crate) struct SerialLock<T> {
    inner: Mutex<T>,
    gate: Mutex<()>,
    released: Condvar,
    label: &'static str,
}

/// Releases the mutex, then wakes queued callers. Field order is drop order.
pub(crate) struct SerialGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    _signal: ReleaseSignal<'a>,
}

struct ReleaseSignal<'a> {
    gate: &'a Mutex<()>,
    released: &'a Condvar,
}

impl<T> SerialLock<T> {
    pub(crate) fn new(label: &'static str, value: T) -> Self {
        Self {
            inner: Mutex::new(value),
            gate: Mutex::new(()),
            released: Condvar::new(),
            label,
        }
    }

    /// Block until the lock is free.
    pub(crate) fn acquire(&self) -> SerialGuard<'_, T> {
        let guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => self.recover(poisoned),
        };
        self.wrap(guard)
    }

    /// Like [`acquire`](Self::acquire), but fails with the error from
    /// [`Wait::check`] once the deadline passes or the token is tripped.
    pub(crate) fn acquire_within(&self, wait: &Wait<'_>) -> io::Result<SerialGuard<'_, T>> {
        // The gate is held across try_lock so a release cannot slip in
        // between the failed attempt and the condvar wait.
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match self.inner.try_lock() {
                Ok(guard) => return Ok(self.wrap(guard)),
                Err(TryLockError::Poisoned(poisoned)) => {
                    return Ok(self.wrap(self.recover(poisoned)))
                }
                Err(TryLockError::WouldBlock) => {}
            }
            wait.check()?;
            let slice = wait
                .remaining()
                .map_or(POLL_SLICE, |left| left.min(POLL_SLICE));
            gate = self
                .released
                .wait_timeout(gate, slice)
                .map(|(gate, _)| gate)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    fn wrap<'a>(&'a self, guard: MutexGuard<'a, T>) -> SerialGuard<'a, T> {
        SerialGuard {
            guard,
            _signal: ReleaseSignal {
                gate: &self.gate,
                released: &self.released,
            },
        }
    }

    fn recover<'a>(&self, poisoned: PoisonError<MutexGuard<'a, T>>) -> MutexGuard<'a, T> {
        tracing::warn!(lock = self.label, "serialization lock poisoned; recovering");
        poisoned.into_inner()
    }
}

impl<T> Deref for SerialGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for SerialGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl Drop for ReleaseSignal<'_> {
    fn drop(&mut self) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.released.notify_all();
    }
}
