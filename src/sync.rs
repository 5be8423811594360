//! Lock helpers

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a listener panicked while it was held
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
