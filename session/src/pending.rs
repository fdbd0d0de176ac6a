//! Pending-request tracker: at most one inspection per location in flight.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Set of in-flight inspection keys.
///
/// The lock is held only for set membership, never across a checker round
/// trip, so `try_acquire` never waits behind a slow request.
#[derive(Debug, Clone, Default)]
pub struct PendingRequests {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl PendingRequests {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` if a request for it is already in flight.
    ///
    /// The key is released when the guard drops, on every exit path.
    #[must_use]
    pub fn try_acquire(&self, key: &str) -> Option<PendingGuard> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.to_string()) {
            return None;
        }
        Some(PendingGuard {
            keys: Arc::clone(&self.keys),
            key: key.to_string(),
        })
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ownership of one in-flight key.
#[derive(Debug)]
pub struct PendingGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl PendingGuard {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
