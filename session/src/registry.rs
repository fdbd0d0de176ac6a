//! One session per workspace root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::coordinator::Session;
use crate::process::{ProcessSpawner, Spawner};

/// Shared map from workspace root to its [`Session`].
///
/// Hosts with several open projects keep one registry and look sessions up
/// by root; each root gets its own process and caches.
pub struct SessionRegistry {
    spawner: Arc<dyn Spawner>,
    sessions: Mutex<HashMap<PathBuf, Arc<Session>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Arc::new(ProcessSpawner))
    }
}

impl SessionRegistry {
    pub fn new(spawner: Arc<dyn Spawner>) -> Self {
        Self {
            spawner,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The session for `root`, created on first request.
    ///
    /// `interpreter` only matters for that first request; later calls return
    /// the existing session unchanged.
    pub fn get_or_create(&self, root: &Path, interpreter: Option<PathBuf>) -> Arc<Session> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(root.to_path_buf()).or_insert_with(|| {
            tracing::debug!(root = %root.display(), "Creating checker session");
            Arc::new(Session::new(root, interpreter, Arc::clone(&self.spawner)))
        }))
    }

    #[must_use]
    pub fn get(&self, root: &Path) -> Option<Arc<Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(root)
            .cloned()
    }

    /// Remove the session for `root` and stop its process.
    ///
    /// Callers still holding the `Arc` keep a working session; it restarts
    /// its process on next use.
    pub async fn close(&self, root: &Path) {
        let session = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(root);
        if let Some(session) = session {
            session.shutdown().await;
        }
    }

    pub async fn close_all(&self) {
        let sessions: Vec<_> = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, session)| session)
            .collect();
        for session in sessions {
            session.shutdown().await;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_session_per_root() {
        let registry = SessionRegistry::default();
        let a = registry.get_or_create(Path::new("/ws/a"), None);
        let again = registry.get_or_create(Path::new("/ws/a"), Some(PathBuf::from("python3")));
        let b = registry.get_or_create(Path::new("/ws/b"), None);

        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
        assert_eq!(a.root(), Path::new("/ws/a"));
    }

    #[tokio::test]
    async fn test_close_removes() {
        let registry = SessionRegistry::default();
        registry.get_or_create(Path::new("/ws/a"), None);
        registry.get_or_create(Path::new("/ws/b"), None);

        registry.close(Path::new("/ws/a")).await;
        assert!(registry.get(Path::new("/ws/a")).is_none());
        assert!(registry.get(Path::new("/ws/b")).is_some());

        registry.close_all().await;
        assert!(registry.is_empty());
    }
}
