use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use uuid::Uuid;

use super::NetworkData;

/// Thread-safe LRU of per-client networks
///
/// Every browser tab owns one network that grows with each expansion.
/// Sessions that have not been touched for a while are evicted once the
/// capacity is reached.
pub struct NetworkSessions {
    sessions: Mutex<LruCache<String, NetworkData>>,
}

impl NetworkSessions {
    /// Create a session store holding at most `capacity` networks
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Start an empty network and return its id
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.lock().put(id.clone(), NetworkData::new());
        log::debug!("network session {} created", id);
        id
    }

    /// Run `f` on a session's network; `None` if the session is unknown
    pub fn with<R>(&self, id: &str, f: impl FnOnce(&mut NetworkData) -> R) -> Option<R> {
        let mut sessions = self.lock();
        sessions.get_mut(id).map(f)
    }

    pub fn remove(&self, id: &str) -> bool {
        self.lock().pop(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, NetworkData>> {
        // a panic inside `with` leaves the data consistent enough to keep serving
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
