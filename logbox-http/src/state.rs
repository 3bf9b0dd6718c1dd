use std::sync::Arc;

use dashmap::DashMap;
use logbox_core::LogService;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Shared by every handler.
pub struct AppState {
    pub service: LogService,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl AppState {
    pub fn new(service: LogService) -> Arc<Self> {
        Arc::new(Self {
            service,
            locks: Arc::new(DashMap::new()),
        })
    }

    /// Serialise acquisitions and deletes of one identifier. Other
    /// identifiers are not blocked. The guard is owned so it can follow the
    /// work onto a blocking thread.
    pub async fn lock_id(&self, id: &str) -> IdGuard {
        let lock = self.locks.entry(id.to_string()).or_default().clone();
        let guard = lock.lock_owned().await;
        IdGuard {
            locks: self.locks.clone(),
            id: id.to_string(),
            guard: Some(guard),
        }
    }
}

pub struct IdGuard {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Forget the entry once nobody else is holding or waiting on it.
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
