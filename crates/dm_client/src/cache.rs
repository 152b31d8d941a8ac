//! Process-local conversation secret cache.
//!
//! One `OnceCell` per conversation id. Concurrent callers for the same id
//! share a single in-flight resolution; a failed resolution removes the empty
//! cell so the next caller retries and failed ids do not accumulate. The map lock is never held across an
//! await.

use std::{collections::HashMap, future::Future, sync::Arc};

use dm_crypto::ChatSecret;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

#[derive(Default)]
pub struct SecretCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<ChatSecret>>>>,
}

impl SecretCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached secret, if already resolved.
    pub fn get(&self, chat_id: &str) -> Option<ChatSecret> {
        self.cells.lock().get(chat_id).and_then(|cell| cell.get().cloned())
    }

    /// Store a secret known up front (the creator's own conversations).
    pub fn insert(&self, chat_id: impl Into<String>, secret: ChatSecret) {
        self.cells
            .lock()
            .insert(chat_id.into(), Arc::new(OnceCell::new_with(Some(secret))));
    }

    /// Return the cached secret or run `resolve` once for this id.
    pub async fn get_or_resolve<F, Fut, E>(&self, chat_id: &str, resolve: F) -> Result<ChatSecret, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ChatSecret, E>>,
    {
        let cell = {
            let mut cells = self.cells.lock();
            Arc::clone(cells.entry(chat_id.to_owned()).or_default())
        };
        let resolved = cell.get_or_try_init(resolve).await.map(ChatSecret::clone);
        if resolved.is_err() {
            self.forget_empty(chat_id, &cell);
        }
        resolved
    }

    /// Drop `cell` from the map if it is still the entry for `chat_id` and
    /// nothing managed to fill it.
    fn forget_empty(&self, chat_id: &str, cell: &Arc<OnceCell<ChatSecret>>) {
        let mut cells = self.cells.lock();
        let stale = cells
            .get(chat_id)
            .is_some_and(|current| Arc::ptr_eq(current, cell) && !current.initialized());
        if stale {
            cells.remove(chat_id);
        }
    }

    pub fn evict(&self, chat_id: &str) -> bool {
        self.cells.lock().remove(chat_id).is_some()
    }

    pub fn clear(&self) {
        self.cells.lock().clear();
    }

    /// Number of resolved secrets.
    pub fn len(&self) -> usize {
        self.cells.lock().values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
