use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// Transient key/value store for per-login credentials (the `state →
/// verifier` record of a pending authorization).
///
/// The capability is transport-independent: the in-memory default below can
/// be swapped for a real datastore without touching the services that hold
/// an `Arc<dyn SessionStore>`.
#[async_trait]
pub trait SessionStore: Send + Sync + fmt::Debug {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: String, ttl: Duration);

    /// Removes and returns the value, giving consume-exactly-once semantics.
    async fn delete(&self, key: &str) -> Option<String>;

    /// Evicts expired entries, returning how many were removed.
    async fn sweep(&self) -> usize;
}

pub type SharedSessionStore = Arc<dyn SessionStore>;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local `SessionStore` over a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let entry = Entry { value, expires_at: Instant::now() + ttl };
        self.entries.insert(key.to_owned(), entry);
    }

    async fn delete(&self, key: &str) -> Option<String> {
        let (_, entry) = self.entries.remove(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value)
    }

    async fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }
}
