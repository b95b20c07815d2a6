use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::Uri;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedPage {
    body: String,
    stored_at: Instant,
}

/// Whole-page HTML cache with a fixed expiry. Entries are only dropped by
/// age or by [`PageCache::clear`]; writes to the store do not touch it.
/// Expired entries are swept on every insert, so keys that are never read
/// again do not pile up.
#[derive(Clone)]
pub struct PageCache {
    pages: Arc<Mutex<HashMap<String, CachedPage>>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pages: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Key for a request: the full path and query, varied by the signed-in
    /// viewer so nobody is served another user's navigation bar.
    pub fn key(uri: &Uri, viewer: Option<i64>) -> String {
        let path = uri
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or_else(|| uri.path());
        match viewer {
            Some(id) => format!("{path}|user:{id}"),
            None => format!("{path}|anonymous"),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut pages = self.pages.lock().await;
        match pages.get(key) {
            Some(page) if page.stored_at.elapsed() < self.ttl => Some(page.body.clone()),
            Some(_) => {
                pages.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a page and sweeps out every expired entry.
    pub async fn insert(&self, key: String, body: String) {
        let mut pages = self.pages.lock().await;
        let ttl = self.ttl;
        pages.retain(|_, page| page.stored_at.elapsed() < ttl);
        pages.insert(
            key,
            CachedPage {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn clear(&self) {
        let mut pages = self.pages.lock().await;
        debug!(entries = pages.len(), "Clearing page cache");
        pages.clear();
    }
}
