/// A response captured in memory, replayed as-is for every later request
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub status: hyper::StatusCode,
    pub headers: hyper::HeaderMap,
    pub body: hyper::body::Bytes,
}

impl CacheEntry {
    /// Buffers the whole response, nothing is sent to a client yet
    pub async fn capture(response: hyper::Response<hyper::Body>) -> Result<CacheEntry, hyper::Error> {
        let (parts, body) = response.into_parts();
        let body = hyper::body::to_bytes(body).await?;
        Ok(CacheEntry {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    pub fn is_not_found(&self) -> bool {
        self.status == hyper::StatusCode::NOT_FOUND
    }

    /// Builds a fresh response from the entry, without the body when `with_body` is false
    pub fn to_response(&self, with_body: bool) -> Result<hyper::Response<hyper::Body>, http::Error> {
        let body = if with_body {
            hyper::Body::from(self.body.clone())
        } else {
            hyper::Body::empty()
        };
        self.to_response_with_body(body)
    }

    /// Status and headers of the entry around a body provided by the caller
    pub fn to_response_with_body(
        &self,
        body: hyper::Body,
    ) -> Result<hyper::Response<hyper::Body>, http::Error> {
        let mut builder = hyper::Response::builder().status(self.status);
        for (name, value) in self.headers.iter() {
            builder = builder.header(name, value);
        }
        builder.body(body)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    /// Human readable hit rate, `None` when nothing was requested
    pub fn report(&self) -> Option<String> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(format!(
            "Cache hits: {}/{} ({:.1}%)",
            self.hits,
            total,
            self.hits as f64 * 100.0 / total as f64
        ))
    }
}

/// Request path to [CacheEntry] map, shared between all in-flight requests.
/// Entries are never evicted.
///
/// Two requests missing on the same path at the same time both fetch it and
/// the last insert wins, both entries being identical.
#[derive(Default)]
pub struct ResponseCache {
    entries: std::sync::RwLock<std::collections::HashMap<String, std::sync::Arc<CacheEntry>>>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl ResponseCache {
    pub fn new() -> ResponseCache {
        ResponseCache::default()
    }

    /// Looks the path up and counts a hit when found
    pub fn get(&self, path: &str) -> Option<std::sync::Arc<CacheEntry>> {
        let entry = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned();
        if entry.is_some() {
            self.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        entry
    }

    /// Stores the entry for a path that missed and counts the miss
    pub fn insert(&self, path: &str, entry: CacheEntry) -> std::sync::Arc<CacheEntry> {
        let entry = std::sync::Arc::new(entry);
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(String::from(path), entry.clone());
        self.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        entry
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(std::sync::atomic::Ordering::Relaxed),
            misses: self.misses.load(std::sync::atomic::Ordering::Relaxed),
        }
    }
}
