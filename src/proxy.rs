//! Round-robin proxy selection.
//!
//! The pool is immutable; the only moving part is the cursor, which the
//! caller threads through [`next_proxy`] or owns via [`ProxyRotator`].
//! The orchestrator's launch loop is the single owner of the rotator, so
//! read-then-advance can never interleave between tasks.

/// Scheme prefixed to bare `host:port` entries.
const DEFAULT_SCHEME: &str = "http://";

/// Prefix a default scheme onto entries that carry none.
pub fn normalize_proxy(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{raw}")
    }
}

/// Whether `raw` can carry both the HTTP client and the WebSocket tunnel.
///
/// Only plain `http://` CONNECT proxies qualify once normalized.
pub fn is_supported_proxy(raw: &str) -> bool {
    normalize_proxy(raw)
        .get(..DEFAULT_SCHEME.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(DEFAULT_SCHEME))
}

/// Split a loaded pool into usable entries and rejected ones, keeping order.
pub fn partition_supported(pool: Vec<String>) -> (Vec<String>, Vec<String>) {
    pool.into_iter().partition(|p| is_supported_proxy(p))
}

/// Pure rotation step: the proxy at `cursor` and the advanced cursor.
///
/// An empty pool yields no proxy and resets the cursor to zero.
pub fn next_proxy(pool: &[String], cursor: usize) -> (Option<String>, usize) {
    if pool.is_empty() {
        return (None, 0);
    }
    let index = cursor % pool.len();
    let proxy = normalize_proxy(&pool[index]);
    (Some(proxy), (index + 1) % pool.len())
}

/// Owned rotator over a fixed pool.
#[derive(Debug, Clone, Default)]
pub struct ProxyRotator {
    pool: Vec<String>,
    cursor: usize,
}

impl ProxyRotator {
    pub fn new(pool: Vec<String>) -> Self {
        Self { pool, cursor: 0 }
    }

    pub fn next(&mut self) -> Option<String> {
        let (proxy, cursor) = next_proxy(&self.pool, self.cursor);
        self.cursor = cursor;
        proxy
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }
}
