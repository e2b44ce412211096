//! Content-hash-keyed AST cache with LRU eviction and coalesced parsing
//! (§4.2 C2).
//!
//! Grounded on the teacher's pairing of `dashmap` for the shared map and
//! `parking_lot` for the low-contention recency list (see
//! `src/detectors/graph.rs`'s `DashMap`-backed `ConcurrentDependencyGraph`
//! and the cache module's use of content hashing in `src/io/cache/mod.rs`).

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::Ast;
use crate::errors::Result;

/// Capacity and cost bounds for an `AstCache` (§4.2, §5 bounded resources).
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Maximum number of distinct ASTs retained. Default 10,000 per spec.
    pub max_entries: usize,
    /// Optional ceiling on total retained source bytes across all entries.
    pub max_bytes: Option<u64>,
    /// Optional directory for persisting parsed ASTs across invocations.
    pub disk_dir: Option<PathBuf>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions {
            max_entries: 10_000,
            max_bytes: None,
            disk_dir: None,
        }
    }
}

type Slot = Arc<OnceCell<Arc<Ast>>>;

/// A read-through, content-hash-keyed memoizer for parsed ASTs.
pub struct AstCache {
    entries: DashMap<String, Slot>,
    recency: Mutex<VecDeque<String>>,
    byte_size: DashMap<String, u64>,
    current_bytes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    options: CacheOptions,
}

impl AstCache {
    pub fn new(options: CacheOptions) -> Self {
        if let Some(dir) = &options.disk_dir {
            let _ = fs::create_dir_all(dir);
        }
        AstCache {
            entries: DashMap::new(),
            recency: Mutex::new(VecDeque::new()),
            byte_size: DashMap::new(),
            current_bytes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            options,
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Return the AST for `content_hash`, parsing with `parse` on a miss.
    /// Concurrent callers requesting the same `content_hash` coalesce onto a
    /// single parse: the first caller to register the slot runs `parse`
    /// while later callers block on the same `OnceCell`.
    pub fn get_or_parse(
        &self,
        content_hash: &str,
        byte_len: u64,
        parse: impl FnOnce() -> Result<Ast>,
    ) -> Result<Arc<Ast>> {
        let slot = self
            .entries
            .entry(content_hash.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let was_empty = slot.get().is_none();
        let result = slot.get_or_try_init(|| parse().map(Arc::new));

        match result {
            Ok(ast) => {
                let ast = ast.clone();
                if was_empty {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    self.byte_size.insert(content_hash.to_string(), byte_len);
                    self.current_bytes.fetch_add(byte_len, Ordering::Relaxed);
                    self.touch(content_hash);
                    self.evict_if_needed();
                    if let Some(dir) = &self.options.disk_dir {
                        persist(dir, content_hash, &ast);
                    }
                } else {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    self.touch(content_hash);
                }
                Ok(ast)
            }
            Err(err) => {
                // Parse failed: don't let a poisoned miss linger in the map.
                self.entries.remove(content_hash);
                Err(err)
            }
        }
    }

    fn touch(&self, key: &str) {
        let mut recency = self.recency.lock();
        recency.retain(|k| k != key);
        recency.push_back(key.to_string());
    }

    fn evict_if_needed(&self) {
        let over_count = self.entries.len() > self.options.max_entries;
        let over_bytes = self
            .options
            .max_bytes
            .is_some_and(|max| self.current_bytes.load(Ordering::Relaxed) > max);

        if !over_count && !over_bytes {
            return;
        }

        let mut recency = self.recency.lock();
        while (self.entries.len() > self.options.max_entries)
            || self
                .options
                .max_bytes
                .is_some_and(|max| self.current_bytes.load(Ordering::Relaxed) > max)
        {
            let Some(lru_key) = recency.pop_front() else {
                break;
            };
            if self.entries.remove(&lru_key).is_some() {
                if let Some((_, size)) = self.byte_size.remove(&lru_key) {
                    self.current_bytes.fetch_sub(size, Ordering::Relaxed);
                }
                trace!(key = %lru_key, "evicted AST cache entry");
            }
        }
    }
}

fn persist(dir: &Path, content_hash: &str, ast: &Ast) {
    let path = dir.join(format!("{content_hash}.bin"));
    if let Ok(bytes) = bincode::serialize(&PersistedAst {
        source: ast.source().to_string(),
        language: ast.language(),
    }) {
        if fs::write(&path, bytes).is_err() {
            debug!(path = %path.display(), "failed to persist AST cache entry");
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedAst {
    source: String,
    language: crate::model::Language,
}
