//! Completion caching keyed by request purpose and question.
//!
//! The cache lives as long as the pipeline that owns it. Without a capacity
//! it never evicts, so memory grows with the number of distinct questions;
//! with a capacity the least recently used entry is dropped first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Logical purpose of a completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePurpose {
    /// Answer plus verification questions
    Combined,
    /// Batched verified/not-verified judgments
    Verification,
    /// Correction of an unverified answer
    Correction,
}

impl std::fmt::Display for CachePurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Combined => write!(f, "combined"),
            Self::Verification => write!(f, "verification"),
            Self::Correction => write!(f, "correction"),
        }
    }
}

/// Cache key: purpose tag plus a digest of the trimmed question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub purpose: CachePurpose,
    pub digest: String,
}

impl CacheKey {
    /// Derive the key for a question and purpose.
    pub fn new(purpose: CachePurpose, question: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(question.trim().as_bytes());
        Self {
            purpose,
            digest: format!("{:x}", hasher.finalize()),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.purpose, &self.digest[..16]) // Short form for display
    }
}

/// A cached completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Raw completion text
    pub value: String,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
    /// Number of hits
    pub hit_count: u64,
    /// Logical clock of the last access, used for LRU ordering
    last_access: u64,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Number of live entries
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate hit rate.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    stats: CacheStats,
    clock: u64,
}

impl CacheInner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Process-lifetime completion cache.
#[derive(Debug, Clone, Default)]
pub struct CompletionCache {
    inner: Arc<RwLock<CacheInner>>,
    capacity: Option<usize>,
}

impl CompletionCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache that holds at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::default(),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Look up a key, recording a hit or miss.
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let mut inner = self.inner.write().await;
        let tick = inner.tick();
        let value = inner.entries.get_mut(key).map(|entry| {
            entry.hit_count += 1;
            entry.last_access = tick;
            entry.value.clone()
        });

        if value.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        value
    }

    /// Check for a key without touching statistics or recency.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.inner.read().await.entries.contains_key(key)
    }

    /// Bind a key, evicting the least recently used entry when full.
    pub async fn insert(&self, key: CacheKey, value: impl Into<String>) {
        let mut inner = self.inner.write().await;
        let tick = inner.tick();

        if let Some(capacity) = self.capacity {
            while inner.entries.len() >= capacity && !inner.entries.contains_key(&key) {
                let oldest = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        inner.entries.remove(&k);
                        inner.stats.evictions += 1;
                    }
                    None => break,
                }
            }
        }

        inner.entries.insert(
            key,
            CacheEntry {
                value: value.into(),
                created_at: Utc::now(),
                hit_count: 0,
                last_access: tick,
            },
        );
        inner.stats.entry_count = inner.entries.len() as u64;
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Clear all entries and statistics.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        *inner = CacheInner::default();
    }
}
