//! In-memory dedup cache: remembers which `(url, kind)` pairs have already
//! been fetched so the stored artifact can be re-delivered instead of
//! fetching again.
//!
//! The cache is unbounded by contract: nothing is ever evicted for the life
//! of the process. That is the original behavior, not an oversight to fix
//! here; a bounded policy is a future change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use grabbot_common::MediaKind;

/// Cache key. URL equality is exact string equality — no normalization, so
/// trailing slashes, query order, and scheme case all produce distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub url: String,
    pub kind: MediaKind,
}

impl CacheKey {
    #[must_use]
    pub fn new(url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Opaque handle to a previously delivered artifact, reusable for
/// re-delivery without fetching. The transport layer decides what the ids
/// mean; the cache only stores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Conversation the artifact was originally delivered into.
    pub chat_id: String,
    /// The delivered message carrying the artifact.
    pub message_id: String,
}

/// A cached fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub artifact: ArtifactRef,
    /// Insertion sequence number, for diagnostics only. Not an eviction input.
    pub produced_at: u64,
}

/// Keyed store of previously fetched media.
#[derive(Debug, Default)]
pub struct DedupCache {
    entries: HashMap<CacheKey, CacheEntry>,
    inserts: u64,
}

impl DedupCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a prior fetch. No side effects.
    #[must_use]
    pub fn lookup(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Record a fetched artifact. A later insert for the same key supersedes
    /// the earlier one (last write wins, single live entry per key).
    pub fn insert(&mut self, key: CacheKey, artifact: ArtifactRef) {
        let produced_at = self.inserts;
        self.inserts += 1;
        self.entries.insert(key, CacheEntry {
            artifact,
            produced_at,
        });
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
