// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Node Cache (C2): per-node keyed memoisation with TTL and dual LRU caps.
//!
//! Eviction follows the same lock-minimising shape as a classic shared-resource
//! manager: collect candidate metadata, decide what to evict without holding
//! the lock, then remove under a short re-acquired lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;

use crate::node::CacheOptions;
use crate::value::Value;

/// Default engine-global cap on total cache entries across all nodes (§4.2).
pub const DEFAULT_GLOBAL_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
    last_accessed: Instant,
    hits: u64,
}

/// Aggregate hit/miss counters, reported per-node and engine-wide when
/// `cacheOptions.collectMetrics` is enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
}

impl CacheMetrics {
    #[must_use]
    pub fn hit_ratio(self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct NodeCacheState {
    entries: HashMap<String, CacheEntry>,
    metrics: CacheMetrics,
}

impl NodeCacheState {
    fn new() -> Self {
        Self { entries: HashMap::new(), metrics: CacheMetrics::default() }
    }
}

/// Shared cache provider consulted by every node's pipeline.
///
/// Cache entries never outlive their node unless exported by the snapshot
/// codec; `remove_node` drops a node's whole cache when the node is torn down.
pub struct CacheProvider {
    global_max_entries: usize,
    nodes: Mutex<HashMap<String, NodeCacheState>>,
    unique_key_counter: AtomicU64,
}

impl CacheProvider {
    #[must_use]
    pub fn new(global_max_entries: usize) -> Self {
        Self {
            global_max_entries,
            nodes: Mutex::new(HashMap::new()),
            unique_key_counter: AtomicU64::new(0),
        }
    }

    /// Derives the cache key for one invocation: the canonical JSON of `inputs`,
    /// plus the canonical JSON of `config` when the node's invalidation strategy
    /// includes `CONFIG_CHANGE`. Falls back to a unique-per-call key (never
    /// colliding with any other call) if encoding somehow fails.
    #[must_use]
    pub fn derive_key(&self, inputs: &[Value], config: Option<&JsonValue>, include_config: bool) -> String {
        let inputs_json = serde_json::to_string(
            &inputs.iter().map(Value::canonical_json).collect::<Option<Vec<_>>>(),
        );
        let config_json = if include_config {
            config.map(serde_json::to_string)
        } else {
            None
        };
        match (inputs_json, config_json.transpose()) {
            (Ok(inputs), Ok(config)) => format!("{inputs}|{}", config.unwrap_or_default()),
            _ => {
                let unique = self.unique_key_counter.fetch_add(1, Ordering::Relaxed);
                format!("__unkeyable__:{unique}")
            },
        }
    }

    /// Reads `key` from `node_id`'s cache, evicting it lazily if expired.
    pub fn get(&self, node_id: &str, key: &str) -> Option<Value> {
        let mut nodes = self.nodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let state = nodes.get_mut(node_id)?;
        let now = Instant::now();
        let expired = state.entries.get(key).is_some_and(|e| e.expires_at.is_some_and(|exp| now >= exp));
        if expired {
            state.entries.remove(key);
            state.metrics.misses += 1;
            return None;
        }
        if let Some(entry) = state.entries.get_mut(key) {
            entry.last_accessed = now;
            entry.hits += 1;
            state.metrics.hits += 1;
            Some(entry.value.clone())
        } else {
            state.metrics.misses += 1;
            None
        }
    }

    /// Writes `value` under `key` in `node_id`'s cache, honouring per-node and
    /// engine-global caps. Returns the number of entries evicted.
    pub fn put(&self, node_id: &str, key: String, value: Value, policy: &CacheOptions) -> usize {
        let mut nodes = self.nodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = Instant::now();
        let expires_at = (policy.ttl > 0).then(|| now + Duration::from_millis(policy.ttl));

        let state = nodes.entry(node_id.to_string()).or_insert_with(NodeCacheState::new);
        state.entries.insert(key, CacheEntry { value, expires_at, last_accessed: now, hits: 0 });

        let mut evicted = 0;
        if let Some(max_entries) = policy.max_entries {
            evicted += evict_one_if_over(state, max_entries);
        }
        drop(nodes);
        evicted + self.enforce_global_cap()
    }

    /// Evicts the globally-oldest-accessed entry across all nodes until the
    /// engine-wide entry count is back under `global_max_entries`.
    fn enforce_global_cap(&self) -> usize {
        let mut evicted = 0;
        loop {
            let mut nodes = self.nodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let total: usize = nodes.values().map(|s| s.entries.len()).sum();
            if total <= self.global_max_entries {
                return evicted;
            }
            // Collect candidate metadata, then decide the victim outside any
            // per-entry mutation so the comparison is a pure function of a snapshot.
            let victim = nodes
                .iter()
                .flat_map(|(node_id, state)| {
                    state.entries.iter().map(move |(k, e)| (node_id.clone(), k.clone(), e.last_accessed, e.hits))
                })
                .min_by(|a, b| a.2.cmp(&b.2).then(a.3.cmp(&b.3)));
            let Some((node_id, key, ..)) = victim else { return evicted };
            if let Some(state) = nodes.get_mut(&node_id) {
                state.entries.remove(&key);
                evicted += 1;
            }
        }
    }

    /// Removes all expired entries across every node. The engine schedules this
    /// every `max(ttl/10, 10s)` while running.
    pub fn cleanup(&self) -> usize {
        let mut nodes = self.nodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = Instant::now();
        let mut removed = 0;
        for state in nodes.values_mut() {
            let before = state.entries.len();
            state.entries.retain(|_, e| e.expires_at.is_none_or(|exp| now < exp));
            removed += before - state.entries.len();
        }
        removed
    }

    /// Clears one node's cache (`clearCache(id)`).
    pub fn clear_node(&self, node_id: &str) {
        let mut nodes = self.nodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        nodes.remove(node_id);
    }

    #[must_use]
    pub fn node_metrics(&self, node_id: &str) -> CacheMetrics {
        let nodes = self.nodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        nodes.get(node_id).map_or_else(CacheMetrics::default, |s| s.metrics)
    }

    #[must_use]
    pub fn engine_metrics(&self) -> CacheMetrics {
        let nodes = self.nodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        nodes.values().fold(CacheMetrics::default(), |mut acc, s| {
            acc.hits += s.metrics.hits;
            acc.misses += s.metrics.misses;
            acc
        })
    }

    #[must_use]
    pub fn total_entries(&self) -> usize {
        let nodes = self.nodes.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        nodes.values().map(|s| s.entries.len()).sum()
    }
}

impl Default for CacheProvider {
    fn default() -> Self {
        Self::new(DEFAULT_GLOBAL_MAX_ENTRIES)
    }
}

fn evict_one_if_over(state: &mut NodeCacheState, max_entries: usize) -> usize {
    if state.entries.len() <= max_entries {
        return 0;
    }
    let victim = state
        .entries
        .iter()
        .min_by(|a, b| a.1.last_accessed.cmp(&b.1.last_accessed).then(a.1.hits.cmp(&b.1.hits)))
        .map(|(k, _)| k.clone());
    if let Some(key) = victim {
        state.entries.remove(&key);
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache = CacheProvider::new(DEFAULT_GLOBAL_MAX_ENTRIES);
        assert!(cache.get("n1", "k").is_none());
        cache.put("n1", "k".into(), Value::from(1.0), &CacheOptions::default());
        assert_eq!(cache.get("n1", "k"), Some(Value::from(1.0)));
        let metrics = cache.node_metrics("n1");
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
    }

    #[test]
    fn ttl_expiry_evicts_lazily() {
        let cache = CacheProvider::new(DEFAULT_GLOBAL_MAX_ENTRIES);
        let policy = CacheOptions { ttl: 1, ..CacheOptions::default() };
        cache.put("n1", "k".into(), Value::from(1.0), &policy);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("n1", "k").is_none());
    }

    #[test]
    fn per_node_cap_evicts_oldest_entry() {
        let cache = CacheProvider::new(DEFAULT_GLOBAL_MAX_ENTRIES);
        let policy = CacheOptions { max_entries: Some(1), ..CacheOptions::default() };
        cache.put("n1", "a".into(), Value::from(1.0), &policy);
        std::thread::sleep(Duration::from_millis(2));
        cache.put("n1", "b".into(), Value::from(2.0), &policy);
        assert!(cache.get("n1", "a").is_none());
        assert_eq!(cache.get("n1", "b"), Some(Value::from(2.0)));
    }

    #[test]
    fn global_cap_evicts_across_nodes() {
        let cache = CacheProvider::new(2);
        let policy = CacheOptions::default();
        cache.put("n1", "a".into(), Value::from(1.0), &policy);
        std::thread::sleep(Duration::from_millis(2));
        cache.put("n2", "b".into(), Value::from(2.0), &policy);
        std::thread::sleep(Duration::from_millis(2));
        cache.put("n3", "c".into(), Value::from(3.0), &policy);
        assert_eq!(cache.total_entries(), 2);
        assert!(cache.get("n1", "a").is_none());
    }

    #[test]
    fn cleanup_removes_only_expired_entries() {
        let cache = CacheProvider::new(DEFAULT_GLOBAL_MAX_ENTRIES);
        cache.put("n1", "a".into(), Value::from(1.0), &CacheOptions { ttl: 1, ..CacheOptions::default() });
        cache.put("n1", "b".into(), Value::from(2.0), &CacheOptions::default());
        std::thread::sleep(Duration::from_millis(5));
        let removed = cache.cleanup();
        assert_eq!(removed, 1);
        assert_eq!(cache.total_entries(), 1);
    }

    #[test]
    fn derive_key_includes_config_only_when_requested() {
        let cache = CacheProvider::new(DEFAULT_GLOBAL_MAX_ENTRIES);
        let inputs = [Value::from(1.0)];
        let config = serde_json::json!({"a": 1});
        let without = cache.derive_key(&inputs, Some(&config), false);
        let with = cache.derive_key(&inputs, Some(&config), true);
        assert_ne!(without, with);
    }
}
