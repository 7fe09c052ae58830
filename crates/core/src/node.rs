// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Node definitions and per-node cache policy.
//!
//! A [`NodeDefinition`] is the user-supplied, immutable-per-version description
//! of a graph vertex. The engine owns the mutable runtime state built around it
//! (see `reactor-engine`); this crate only defines the data the engine consumes.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Config keys that are runtime-only and must never survive a snapshot export.
pub const RUNTIME_CONFIG_KEYS: [&str; 3] = ["__runtime", "__subject", "triggeredNodeId"];

/// A user-supplied node. Immutable per version: `updateNode` replaces the whole
/// struct rather than mutating fields in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub config: JsonValue,
    #[serde(default, rename = "cacheOptions", skip_serializing_if = "Option::is_none")]
    pub cache_options: Option<CacheOptions>,
}

impl NodeDefinition {
    #[must_use]
    pub fn new(id: impl Into<String>, type_tag: impl Into<String>, inputs: Vec<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
            inputs,
            config: JsonValue::Object(serde_json::Map::new()),
            cache_options: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: JsonValue) -> Self {
        self.config = config;
        self
    }

    /// Strips runtime-only config keys, producing the record safe to snapshot.
    #[must_use]
    pub fn without_runtime_keys(&self) -> Self {
        let mut stripped = self.clone();
        if let JsonValue::Object(map) = &mut stripped.config {
            for key in RUNTIME_CONFIG_KEYS {
                map.remove(key);
            }
        }
        stripped
    }
}

/// When a per-node cache entry is considered stale and should be recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidationStrategy {
    Time,
    ConfigChange,
    InputChange,
    Manual,
}

/// Per-node cache policy, overriding the engine's cache defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time-to-live in milliseconds. `0` means entries never expire by time.
    #[serde(default)]
    pub ttl: u64,
    #[serde(default, rename = "maxEntries", skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
    #[serde(default = "default_invalidation", rename = "invalidationStrategy")]
    pub invalidation_strategy: Vec<InvalidationStrategy>,
}

const fn default_true() -> bool {
    true
}

fn default_invalidation() -> Vec<InvalidationStrategy> {
    vec![InvalidationStrategy::InputChange]
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self { enabled: true, ttl: 0, max_entries: None, invalidation_strategy: default_invalidation() }
    }
}

impl CacheOptions {
    #[must_use]
    pub fn includes_config_change(&self) -> bool {
        self.invalidation_strategy.contains(&InvalidationStrategy::ConfigChange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_runtime_keys_strips_reserved_config() {
        let def = NodeDefinition::new("n1", "add", vec![]).with_config(serde_json::json!({
            "a": 1,
            "__runtime": {"foo": "bar"},
            "__subject": "opaque",
            "triggeredNodeId": "n2",
        }));
        let stripped = def.without_runtime_keys();
        let obj = stripped.config.as_object().unwrap();
        assert!(obj.contains_key("a"));
        assert!(!obj.contains_key("__runtime"));
        assert!(!obj.contains_key("__subject"));
        assert!(!obj.contains_key("triggeredNodeId"));
    }

    #[test]
    fn default_cache_options_invalidate_on_input_change() {
        let opts = CacheOptions::default();
        assert!(opts.enabled);
        assert!(!opts.includes_config_change());
    }
}
