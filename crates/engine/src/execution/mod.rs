// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Execution Context (C3): runs a wrapper's invocation either inline on the
//! calling task or offloaded to the worker pool.

mod pool;

use std::sync::Arc;

use reactor_core::{ComputeOutput, Plugin, Result, Value};
use serde_json::Value as JsonValue;

pub use pool::WorkerPool;

/// Types considered expensive enough to always prefer the worker pool when
/// `executionMode = PARALLEL`, regardless of the size heuristics below.
const HEAVY_TYPES: &[&str] = &["slow_transform"];

/// Decides whether a `PARALLEL`-mode invocation should actually be dispatched
/// to the pool, or is cheap enough to run inline. Mirrors `shouldParallelize`
/// (§4.3): heavy type list, `iterations`/`forceParallel`/array-length/aggregate
/// size heuristics.
#[must_use]
pub fn should_parallelize(plugin_type: &str, config: &JsonValue, inputs: &[Value]) -> bool {
    if HEAVY_TYPES.contains(&plugin_type) {
        return true;
    }
    if config.get("forceParallel").and_then(JsonValue::as_bool) == Some(true) {
        return true;
    }
    if config.get("iterations").and_then(JsonValue::as_u64).is_some_and(|n| n > 10_000) {
        return true;
    }
    if let Some(JsonValue::Array(arr)) = config.get("data") {
        if arr.len() > 5000 {
            return true;
        }
    }
    aggregate_size(inputs) > 1000
}

fn aggregate_size(inputs: &[Value]) -> usize {
    inputs.iter().map(value_size).sum()
}

fn value_size(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(value_size).sum::<usize>(),
        Value::Object(map) => 1 + map.values().map(value_size).sum::<usize>(),
        _ => 1,
    }
}

/// Execution context used by a node's pipeline to run one compute. `Inline`
/// runs on the caller's task; `Pooled` dispatches to the shared worker pool
/// and awaits the reply, subject to `workerTimeout`.
pub enum ExecutionContext {
    Inline,
    Pooled(Arc<WorkerPool>),
}

impl ExecutionContext {
    /// Runs one invocation of `plugin` under `config` with `inputs`.
    ///
    /// # Errors
    /// Propagates the plugin's own error, or [`reactor_core::EngineError::Timeout`]
    /// when pooled execution exceeds the pool's configured timeout.
    pub async fn execute(&self, plugin: Arc<dyn Plugin>, config: JsonValue, inputs: Vec<Value>) -> Result<ComputeOutput> {
        match self {
            Self::Inline => plugin.compute(&config, &inputs).await,
            Self::Pooled(pool) => {
                if should_parallelize(plugin.plugin_type(), &config, &inputs) {
                    pool.dispatch(plugin, config, inputs).await
                } else {
                    plugin.compute(&config, &inputs).await
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heavy_type_always_parallelizes() {
        assert!(should_parallelize("slow_transform", &JsonValue::Null, &[]));
    }

    #[test]
    fn force_parallel_flag_is_honoured() {
        let config = serde_json::json!({"forceParallel": true});
        assert!(should_parallelize("add", &config, &[]));
    }

    #[test]
    fn small_input_stays_inline() {
        assert!(!should_parallelize("add", &JsonValue::Null, &[Value::from(1.0)]));
    }
}
