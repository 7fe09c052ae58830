// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Built-in operational transforms: arithmetic and string concatenation.

use async_trait::async_trait;
use reactor_core::{ComputeOutput, EngineError, Plugin, PluginCategory, Result, Value};
use serde_json::Value as JsonValue;

/// Sums every numeric input. Non-numeric inputs are treated as `0`.
#[derive(Default)]
pub struct AddTransform;

#[async_trait]
impl Plugin for AddTransform {
    fn plugin_type(&self) -> &str {
        "add"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Operational
    }

    async fn compute(&self, _config: &JsonValue, inputs: &[Value]) -> Result<ComputeOutput> {
        let sum: f64 = inputs.iter().filter_map(Value::as_f64).sum();
        Ok(ComputeOutput::single(sum))
    }
}

/// Multiplies every numeric input together (empty input yields `1`).
#[derive(Default)]
pub struct MultiplyTransform;

#[async_trait]
impl Plugin for MultiplyTransform {
    fn plugin_type(&self) -> &str {
        "multiply"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Operational
    }

    async fn compute(&self, _config: &JsonValue, inputs: &[Value]) -> Result<ComputeOutput> {
        let product = inputs.iter().filter_map(Value::as_f64).fold(1.0, |acc, n| acc * n);
        Ok(ComputeOutput::single(product))
    }
}

/// Joins every string input with `config.separator` (default `""`).
#[derive(Default)]
pub struct ConcatTransform;

#[async_trait]
impl Plugin for ConcatTransform {
    fn plugin_type(&self) -> &str {
        "concat"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Operational
    }

    async fn compute(&self, config: &JsonValue, inputs: &[Value]) -> Result<ComputeOutput> {
        let separator = config.get("separator").and_then(JsonValue::as_str).unwrap_or("");
        let joined = inputs.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(separator);
        Ok(ComputeOutput::single(joined.as_str()))
    }
}

/// Deliberately slow transform used to exercise the worker pool and cache
/// (always dispatched to the pool by `should_parallelize`'s heavy-type list).
/// Sleeps `config.delayMs` (default 50) then echoes the first input, counting
/// invocations for cache-hit assertions in tests.
pub struct SlowTransform {
    invocations: std::sync::atomic::AtomicU64,
}

impl Default for SlowTransform {
    fn default() -> Self {
        Self { invocations: std::sync::atomic::AtomicU64::new(0) }
    }
}

impl SlowTransform {
    #[must_use]
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for SlowTransform {
    fn plugin_type(&self) -> &str {
        "slow_transform"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Operational
    }

    async fn compute(&self, config: &JsonValue, inputs: &[Value]) -> Result<ComputeOutput> {
        self.invocations.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let delay_ms = config.get("delayMs").and_then(JsonValue::as_u64).unwrap_or(50);
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        inputs.first().cloned().map_or_else(
            || Err(EngineError::compute("slow_transform", std::io::Error::other("slow_transform requires one input"))),
            |value| Ok(ComputeOutput::single(value)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_sums_numeric_inputs() {
        let plugin = AddTransform;
        let out = plugin.compute(&JsonValue::Null, &[Value::from(10.0), Value::from(20.0)]).await.unwrap();
        assert_eq!(out.into_single().unwrap(), Value::from(30.0));
    }

    #[tokio::test]
    async fn multiply_of_empty_input_is_one() {
        let plugin = MultiplyTransform;
        let out = plugin.compute(&JsonValue::Null, &[]).await.unwrap();
        assert_eq!(out.into_single().unwrap(), Value::from(1.0));
    }

    #[tokio::test]
    async fn concat_joins_with_configured_separator() {
        let plugin = ConcatTransform;
        let config = serde_json::json!({"separator": "-"});
        let out = plugin.compute(&config, &[Value::string("a"), Value::string("b")]).await.unwrap();
        assert_eq!(out.into_single().unwrap(), Value::string("a-b"));
    }

    #[tokio::test]
    async fn slow_transform_echoes_its_input_and_counts_invocations() {
        let plugin = SlowTransform::default();
        let config = serde_json::json!({"delayMs": 1});
        let out = plugin.compute(&config, &[Value::from(5.0)]).await.unwrap();
        assert_eq!(out.into_single().unwrap(), Value::from(5.0));
        assert_eq!(plugin.invocation_count(), 1);
    }
}
