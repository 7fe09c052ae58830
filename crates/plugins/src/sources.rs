// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Built-in data sources: a constant value and a finite sequence emitter.

use async_trait::async_trait;
use reactor_core::{ComputeOutput, EngineError, Plugin, PluginCategory, Result, Value};
use serde_json::Value as JsonValue;

/// Emits `config.value` once on activation. The simplest possible data node.
#[derive(Default)]
pub struct ConstantSource;

#[async_trait]
impl Plugin for ConstantSource {
    fn plugin_type(&self) -> &str {
        "constant"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Data
    }

    async fn compute(&self, config: &JsonValue, _inputs: &[Value]) -> Result<ComputeOutput> {
        Ok(ComputeOutput::single(json_to_value(config.get("value").unwrap_or(&JsonValue::Null))))
    }
}

/// Emits `config.values` (an array) in order as a finite lazy sequence, one
/// item at a time, sleeping `config.intervalMs` (default 0) between items.
#[derive(Default)]
pub struct SequenceSource;

#[async_trait]
impl Plugin for SequenceSource {
    fn plugin_type(&self) -> &str {
        "sequence"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Data
    }

    async fn compute(&self, config: &JsonValue, _inputs: &[Value]) -> Result<ComputeOutput> {
        let items: Vec<Value> = config
            .get("values")
            .and_then(JsonValue::as_array)
            .map(|arr| arr.iter().map(json_to_value).collect())
            .unwrap_or_default();
        let interval_ms = config.get("intervalMs").and_then(JsonValue::as_u64).unwrap_or(0);

        let stream = futures::stream::iter(items.into_iter().map(Ok::<Value, EngineError>)).then(move |item| async move {
            if interval_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(interval_ms)).await;
            }
            item
        });
        Ok(ComputeOutput::Sequence(Box::pin(stream)))
    }
}

/// A data source that always opts out of the current round, used to exercise
/// skip propagation (S3).
#[derive(Default)]
pub struct SkippingSource;

#[async_trait]
impl Plugin for SkippingSource {
    fn plugin_type(&self) -> &str {
        "always_skip"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Data
    }

    async fn compute(&self, _config: &JsonValue, _inputs: &[Value]) -> Result<ComputeOutput> {
        Ok(ComputeOutput::Skip)
    }
}

pub(crate) fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        JsonValue::String(s) => Value::string(s.clone()),
        JsonValue::Array(arr) => Value::array(arr.iter().map(json_to_value).collect()),
        JsonValue::Object(map) => {
            Value::Object(std::sync::Arc::new(map.iter().map(|(k, v)| (k.clone(), json_to_value(v))).collect()))
        },
    }
}

use futures::StreamExt;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn constant_emits_configured_value() {
        let plugin = ConstantSource;
        let config = serde_json::json!({"value": 10.0});
        let out = plugin.compute(&config, &[]).await.unwrap();
        assert_eq!(out.into_single().unwrap(), Value::from(10.0));
    }

    #[tokio::test]
    async fn sequence_emits_each_item_in_order() {
        let plugin = SequenceSource;
        let config = serde_json::json!({"values": [1, 2, 3]});
        let out = plugin.compute(&config, &[]).await.unwrap();
        let ComputeOutput::Sequence(mut stream) = out else { panic!("expected a sequence") };
        let mut collected = Vec::new();
        while let Some(item) = stream.next().await {
            collected.push(item.unwrap());
        }
        assert_eq!(collected, vec![Value::from(1.0), Value::from(2.0), Value::from(3.0)]);
    }

    #[tokio::test]
    async fn always_skip_never_produces_a_value() {
        let plugin = SkippingSource;
        let out = plugin.compute(&JsonValue::Null, &[]).await.unwrap();
        assert!(matches!(out, ComputeOutput::Skip));
    }
}
