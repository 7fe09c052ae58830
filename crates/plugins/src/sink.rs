// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! A side-effecting sink plugin: logs every value it receives and echoes it
//! back unchanged so it can still sit mid-graph for test assertions.

use async_trait::async_trait;
use reactor_core::{ComputeOutput, Plugin, PluginCategory, Result, Value};
use serde_json::Value as JsonValue;

#[derive(Default)]
pub struct LogSink;

#[async_trait]
impl Plugin for LogSink {
    fn plugin_type(&self) -> &str {
        "log_sink"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Operational
    }

    async fn compute(&self, config: &JsonValue, inputs: &[Value]) -> Result<ComputeOutput> {
        let label = config.get("label").and_then(JsonValue::as_str).unwrap_or("sink");
        tracing::info!(%label, ?inputs, "log_sink received inputs");
        Ok(ComputeOutput::single(inputs.first().cloned().unwrap_or(Value::Null)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_echoes_first_input() {
        let plugin = LogSink;
        let out = plugin.compute(&JsonValue::Null, &[Value::from(7.0)]).await.unwrap();
        assert_eq!(out.into_single().unwrap(), Value::from(7.0));
    }
}
