// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Node Wrapper (C4): a plugin bound to its frozen config, honouring the
//! skip-propagation rule for operational nodes.

use std::sync::Arc;

use reactor_core::{EngineError, Plugin, PluginCategory, Result, Value};
use serde_json::Value as JsonValue;

use crate::execution::ExecutionContext;

/// A plugin bound to one node's frozen config.
pub struct NodeWrapper {
    node_id: String,
    plugin: Arc<dyn Plugin>,
    config: JsonValue,
}

impl NodeWrapper {
    #[must_use]
    pub fn new(node_id: impl Into<String>, plugin: Arc<dyn Plugin>, config: JsonValue) -> Self {
        Self { node_id: node_id.into(), plugin, config }
    }

    #[must_use]
    pub fn category(&self) -> PluginCategory {
        self.plugin.category()
    }

    #[must_use]
    pub fn plugin_type(&self) -> &str {
        self.plugin.plugin_type()
    }

    #[must_use]
    pub fn config(&self) -> &JsonValue {
        &self.config
    }

    #[must_use]
    pub fn plugin_arc(&self) -> Arc<dyn Plugin> {
        self.plugin.clone()
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Injects the data node's output back-reference into `config.__subject`,
    /// so self-sourcing plugins (pollers, webhooks) can push into the graph.
    /// Stripped before any snapshot export (`without_runtime_keys`).
    pub fn set_subject_handle(&mut self, handle: impl Into<String>) {
        if let JsonValue::Object(map) = &mut self.config {
            map.insert("__subject".to_string(), JsonValue::String(handle.into()));
        }
    }

    /// Invokes the wrapped plugin through `exec_ctx` (inline or pooled).
    /// Operational plugins observing a `SKIP` among `inputs` fail fast with
    /// [`EngineError::SkipInput`] without reaching `exec_ctx` at all.
    ///
    /// # Errors
    /// Propagates [`EngineError::SkipInput`] or any error the plugin's
    /// `compute` returns.
    pub async fn invoke(&self, exec_ctx: &ExecutionContext, inputs_skipped: bool, inputs: &[Value]) -> Result<reactor_core::ComputeOutput> {
        if self.plugin.category() == PluginCategory::Operational && inputs_skipped {
            return Err(EngineError::SkipInput(self.node_id.clone()));
        }
        exec_ctx.execute(self.plugin_arc(), self.config.clone(), inputs.to_vec()).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use reactor_core::ComputeOutput;

    use super::*;

    struct EchoPlugin;

    #[async_trait]
    impl Plugin for EchoPlugin {
        fn plugin_type(&self) -> &str {
            "echo"
        }

        fn category(&self) -> PluginCategory {
            PluginCategory::Operational
        }

        async fn compute(&self, _config: &JsonValue, inputs: &[Value]) -> Result<ComputeOutput> {
            Ok(ComputeOutput::Single(inputs.first().cloned().unwrap_or(Value::Null)))
        }
    }

    #[tokio::test]
    async fn operational_wrapper_rejects_skipped_input() {
        let wrapper = NodeWrapper::new("op1", Arc::new(EchoPlugin), JsonValue::Null);
        let err = wrapper.invoke(&ExecutionContext::Inline, true, &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::SkipInput(id) if id == "op1"));
    }

    #[tokio::test]
    async fn operational_wrapper_computes_when_not_skipped() {
        let wrapper = NodeWrapper::new("op1", Arc::new(EchoPlugin), JsonValue::Null);
        let out = wrapper.invoke(&ExecutionContext::Inline, false, &[Value::from(1.0)]).await.unwrap();
        assert_eq!(out.into_single().unwrap(), Value::from(1.0));
    }
}
