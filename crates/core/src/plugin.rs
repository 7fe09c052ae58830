// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The plugin trait plugins implement and the uniform result shape `compute` returns.

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::value::Value;

/// Whether a plugin produces data from an external source or transforms upstream values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginCategory {
    /// Produces values without consuming graph inputs; may skip a round.
    Data,
    /// Consumes upstream values; skips if any input was itself skipped.
    Operational,
}

/// A finite or indefinite sequence of computed values, used when a plugin's
/// `compute` doesn't resolve to a single value in one step (e.g. a poller or
/// a streaming transform). Each item the stream yields is published to the
/// node's output channel in turn.
pub type LazySequence = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

/// What a plugin's `compute` returns: either it resolved immediately to a
/// single value, or it handed back a sequence that the execution context
/// drives to completion, publishing each item.
pub enum ComputeOutput {
    Single(Value),
    Sequence(LazySequence),
    /// A data plugin's decision not to produce a value this round. Published
    /// as the `SKIP` sentinel on the node's own output, which then propagates
    /// to operational dependents exactly like an upstream `SKIP` would.
    Skip,
}

impl ComputeOutput {
    #[must_use]
    pub fn single(value: impl Into<Value>) -> Self {
        Self::Single(value.into())
    }

    /// Returns the immediate value, if this output did not resolve to a sequence or a skip.
    #[must_use]
    pub fn into_single(self) -> Option<Value> {
        match self {
            Self::Single(v) => Some(v),
            Self::Sequence(_) | Self::Skip => None,
        }
    }
}

impl From<Value> for ComputeOutput {
    fn from(v: Value) -> Self {
        Self::Single(v)
    }
}

/// A registered computation: a type tag, a category, and a `compute` function.
///
/// Implementors should avoid inheritance-style layering; the engine composes
/// a `Plugin` with its frozen config rather than subclassing it.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The type tag this plugin is registered under. Must match the key used
    /// in [`crate::registry::PluginRegistry::register`].
    fn plugin_type(&self) -> &str;

    fn category(&self) -> PluginCategory;

    /// Runs the computation for one invocation of this node.
    ///
    /// `config` is the node's frozen, already-sanitised configuration.
    /// `inputs` holds one concrete [`Value`] per declared input, in declaration
    /// order; sentinels are never delivered here (the wrapper gates on them).
    async fn compute(&self, config: &JsonValue, inputs: &[Value]) -> Result<ComputeOutput>;
}

pub type PluginFactory = Box<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub struct EchoPlugin;

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
}
