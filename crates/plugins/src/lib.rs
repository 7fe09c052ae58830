// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Reactor Plugins - the built-in plugin set sufficient to drive every
//! scenario the engine crate's integration tests exercise: data sources,
//! arithmetic/string transforms, a side-effecting sink, and a deliberately
//! slow transform for worker-pool and cache exercising.

pub mod sink;
pub mod sources;
pub mod transforms;

use std::sync::Arc;

use reactor_core::{PluginRegistry, Result};

pub use sink::LogSink;
pub use sources::{ConstantSource, SequenceSource, SkippingSource};
pub use transforms::{AddTransform, ConcatTransform, MultiplyTransform, SlowTransform};

/// Registers every built-in plugin under its default type tag.
///
/// # Errors
/// Propagates [`reactor_core::EngineError::DuplicateType`] if `registry`
/// already has a plugin registered under one of these type tags.
pub fn register_builtin_plugins(registry: &mut PluginRegistry) -> Result<()> {
    registry.register(Arc::new(ConstantSource))?;
    registry.register(Arc::new(SequenceSource))?;
    registry.register(Arc::new(SkippingSource))?;
    registry.register(Arc::new(AddTransform))?;
    registry.register(Arc::new(MultiplyTransform))?;
    registry.register(Arc::new(ConcatTransform))?;
    registry.register(Arc::new(SlowTransform::default()))?;
    registry.register(Arc::new(LogSink))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_builtin_type_without_collision() {
        let mut registry = PluginRegistry::new();
        register_builtin_plugins(&mut registry).unwrap();
        for expected in ["constant", "sequence", "always_skip", "add", "multiply", "concat", "slow_transform", "log_sink"] {
            assert!(registry.has(expected), "missing builtin plugin {expected}");
        }
        assert_eq!(registry.size(), 8);
    }
}
