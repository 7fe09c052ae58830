// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Plugin Registry (C1): maps a type tag to a plugin.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{EngineError, Result};
use crate::plugin::Plugin;

/// Maps a plugin's type tag to the plugin itself.
///
/// Registration is idempotent only via [`PluginRegistry::clear`] followed by
/// re-`register`; there is no update-in-place operation.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: IndexMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under its own `plugin_type()`.
    ///
    /// # Errors
    /// Returns [`EngineError::DuplicateType`] if a plugin is already registered
    /// under that type tag.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let type_tag = plugin.plugin_type().to_string();
        if self.plugins.contains_key(&type_tag) {
            return Err(EngineError::DuplicateType(type_tag));
        }
        tracing::debug!(plugin_type = %type_tag, "registered plugin");
        self.plugins.insert(type_tag, plugin);
        Ok(())
    }

    /// Looks up a plugin by type tag.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownType`] if no plugin is registered under `type_tag`.
    pub fn get(&self, type_tag: &str) -> Result<Arc<dyn Plugin>> {
        self.plugins
            .get(type_tag)
            .cloned()
            .ok_or_else(|| EngineError::UnknownType(type_tag.to_string()))
    }

    #[must_use]
    pub fn has(&self, type_tag: &str) -> bool {
        self.plugins.contains_key(type_tag)
    }

    #[must_use]
    pub fn types(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.plugins.len()
    }

    pub fn clear(&mut self) {
        self.plugins.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::test_support::EchoPlugin;

    #[test]
    fn register_get_has_size_clear() {
        let mut registry = PluginRegistry::new();
        assert_eq!(registry.size(), 0);

        registry.register(Arc::new(EchoPlugin)).unwrap();
        assert!(registry.has("echo"));
        assert_eq!(registry.size(), 1);
        assert_eq!(registry.types(), vec!["echo".to_string()]);

        assert!(registry.get("echo").is_ok());
        assert!(matches!(registry.get("missing"), Err(EngineError::UnknownType(_))));

        registry.clear();
        assert_eq!(registry.size(), 0);
        assert!(!registry.has("echo"));
    }

    #[test]
    fn register_rejects_duplicate_type() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(EchoPlugin)).unwrap();
        let err = registry.register(Arc::new(EchoPlugin)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateType(t) if t == "echo"));
    }

    #[test]
    fn re_registration_after_clear_is_allowed() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(EchoPlugin)).unwrap();
        registry.clear();
        assert!(registry.register(Arc::new(EchoPlugin)).is_ok());
    }
}
