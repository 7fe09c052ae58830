// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Reactor Core - fundamental traits and data structures for the reactive
//! dataflow engine.
//!
//! ## Core Modules
//!
//! - [`value`]: The concrete value domain (`Value`, `Sentinel`, `Emission`)
//! - [`plugin`]: The `Plugin` trait, plugin categories, and compute output
//! - [`registry`]: Plugin factory and discovery (`PluginRegistry`)
//! - [`node`]: `NodeDefinition` and per-node cache policy
//! - [`state`]: Engine lifecycle state machine
//! - [`stats`]: Engine-wide statistics and bounded error log
//! - [`cache`]: Per-node memoisation (`CacheProvider`)
//! - [`control`]: Control-plane commands accepted by the engine's actor loop
//! - [`hooks`]: Typed lifecycle event bus
//! - [`options`]: Typed, validated engine configuration
//! - [`error`]: Error types and handling

pub use async_trait::async_trait;

pub mod cache;
pub mod control;
pub mod error;
pub mod hooks;
pub mod node;
pub mod options;
pub mod plugin;
pub mod registry;
pub mod state;
pub mod stats;
pub mod value;

pub use cache::CacheProvider;
pub use control::EngineCommand;
pub use error::{EngineError, Result};
pub use hooks::{HookEvent, HookEventKind, HookManager, SubscriptionId};
pub use node::{CacheOptions, InvalidationStrategy, NodeDefinition};
pub use options::{CacheConfig, EngineOptions, ExecutionMode, ParallelConfig};
pub use plugin::{ComputeOutput, LazySequence, Plugin, PluginCategory};
pub use registry::PluginRegistry;
pub use state::{DataNodeExecutionMode, EngineLifecycle};
pub use stats::{EngineStats, ErrorLogEntry};
pub use value::{Emission, Sentinel, Value};
