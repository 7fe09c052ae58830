// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Engine options (§6): a typed, validated analogue of the free-form options map.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::state::DataNodeExecutionMode;

/// `executionMode`: where plugin compute runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    Serial,
    Parallel,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Serial
    }
}

/// Cache policy / injection (§6 `cacheOptions.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_global_max_entries")]
    pub max_entries: usize,
    #[serde(default)]
    pub default_ttl: u64,
    #[serde(default = "default_invalidation_strategy")]
    pub default_invalidation_strategy: crate::node::InvalidationStrategy,
    #[serde(default)]
    pub collect_metrics: bool,
}

const fn default_true() -> bool {
    true
}
const fn default_global_max_entries() -> usize {
    crate::cache::DEFAULT_GLOBAL_MAX_ENTRIES
}
const fn default_invalidation_strategy() -> crate::node::InvalidationStrategy {
    crate::node::InvalidationStrategy::InputChange
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_global_max_entries(),
            default_ttl: 0,
            default_invalidation_strategy: default_invalidation_strategy(),
            collect_metrics: false,
        }
    }
}

/// Worker pool tuning (§6 `parallelOptions.*`). `worker_script_url`/`worker_path`
/// from the source design have no host analogue (pool workers are in-process
/// tasks, not separate scripts/executables) and are intentionally absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default = "default_min_complexity")]
    pub min_complexity: usize,
    #[serde(default = "default_worker_timeout_ms")]
    pub worker_timeout_ms: u64,
}

const fn default_min_complexity() -> usize {
    1000
}
const fn default_worker_timeout_ms() -> u64 {
    30_000
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self { max_workers: None, min_complexity: default_min_complexity(), worker_timeout_ms: default_worker_timeout_ms() }
    }
}

impl ParallelConfig {
    /// `max(2, cores - 1)` unless overridden.
    #[must_use]
    pub fn resolved_pool_size(&self) -> usize {
        self.max_workers.unwrap_or_else(|| std::thread::available_parallelism().map_or(2, |n| n.get().max(2) - 1).max(2))
    }
}

/// The engine's full typed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    #[serde(default)]
    pub data_nodes_execution_mode: DataNodeExecutionMode,
    #[serde(default)]
    pub debounce_time_ms: Option<u64>,
    #[serde(default)]
    pub throttle_time_ms: Option<u64>,
    #[serde(default)]
    pub distinct_values: bool,
    #[serde(default)]
    pub enable_cancelable_compute: bool,
    #[serde(default)]
    pub cache_options: CacheConfig,
    #[serde(default)]
    pub parallel_options: ParallelConfig,
    #[serde(default = "default_stat_logging_interval_ms")]
    pub stat_logging_interval_ms: u64,
    #[serde(default)]
    pub memory_threshold_bytes: Option<u64>,
    #[serde(default = "default_error_threshold")]
    pub error_threshold: usize,
    #[serde(default = "default_error_time_window_ms")]
    pub error_time_window_ms: u64,
    #[serde(default)]
    pub silent_errors: bool,
    #[serde(default = "default_true")]
    pub sanitize_input: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_true")]
    pub auto_start: bool,
    #[serde(default)]
    pub engine_id: Option<String>,
}

const fn default_stat_logging_interval_ms() -> u64 {
    10_000
}
const fn default_error_threshold() -> usize {
    10
}
const fn default_error_time_window_ms() -> u64 {
    60_000
}
const fn default_max_depth() -> usize {
    10
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::default(),
            data_nodes_execution_mode: DataNodeExecutionMode::default(),
            debounce_time_ms: None,
            throttle_time_ms: None,
            distinct_values: false,
            enable_cancelable_compute: false,
            cache_options: CacheConfig::default(),
            parallel_options: ParallelConfig::default(),
            stat_logging_interval_ms: default_stat_logging_interval_ms(),
            memory_threshold_bytes: None,
            error_threshold: default_error_threshold(),
            error_time_window_ms: default_error_time_window_ms(),
            silent_errors: false,
            sanitize_input: true,
            max_depth: default_max_depth(),
            auto_start: true,
            engine_id: None,
        }
    }
}

impl EngineOptions {
    /// Validates the option set, matching §3.2's `INVALID_CONFIG` conditions.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidConfig`] when `max_depth == 0`,
    /// `error_time_window_ms == 0`, or a worker-pool option is set while
    /// `execution_mode == Serial`.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(EngineError::InvalidConfig("max_depth must be > 0".into()));
        }
        if self.error_time_window_ms == 0 {
            return Err(EngineError::InvalidConfig("error_time_window_ms must be > 0".into()));
        }
        if self.execution_mode == ExecutionMode::Serial && self.parallel_options.max_workers.is_some() {
            return Err(EngineError::InvalidConfig(
                "parallel_options.max_workers set while execution_mode is SERIAL".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineOptions::default().validate().is_ok());
    }

    #[test]
    fn zero_max_depth_is_rejected() {
        let opts = EngineOptions { max_depth: 0, ..EngineOptions::default() };
        assert!(matches!(opts.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn worker_options_require_parallel_mode() {
        let opts = EngineOptions {
            execution_mode: ExecutionMode::Serial,
            parallel_options: ParallelConfig { max_workers: Some(4), ..ParallelConfig::default() },
            ..EngineOptions::default()
        };
        assert!(matches!(opts.validate(), Err(EngineError::InvalidConfig(_))));
    }
}
