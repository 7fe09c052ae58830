// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The Reactive Engine (C7): a single actor task that owns every node's
//! runtime state, the lifecycle state machine, and all hook emissions.
//! Mutations, queries, and pipeline bookkeeping are all handled from one
//! `tokio::select!` loop so state never needs its own lock.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use reactor_core::{
    CacheOptions, CacheProvider, ComputeOutput, DataNodeExecutionMode, EngineCommand, EngineError, EngineLifecycle,
    EngineOptions, EngineStats, Emission, ExecutionMode, HookEvent, HookEventKind, HookManager, NodeDefinition,
    PluginCategory, PluginRegistry, Result, Value,
};
use tokio::sync::{mpsc, oneshot, watch};

use crate::execution::{ExecutionContext, WorkerPool};
use crate::memory;
use crate::pipeline::{self, PipelineEvent, RateShaping};
use crate::sanitize;
use crate::snapshot::{self, NodeSnapshot, Snapshot};
use crate::wrapper::NodeWrapper;

/// Non-mutating requests against engine state, handled alongside
/// [`EngineCommand`] in the same actor loop.
pub enum EngineQuery {
    Subscribe { id: String, reply: oneshot::Sender<Result<watch::Receiver<Emission>>> },
    NodeIds { reply: oneshot::Sender<Vec<String>> },
    IsStabilized { reply: oneshot::Sender<bool> },
    Stats { reply: oneshot::Sender<EngineStats> },
    ExportState { reply: oneshot::Sender<Box<Snapshot>> },
    ImportState { snapshot: Box<Snapshot>, reply: oneshot::Sender<Result<()>> },
}

struct NodeRuntime {
    definition: NodeDefinition,
    wrapper: Arc<NodeWrapper>,
    output_tx: watch::Sender<Emission>,
    output_rx: watch::Receiver<Emission>,
    pipeline: Option<pipeline::PipelineHandle>,
    cache_options: CacheOptions,
    error_count: u64,
}

pub(crate) struct Engine {
    options: EngineOptions,
    registry: PluginRegistry,
    cache: Arc<CacheProvider>,
    hooks: Arc<HookManager>,
    exec_ctx: Arc<ExecutionContext>,
    lifecycle: EngineLifecycle,
    nodes: IndexMap<String, NodeRuntime>,
    active_nodes: HashSet<String>,
    pending_skip_hooks: VecDeque<String>,
    pending_updates: HashMap<String, NodeDefinition>,
    /// Whether a skip has been observed during the current round of active
    /// work, under `AsyncExecMode` (§4.7.5). Cleared on `start`/`resume` and
    /// whenever a fresh round begins (`active_nodes` goes empty → non-empty)
    /// so a stale skip from an earlier round can't mask later stabilisation.
    saw_skip_since_start: bool,
    stats: EngineStats,
    command_rx: mpsc::Receiver<EngineCommand>,
    query_rx: mpsc::Receiver<EngineQuery>,
    event_tx: mpsc::Sender<PipelineEvent>,
    event_rx: mpsc::Receiver<PipelineEvent>,
}

/// Builds and spawns the engine actor, returning the channels used to talk
/// to it and the task's `JoinHandle`.
///
/// # Errors
/// Returns [`EngineError::InvalidConfig`] if `options` fails validation.
pub(crate) fn spawn(
    options: EngineOptions,
    registry: PluginRegistry,
    hooks: Arc<HookManager>,
) -> Result<(mpsc::Sender<EngineCommand>, mpsc::Sender<EngineQuery>, tokio::task::JoinHandle<()>)> {
    options.validate()?;

    let (command_tx, command_rx) = mpsc::channel(256);
    let (query_tx, query_rx) = mpsc::channel(256);
    let (event_tx, event_rx) = mpsc::channel(1024);

    let pool = (options.execution_mode == ExecutionMode::Parallel).then(|| {
        Arc::new(WorkerPool::new(
            options.parallel_options.resolved_pool_size(),
            Duration::from_millis(options.parallel_options.worker_timeout_ms),
        ))
    });
    let exec_ctx = Arc::new(pool.map_or(ExecutionContext::Inline, ExecutionContext::Pooled));

    let engine_id = options.engine_id.clone().unwrap_or_else(|| format!("engine-{}", snapshot::now_ms()));
    let cache = Arc::new(CacheProvider::new(options.cache_options.max_entries));
    let auto_start = options.auto_start;

    let engine = Engine {
        options,
        registry,
        cache,
        hooks,
        exec_ctx,
        lifecycle: EngineLifecycle::Initialized,
        nodes: IndexMap::new(),
        active_nodes: HashSet::new(),
        pending_skip_hooks: VecDeque::new(),
        pending_updates: HashMap::new(),
        saw_skip_since_start: false,
        stats: EngineStats::new(engine_id),
        command_rx,
        query_rx,
        event_tx,
        event_rx,
    };

    let join_handle = tokio::spawn(async move {
        let mut engine = engine;
        engine.hooks.emit(&HookEvent::EngineInitialized);
        if auto_start {
            if let Err(error) = engine.start() {
                tracing::error!(%error, "auto_start failed");
            }
        }
        engine.run().await;
    });

    Ok((command_tx, query_tx, join_handle))
}

impl Engine {
    async fn run(mut self) {
        let stat_interval = Duration::from_millis(self.options.stat_logging_interval_ms.max(1));
        let cleanup_interval = Duration::from_millis((self.options.cache_options.default_ttl / 10).max(10_000));
        let mut stat_timer = tokio::time::interval(stat_interval);
        let mut cleanup_timer = tokio::time::interval(cleanup_interval);
        stat_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        cleanup_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    if !self.handle_command(command).await {
                        break;
                    }
                }
                Some(query) = self.query_rx.recv() => {
                    self.handle_query(query).await;
                }
                Some(event) = self.event_rx.recv() => {
                    self.handle_pipeline_event(event);
                }
                _ = stat_timer.tick(), if self.lifecycle.is_running() => {
                    self.run_stat_cycle();
                }
                _ = cleanup_timer.tick(), if self.lifecycle.is_running() => {
                    self.cache.cleanup();
                }
                else => break,
            }
        }
    }

    async fn handle_command(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::AddNode { def, reply } => {
                let _ = reply.send(self.add_node(def));
            },
            EngineCommand::UpdateNode { id, def, reply } => {
                let _ = reply.send(self.update_node(id, def));
            },
            EngineCommand::RemoveNode { id, reply } => {
                let _ = reply.send(self.remove_node(&id));
            },
            EngineCommand::PrecomputeNode { id, inputs, reply } => {
                self.precompute_node(id, inputs, reply);
            },
            EngineCommand::ClearCache { id, reply } => {
                let _ = reply.send(self.clear_cache(&id));
            },
            EngineCommand::Start { reply } => {
                let _ = reply.send(self.start());
            },
            EngineCommand::Pause { reply } => {
                let _ = reply.send(self.pause());
            },
            EngineCommand::Resume { reply } => {
                let _ = reply.send(self.resume());
            },
            EngineCommand::Stop { reply } => {
                let _ = reply.send(self.stop());
                return false;
            },
        }
        true
    }

    async fn handle_query(&mut self, query: EngineQuery) {
        match query {
            EngineQuery::Subscribe { id, reply } => {
                let result =
                    self.nodes.get(&id).map(|n| n.output_rx.clone()).ok_or_else(|| EngineError::MissingNode(id));
                let _ = reply.send(result);
            },
            EngineQuery::NodeIds { reply } => {
                let _ = reply.send(self.nodes.keys().cloned().collect());
            },
            EngineQuery::IsStabilized { reply } => {
                let _ = reply.send(self.is_stabilized());
            },
            EngineQuery::Stats { reply } => {
                let _ = reply.send(self.stats.clone());
            },
            EngineQuery::ExportState { reply } => {
                let _ = reply.send(Box::new(self.export_state()));
            },
            EngineQuery::ImportState { snapshot, reply } => {
                let _ = reply.send(self.import_state(*snapshot));
            },
        }
    }

    fn handle_pipeline_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::ComputeStarted { node_id } => {
                if self.active_nodes.is_empty() {
                    // A fresh round of work is starting; a skip observed
                    // during a prior round no longer stands in for this
                    // round's stabilisation.
                    self.saw_skip_since_start = false;
                }
                self.active_nodes.insert(node_id);
                self.stats.record_compute();
            },
            PipelineEvent::ComputeFinished { node_id } => {
                self.active_nodes.remove(&node_id);
                if self.active_nodes.is_empty() {
                    while let Some(pending_id) = self.pending_skip_hooks.pop_front() {
                        self.hooks.emit(&HookEvent::NodeSkipComputation { id: pending_id });
                    }
                }
            },
            PipelineEvent::Skip { node_id } => {
                self.saw_skip_since_start = true;
                if self.active_nodes.is_empty() {
                    self.hooks.emit(&HookEvent::NodeSkipComputation { id: node_id });
                } else {
                    self.pending_skip_hooks.push_back(node_id);
                }
                if self.options.data_nodes_execution_mode == DataNodeExecutionMode::AsyncExecMode
                    && self.lifecycle == EngineLifecycle::Running
                {
                    self.transition_to_paused();
                }
            },
            PipelineEvent::Error { node_id, error } => {
                if let Some(runtime) = self.nodes.get_mut(&node_id) {
                    runtime.error_count += 1;
                }
                if !self.options.silent_errors {
                    tracing::error!(node_id = %node_id, %error, "node compute failed");
                }
                self.stats.record_error(Some(node_id.clone()), error.to_string());
                self.hooks.emit(&HookEvent::NodeComputeError { id: node_id, message: error.to_string() });
            },
        }
    }

    fn run_stat_cycle(&mut self) {
        if self.hooks.has_subscribers(HookEventKind::HealthCheck) {
            self.hooks.emit(&HookEvent::HealthCheck {
                node_count: self.nodes.len(),
                active_tasks: self.active_nodes.len(),
                pending_skip_hooks: self.pending_skip_hooks.len(),
                uptime_ms: self.stats.uptime_ms(),
            });
        }
        let recent_errors = self.stats.errors_within(self.options.error_time_window_ms);
        if recent_errors >= self.options.error_threshold {
            self.hooks.emit(&HookEvent::ErrorThresholdExceeded {
                count: recent_errors,
                window_ms: self.options.error_time_window_ms,
            });
        }
        if let Some(threshold) = self.options.memory_threshold_bytes {
            let used = memory::resident_set_bytes();
            if used > threshold {
                self.hooks.emit(&HookEvent::MemoryThresholdExceeded { used_bytes: used, threshold_bytes: threshold });
            }
        }
    }

    // ---- mutations (§4.7.6) ----

    fn add_node(&mut self, def: NodeDefinition) -> Result<()> {
        if def.id.trim().is_empty() || def.type_tag.trim().is_empty() {
            return Err(EngineError::InvalidDefinition("node id and type must be non-empty".into()));
        }
        if self.nodes.contains_key(&def.id) {
            return Err(EngineError::DuplicateId(def.id));
        }
        for input_id in &def.inputs {
            if input_id != &def.id && !self.nodes.contains_key(input_id) {
                return Err(EngineError::MissingInput { node_id: def.id.clone(), input_id: input_id.clone() });
            }
        }

        let mut dependency_map: HashMap<String, Vec<String>> =
            self.nodes.iter().map(|(id, n)| (id.clone(), n.definition.inputs.clone())).collect();
        dependency_map.insert(def.id.clone(), def.inputs.clone());
        if crate::cycle::creates_cycle(&dependency_map, &def.id) {
            return Err(EngineError::CycleDetected(def.id));
        }

        let plugin = self.registry.get(&def.type_tag)?;

        if self.options.sanitize_input {
            for issue in sanitize::scan_for_issues(&def.config, self.options.max_depth) {
                tracing::warn!(node_id = %def.id, issue, "config sanitisation flagged an issue; using definition as-is");
            }
        }

        let mut wrapper = NodeWrapper::new(def.id.clone(), plugin, def.config.clone());
        if wrapper.category() == PluginCategory::Data {
            wrapper.set_subject_handle(def.id.clone());
        }

        let cache_options = def.cache_options.clone().unwrap_or_else(|| self.default_cache_options());
        let (output_tx, output_rx) = watch::channel(Emission::init());

        self.nodes.insert(
            def.id.clone(),
            NodeRuntime {
                definition: def.clone(),
                wrapper: Arc::new(wrapper),
                output_tx,
                output_rx,
                pipeline: None,
                cache_options,
                error_count: 0,
            },
        );

        if self.lifecycle.is_running() {
            self.spawn_pipeline_for(&def.id);
        }
        self.hooks.emit(&HookEvent::NodeAdded { id: def.id });
        Ok(())
    }

    fn update_node(&mut self, id: String, mut def: NodeDefinition) -> Result<()> {
        if !self.nodes.contains_key(&id) {
            return Err(EngineError::MissingNode(id));
        }
        def.id.clone_from(&id);
        if def.type_tag.trim().is_empty() {
            return Err(EngineError::InvalidDefinition("node type must be non-empty".into()));
        }
        for input_id in &def.inputs {
            if input_id != &id && !self.nodes.contains_key(input_id) {
                return Err(EngineError::MissingInput { node_id: id.clone(), input_id: input_id.clone() });
            }
        }

        let mut dependency_map: HashMap<String, Vec<String>> =
            self.nodes.iter().map(|(nid, n)| (nid.clone(), n.definition.inputs.clone())).collect();
        dependency_map.insert(id.clone(), def.inputs.clone());
        if crate::cycle::creates_cycle(&dependency_map, &id) {
            return Err(EngineError::CycleDetected(id));
        }

        // Validates the plugin type up front even if the update ends up
        // buffered below, so TYPE errors surface synchronously regardless
        // of whether the engine happens to be paused right now.
        let plugin = self.registry.get(&def.type_tag)?;

        if matches!(self.lifecycle, EngineLifecycle::Paused) {
            self.pending_updates.insert(id, def);
            return Ok(());
        }

        if self.options.sanitize_input {
            for issue in sanitize::scan_for_issues(&def.config, self.options.max_depth) {
                tracing::warn!(node_id = %id, issue, "config sanitisation flagged an issue; using definition as-is");
            }
        }

        let mut wrapper = NodeWrapper::new(id.clone(), plugin, def.config.clone());
        if wrapper.category() == PluginCategory::Data {
            wrapper.set_subject_handle(id.clone());
        }
        let cache_options = def.cache_options.clone().unwrap_or_else(|| self.default_cache_options());

        let old_def = {
            let runtime = self.nodes.get_mut(&id).expect("existence checked above");
            if let Some(handle) = runtime.pipeline.take() {
                handle.cancel();
            }
            let old_def = runtime.definition.clone();
            runtime.definition = def.clone();
            runtime.wrapper = Arc::new(wrapper);
            runtime.cache_options = cache_options;
            old_def
        };
        self.cache.clear_node(&id);

        if self.lifecycle.is_running() {
            self.spawn_pipeline_for(&id);
        }
        self.hooks.emit(&HookEvent::NodeUpdated { id, old: Box::new(old_def), new: Box::new(def) });
        Ok(())
    }

    fn remove_node(&mut self, id: &str) -> Result<()> {
        let Some(mut runtime) = self.nodes.shift_remove(id) else {
            return Err(EngineError::MissingNode(id.to_string()));
        };
        if let Some(handle) = runtime.pipeline.take() {
            handle.cancel();
        }
        self.cache.clear_node(id);
        self.active_nodes.remove(id);
        self.pending_skip_hooks.retain(|pending_id| pending_id != id);
        self.pending_updates.remove(id);
        self.hooks.emit(&HookEvent::NodeRemoved { id: id.to_string() });

        let affected: Vec<(String, NodeDefinition)> = self
            .nodes
            .values()
            .filter(|n| n.definition.inputs.iter().any(|input_id| input_id == id))
            .map(|n| {
                let mut def = n.definition.clone();
                def.inputs.retain(|input_id| input_id != id);
                (def.id.clone(), def)
            })
            .collect();
        for (other_id, def) in affected {
            if let Err(error) = self.update_node(other_id.clone(), def) {
                tracing::warn!(node_id = %other_id, %error, "failed to cascade input removal");
            }
        }
        Ok(())
    }

    fn precompute_node(&mut self, id: String, inputs: Vec<Value>, reply: oneshot::Sender<Result<()>>) {
        let Some(runtime) = self.nodes.get(&id) else {
            let _ = reply.send(Err(EngineError::MissingNode(id)));
            return;
        };
        let wrapper = runtime.wrapper.clone();
        let exec_ctx = self.exec_ctx.clone();
        let cache = self.cache.clone();
        let cache_options = runtime.cache_options.clone();
        let node_id = id;

        tokio::spawn(async move {
            let cache_key = cache_options
                .enabled
                .then(|| cache.derive_key(&inputs, Some(wrapper.config()), cache_options.includes_config_change()));
            let result = exec_ctx.execute(wrapper.plugin_arc(), wrapper.config().clone(), inputs).await;
            let outcome = match result {
                Ok(ComputeOutput::Single(value)) => {
                    if let Some(key) = cache_key {
                        cache.put(&node_id, key, value, &cache_options);
                    }
                    Ok(())
                },
                Ok(ComputeOutput::Skip | ComputeOutput::Sequence(_)) => Ok(()),
                Err(error) => Err(error),
            };
            let _ = reply.send(outcome);
        });
    }

    fn clear_cache(&self, id: &str) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(EngineError::MissingNode(id.to_string()));
        }
        self.cache.clear_node(id);
        Ok(())
    }

    // ---- lifecycle (§4.7.1) ----

    fn start(&mut self) -> Result<()> {
        if self.lifecycle != EngineLifecycle::Initialized {
            return Err(EngineError::InvalidState(format!("start is only valid from INITIALIZED, engine is {}", self.lifecycle)));
        }
        let from = self.lifecycle;
        self.lifecycle = EngineLifecycle::Running;
        self.saw_skip_since_start = false;
        let ids: Vec<String> = self.nodes.keys().cloned().collect();
        for id in ids {
            self.spawn_pipeline_for(&id);
        }
        self.hooks.emit(&HookEvent::EngineStarted);
        self.hooks.emit(&HookEvent::EngineStateChanged { from, to: self.lifecycle });
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if !self.lifecycle.can_pause() {
            return Err(EngineError::InvalidState(format!("cannot pause from {}", self.lifecycle)));
        }
        self.transition_to_paused();
        Ok(())
    }

    fn transition_to_paused(&mut self) {
        let from = self.lifecycle;
        for runtime in self.nodes.values_mut() {
            if let Some(handle) = runtime.pipeline.take() {
                handle.cancel();
            }
        }
        self.lifecycle = EngineLifecycle::Paused;
        self.hooks.emit(&HookEvent::EnginePaused);
        self.hooks.emit(&HookEvent::EngineStateChanged { from, to: self.lifecycle });
    }

    /// Reapplies buffered `updateNode` calls inline. The original design's
    /// ~10ms trampoline existed to release a single-threaded event loop
    /// before doing the (potentially large) batch of deferred work; a
    /// cooperatively-scheduled async task has no caller to release, so the
    /// buffered updates are simply applied before replying to `resume`.
    fn resume(&mut self) -> Result<()> {
        if !self.lifecycle.can_resume() {
            return Err(EngineError::InvalidState(format!("cannot resume from {}", self.lifecycle)));
        }
        let from = self.lifecycle;
        self.lifecycle = EngineLifecycle::Running;
        self.saw_skip_since_start = false;
        let ids: Vec<String> = self.nodes.keys().cloned().collect();
        for id in ids {
            self.spawn_pipeline_for(&id);
        }
        let pending: Vec<(String, NodeDefinition)> = self.pending_updates.drain().collect();
        for (id, def) in pending {
            if let Err(error) = self.update_node(id.clone(), def) {
                tracing::warn!(node_id = %id, %error, "buffered update failed to apply on resume");
            }
        }
        self.hooks.emit(&HookEvent::EngineResumed);
        self.hooks.emit(&HookEvent::EngineStateChanged { from, to: self.lifecycle });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.lifecycle.is_destroyed() {
            return Err(EngineError::InvalidState("engine already destroyed".into()));
        }
        let from = self.lifecycle;
        self.hooks.emit(&HookEvent::BeforeDestroy);
        for runtime in self.nodes.values_mut() {
            if let Some(handle) = runtime.pipeline.take() {
                handle.cancel();
            }
        }
        self.lifecycle = EngineLifecycle::Destroyed;
        self.hooks.emit(&HookEvent::AfterDestroy);
        self.hooks.emit(&HookEvent::EngineStateChanged { from, to: self.lifecycle });
        Ok(())
    }

    // ---- helpers ----

    fn default_cache_options(&self) -> CacheOptions {
        CacheOptions {
            enabled: self.options.cache_options.enabled,
            ttl: self.options.cache_options.default_ttl,
            max_entries: Some(self.options.cache_options.max_entries),
            invalidation_strategy: vec![self.options.cache_options.default_invalidation_strategy],
        }
    }

    fn spawn_pipeline_for(&mut self, id: &str) {
        let Some(existing) = self.nodes.get(id) else { return };
        let inputs: Vec<watch::Receiver<Emission>> = existing
            .definition
            .inputs
            .iter()
            .filter_map(|input_id| self.nodes.get(input_id).map(|n| n.output_rx.clone()))
            .collect();
        let rate_shaping = RateShaping {
            debounce_ms: self.options.debounce_time_ms,
            throttle_ms: self.options.throttle_time_ms,
            distinct_values: self.options.distinct_values,
        };
        let exec_ctx = self.exec_ctx.clone();
        let cache = self.cache.clone();
        let event_tx = self.event_tx.clone();

        let runtime = self.nodes.get_mut(id).expect("existence checked above");
        let handle = pipeline::spawn(
            id.to_string(),
            runtime.wrapper.clone(),
            exec_ctx,
            cache,
            runtime.cache_options.clone(),
            inputs,
            runtime.output_tx.clone(),
            rate_shaping,
            event_tx,
        );
        runtime.pipeline = Some(handle);
    }

    fn is_stabilized(&self) -> bool {
        match self.options.data_nodes_execution_mode {
            DataNodeExecutionMode::AsyncExecMode => self.saw_skip_since_start || self.active_nodes.is_empty(),
            DataNodeExecutionMode::SyncExecMode => {
                self.active_nodes.is_empty() && self.nodes.values().all(|n| !n.output_rx.borrow().is_init())
            },
        }
    }

    fn export_state(&self) -> Snapshot {
        let mut nodes = IndexMap::new();
        for (id, runtime) in &self.nodes {
            let stripped = runtime.definition.without_runtime_keys();
            let cache_data = self.options.cache_options.collect_metrics.then(|| {
                let metrics = self.cache.node_metrics(id);
                serde_json::json!({"hits": metrics.hits, "misses": metrics.misses})
            });
            nodes.insert(
                id.clone(),
                NodeSnapshot {
                    id: id.clone(),
                    type_tag: stripped.type_tag,
                    inputs: stripped.inputs,
                    config: stripped.config,
                    current_value: snapshot::encode_emission(&runtime.output_rx.borrow()),
                    error_count: runtime.error_count,
                    cache_data,
                },
            );
        }
        Snapshot {
            engine_id: self.stats.engine_id.clone(),
            created_at_ms: self.stats.start_time_ms,
            exported_at_ms: snapshot::now_ms(),
            state: EngineLifecycle::Initialized.to_string(),
            options: self.options.clone(),
            stats: self.stats.clone(),
            nodes,
            metadata: None,
            recorded_lifecycle: self.lifecycle.to_string(),
        }
    }

    /// Rebuilds engine state from a snapshot. Only valid on a freshly
    /// constructed engine (no nodes yet) — `replay` always imports into a
    /// brand new engine rather than merging into a live one.
    fn import_state(&mut self, snapshot: Snapshot) -> Result<()> {
        if !self.nodes.is_empty() {
            return Err(EngineError::InvalidState("importState requires an engine with no existing nodes".into()));
        }
        self.stats = snapshot.stats;
        self.stats.engine_id = snapshot.engine_id;
        for (id, node_snapshot) in snapshot.nodes {
            let def = NodeDefinition {
                id: id.clone(),
                type_tag: node_snapshot.type_tag,
                inputs: node_snapshot.inputs,
                config: node_snapshot.config,
                cache_options: None,
            };
            self.add_node(def)?;
            if let Some(runtime) = self.nodes.get(&id) {
                let emission = snapshot::decode_emission(&node_snapshot.current_value);
                let _ = runtime.output_tx.send(emission);
            }
        }
        self.hooks.emit(&HookEvent::EngineRestored);
        Ok(())
    }
}
