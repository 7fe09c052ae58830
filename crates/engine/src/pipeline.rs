// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Per-node pipeline (§4.7.2): combine → gate → await → rate-shape → compute
//! → terminate, realised as one `tokio::spawn`ed task per node.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reactor_core::{CacheOptions, CacheProvider, ComputeOutput, Emission, EngineError, Value};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::execution::ExecutionContext;
use crate::wrapper::NodeWrapper;

/// Events a running pipeline reports back to the owning engine actor so it
/// can track `activeNodes`, flush deferred skip hooks, and update stats.
#[derive(Debug)]
pub enum PipelineEvent {
    ComputeStarted { node_id: String },
    ComputeFinished { node_id: String },
    Skip { node_id: String },
    Error { node_id: String, error: EngineError },
}

/// Rate-shaping configuration applied before a node's compute (§4.7.2 step 4).
#[derive(Debug, Clone, Copy, Default)]
pub struct RateShaping {
    pub debounce_ms: Option<u64>,
    pub throttle_ms: Option<u64>,
    pub distinct_values: bool,
}

/// A handle to a running pipeline task, used for teardown.
pub struct PipelineHandle {
    cancel: CancellationToken,
}

impl PipelineHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[allow(clippy::too_many_arguments)]
pub fn spawn(
    node_id: String,
    wrapper: Arc<NodeWrapper>,
    exec_ctx: Arc<ExecutionContext>,
    cache: Arc<CacheProvider>,
    cache_options: CacheOptions,
    inputs: Vec<watch::Receiver<Emission>>,
    output: watch::Sender<Emission>,
    rate_shaping: RateShaping,
    events: mpsc::Sender<PipelineEvent>,
) -> PipelineHandle {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    tokio::spawn(run(node_id, wrapper, exec_ctx, cache, cache_options, inputs, output, rate_shaping, events, task_cancel));
    PipelineHandle { cancel }
}

/// Message forwarded from a per-input watcher task to the pipeline's combine loop.
struct InputChanged {
    index: usize,
    value: Emission,
}

#[allow(clippy::too_many_arguments, clippy::too_many_lines)]
async fn run(
    node_id: String,
    wrapper: Arc<NodeWrapper>,
    exec_ctx: Arc<ExecutionContext>,
    cache: Arc<CacheProvider>,
    cache_options: CacheOptions,
    inputs: Vec<watch::Receiver<Emission>>,
    output: watch::Sender<Emission>,
    rate_shaping: RateShaping,
    events: mpsc::Sender<PipelineEvent>,
    cancel: CancellationToken,
) {
    if inputs.is_empty() {
        run_zero_input(&node_id, &wrapper, &exec_ctx, &cache, &cache_options, &output, &events, &cancel).await;
        return;
    }

    let mut latest: Vec<Emission> = inputs.iter().map(|rx| rx.borrow().clone()).collect();
    let (tx, mut rx_merge) = mpsc::channel::<InputChanged>(inputs.len().max(1) * 4);
    for (index, mut input_rx) in inputs.into_iter().enumerate() {
        let tx = tx.clone();
        let watcher_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = watcher_cancel.cancelled() => break,
                    changed = input_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let value = input_rx.borrow_and_update().clone();
                        if tx.send(InputChanged { index, value }).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }
    drop(tx);

    let mut last_emitted_key: Option<String> = None;
    let mut last_throttle_at: Option<Instant> = None;

    'outer: loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = rx_merge.recv() => {
                match changed {
                    None => break,
                    Some(InputChanged { index, value }) => latest[index] = value,
                }
            }
        }

        if latest.iter().any(Emission::is_init) {
            continue;
        }

        if let Some(ms) = rate_shaping.debounce_ms {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break 'outer,
                    () = tokio::time::sleep(Duration::from_millis(ms)) => break,
                    changed = rx_merge.recv() => {
                        match changed {
                            None => break 'outer,
                            Some(InputChanged { index, value }) => {
                                latest[index] = value;
                                if latest.iter().any(Emission::is_init) {
                                    continue 'outer;
                                }
                            }
                        }
                    }
                }
            }
        }

        if let Some(ms) = rate_shaping.throttle_ms {
            let now = Instant::now();
            if last_throttle_at.is_some_and(|last| now.duration_since(last) < Duration::from_millis(ms)) {
                continue;
            }
            last_throttle_at = Some(now);
        }

        let skipped = latest.iter().any(Emission::is_skip);
        let concrete: Vec<Value> = latest.iter().filter_map(Emission::as_value).cloned().collect();

        if rate_shaping.distinct_values && !skipped {
            if let Some(key) = canonical_key(&concrete) {
                if last_emitted_key.as_deref() == Some(key.as_str()) {
                    continue;
                }
                last_emitted_key = Some(key);
            }
        }

        run_compute(&node_id, &wrapper, &exec_ctx, &cache, &cache_options, &concrete, skipped, &output, &events, &cancel).await;
    }
}

async fn run_zero_input(
    node_id: &str,
    wrapper: &Arc<NodeWrapper>,
    exec_ctx: &Arc<ExecutionContext>,
    cache: &Arc<CacheProvider>,
    cache_options: &CacheOptions,
    output: &watch::Sender<Emission>,
    events: &mpsc::Sender<PipelineEvent>,
    cancel: &CancellationToken,
) {
    run_compute(node_id, wrapper, exec_ctx, cache, cache_options, &[], false, output, events, cancel).await;
}

#[allow(clippy::too_many_arguments)]
async fn run_compute(
    node_id: &str,
    wrapper: &Arc<NodeWrapper>,
    exec_ctx: &Arc<ExecutionContext>,
    cache: &Arc<CacheProvider>,
    cache_options: &CacheOptions,
    inputs: &[Value],
    skipped: bool,
    output: &watch::Sender<Emission>,
    events: &mpsc::Sender<PipelineEvent>,
    cancel: &CancellationToken,
) {
    let _ = events.send(PipelineEvent::ComputeStarted { node_id: node_id.to_string() }).await;

    let cache_key = (!skipped && cache_options.enabled)
        .then(|| cache.derive_key(inputs, Some(wrapper.config()), cache_options.includes_config_change()));

    if let Some(key) = &cache_key {
        if let Some(cached) = cache.get(node_id, key) {
            let _ = output.send(Emission::from(cached));
            let _ = events.send(PipelineEvent::ComputeFinished { node_id: node_id.to_string() }).await;
            return;
        }
    }

    let compute = wrapper.invoke(exec_ctx, skipped, inputs);
    let result = tokio::select! {
        () = cancel.cancelled() => {
            let _ = events.send(PipelineEvent::ComputeFinished { node_id: node_id.to_string() }).await;
            return;
        }
        result = compute => result,
    };

    match result {
        Ok(ComputeOutput::Single(value)) => {
            if let Some(key) = cache_key {
                cache.put(node_id, key, value.clone(), cache_options);
            }
            let _ = output.send(Emission::from(value));
        },
        Ok(ComputeOutput::Skip) => {
            let _ = output.send(Emission::skip());
            let _ = events.send(PipelineEvent::Skip { node_id: node_id.to_string() }).await;
        },
        Ok(ComputeOutput::Sequence(mut sequence)) => {
            use futures::StreamExt;
            while let Some(item) = sequence.next().await {
                match item {
                    Ok(value) => {
                        let _ = output.send(Emission::from(value));
                    },
                    Err(error) => {
                        let _ = events.send(PipelineEvent::Error { node_id: node_id.to_string(), error }).await;
                        let _ = output.send(Emission::from(Value::Null));
                        break;
                    },
                }
            }
        },
        Err(EngineError::SkipInput(_)) => {
            let _ = output.send(Emission::skip());
            let _ = events.send(PipelineEvent::Skip { node_id: node_id.to_string() }).await;
        },
        Err(error) => {
            let _ = events.send(PipelineEvent::Error { node_id: node_id.to_string(), error }).await;
            let _ = output.send(Emission::from(Value::Null));
        },
    }

    let _ = events.send(PipelineEvent::ComputeFinished { node_id: node_id.to_string() }).await;
}

fn canonical_key(values: &[Value]) -> Option<String> {
    let encoded: Option<Vec<String>> = values.iter().map(Value::canonical_json).collect();
    encoded.and_then(|v| serde_json::to_string(&v).ok())
}
