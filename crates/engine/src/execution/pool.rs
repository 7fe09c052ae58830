// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Host realisation of the worker pool (§4.3.1): a fixed-size set of
//! long-lived `tokio::task`s, each with its own task queue and an
//! `AtomicUsize` pending-count used for least-loaded dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reactor_core::{ComputeOutput, EngineError, Plugin, Result, Value};
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

struct Task {
    plugin: Arc<dyn Plugin>,
    config: JsonValue,
    inputs: Vec<Value>,
    reply: oneshot::Sender<Result<ComputeOutput>>,
}

struct Worker {
    tx: Arc<Mutex<mpsc::Sender<Task>>>,
    pending: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

/// A fixed-size pool of worker tasks, dispatching by least outstanding load.
///
/// A panicking worker task is detected by its supervisor and respawned; any
/// tasks still queued to it at that point are dropped along with their reply
/// channels, which resolves the caller's await to a closed-channel error —
/// surfaced here as [`EngineError::Timeout`] to match "indistinguishable to
/// the engine from a plugin error" (§5).
pub struct WorkerPool {
    workers: Vec<Worker>,
    timeout: Duration,
}

impl WorkerPool {
    /// Spawns `pool_size` worker tasks under `runtime`'s current executor.
    #[must_use]
    pub fn new(pool_size: usize, timeout: Duration) -> Self {
        let pool_size = pool_size.max(1);
        let mut workers = Vec::with_capacity(pool_size);
        for index in 0..pool_size {
            let pending = Arc::new(AtomicUsize::new(0));
            let cancel = CancellationToken::new();
            let tx = spawn_worker(index, cancel.clone());
            workers.push(Worker { tx, pending, cancel });
        }
        Self { workers, timeout }
    }

    /// Dispatches one task to the least-loaded worker, awaiting its result
    /// within `workerTimeout`.
    ///
    /// # Errors
    /// Returns [`EngineError::Timeout`] if the worker does not reply in time
    /// or its channel is dropped (worker crashed mid-task).
    pub async fn dispatch(&self, plugin: Arc<dyn Plugin>, config: JsonValue, inputs: Vec<Value>) -> Result<ComputeOutput> {
        let worker = self
            .workers
            .iter()
            .min_by_key(|w| w.pending.load(Ordering::Acquire))
            .expect("pool always has at least one worker");

        let plugin_type = plugin.plugin_type().to_string();
        let (reply_tx, reply_rx) = oneshot::channel();
        worker.pending.fetch_add(1, Ordering::AcqRel);
        let tx = worker.tx.lock().await.clone();
        let sent = tx.send(Task { plugin, config, inputs, reply: reply_tx }).await;
        if sent.is_err() {
            worker.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(EngineError::Timeout(plugin_type));
        }

        let result = tokio::time::timeout(self.timeout, reply_rx).await;
        worker.pending.fetch_sub(1, Ordering::AcqRel);
        match result {
            Ok(Ok(inner)) => inner,
            Ok(Err(_)) | Err(_) => Err(EngineError::Timeout(plugin_type)),
        }
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.workers.len()
    }

    /// Minimum pending-task count across workers, used by tests asserting
    /// least-loaded dispatch (§8, property 10).
    #[must_use]
    pub fn min_pending(&self) -> usize {
        self.workers.iter().map(|w| w.pending.load(Ordering::Acquire)).min().unwrap_or(0)
    }

    /// Signals shutdown by cancelling every worker's token; outstanding
    /// dispatches resolve to `TIMEOUT`. Non-blocking, matching "asked to
    /// terminate and, optionally, waited on for at most 1s" (§5).
    pub fn terminate(self) {
        for worker in &self.workers {
            worker.cancel.cancel();
        }
    }
}

async fn worker_loop(index: usize, mut rx: mpsc::Receiver<Task>, cancel: CancellationToken) {
    tracing::debug!(worker = index, "worker task started");
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            task = rx.recv() => {
                let Some(Task { plugin, config, inputs, reply }) = task else { break };
                let result = plugin.compute(&config, &inputs).await;
                let _ = reply.send(result);
            }
        }
    }
    tracing::debug!(worker = index, "worker task shutting down");
}

fn start_worker_task(index: usize, cancel: CancellationToken) -> (mpsc::Sender<Task>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(64);
    let handle = tokio::spawn(worker_loop(index, rx, cancel));
    (tx, handle)
}

/// Spawns worker `index` under a supervisor that respawns it, with a fresh
/// task queue, if its task panics mid-compute. Tasks still queued to the
/// crashed worker are dropped along with their reply channels, resolving the
/// caller's await to [`EngineError::Timeout`] (§4.3, "the worker is replaced").
/// Shutdown is driven by `cancel` rather than dropping the channel, since the
/// supervisor itself holds a clone of the sender for the life of the pool.
fn spawn_worker(index: usize, cancel: CancellationToken) -> Arc<Mutex<mpsc::Sender<Task>>> {
    let (tx, handle) = start_worker_task(index, cancel.clone());
    let tx = Arc::new(Mutex::new(tx));
    let supervised_tx = tx.clone();
    tokio::spawn(async move {
        let mut handle = handle;
        loop {
            match handle.await {
                Ok(()) => break,
                Err(join_error) if join_error.is_panic() && !cancel.is_cancelled() => {
                    tracing::warn!(worker = index, "worker task panicked, respawning");
                    let (new_tx, new_handle) = start_worker_task(index, cancel.clone());
                    *supervised_tx.lock().await = new_tx;
                    handle = new_handle;
                },
                Err(_) => break,
            }
        }
    });
    tx
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use reactor_core::PluginCategory;

    use super::*;

    struct AddOne;

    #[async_trait]
    impl Plugin for AddOne {
        fn plugin_type(&self) -> &str {
            "add_one"
        }

        fn category(&self) -> PluginCategory {
            PluginCategory::Operational
        }

        async fn compute(&self, _config: &JsonValue, inputs: &[Value]) -> Result<ComputeOutput> {
            let n = inputs.first().and_then(Value::as_f64).unwrap_or(0.0);
            Ok(ComputeOutput::single(n + 1.0))
        }
    }

    #[tokio::test]
    async fn dispatch_runs_plugin_and_returns_result() {
        let pool = WorkerPool::new(2, Duration::from_secs(1));
        let out = pool.dispatch(Arc::new(AddOne), JsonValue::Null, vec![Value::from(1.0)]).await.unwrap();
        assert_eq!(out.into_single().unwrap(), Value::from(2.0));
    }

    #[tokio::test]
    async fn pool_has_requested_size() {
        let pool = WorkerPool::new(3, Duration::from_secs(1));
        assert_eq!(pool.pool_size(), 3);
    }

    struct PanicOnce {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Plugin for PanicOnce {
        fn plugin_type(&self) -> &str {
            "panic_once"
        }

        fn category(&self) -> PluginCategory {
            PluginCategory::Operational
        }

        async fn compute(&self, _config: &JsonValue, _inputs: &[Value]) -> Result<ComputeOutput> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("simulated plugin panic");
            }
            Ok(ComputeOutput::single(Value::from(1.0)))
        }
    }

    #[tokio::test]
    async fn a_panicking_worker_is_respawned() {
        let pool = WorkerPool::new(1, Duration::from_millis(500));
        let calls = Arc::new(AtomicUsize::new(0));
        let plugin: Arc<dyn Plugin> = Arc::new(PanicOnce { calls: calls.clone() });

        let first = pool.dispatch(plugin.clone(), JsonValue::Null, vec![]).await;
        assert!(first.is_err(), "the panicking call surfaces as an error rather than hanging");

        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = pool.dispatch(plugin, JsonValue::Null, vec![]).await.expect("worker was respawned");
        assert_eq!(second.into_single().unwrap(), Value::from(1.0));
    }
}
