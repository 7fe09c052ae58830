// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The public, ergonomic handle to a running engine. Wraps the two control
//! channels and the actor's `JoinHandle`, exposing one `async fn` per
//! [`reactor_core::EngineCommand`]/[`crate::EngineQuery`] variant.

use std::sync::Arc;
use std::time::Duration;

use reactor_core::{
    EngineCommand, EngineError, EngineOptions, EngineStats, Emission, HookManager, NodeDefinition, PluginRegistry,
    Result, Value,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::engine::{self, EngineQuery};
use crate::snapshot::Snapshot;

/// A handle to a running engine actor. Cloning is not supported — an engine
/// has exactly one owner, matching the single-control-loop design; share a
/// `EngineHandle` behind an `Arc` if multiple callers need it.
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    query_tx: mpsc::Sender<EngineQuery>,
    hooks: Arc<HookManager>,
    task: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Builds and starts the engine actor. Subscribe to [`Self::hooks`] before
    /// issuing any mutation if you need to observe `NODE_ADDED`-style events
    /// from the very first call.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidConfig`] if `options` fails validation.
    pub fn new(options: EngineOptions, registry: PluginRegistry) -> Result<Self> {
        let hooks = Arc::new(HookManager::new());
        let (command_tx, query_tx, task) = engine::spawn(options, registry, hooks.clone())?;
        Ok(Self { command_tx, query_tx, hooks, task: Some(task) })
    }

    #[must_use]
    pub fn hooks(&self) -> &HookManager {
        &self.hooks
    }

    pub async fn add_node(&self, def: NodeDefinition) -> Result<()> {
        self.send_command(|reply| EngineCommand::AddNode { def, reply }).await
    }

    pub async fn update_node(&self, id: impl Into<String>, def: NodeDefinition) -> Result<()> {
        let id = id.into();
        self.send_command(|reply| EngineCommand::UpdateNode { id, def, reply }).await
    }

    pub async fn remove_node(&self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        self.send_command(|reply| EngineCommand::RemoveNode { id, reply }).await
    }

    pub async fn precompute_node(&self, id: impl Into<String>, inputs: Vec<Value>) -> Result<()> {
        let id = id.into();
        self.send_command(|reply| EngineCommand::PrecomputeNode { id, inputs, reply }).await
    }

    pub async fn clear_cache(&self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        self.send_command(|reply| EngineCommand::ClearCache { id, reply }).await
    }

    pub async fn start(&self) -> Result<()> {
        self.send_command(|reply| EngineCommand::Start { reply }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send_command(|reply| EngineCommand::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.send_command(|reply| EngineCommand::Resume { reply }).await
    }

    /// Sends the non-destructive `stop` shortcut without waiting for the
    /// actor task to exit; see [`Self::shutdown_and_wait`] to also join it.
    pub async fn stop(&self) -> Result<()> {
        self.send_command(|reply| EngineCommand::Stop { reply }).await
    }

    pub async fn subscribe(&self, id: impl Into<String>) -> Result<watch::Receiver<Emission>> {
        let (reply, rx) = oneshot::channel();
        self.query_tx
            .send(EngineQuery::Subscribe { id: id.into(), reply })
            .await
            .map_err(|_| task_gone())?;
        rx.await.map_err(|_| task_gone())?
    }

    pub async fn node_ids(&self) -> Result<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.query_tx.send(EngineQuery::NodeIds { reply }).await.map_err(|_| task_gone())?;
        rx.await.map_err(|_| task_gone())
    }

    pub async fn is_stabilized(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.query_tx.send(EngineQuery::IsStabilized { reply }).await.map_err(|_| task_gone())?;
        rx.await.map_err(|_| task_gone())
    }

    pub async fn stats(&self) -> Result<EngineStats> {
        let (reply, rx) = oneshot::channel();
        self.query_tx.send(EngineQuery::Stats { reply }).await.map_err(|_| task_gone())?;
        rx.await.map_err(|_| task_gone())
    }

    pub async fn export_state(&self) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.query_tx.send(EngineQuery::ExportState { reply }).await.map_err(|_| task_gone())?;
        rx.await.map(|boxed| *boxed).map_err(|_| task_gone())
    }

    pub async fn import_state(&self, snapshot: Snapshot) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.query_tx
            .send(EngineQuery::ImportState { snapshot: Box::new(snapshot), reply })
            .await
            .map_err(|_| task_gone())?;
        rx.await.map_err(|_| task_gone())?
    }

    /// Stops the engine and waits up to `timeout` for its actor task to
    /// exit. Returns `Ok(())` even if the wait times out — the task is
    /// still shutting down, it just didn't finish within the budget.
    pub async fn shutdown_and_wait(&mut self, timeout: Duration) -> Result<()> {
        self.stop().await?;
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(timeout, task).await.is_err() {
                tracing::warn!("engine task did not exit within the shutdown timeout");
            }
        }
        Ok(())
    }

    async fn send_command(&self, build: impl FnOnce(oneshot::Sender<Result<()>>) -> EngineCommand) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.command_tx.send(build(reply)).await.map_err(|_| task_gone())?;
        rx.await.map_err(|_| task_gone())?
    }
}

fn task_gone() -> EngineError {
    EngineError::InvalidState("engine task is no longer running".into())
}
