// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Control-plane messages accepted by the engine's actor loop (§4.7.6, §5).

use tokio::sync::oneshot;

use crate::error::Result;
use crate::node::NodeDefinition;
use crate::value::Value;

/// One command sent to the engine's single control loop. Every variant carries
/// a reply channel so a mutation's structural failure (`DUPLICATE_ID`,
/// `CYCLE_DETECTED`, ...) surfaces synchronously to the caller, matching
/// "structural and lifecycle errors surface to the caller immediately" (§7).
pub enum EngineCommand {
    AddNode { def: NodeDefinition, reply: oneshot::Sender<Result<()>> },
    UpdateNode { id: String, def: NodeDefinition, reply: oneshot::Sender<Result<()>> },
    RemoveNode { id: String, reply: oneshot::Sender<Result<()>> },
    /// Computes and writes through to cache without touching the node's output channel.
    PrecomputeNode { id: String, inputs: Vec<Value>, reply: oneshot::Sender<Result<()>> },
    ClearCache { id: String, reply: oneshot::Sender<Result<()>> },
    Start { reply: oneshot::Sender<Result<()>> },
    Pause { reply: oneshot::Sender<Result<()>> },
    Resume { reply: oneshot::Sender<Result<()>> },
    /// Non-destructive shortcut: cancels every pipeline and active compute, then
    /// transitions `STOPPING → DESTROYED`.
    Stop { reply: oneshot::Sender<Result<()>> },
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AddNode { .. } => "AddNode",
            Self::UpdateNode { .. } => "UpdateNode",
            Self::RemoveNode { .. } => "RemoveNode",
            Self::PrecomputeNode { .. } => "PrecomputeNode",
            Self::ClearCache { .. } => "ClearCache",
            Self::Start { .. } => "Start",
            Self::Pause { .. } => "Pause",
            Self::Resume { .. } => "Resume",
            Self::Stop { .. } => "Stop",
        };
        f.write_str(name)
    }
}
