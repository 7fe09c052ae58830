// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Engine lifecycle state machine.
//!
//! ```text
//!            ┌──────────────┐
//!            │ INITIALIZED  │
//!            └──────┬───────┘
//!                   │ start()
//!                   ▼
//!   resume()  ┌──────────────┐
//!  ┌──────────┤   RUNNING    │
//!  │          └──────┬───────┘
//!  ▼                 │ pause()          stop()/destroy()
//! ┌────────┐         │                  ┌──────────┐   ┌───────────┐
//! │ PAUSED │         └─────────────────▶│ STOPPING ├──▶│ DESTROYED │
//! └────┬───┘                            └──────────┘   └───────────┘
//!      │ stop()/destroy()                                    ▲
//!      └──────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// The engine's lifecycle state. `start` is legal only from `Initialized` or
/// `Paused`; `pause` only from `Running`; `resume` only from `Paused`;
/// destruction is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineLifecycle {
    Initialized,
    Running,
    Paused,
    Stopping,
    Destroyed,
}

impl EngineLifecycle {
    /// Whether `start()` is legal from this state.
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::Initialized | Self::Paused)
    }

    #[must_use]
    pub const fn can_pause(self) -> bool {
        matches!(self, Self::Running)
    }

    #[must_use]
    pub const fn can_resume(self) -> bool {
        matches!(self, Self::Paused)
    }

    #[must_use]
    pub const fn is_destroyed(self) -> bool {
        matches!(self, Self::Destroyed)
    }

    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for EngineLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initialized => "INITIALIZED",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Stopping => "STOPPING",
            Self::Destroyed => "DESTROYED",
        };
        f.write_str(s)
    }
}

/// Whether a data node execution mode treats a single skip as a stabilisation
/// signal (`AsyncExec`) or requires the whole graph to settle (`SyncExec`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataNodeExecutionMode {
    SyncExecMode,
    AsyncExecMode,
}

impl Default for DataNodeExecutionMode {
    fn default() -> Self {
        Self::SyncExecMode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_initialized_and_paused_can_start() {
        assert!(EngineLifecycle::Initialized.can_start());
        assert!(EngineLifecycle::Paused.can_start());
        assert!(!EngineLifecycle::Running.can_start());
        assert!(!EngineLifecycle::Destroyed.can_start());
    }

    #[test]
    fn pause_resume_are_mutually_exclusive_preconditions() {
        assert!(EngineLifecycle::Running.can_pause());
        assert!(!EngineLifecycle::Paused.can_pause());
        assert!(EngineLifecycle::Paused.can_resume());
        assert!(!EngineLifecycle::Running.can_resume());
    }

    #[test]
    fn destroyed_is_terminal() {
        assert!(!EngineLifecycle::Destroyed.can_start());
        assert!(!EngineLifecycle::Destroyed.can_pause());
        assert!(!EngineLifecycle::Destroyed.can_resume());
    }
}
