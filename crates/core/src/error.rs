// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for the reactive engine.
//!
//! This module provides a hierarchy of error types for better error handling
//! and programmatic error inspection. Structural and lifecycle errors surface to
//! the caller immediately; compute and worker errors are confined to the node
//! that raised them (see [`EngineError::is_node_local`]) and are reported
//! through a hook instead of aborting the operation that triggered them.

use thiserror::Error;

/// Main error type for engine operations.
///
/// Each variant categorizes one failure mode from the error design: graph
/// structure, lifecycle, registry, or node-local compute/worker failures.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operation attempted in an incompatible lifecycle state, e.g. `addNode`
    /// on a destroyed engine or `pause` while not running.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A node with this id already exists.
    #[error("duplicate node id: {0}")]
    DuplicateId(String),

    /// No node with this id exists.
    #[error("missing node: {0}")]
    MissingNode(String),

    /// A node's `inputs` list names a node id that doesn't exist.
    #[error("node {node_id} declares missing input {input_id}")]
    MissingInput { node_id: String, input_id: String },

    /// Adding or updating a node would create a cycle in the dependency relation.
    #[error("cycle detected at node {0}")]
    CycleDetected(String),

    /// No plugin is registered for this type tag.
    #[error("unknown plugin type: {0}")]
    UnknownType(String),

    /// A plugin is already registered under this type tag.
    #[error("duplicate plugin type: {0}")]
    DuplicateType(String),

    /// Structural validation of a node definition failed (missing id, wrong type, ...).
    #[error("invalid node definition: {0}")]
    InvalidDefinition(String),

    /// Engine options failed validation at construction time.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// An operational node observed `SKIP` among its inputs. Handled internally by
    /// the engine and never surfaced past the pipeline that raised it.
    #[error("node {0} observed a skipped input")]
    SkipInput(String),

    /// A plugin's compute failed, or its lazy sequence produced an error.
    /// Always wraps the underlying error rather than forwarding it raw.
    #[error("compute failed for node {node_id}: {source}")]
    ComputeError {
        node_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A worker-pool task exceeded `workerTimeout`. Treated identically to
    /// [`EngineError::ComputeError`] by everything downstream of the pipeline.
    #[error("compute for node {0} exceeded its worker timeout")]
    Timeout(String),

    /// Snapshot encoding failed (typically a cyclic config); a fallback snapshot
    /// with the bounded error log cleared was produced instead.
    #[error("snapshot fell back to a partial encoding: {0}")]
    SerializationWarning(String),

    /// I/O error loading or writing a graph/snapshot file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding/encoding error for a graph or snapshot file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Builds a [`EngineError::ComputeError`], always wrapping `source` rather
    /// than forwarding a raw plugin error (design note (b): always wrap).
    pub fn compute(node_id: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::ComputeError { node_id: node_id.into(), source: Box::new(source) }
    }

    /// `true` for errors confined to a single node's compute; these never abort
    /// the mutation that triggered the pipeline and are instead reported via a hook.
    #[must_use]
    pub const fn is_node_local(&self) -> bool {
        matches!(self, Self::SkipInput(_) | Self::ComputeError { .. } | Self::Timeout(_))
    }

    /// The node id associated with this error, if any.
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateId(id)
            | Self::MissingNode(id)
            | Self::CycleDetected(id)
            | Self::SkipInput(id)
            | Self::Timeout(id)
            | Self::ComputeError { node_id: id, .. } => Some(id),
            Self::MissingInput { node_id, .. } => Some(node_id),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_error_wraps_source_and_is_node_local() {
        let source = std::io::Error::other("boom");
        let err = EngineError::compute("n1", source);
        assert!(err.is_node_local());
        assert_eq!(err.to_string(), "compute failed for node n1: boom");
        assert_eq!(err.node_id(), Some("n1"));
    }

    #[test]
    fn structural_errors_are_not_node_local() {
        assert!(!EngineError::DuplicateId("a".into()).is_node_local());
        assert!(!EngineError::CycleDetected("a".into()).is_node_local());
        assert!(!EngineError::InvalidConfig("bad".into()).is_node_local());
    }

    #[test]
    fn missing_input_reports_the_node_id_not_the_missing_one() {
        let err = EngineError::MissingInput { node_id: "n1".into(), input_id: "ghost".into() };
        assert_eq!(err.node_id(), Some("n1"));
        assert!(err.to_string().contains("ghost"));
    }
}
