// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Loading a graph definition file (§6.1): `{ options?, nodes: [NodeDefinition] }`.

use std::path::Path;

use reactor_core::{EngineOptions, NodeDefinition};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub options: EngineOptions,
    pub nodes: Vec<NodeDefinition>,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub fn load(path: impl AsRef<Path>) -> Result<GraphFile, BoxError> {
    let contents = std::fs::read_to_string(path.as_ref())
        .map_err(|e| format!("failed to read {}: {e}", path.as_ref().display()))?;
    let graph: GraphFile = serde_json::from_str(&contents)
        .map_err(|e| format!("failed to parse {} as a graph file: {e}", path.as_ref().display()))?;
    Ok(graph)
}
