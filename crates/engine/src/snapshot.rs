// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Snapshot Codec (C8): encodes/decodes engine state, stripping runtime
//! fields and translating sentinels to their on-wire names.

use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use reactor_core::{EngineOptions, EngineStats, Emission, Sentinel, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One node's exported state (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub inputs: Vec<String>,
    pub config: JsonValue,
    #[serde(rename = "currentValue")]
    pub current_value: JsonValue,
    #[serde(rename = "errorCount")]
    pub error_count: u64,
    #[serde(rename = "cacheData", skip_serializing_if = "Option::is_none")]
    pub cache_data: Option<JsonValue>,
}

/// The full exported engine state. Always reports `state = "INITIALIZED"`
/// (§4.8) regardless of the engine's lifecycle at export time, so a replay
/// always starts deterministically from `importState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "engineId")]
    pub engine_id: String,
    #[serde(rename = "createdAt")]
    pub created_at_ms: u64,
    #[serde(rename = "exportedAt")]
    pub exported_at_ms: u64,
    pub state: String,
    pub options: EngineOptions,
    pub stats: EngineStats,
    pub nodes: IndexMap<String, NodeSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
    /// The recorded lifecycle at export time, used by `replay` to decide
    /// whether to resume a running engine. Not part of the normative `state`
    /// field (which is always `INITIALIZED`), carried alongside it.
    #[serde(rename = "recordedLifecycle")]
    pub recorded_lifecycle: String,
}

/// Translates a sentinel/value pair into its on-wire JSON representation.
#[must_use]
pub fn encode_emission(emission: &Emission) -> JsonValue {
    match emission {
        Emission::Sentinel(s) => JsonValue::String(s.wire_name().to_string()),
        Emission::Value(v) => serde_json::to_value(v).unwrap_or(JsonValue::Null),
    }
}

/// Inverts [`encode_emission`]; a bare string matching a sentinel wire name
/// decodes back to that sentinel, everything else decodes as a concrete value.
#[must_use]
pub fn decode_emission(json: &JsonValue) -> Emission {
    if let JsonValue::String(s) = json {
        if let Some(sentinel) = Sentinel::from_wire_name(s) {
            return Emission::Sentinel(sentinel);
        }
    }
    serde_json::from_value::<Value>(json.clone()).map_or_else(|_| Emission::Sentinel(Sentinel::Init), Emission::Value)
}

#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_round_trips_through_wire_name() {
        let encoded = encode_emission(&Emission::init());
        assert_eq!(encoded, JsonValue::String("INIT_NODE_EXEC".to_string()));
        assert_eq!(decode_emission(&encoded), Emission::init());
    }

    #[test]
    fn value_round_trips_through_json() {
        let emission = Emission::from(Value::from(30.0));
        let encoded = encode_emission(&emission);
        assert_eq!(decode_emission(&encoded), emission);
    }
}
