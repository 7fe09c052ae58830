// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The plugin value domain and the sentinel tokens that flow alongside it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A value a plugin can produce or consume.
///
/// Mirrors `serde_json::Value` in shape (null/bool/number/string/array/object)
/// but keeps arrays and objects behind an `Arc` so that fanning a value out to
/// many downstream dependents is a cheap clone rather than a deep copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Object(Arc<indexmap::IndexMap<String, Value>>),
}

impl Value {
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(Arc::from(s.into()))
    }

    #[must_use]
    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(Arc::new(items))
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical JSON encoding used for cache-key derivation and `distinctValues`
    /// structural-equality dedup. Falls back to `None` only if the value somehow
    /// contains a type `serde_json` cannot represent, which cannot happen for this enum.
    #[must_use]
    pub fn canonical_json(&self) -> Option<String> {
        serde_json::to_value(self).ok().map(|v| v.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

/// The two process-wide sentinel tokens, disjoint from any plugin value.
///
/// `INIT` seeds every node's output channel; no dependent recomputes while any
/// of its gated inputs still holds `INIT`. `SKIP` is emitted by a data node
/// that opted out of the current round and propagates to operational
/// dependents as a `SKIP_INPUT` failure instead of a compute invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Init,
    Skip,
}

impl Sentinel {
    /// The on-wire name used by the snapshot codec; must stay stable for
    /// snapshot compatibility regardless of internal representation.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Init => "INIT_NODE_EXEC",
            Self::Skip => "SKIP_NODE_EXEC",
        }
    }

    #[must_use]
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "INIT_NODE_EXEC" => Some(Self::Init),
            "SKIP_NODE_EXEC" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// What flows through a node's output channel: either a sentinel or a concrete
/// plugin value. Plugins never see this type directly — only [`Value`] — so a
/// sentinel can never leak into `compute`'s input slice by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Sentinel(Sentinel),
    Value(Value),
}

impl Emission {
    #[must_use]
    pub const fn init() -> Self {
        Self::Sentinel(Sentinel::Init)
    }

    #[must_use]
    pub const fn skip() -> Self {
        Self::Sentinel(Sentinel::Skip)
    }

    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self, Self::Sentinel(Sentinel::Init))
    }

    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Sentinel(Sentinel::Skip))
    }

    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Sentinel(_) => None,
        }
    }
}

impl From<Value> for Emission {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_wire_names_round_trip() {
        for s in [Sentinel::Init, Sentinel::Skip] {
            assert_eq!(Sentinel::from_wire_name(s.wire_name()), Some(s));
        }
        assert_eq!(Sentinel::from_wire_name("not-a-sentinel"), None);
    }

    #[test]
    fn emission_never_confuses_sentinel_and_value() {
        assert!(Emission::init().is_init());
        assert!(!Emission::init().is_skip());
        let v: Emission = Value::from(1.0).into();
        assert!(v.as_value().is_some());
        assert!(!v.is_init());
    }

    #[test]
    fn canonical_json_is_stable_for_equal_values() {
        let a = Value::array(vec![Value::from(1.0), Value::string("x")]);
        let b = Value::array(vec![Value::from(1.0), Value::string("x")]);
        assert_eq!(a.canonical_json(), b.canonical_json());
    }
}
