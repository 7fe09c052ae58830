// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Best-effort config sanitisation (§4.7.7). Findings are logged by the
//! caller and never reject a definition — the original config is always
//! what the node runs with.

use serde_json::Value as JsonValue;

const MAX_STRING_LEN: usize = 10_000;

/// Scans `config` for nesting past `max_depth`, oversized strings, and
/// control characters in object keys. Returns one message per issue found.
#[must_use]
pub fn scan_for_issues(config: &JsonValue, max_depth: usize) -> Vec<String> {
    let mut issues = Vec::new();
    scan(config, 0, max_depth, &mut issues);
    issues
}

fn scan(value: &JsonValue, depth: usize, max_depth: usize, issues: &mut Vec<String>) {
    if depth > max_depth {
        issues.push(format!("config nesting exceeds maxDepth={max_depth}"));
        return;
    }
    match value {
        JsonValue::String(s) if s.len() > MAX_STRING_LEN => {
            issues.push(format!("string value exceeds {MAX_STRING_LEN} bytes"));
        },
        JsonValue::Array(items) => {
            for item in items {
                scan(item, depth + 1, max_depth, issues);
            }
        },
        JsonValue::Object(map) => {
            for (key, v) in map {
                if key.chars().any(char::is_control) {
                    issues.push(format!("config key {key:?} contains control characters"));
                }
                scan(v, depth + 1, max_depth, issues);
            }
        },
        _ => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_nesting_past_max_depth() {
        let config = serde_json::json!({"a": {"b": {"c": 1}}});
        assert!(scan_for_issues(&config, 5).is_empty());
        let issues = scan_for_issues(&config, 1);
        assert!(issues.iter().any(|i| i.contains("maxDepth")));
    }

    #[test]
    fn well_formed_config_has_no_issues() {
        let config = serde_json::json!({"a": 1, "b": [1, 2, 3]});
        assert!(scan_for_issues(&config, 10).is_empty());
    }
}
