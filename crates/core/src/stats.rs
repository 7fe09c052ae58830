// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Engine-wide statistics and the bounded error log (§3, §4.7.8, §5).

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// The error log never grows past this many entries; the oldest entries are
/// dropped first so the log always reflects the most recent failures.
pub const ERROR_LOG_CAPACITY: usize = 1000;

/// One entry in the bounded error log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub node_id: Option<String>,
    pub message: String,
    pub timestamp_ms: u64,
}

/// Engine-wide counters plus the bounded, time-queryable error log used to
/// drive `ERROR_THRESHOLD_EXCEEDED` (§4.7.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub engine_id: String,
    pub start_time_ms: u64,
    pub compute_count: u64,
    pub error_count: u64,
    #[serde(skip)]
    pub error_log: VecDeque<ErrorLogEntry>,
}

impl EngineStats {
    #[must_use]
    pub fn new(engine_id: impl Into<String>) -> Self {
        Self {
            engine_id: engine_id.into(),
            start_time_ms: now_ms(),
            compute_count: 0,
            error_count: 0,
            error_log: VecDeque::with_capacity(ERROR_LOG_CAPACITY),
        }
    }

    pub const fn record_compute(&mut self) {
        self.compute_count += 1;
    }

    /// Records a compute/worker failure, trimming the log to
    /// [`ERROR_LOG_CAPACITY`]. `silent` suppresses nothing here — it only
    /// controls whether the engine additionally logs via `tracing` (§7).
    pub fn record_error(&mut self, node_id: Option<String>, message: impl Into<String>) {
        self.error_count += 1;
        if self.error_log.len() >= ERROR_LOG_CAPACITY {
            self.error_log.pop_front();
        }
        self.error_log.push_back(ErrorLogEntry { node_id, message: message.into(), timestamp_ms: now_ms() });
    }

    /// Number of error-log entries whose timestamp falls within `window_ms` of now.
    /// Used to evaluate `errorThreshold` over `errorTimeWindow`.
    #[must_use]
    pub fn errors_within(&self, window_ms: u64) -> usize {
        let cutoff = now_ms().saturating_sub(window_ms);
        self.error_log.iter().filter(|e| e.timestamp_ms >= cutoff).count()
    }

    #[must_use]
    pub fn uptime_ms(&self) -> u64 {
        now_ms().saturating_sub(self.start_time_ms)
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_log_is_bounded() {
        let mut stats = EngineStats::new("e1");
        for i in 0..(ERROR_LOG_CAPACITY + 10) {
            stats.record_error(None, format!("err {i}"));
        }
        assert_eq!(stats.error_log.len(), ERROR_LOG_CAPACITY);
        assert_eq!(stats.error_count as usize, ERROR_LOG_CAPACITY + 10);
        assert!(stats.error_log.front().unwrap().message.contains("err 10"));
    }

    #[test]
    fn errors_within_window_counts_recent_entries() {
        let mut stats = EngineStats::new("e1");
        stats.record_error(Some("n1".into()), "boom");
        assert_eq!(stats.errors_within(60_000), 1);
        assert_eq!(stats.errors_within(0), 1);
    }
}
