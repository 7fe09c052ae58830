// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Best-effort, never-fatal resident-set-size probe used to evaluate
//! `memoryThreshold` (§4.7.8 addendum). Reports `0` on platforms where the
//! read fails, logged once at `debug` level.

use std::sync::atomic::{AtomicBool, Ordering};

static LOGGED_FAILURE: AtomicBool = AtomicBool::new(false);

/// Reads the process's resident set size in bytes.
#[must_use]
pub fn resident_set_bytes() -> u64 {
    read_linux_statm().unwrap_or_else(|| {
        if !LOGGED_FAILURE.swap(true, Ordering::Relaxed) {
            tracing::debug!("memory probe unavailable on this platform; reporting 0");
        }
        0
    })
}

/// Every Linux target reactor-engine ships on uses a 4096-byte page; avoids an
/// `unsafe` `sysconf` call (and a `libc` dependency) for a single constant.
const ASSUMED_PAGE_SIZE_BYTES: u64 = 4096;

#[cfg(target_os = "linux")]
fn read_linux_statm() -> Option<u64> {
    let contents = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = contents.split_whitespace().nth(1)?.parse().ok()?;
    Some(resident_pages * ASSUMED_PAGE_SIZE_BYTES)
}

#[cfg(not(target_os = "linux"))]
fn read_linux_statm() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_never_panics() {
        let _ = resident_set_bytes();
    }
}
