/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 Tether Contributors.
 */

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Marker for "no activity recorded yet".
pub(crate) const TICK_NEVER: u64 = 0;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic milliseconds since a process-local epoch. Always non-zero,
/// so [`TICK_NEVER`] stays unambiguous.
pub(crate) fn now_millis() -> u64 {
    let epoch = *EPOCH.get_or_init(Instant::now);
    Instant::now().duration_since(epoch).as_millis() as u64 + 1
}

/// Absolute deadline tick for an activity marker, if both the marker and
/// the timeout are set.
pub(crate) fn deadline(last: u64, ioto: Option<Duration>) -> Option<u64> {
    if last == TICK_NEVER {
        return None;
    }
    ioto.map(|t| last.saturating_add(t.as_millis() as u64))
}
