// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Process-wide fault counters, surfaced through the operator interface.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Stats {
    pub sessions_accepted: AtomicU64,
    pub sessions_closed: AtomicU64,
    pub registrations_rejected: AtomicU64,
    pub malformed_frames: AtomicU64,
    pub panics: AtomicU64,
}

impl Stats {
    pub fn new() -> Stats {
        Stats::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sessions_accepted: self.sessions_accepted.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            registrations_rejected: self.registrations_rejected.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }

    pub fn incr_panics(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StatsSnapshot {
    pub sessions_accepted: u64,
    pub sessions_closed: u64,
    pub registrations_rejected: u64,
    pub malformed_frames: u64,
    pub panics: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let s = Stats::new();
        assert_eq!(s.snapshot().panics, 0);
    }

    #[test]
    fn incr_panics_is_observable_in_snapshot() {
        let s = Stats::new();
        s.incr_panics();
        s.incr_panics();
        assert_eq!(s.snapshot().panics, 2);
    }
}
