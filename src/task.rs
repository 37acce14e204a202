// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Per-session deadline scheduler used for the auth timer, keepalive
//! watchdog, and any other delayed one-shot work a session needs.
//!
//! Not thread safe: a `TaskRunner` belongs to exactly one session thread,
//! same as the task list it is modeled on.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Identity used to find a previously scheduled task: same callback tag
/// and same associated data means "this is the same task", so scheduling
/// it again reschedules rather than duplicates.
pub type TaskId = (u32, u64);

struct Scheduled {
    when: Instant,
    id: TaskId,
}

impl Eq for Scheduled {}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest deadline sorts first.
        other.when.cmp(&self.when)
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A deadline-ordered queue of pending tasks, keyed by `TaskId` so a
/// caller can reschedule or cancel one without holding on to a handle.
pub struct TaskRunner {
    heap: BinaryHeap<Scheduled>,
    live: Vec<TaskId>,
}

impl TaskRunner {
    pub fn new() -> TaskRunner {
        TaskRunner { heap: BinaryHeap::new(), live: Vec::new() }
    }

    /// Schedule `id` to fire after `delay`. If `id` is already scheduled,
    /// it is rescheduled to the new deadline; the old entry is left in the
    /// heap and discarded lazily when it is popped.
    pub fn add(&mut self, id: TaskId, delay: Duration) {
        self.remove(id);
        self.live.push(id);
        self.heap.push(Scheduled { when: Instant::now() + delay, id });
    }

    /// Unschedule `id`. Not an error if it was never scheduled.
    pub fn remove(&mut self, id: TaskId) {
        self.live.retain(|&x| x != id);
    }

    fn is_live(&self, id: TaskId) -> bool {
        self.live.contains(&id)
    }

    /// Pop and return every task whose deadline has passed, removing it
    /// from the live set. Lazily discards stale heap entries left behind
    /// by `add` rescheduling an id that was already pending.
    pub fn due(&mut self) -> Vec<TaskId> {
        let now = Instant::now();
        let mut fired = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.when > now {
                break;
            }
            let entry = self.heap.pop().unwrap();
            if self.is_live(entry.id) {
                self.remove(entry.id);
                fired.push(entry.id);
            }
        }
        fired
    }

    /// Time until the next live deadline, or `None` if nothing is scheduled.
    pub fn next_deadline(&mut self) -> Option<Duration> {
        loop {
            let top = self.heap.peek()?;
            if self.is_live(top.id) {
                let now = Instant::now();
                return Some(top.when.saturating_duration_since(now));
            }
            self.heap.pop();
        }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        TaskRunner::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn fires_after_delay() {
        let mut r = TaskRunner::new();
        r.add((1, 0), Duration::from_millis(5));
        assert!(r.due().is_empty());
        sleep(Duration::from_millis(15));
        assert_eq!(r.due(), vec![(1, 0)]);
    }

    #[test]
    fn readding_reschedules_instead_of_duplicating() {
        let mut r = TaskRunner::new();
        r.add((1, 0), Duration::from_millis(5));
        r.add((1, 0), Duration::from_secs(60));
        sleep(Duration::from_millis(15));
        assert!(r.due().is_empty());
    }

    #[test]
    fn remove_cancels_pending_task() {
        let mut r = TaskRunner::new();
        r.add((1, 0), Duration::from_millis(5));
        r.remove((1, 0));
        sleep(Duration::from_millis(15));
        assert!(r.due().is_empty());
    }

    #[test]
    fn next_deadline_reports_nothing_when_empty() {
        let mut r = TaskRunner::new();
        assert!(r.next_deadline().is_none());
    }
}
