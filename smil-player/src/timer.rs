//! Deadline-ordered timer queue with reference-counted postponement
//!
//! Entries are kept sorted by deadline; entries sharing a deadline fire in
//! insertion order. The queue never talks to the host directly: mutators
//! return a [`Wake`] describing how the single host wake-up must change so
//! that exactly one wake is outstanding, for the earliest deadline.

use smil_common::timing::ds_to_ms;
use tracing::{debug, trace};

use crate::tree::NodeId;

/// Identifier of a scheduled timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer is for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerTag {
    /// Begin offset of a runtime
    Begin,
    /// Active duration of a runtime
    Duration,
    /// Deferred stop handling of a runtime
    Stopped,
}

/// A scheduled timer entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerInfo {
    pub id: TimerId,
    pub node: NodeId,
    pub tag: TimerTag,
    /// Absolute deadline, clock milliseconds
    pub deadline_ms: u64,
    /// Requested delay, deci-seconds
    pub delay_ds: i64,
}

/// Required change to the host wake-up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wake {
    /// (Re)arm the host wake for `delay_ms` from now
    Arm { delay_ms: u64 },
    /// Cancel the outstanding wake
    Disarm,
    /// Nothing to do
    Keep,
}

/// Postponement token.
///
/// Returned by [`TimerQueue::postpone`]; timers stay frozen until every
/// outstanding token has been handed back to `resume`.
/// Dropping a token without resuming it freezes the queue for good, which
/// debug builds report as an invariant violation.
#[must_use = "timers stay frozen until the postponement is resumed"]
#[derive(Debug)]
pub struct Postpone {
    released: bool,
}

impl Postpone {
    /// Give up a token whose queue is being torn down
    pub(crate) fn discard(mut self) {
        self.released = true;
    }
}

impl Drop for Postpone {
    fn drop(&mut self) {
        if !self.released && !std::thread::panicking() {
            invariant_violation!("Postpone token dropped without resume, timers stay frozen");
        }
    }
}

/// Sorted timer queue
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: Vec<TimerInfo>,
    next_id: u64,
    postpone_count: u32,
    postponed_at: u64,
    /// Deadline the host wake is currently armed for
    armed: Option<u64>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in firing order
    pub fn iter(&self) -> impl Iterator<Item = &TimerInfo> {
        self.entries.iter()
    }

    pub fn is_postponed(&self) -> bool {
        self.postpone_count > 0
    }

    /// Earliest deadline, `None` while postponed or empty
    pub fn next_deadline(&self) -> Option<u64> {
        if self.is_postponed() {
            return None;
        }
        self.entries.first().map(|t| t.deadline_ms)
    }

    /// Milliseconds left until `id` fires
    pub fn remaining(&self, id: TimerId, now_ms: u64) -> Option<u64> {
        let entry = self.entries.iter().find(|t| t.id == id)?;
        let now = if self.is_postponed() {
            self.postponed_at
        } else {
            now_ms
        };
        Some(entry.deadline_ms.saturating_sub(now))
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.entries.iter().any(|t| t.id == id)
    }

    /// Schedule a timer for `node` firing `delay_ds` deci-seconds after `now_ms`
    pub fn schedule(
        &mut self,
        node: NodeId,
        delay_ds: i64,
        tag: TimerTag,
        now_ms: u64,
    ) -> (TimerId, Wake) {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let base = if self.is_postponed() {
            self.postponed_at
        } else {
            now_ms
        };
        let deadline_ms = base.saturating_add(ds_to_ms(delay_ds.max(0)) as u64);
        trace!(?id, %node, ?tag, deadline_ms, "Timer scheduled");
        self.insert(TimerInfo {
            id,
            node,
            tag,
            deadline_ms,
            delay_ds,
        });
        (id, self.sync_wake(now_ms))
    }

    /// Cancel a timer. Unknown ids are ignored.
    pub fn cancel(&mut self, id: TimerId, now_ms: u64) -> Wake {
        if let Some(pos) = self.entries.iter().position(|t| t.id == id) {
            self.entries.remove(pos);
            trace!(?id, "Timer cancelled");
        }
        self.sync_wake(now_ms)
    }

    /// Remove every entry belonging to `node`
    pub fn cancel_node(&mut self, node: NodeId, now_ms: u64) -> Wake {
        self.entries.retain(|t| t.node != node);
        self.sync_wake(now_ms)
    }

    /// Take the earliest entry due at `now_ms`; entries are one-shot.
    ///
    /// Nothing is due while postponed.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<TimerInfo> {
        if self.is_postponed() || self.entries.first()?.deadline_ms > now_ms {
            return None;
        }
        Some(self.entries.remove(0))
    }

    /// Freeze all timers. Postponements nest; each returns its own token.
    pub fn postpone(&mut self, now_ms: u64) -> (Postpone, Wake) {
        if self.postpone_count == 0 {
            self.postponed_at = now_ms;
            debug!(now_ms, pending = self.entries.len(), "Timers postponed");
        }
        self.postpone_count += 1;
        (Postpone { released: false }, self.sync_wake(now_ms))
    }

    /// Hand back a postponement token.
    ///
    /// Releasing the last token shifts every deadline by the time spent
    /// frozen so relative spacing is preserved.
    pub fn resume(&mut self, mut token: Postpone, now_ms: u64) -> Wake {
        token.released = true;
        if self.postpone_count == 0 {
            return Wake::Keep;
        }
        self.postpone_count -= 1;
        if self.postpone_count == 0 {
            let frozen = now_ms.saturating_sub(self.postponed_at);
            for entry in &mut self.entries {
                entry.deadline_ms = entry.deadline_ms.saturating_add(frozen);
            }
            debug!(now_ms, frozen_ms = frozen, "Timers resumed");
        }
        self.sync_wake(now_ms)
    }

    /// Wake change needed so the host is armed for the current head
    pub fn sync_wake(&mut self, now_ms: u64) -> Wake {
        let wanted = self.next_deadline();
        if wanted == self.armed {
            return Wake::Keep;
        }
        self.armed = wanted;
        match wanted {
            Some(deadline) => Wake::Arm {
                delay_ms: deadline.saturating_sub(now_ms),
            },
            None => Wake::Disarm,
        }
    }

    /// Host reported the wake fired; it must be re-armed for the next head
    pub fn wake_consumed(&mut self) {
        self.armed = None;
    }

    fn insert(&mut self, entry: TimerInfo) {
        // after all entries with deadline <= new deadline: FIFO among equals
        let pos = self
            .entries
            .partition_point(|t| t.deadline_ms <= entry.deadline_ms);
        self.entries.insert(pos, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Node, NodeKind, NodeStore};

    fn node() -> NodeId {
        NodeStore::new().insert(Node::new(NodeKind::Par, "par"))
    }

    fn deadlines(queue: &TimerQueue) -> Vec<u64> {
        queue.iter().map(|t| t.deadline_ms).collect()
    }

    #[test]
    fn test_entries_sorted_with_fifo_ties() {
        let n = node();
        let mut q = TimerQueue::new();
        let (a, _) = q.schedule(n, 30, TimerTag::Begin, 0);
        let (b, _) = q.schedule(n, 10, TimerTag::Begin, 0);
        let (c, _) = q.schedule(n, 30, TimerTag::Duration, 0);
        let (d, _) = q.schedule(n, 0, TimerTag::Stopped, 0);

        assert_eq!(deadlines(&q), vec![0, 1000, 3000, 3000]);
        let order: Vec<_> = q.iter().map(|t| t.id).collect();
        assert_eq!(order, vec![d, b, a, c]);
    }

    #[test]
    fn test_wake_armed_only_for_new_head() {
        let n = node();
        let mut q = TimerQueue::new();
        let (_, wake) = q.schedule(n, 20, TimerTag::Begin, 0);
        assert_eq!(wake, Wake::Arm { delay_ms: 2000 });

        let (_, wake) = q.schedule(n, 50, TimerTag::Begin, 0);
        assert_eq!(wake, Wake::Keep);

        let (head, wake) = q.schedule(n, 5, TimerTag::Begin, 100);
        assert_eq!(wake, Wake::Arm { delay_ms: 500 });

        let wake = q.cancel(head, 100);
        assert_eq!(wake, Wake::Arm { delay_ms: 1900 });
    }

    #[test]
    fn test_cancel_last_disarms() {
        let n = node();
        let mut q = TimerQueue::new();
        let (id, _) = q.schedule(n, 10, TimerTag::Begin, 0);
        assert_eq!(q.cancel(id, 0), Wake::Disarm);
        assert_eq!(q.cancel(id, 0), Wake::Keep);
        assert!(q.is_empty());
    }

    #[test]
    fn test_pop_due_in_order() {
        let n = node();
        let mut q = TimerQueue::new();
        q.schedule(n, 20, TimerTag::Duration, 0);
        q.schedule(n, 10, TimerTag::Begin, 0);

        assert!(q.pop_due(999).is_none());
        let first = q.pop_due(2500).map(|t| t.tag);
        let second = q.pop_due(2500).map(|t| t.tag);

        assert_eq!(first, Some(TimerTag::Begin));
        assert_eq!(second, Some(TimerTag::Duration));
        assert!(q.is_empty());
    }

    #[test]
    fn test_fired_entry_needs_fresh_wake() {
        let n = node();
        let mut q = TimerQueue::new();
        q.schedule(n, 10, TimerTag::Begin, 0);
        q.schedule(n, 30, TimerTag::Duration, 0);

        assert!(q.pop_due(1000).is_some());
        q.wake_consumed();
        assert_eq!(q.sync_wake(1000), Wake::Arm { delay_ms: 2000 });
        assert_eq!(q.sync_wake(1000), Wake::Keep);
    }

    #[test]
    fn test_postpone_resume_shifts_deadlines() {
        let n = node();
        let mut q = TimerQueue::new();
        q.schedule(n, 10, TimerTag::Begin, 0);
        q.schedule(n, 25, TimerTag::Duration, 0);

        let (token, wake) = q.postpone(500);
        assert_eq!(wake, Wake::Disarm);
        assert!(q.pop_due(5000).is_none());
        assert_eq!(q.next_deadline(), None);

        let wake = q.resume(token, 3500);
        assert_eq!(deadlines(&q), vec![4000, 5500]);
        assert_eq!(wake, Wake::Arm { delay_ms: 500 });
    }

    #[test]
    fn test_nested_postpone_needs_every_token() {
        let n = node();
        let mut q = TimerQueue::new();
        q.schedule(n, 10, TimerTag::Begin, 0);

        let (outer, _) = q.postpone(0);
        let (inner, _) = q.postpone(200);
        let _ = q.resume(inner, 400);
        assert!(q.is_postponed());
        assert_eq!(deadlines(&q), vec![1000]);

        let _ = q.resume(outer, 600);
        assert!(!q.is_postponed());
        assert_eq!(deadlines(&q), vec![1600]);
    }

    #[test]
    fn test_schedule_while_postponed_counts_from_freeze() {
        let n = node();
        let mut q = TimerQueue::new();
        let (token, _) = q.postpone(1000);
        let (id, wake) = q.schedule(n, 10, TimerTag::Begin, 1800);
        assert_eq!(wake, Wake::Keep);
        assert_eq!(q.remaining(id, 5000), Some(1000));

        let _ = q.resume(token, 3000);
        assert_eq!(deadlines(&q), vec![4000]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "dropped without resume")]
    fn test_dropped_token_is_reported() {
        let mut q = TimerQueue::new();
        let (token, _) = q.postpone(0);
        drop(token);
    }

    #[test]
    fn test_discarded_token_is_silent() {
        let mut q = TimerQueue::new();
        let (token, _) = q.postpone(0);
        token.discard();
        assert!(q.is_postponed());
    }
}
