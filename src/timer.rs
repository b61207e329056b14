//! Cancellable scheduled tasks for the UI thread.
//!
//! Deferred work (fade-out completion, auto-hide, flash) is not run on
//! sleeping threads.  Instead each task is parked in a [`TimerQueue`] owned
//! by the UI thread; the main loop sleeps on its event channel until
//! [`TimerQueue::next_deadline`] and then drains whatever is due.  Tasks fire
//! in deadline order, and in scheduling order among equal deadlines.

use crate::lifecycle::Ticket;
use log::warn;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Deadline used when `now + delay` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Identifies a scheduled task so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Deferred operations the shell schedules.
///
/// Every variant carries the ticket captured at scheduling time; the
/// receiving controller drops the task when the ticket is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    /// Physically remove a faded-out live dock slot.
    DockRemove { app_id: String, ticket: Ticket },
    /// End a dock reveal flash.
    DockFlashEnd { ticket: Ticket },
    /// A notification's display timeout elapsed.
    NotificationExpire { slot: usize, ticket: Ticket },
    /// A notification's fade-out finished.
    NotificationFinalize { slot: usize, ticket: Ticket },
    /// Hide the on-screen display.
    OsdHide { ticket: Ticket },
}

/// A deadline-ordered set of pending tasks.
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    pending: BTreeMap<(Instant, u64), T>,
    deadlines: HashMap<u64, Instant>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Schedule `task` to become due at `now + delay`.
    pub fn schedule(&mut self, now: Instant, delay: Duration, task: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let deadline = now.checked_add(delay).unwrap_or_else(|| {
            warn!("timer delay {:?} out of range, clamping", delay);
            now.checked_add(FAR_FUTURE).unwrap_or(now)
        });
        self.pending.insert((deadline, id), task);
        self.deadlines.insert(id, deadline);
        TimerHandle(id)
    }

    /// Cancel a scheduled task, returning it if it had not fired yet.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        let deadline = self.deadlines.remove(&handle.0)?;
        self.pending.remove(&(deadline, handle.0))
    }

    /// Whether `handle` is still waiting.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    /// Earliest deadline among pending tasks.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return every task due at or before `now`, in order.
    pub fn pop_due(&mut self, now: Instant) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(entry) = self.pending.first_entry() {
            let (deadline, id) = *entry.key();
            if deadline > now {
                break;
            }
            due.push(entry.remove());
            self.deadlines.remove(&id);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// The shell's timer queue together with the current time.
///
/// Controllers receive `&mut Scheduler` so they can schedule and cancel
/// deferred work without knowing where "now" comes from; the shell advances
/// [`now`](Scheduler::now) before dispatching each event.
#[derive(Debug)]
pub struct Scheduler {
    now: Instant,
    queue: TimerQueue<Deferred>,
}

impl Scheduler {
    pub fn new(now: Instant) -> Self {
        Self {
            now,
            queue: TimerQueue::new(),
        }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    /// Advance the clock.  Time never goes backwards.
    pub fn set_now(&mut self, now: Instant) {
        if now > self.now {
            self.now = now;
        }
    }

    pub fn schedule(&mut self, delay: Duration, task: Deferred) -> TimerHandle {
        self.queue.schedule(self.now, delay, task)
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.queue.cancel(handle).is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.next_deadline()
    }

    /// Tasks due at the current time.
    pub fn pop_due(&mut self) -> Vec<Deferred> {
        self.queue.pop_due(self.now)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fires_in_deadline_order() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(t0, ms(300), "c");
        q.schedule(t0, ms(100), "a");
        q.schedule(t0, ms(200), "b");
        assert_eq!(q.next_deadline(), Some(t0 + ms(100)));
        assert_eq!(q.pop_due(t0 + ms(250)), vec!["a", "b"]);
        assert_eq!(q.pop_due(t0 + ms(300)), vec!["c"]);
        assert!(q.is_empty());
    }

    #[test]
    fn huge_delay_is_clamped() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        let handle = q.schedule(t0, Duration::MAX, "never");
        q.schedule(t0, ms(5), "soon");
        assert!(q.next_deadline().is_some_and(|d| d == t0 + ms(5)));
        assert_eq!(q.pop_due(t0 + ms(5)), vec!["soon"]);
        assert!(q.pop_due(t0 + Duration::from_secs(3600)).is_empty());
        assert!(q.is_pending(handle));
        assert_eq!(q.cancel(handle), Some("never"));
    }

    #[test]
    fn equal_deadlines_are_fifo() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(t0, ms(10), 1);
        q.schedule(t0, ms(10), 2);
        q.schedule(t0, ms(10), 3);
        assert_eq!(q.pop_due(t0 + ms(10)), vec![1, 2, 3]);
    }

    #[test]
    fn cancel_removes_task() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        let a = q.schedule(t0, ms(10), "a");
        q.schedule(t0, ms(20), "b");
        assert_eq!(q.cancel(a), Some("a"));
        assert!(!q.is_pending(a));
        assert_eq!(q.cancel(a), None);
        assert_eq!(q.pop_due(t0 + ms(50)), vec!["b"]);
    }

    #[test]
    fn nothing_due_early() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(t0, ms(10), ());
        assert!(q.pop_due(t0 + ms(9)).is_empty());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn scheduler_clock_is_monotonic() {
        let t0 = Instant::now();
        let mut s = Scheduler::new(t0 + ms(100));
        s.set_now(t0);
        assert_eq!(s.now(), t0 + ms(100));
    }
}
