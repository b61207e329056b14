//! Notification popups.
//!
//! A fixed number of popup slots (`max_notifications`).  When all are taken
//! further notifications wait in a FIFO queue and are promoted, one per freed
//! slot, in arrival order.  A notification that replaces an earlier one
//! (`replaces_id`) takes over that notification's slot directly, bypassing the
//! queue, and cancels its fade-out if one is running.

use crate::lifecycle::{ItemState, Lifecycle, Ticket};
use crate::slots::{Growth, SlotFlags, SlotId, SlotSet};
use crate::timer::{Deferred, Scheduler};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    Critical,
}

fn default_timeout() -> i32 {
    -1
}

/// A desktop notification as delivered by the notification daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u32,
    #[serde(default)]
    pub app_name: String,
    pub summary: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub app_icon: String,
    /// Id of the notification this one replaces, `0` for none.
    #[serde(default)]
    pub replaces_id: u32,
    /// Milliseconds; `-1` means the server default, `0` never expires.
    #[serde(default = "default_timeout")]
    pub timeout: i32,
    #[serde(default)]
    pub urgency: Urgency,
}

impl Notification {
    /// How long the popup stays up before fading, `None` for never.
    pub fn effective_timeout(&self, default: Duration) -> Option<Duration> {
        match self.timeout {
            0 => None,
            t if t > 0 => Some(Duration::from_millis(t as u64)),
            _ if self.urgency == Urgency::Critical => None,
            _ => Some(default),
        }
    }

    /// The id whose slot this notification should occupy.
    fn target_id(&self) -> u32 {
        if self.replaces_id != 0 {
            self.replaces_id
        } else {
            self.id
        }
    }
}

/// What [`NotificationStack::notify`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Bound to a free slot.
    Shown(SlotId),
    /// Took over the slot of the notification it replaces.
    Replaced(SlotId),
    /// Waiting for a slot.
    Queued,
}

/// One visible popup, for the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationView {
    pub slot: usize,
    pub id: u32,
    pub app_name: String,
    pub summary: String,
    pub body: String,
    pub fading: bool,
}

#[derive(Debug)]
struct Entry {
    notification: Notification,
    lifecycle: Lifecycle,
}

#[derive(Debug)]
pub struct NotificationStack {
    slots: SlotSet<u32>,
    entries: HashMap<SlotId, Entry>,
    /// Bound slots, top to bottom.
    order: VecDeque<SlotId>,
    queue: VecDeque<Notification>,
    /// Last ticket issued in each freed slot; the next occupant continues
    /// from it.
    retired: HashMap<SlotId, Ticket>,
    from_bottom: bool,
    timeout: Duration,
    fade_out: Duration,
}

impl NotificationStack {
    pub fn new(config: &crate::config::NotificationConfig) -> Self {
        let max = config.max_notifications.max(1);
        Self {
            slots: SlotSet::dynamic(max, Growth::Fixed),
            entries: HashMap::new(),
            order: VecDeque::new(),
            queue: VecDeque::new(),
            retired: HashMap::new(),
            from_bottom: config.new_notification_from_bottom,
            timeout: Duration::from_millis(config.timeout_ms),
            fade_out: Duration::from_millis(config.fade_out_ms),
        }
    }

    pub fn shown_count(&self) -> usize {
        self.entries.len()
    }

    pub fn queued(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    pub fn slot_of(&self, id: u32) -> Option<SlotId> {
        self.slots.slot_of(&id)
    }

    pub fn state_of(&self, id: u32) -> Option<ItemState> {
        let slot = self.slots.slot_of(&id)?;
        self.entries.get(&slot).map(|e| e.lifecycle.state())
    }

    /// Visible popups, top to bottom.
    pub fn view(&self) -> Vec<NotificationView> {
        self.order
            .iter()
            .filter_map(|slot| {
                let entry = self.entries.get(slot)?;
                let n = &entry.notification;
                Some(NotificationView {
                    slot: slot.0,
                    id: n.id,
                    app_name: n.app_name.clone(),
                    summary: n.summary.clone(),
                    body: n.body.clone(),
                    fading: entry.lifecycle.state() == ItemState::FadingOut,
                })
            })
            .collect()
    }

    /// Mark every updated popup as rendered.
    pub fn settle(&mut self) {
        for entry in self.entries.values_mut() {
            entry.lifecycle.settle();
        }
    }

    /// A notification arrived.
    pub fn notify(&mut self, notification: Notification, sched: &mut Scheduler) -> NotifyOutcome {
        let id = notification.id;
        let target = notification.target_id();

        // An id already on screen keeps its own slot, whatever it claims to
        // replace.
        let shown = [id, target]
            .into_iter()
            .find_map(|key| self.slots.slot_of(&key).map(|slot| (slot, key)));
        if let Some((slot, old_id)) = shown {
            self.replace(slot, old_id, notification, sched);
            return NotifyOutcome::Replaced(slot);
        }

        if self.queue.iter().any(|q| q.id == target) {
            debug!("notification {} replaces queued {}", id, target);
            self.queue.retain(|q| q.id == target || q.id != id);
            if let Some(queued) = self.queue.iter_mut().find(|q| q.id == target) {
                *queued = notification;
            }
            return NotifyOutcome::Queued;
        }

        match self.bind(notification.clone(), sched) {
            Some(slot) => NotifyOutcome::Shown(slot),
            None => {
                debug!("no free popup slot, queueing {}", notification.id);
                self.queue.push_back(notification);
                NotifyOutcome::Queued
            }
        }
    }

    /// The sender (or the user, by id) closed a notification.
    pub fn close(&mut self, id: u32, sched: &mut Scheduler) {
        if let Some(slot) = self.slots.slot_of(&id) {
            self.start_fade(slot, sched);
            return;
        }
        let before = self.queue.len();
        self.queue.retain(|q| q.id != id);
        if self.queue.len() == before {
            debug!("close: notification {} unknown", id);
        }
    }

    /// The user dismissed the popup in `slot`.
    pub fn dismiss(&mut self, slot: usize, sched: &mut Scheduler) {
        let slot = SlotId(slot);
        if !self.entries.contains_key(&slot) {
            debug!("dismiss: slot {} is empty", slot.0);
            return;
        }
        self.start_fade(slot, sched);
    }

    /// Display timeout elapsed.
    pub fn expire(&mut self, slot: usize, ticket: Ticket, sched: &mut Scheduler) {
        let slot = SlotId(slot);
        let current = self
            .entries
            .get(&slot)
            .is_some_and(|e| e.lifecycle.is_current(ticket));
        if !current {
            debug!("stale expiry for slot {} ({})", slot.0, ticket.value());
            return;
        }
        self.start_fade(slot, sched);
    }

    /// Fade-out elapsed: free the slot and promote the head of the queue.
    ///
    /// Returns the id of the promoted notification.
    pub fn finalize(&mut self, slot: usize, ticket: Ticket, sched: &mut Scheduler) -> Option<u32> {
        let slot = SlotId(slot);
        let finished = self
            .entries
            .get_mut(&slot)
            .is_some_and(|e| e.lifecycle.finish_fade(ticket));
        if !finished {
            debug!("stale finalize for slot {} ({})", slot.0, ticket.value());
            return None;
        }
        let entry = self.entries.remove(&slot)?;
        self.slots.release(&entry.notification.id);
        self.order.retain(|s| *s != slot);
        self.retired.insert(slot, entry.lifecycle.ticket());
        info!("notification {} removed", entry.notification.id);

        while let Some(next) = self.queue.pop_front() {
            if self.slots.slot_of(&next.id).is_some() {
                debug!("queued notification {} is already shown, dropping", next.id);
                continue;
            }
            let id = next.id;
            return match self.bind(next.clone(), sched) {
                Some(_) => Some(id),
                None => {
                    self.queue.push_front(next);
                    None
                }
            };
        }
        None
    }

    //  Internal

    fn bind(&mut self, notification: Notification, sched: &mut Scheduler) -> Option<SlotId> {
        if self.slots.slot_of(&notification.id).is_some() {
            warn!("notification {} is already shown, not binding again", notification.id);
            return None;
        }
        let slot = self.slots.insert(notification.id)?;
        let last = self.retired.remove(&slot).unwrap_or_default();
        let mut lifecycle = Lifecycle::after(last);
        lifecycle.show();
        if self.from_bottom {
            self.order.push_back(slot);
        } else {
            self.order.push_front(slot);
        }
        info!("notification {} shown in slot {}", notification.id, slot.0);
        let previous = self.entries.insert(
            slot,
            Entry {
                notification,
                lifecycle,
            },
        );
        if let Some(timer) = previous.and_then(|mut old| old.lifecycle.take_timer()) {
            sched.cancel(timer);
        }
        self.arm_expiry(slot, sched);
        Some(slot)
    }

    fn replace(&mut self, slot: SlotId, old_id: u32, notification: Notification, sched: &mut Scheduler) {
        let new_id = notification.id;
        if new_id != old_id && self.slots.rebind(&old_id, new_id).is_none() {
            debug!("replace: {} already shown elsewhere", new_id);
            return;
        }
        self.queue.retain(|q| q.id != new_id);
        let Some(entry) = self.entries.get_mut(&slot) else {
            return;
        };
        entry.notification = notification;
        if entry.lifecycle.state() == ItemState::FadingOut {
            if let Some(timer) = entry.lifecycle.cancel_fade() {
                sched.cancel(timer);
            }
            self.slots.set_flag(&new_id, SlotFlags::FADING, false);
            debug!("notification {} revived by replacement", new_id);
        } else {
            entry.lifecycle.update();
        }
        self.arm_expiry(slot, sched);
    }

    fn arm_expiry(&mut self, slot: SlotId, sched: &mut Scheduler) {
        let default = self.timeout;
        let Some(entry) = self.entries.get_mut(&slot) else {
            return;
        };
        let ticket = entry.lifecycle.rearm();
        let previous = match entry.notification.effective_timeout(default) {
            Some(delay) => {
                let handle = sched.schedule(delay, Deferred::NotificationExpire { slot: slot.0, ticket });
                entry.lifecycle.set_timer(handle)
            }
            None => entry.lifecycle.take_timer(),
        };
        if let Some(previous) = previous {
            sched.cancel(previous);
        }
    }

    fn start_fade(&mut self, slot: SlotId, sched: &mut Scheduler) {
        let Some(entry) = self.entries.get_mut(&slot) else {
            return;
        };
        let Some(ticket) = entry.lifecycle.begin_fade() else {
            return;
        };
        let handle = sched.schedule(
            self.fade_out,
            Deferred::NotificationFinalize { slot: slot.0, ticket },
        );
        if let Some(previous) = entry.lifecycle.set_timer(handle) {
            sched.cancel(previous);
        }
        let id = entry.notification.id;
        self.slots.set_flag(&id, SlotFlags::FADING, true);
        debug!("notification {} fading", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationConfig;
    use crate::slots::assert_unique;
    use std::time::Instant;

    fn note(id: u32) -> Notification {
        Notification {
            id,
            app_name: "test".into(),
            summary: format!("summary {}", id),
            body: String::new(),
            app_icon: String::new(),
            replaces_id: 0,
            timeout: -1,
            urgency: Urgency::Normal,
        }
    }

    fn stack(max: usize) -> NotificationStack {
        NotificationStack::new(&NotificationConfig {
            max_notifications: max,
            new_notification_from_bottom: false,
            timeout_ms: 5000,
            fade_out_ms: 300,
        })
    }

    /// Advance the clock to `t0 + ms` and run whatever became due.
    fn advance(stack: &mut NotificationStack, sched: &mut Scheduler, t0: Instant, ms: u64) {
        sched.set_now(t0 + Duration::from_millis(ms));
        for task in sched.pop_due() {
            match task {
                Deferred::NotificationExpire { slot, ticket } => stack.expire(slot, ticket, sched),
                Deferred::NotificationFinalize { slot, ticket } => {
                    stack.finalize(slot, ticket, sched);
                }
                other => panic!("unexpected task {:?}", other),
            }
        }
    }

    #[test]
    fn overflow_queue_drains_in_arrival_order() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(2);
        for id in 1..=4 {
            s.notify(note(id), &mut sched);
        }
        assert_eq!(s.shown_count(), 2);
        assert_eq!(s.queued_count(), 2);

        let freed = s.slot_of(1).unwrap();
        s.close(1, &mut sched);
        assert_eq!(s.state_of(1), Some(ItemState::FadingOut));
        advance(&mut s, &mut sched, t0, 300);

        assert_eq!(s.shown_count(), 2);
        assert_eq!(s.queued_count(), 1);
        assert_eq!(s.slot_of(3), Some(freed));
        assert!(s.slot_of(4).is_none());
        assert_unique(s.slots.slots());
    }

    #[test]
    fn replacement_reuses_slot() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(3);
        s.notify(note(1), &mut sched);
        s.notify(note(2), &mut sched);
        let slot = s.slot_of(1).unwrap();

        let mut update = note(7);
        update.replaces_id = 1;
        assert_eq!(s.notify(update, &mut sched), NotifyOutcome::Replaced(slot));
        assert_eq!(s.slot_of(7), Some(slot));
        assert!(s.slot_of(1).is_none());
        assert_eq!(s.shown_count(), 2);
        assert_eq!(s.state_of(7), Some(ItemState::Updated));
    }

    #[test]
    fn replacement_during_fade_cancels_removal() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(2);
        s.notify(note(1), &mut sched);
        s.close(1, &mut sched);
        advance(&mut s, &mut sched, t0, 100);

        let mut update = note(1);
        update.summary = "again".into();
        s.notify(update, &mut sched);
        assert_eq!(s.state_of(1), Some(ItemState::Shown));

        advance(&mut s, &mut sched, t0, 1000);
        assert_eq!(s.shown_count(), 1);
        assert_eq!(s.view()[0].summary, "again");
        assert!(!s.view()[0].fading);
    }

    #[test]
    fn timeout_fades_then_frees() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(2);
        let mut n = note(1);
        n.timeout = 1000;
        s.notify(n, &mut sched);
        advance(&mut s, &mut sched, t0, 999);
        assert_eq!(s.state_of(1), Some(ItemState::Shown));
        advance(&mut s, &mut sched, t0, 1000);
        assert_eq!(s.state_of(1), Some(ItemState::FadingOut));
        advance(&mut s, &mut sched, t0, 1300);
        assert_eq!(s.shown_count(), 0);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn update_restarts_timeout() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(2);
        s.notify(note(1), &mut sched);
        advance(&mut s, &mut sched, t0, 4000);
        s.notify(note(1), &mut sched);
        // The first expiry would have fired at 5000.
        advance(&mut s, &mut sched, t0, 5000);
        assert_eq!(s.state_of(1), Some(ItemState::Updated));
        advance(&mut s, &mut sched, t0, 9000);
        assert_eq!(s.state_of(1), Some(ItemState::FadingOut));
    }

    #[test]
    fn newest_on_top_unless_from_bottom() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(3);
        s.notify(note(1), &mut sched);
        s.notify(note(2), &mut sched);
        let ids: Vec<u32> = s.view().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![2, 1]);

        let mut s = NotificationStack::new(&NotificationConfig {
            max_notifications: 3,
            new_notification_from_bottom: true,
            ..NotificationConfig::default()
        });
        s.notify(note(1), &mut sched);
        s.notify(note(2), &mut sched);
        let ids: Vec<u32> = s.view().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn queued_replacement_and_close() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(1);
        s.notify(note(1), &mut sched);
        s.notify(note(2), &mut sched);
        let mut update = note(2);
        update.summary = "newer".into();
        assert_eq!(s.notify(update, &mut sched), NotifyOutcome::Queued);
        assert_eq!(s.queued_count(), 1);
        assert_eq!(s.queued().next().unwrap().summary, "newer");
        s.close(2, &mut sched);
        assert_eq!(s.queued_count(), 0);
    }

    fn view_ids(s: &NotificationStack) -> Vec<u32> {
        s.view().iter().map(|v| v.id).collect()
    }

    #[test]
    fn shown_id_replacing_unknown_keeps_its_slot() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(3);
        let mut first = note(5);
        first.timeout = 1000;
        let slot = match s.notify(first, &mut sched) {
            NotifyOutcome::Shown(slot) => slot,
            other => panic!("expected Shown, got {:?}", other),
        };

        let mut again = note(5);
        again.replaces_id = 9;
        again.timeout = 10_000;
        assert_eq!(s.notify(again, &mut sched), NotifyOutcome::Replaced(slot));
        assert_eq!(view_ids(&s), vec![5]);
        assert_eq!(sched.pending(), 1);

        // The first timeout must not fade the refreshed popup.
        advance(&mut s, &mut sched, t0, 1000);
        assert_eq!(s.state_of(5), Some(ItemState::Updated));
        advance(&mut s, &mut sched, t0, 10_000);
        assert_eq!(s.state_of(5), Some(ItemState::FadingOut));
    }

    #[test]
    fn rebinding_a_queued_id_drops_the_queued_copy() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(1);
        s.notify(note(3), &mut sched);
        assert_eq!(s.notify(note(7), &mut sched), NotifyOutcome::Queued);

        let mut update = note(7);
        update.replaces_id = 3;
        s.notify(update, &mut sched);
        assert_eq!(view_ids(&s), vec![7]);
        assert_eq!(s.queued_count(), 0);

        s.close(7, &mut sched);
        advance(&mut s, &mut sched, t0, 300);
        assert!(s.view().is_empty());
        assert_eq!(s.queued_count(), 0);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn reused_slot_ignores_expiry_of_previous_occupant() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(1);
        let mut first = note(1);
        first.timeout = 1000;
        s.notify(first, &mut sched);
        let slot = s.slot_of(1).unwrap();
        let stale = s.entries[&slot].lifecycle.ticket();
        s.close(1, &mut sched);
        advance(&mut s, &mut sched, t0, 300);
        assert_eq!(s.shown_count(), 0);

        s.notify(note(2), &mut sched);
        assert_eq!(s.slot_of(2), Some(slot));
        s.expire(slot.0, stale, &mut sched);
        assert_eq!(s.state_of(2), Some(ItemState::Shown));
    }

    #[test]
    fn no_duplicate_ids_on_screen() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(2);
        for (id, replaces) in [(1, 0), (2, 0), (1, 2), (2, 1), (4, 0), (2, 4), (1, 0)] {
            let mut n = note(id);
            n.replaces_id = replaces;
            s.notify(n, &mut sched);
            let mut ids = view_ids(&s);
            let total = ids.len();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), total, "duplicate popup after {}/{}", id, replaces);
            assert!(s.queued().all(|q| s.slot_of(q.id).is_none()));
        }
        assert_unique(s.slots.slots());
    }

    #[test]
    fn critical_and_zero_timeout_never_expire() {
        let mut n = note(1);
        n.urgency = Urgency::Critical;
        assert_eq!(n.effective_timeout(Duration::from_secs(5)), None);
        n.timeout = 200;
        assert_eq!(n.effective_timeout(Duration::from_secs(5)), Some(Duration::from_millis(200)));
        let mut n = note(2);
        n.timeout = 0;
        assert_eq!(n.effective_timeout(Duration::from_secs(5)), None);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut s = stack(2);
        s.close(42, &mut sched);
        s.dismiss(5, &mut sched);
        assert_eq!(s.shown_count(), 0);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn deserialize_with_defaults() {
        let json = r#"{ "id": 3, "summary": "hi" }"#;
        let n: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(n.timeout, -1);
        assert_eq!(n.replaces_id, 0);
        assert_eq!(n.urgency, Urgency::Normal);
    }
}
