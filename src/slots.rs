//! Bounded slot reconciliation.
//!
//! A [`SlotSet`] maps a changing collection of item keys onto an ordered set
//! of [`Slot`]s.  Slots are the long-lived visual containers (a renderer
//! keeps one widget per [`SlotId`]); items come and go.
//!
//! Two modes exist:
//!
//! * **Dynamic**: slots are anonymous content containers.  An arriving item
//!   takes the first empty slot; when none is free the set either grows by
//!   one trailing slot ([`Growth::Unbounded`], the dock) or reports the item
//!   as overflow ([`Growth::Fixed`], notifications, which queue it).
//! * **Static**: each slot is permanently keyed (workspace indicators).
//!   Sync only toggles [`SlotFlags::EMPTY`] on slots whose key is absent.
//!
//! Invariant: an item key is bound to at most one slot, and a slot holds at
//! most one item.

use bitflags::bitflags;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

bitflags! {
    /// Visual state of a slot, for the renderer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SlotFlags: u16 {
        /// No item bound.
        const EMPTY = 1 << 0;
        /// The focused / selected slot.
        const ACTIVE = 1 << 1;
        /// Under the pointer.
        const HOVERED = 1 << 2;
        /// Next to the hovered slot.
        const SEMI_HOVERED = 1 << 3;
        /// First or last slot of a window.
        const EDGE = 1 << 4;
        /// Never rendered (animation overflow).
        const HIDDEN = 1 << 5;
        /// Ignores presses.
        const DISABLED = 1 << 6;
        /// Bound item is fading out.
        const FADING = 1 << 7;
        /// Bound application has running windows.
        const RUNNING = 1 << 8;
    }
}

/// Stable identity of a slot widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

/// A positional placeholder that may hold one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot<K> {
    pub id: SlotId,
    /// The permanent key of a static slot.
    pub key: Option<K>,
    pub item: Option<K>,
    pub flags: SlotFlags,
}

impl<K> Slot<K> {
    fn empty(id: SlotId) -> Self {
        Self {
            id,
            key: None,
            item: None,
            flags: SlotFlags::EMPTY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_none()
    }
}

/// What happens when a dynamic set has no empty slot left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// Append a trailing slot.
    Unbounded,
    /// Never grow; the item is reported as overflow.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Dynamic(Growth),
    Static,
}

/// Result of a [`SlotSet::sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport<K> {
    /// Items newly bound, with their slot.
    pub bound: Vec<(SlotId, K)>,
    /// Items whose slot was cleared.
    pub cleared: Vec<(SlotId, K)>,
    /// Items that found no slot.
    pub overflow: Vec<K>,
}

impl<K> SyncReport<K> {
    pub fn is_noop(&self) -> bool {
        self.bound.is_empty() && self.cleared.is_empty() && self.overflow.is_empty()
    }
}

/// An ordered set of slots and the item → slot index.
#[derive(Debug, Clone)]
pub struct SlotSet<K> {
    mode: Mode,
    slots: Vec<Slot<K>>,
    index: HashMap<K, SlotId>,
    next_id: usize,
}

impl<K: Clone + Eq + Hash + std::fmt::Debug> SlotSet<K> {
    /// A dynamic set with `initial` pre-allocated empty slots.
    pub fn dynamic(initial: usize, growth: Growth) -> Self {
        let slots = (0..initial).map(|i| Slot::empty(SlotId(i))).collect();
        Self {
            mode: Mode::Dynamic(growth),
            slots,
            index: HashMap::new(),
            next_id: initial,
        }
    }

    /// A static set with one permanently keyed slot per key.
    pub fn fixed_keys(keys: impl IntoIterator<Item = K>) -> Self {
        let mut slots: Vec<Slot<K>> = Vec::new();
        for key in keys {
            if slots.iter().any(|s| s.key.as_ref() == Some(&key)) {
                continue;
            }
            let mut slot = Slot::empty(SlotId(slots.len()));
            slot.key = Some(key);
            slots.push(slot);
        }
        let next_id = slots.len();
        Self {
            mode: Mode::Static,
            slots,
            index: HashMap::new(),
            next_id,
        }
    }

    //  Accessors

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots holding an item.
    pub fn bound_count(&self) -> usize {
        self.index.len()
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(|s| s.is_empty() && s.key.is_none())
    }

    pub fn slots(&self) -> &[Slot<K>] {
        &self.slots
    }

    pub fn slot_of(&self, item: &K) -> Option<SlotId> {
        self.index.get(item).copied()
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot<K>> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Position of slot `id` in display order.
    pub fn position(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    /// Bound items in slot order.
    pub fn items(&self) -> Vec<K> {
        self.slots.iter().filter_map(|s| s.item.clone()).collect()
    }

    //  Reconciliation

    /// Make the slots reflect `current`.
    ///
    /// Existing bindings of items still present are kept, slots of vanished
    /// items are cleared, and new items take free slots in order.  Calling
    /// this twice with the same input changes nothing the second time.
    pub fn sync(&mut self, current: &[K]) -> SyncReport<K> {
        let mut seen = HashSet::new();
        let wanted: Vec<&K> = current.iter().filter(|k| seen.insert(*k)).collect();

        let mut report = SyncReport {
            bound: Vec::new(),
            cleared: Vec::new(),
            overflow: Vec::new(),
        };

        for slot in &mut self.slots {
            let stale = slot.item.as_ref().is_some_and(|item| !seen.contains(item));
            if !stale {
                continue;
            }
            if let Some(item) = slot.item.take() {
                self.index.remove(&item);
                slot.flags = SlotFlags::EMPTY;
                report.cleared.push((slot.id, item));
            }
        }

        for item in wanted {
            if self.index.contains_key(item) {
                continue;
            }
            match self.insert(item.clone()) {
                Some(id) => report.bound.push((id, item.clone())),
                None => report.overflow.push(item.clone()),
            }
        }

        report
    }

    /// Bind `item` to a slot.
    ///
    /// Already bound items keep their slot.  Dynamic sets use the first empty
    /// slot or grow; static sets bind to the slot keyed by `item`.  Returns
    /// `None` when no slot can take the item.
    pub fn insert(&mut self, item: K) -> Option<SlotId> {
        if let Some(id) = self.index.get(&item) {
            return Some(*id);
        }
        let position = match self.mode {
            Mode::Static => {
                let pos = self.slots.iter().position(|s| s.key.as_ref() == Some(&item));
                if pos.is_none() {
                    debug!("no static slot for {:?}", item);
                }
                pos?
            }
            Mode::Dynamic(growth) => match self.slots.iter().position(|s| s.is_empty()) {
                Some(pos) => pos,
                None if growth == Growth::Unbounded => {
                    self.slots.push(Slot::empty(SlotId(self.next_id)));
                    self.next_id += 1;
                    self.slots.len() - 1
                }
                None => return None,
            },
        };
        let slot = &mut self.slots[position];
        slot.item = Some(item.clone());
        slot.flags.remove(SlotFlags::EMPTY);
        self.index.insert(item, slot.id);
        Some(slot.id)
    }

    /// Clear the slot bound to `item`, returning it.
    ///
    /// Unknown items are logged and ignored.
    pub fn release(&mut self, item: &K) -> Option<SlotId> {
        let Some(id) = self.index.remove(item) else {
            debug!("release: {:?} not bound", item);
            return None;
        };
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.item = None;
            slot.flags = SlotFlags::EMPTY;
        }
        Some(id)
    }

    /// Bind `new` to the slot currently holding `old`, keeping the slot.
    pub fn rebind(&mut self, old: &K, new: K) -> Option<SlotId> {
        if old == &new {
            return self.slot_of(old);
        }
        if self.index.contains_key(&new) {
            warn!("rebind: {:?} already bound elsewhere", new);
            return None;
        }
        let id = self.index.remove(old)?;
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.item = Some(new.clone());
        }
        self.index.insert(new, id);
        Some(id)
    }

    /// Physically remove the slot bound to `item` (growable sets shrink).
    ///
    /// Static sets never lose slots; this only releases the item there.
    pub fn remove_slot(&mut self, item: &K) -> Option<SlotId> {
        if self.mode == Mode::Static {
            return self.release(item);
        }
        let id = self.index.remove(item)?;
        self.slots.retain(|s| s.id != id);
        Some(id)
    }

    //  Flags

    pub fn flags_mut(&mut self, id: SlotId) -> Option<&mut SlotFlags> {
        self.slots.iter_mut().find(|s| s.id == id).map(|s| &mut s.flags)
    }

    /// Set or clear `flag` on the slot bound to `item`.
    pub fn set_flag(&mut self, item: &K, flag: SlotFlags, on: bool) {
        if let Some(id) = self.slot_of(item) {
            if let Some(flags) = self.flags_mut(id) {
                flags.set(flag, on);
            }
        }
    }

    /// Clear `flag` on every slot.
    pub fn clear_flag(&mut self, flag: SlotFlags) {
        for slot in &mut self.slots {
            slot.flags.remove(flag);
        }
    }
}

#[cfg(test)]
pub(crate) fn assert_unique<K: Eq + Hash + std::fmt::Debug>(slots: &[Slot<K>]) {
    let mut seen = HashSet::new();
    for slot in slots {
        if let Some(item) = &slot.item {
            assert!(seen.insert(item), "{:?} bound to two slots", item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(set: &SlotSet<&'static str>) -> Vec<Option<&'static str>> {
        set.slots().iter().map(|s| s.item).collect()
    }

    #[test]
    fn sync_binds_in_order() {
        let mut set = SlotSet::dynamic(0, Growth::Unbounded);
        let r = set.sync(&["a", "b", "c"]);
        assert_eq!(r.bound.len(), 3);
        assert_eq!(keys(&set), vec![Some("a"), Some("b"), Some("c")]);
        assert_unique(set.slots());
    }

    #[test]
    fn sync_is_idempotent() {
        let mut set = SlotSet::dynamic(2, Growth::Unbounded);
        set.sync(&["a", "b", "c"]);
        let snapshot = set.slots().to_vec();
        let r = set.sync(&["a", "b", "c"]);
        assert!(r.is_noop());
        assert_eq!(set.slots(), snapshot.as_slice());
    }

    #[test]
    fn sync_keeps_existing_bindings() {
        let mut set = SlotSet::dynamic(0, Growth::Unbounded);
        set.sync(&["a", "b", "c"]);
        let b = set.slot_of(&"b").unwrap();
        let r = set.sync(&["c", "b", "d"]);
        assert_eq!(set.slot_of(&"b"), Some(b));
        assert_eq!(r.cleared, vec![(SlotId(0), "a")]);
        // "d" reuses the freed first slot instead of growing.
        assert_eq!(r.bound, vec![(SlotId(0), "d")]);
        assert_eq!(set.len(), 3);
        assert_unique(set.slots());
    }

    #[test]
    fn duplicates_bind_once() {
        let mut set = SlotSet::dynamic(0, Growth::Unbounded);
        set.sync(&["a", "a", "b"]);
        assert_eq!(set.bound_count(), 2);
        assert_unique(set.slots());
    }

    #[test]
    fn fixed_growth_reports_overflow() {
        let mut set = SlotSet::dynamic(2, Growth::Fixed);
        let r = set.sync(&["a", "b", "c"]);
        assert_eq!(r.overflow, vec!["c"]);
        assert_eq!(set.len(), 2);
        assert!(set.insert("d").is_none());
    }

    #[test]
    fn release_and_rebind() {
        let mut set = SlotSet::dynamic(2, Growth::Fixed);
        let a = set.insert("a").unwrap();
        set.insert("b").unwrap();
        assert_eq!(set.rebind(&"a", "z"), Some(a));
        assert_eq!(set.slot_of(&"z"), Some(a));
        assert!(set.slot_of(&"a").is_none());
        assert!(set.rebind(&"z", "b").is_none(), "b is already bound");
        assert_eq!(set.release(&"z"), Some(a));
        assert!(set.release(&"z").is_none());
        assert!(set.has_free_slot());
    }

    #[test]
    fn remove_slot_shrinks_dynamic() {
        let mut set = SlotSet::dynamic(0, Growth::Unbounded);
        set.sync(&["a", "b", "c"]);
        set.remove_slot(&"b");
        assert_eq!(keys(&set), vec![Some("a"), Some("c")]);
        // New slot ids never collide with removed ones.
        let d = set.insert("d").unwrap();
        assert_eq!(d, SlotId(3));
    }

    #[test]
    fn static_mode_keeps_keys() {
        let mut set = SlotSet::fixed_keys(1..=4);
        set.sync(&[2, 4]);
        let empty: Vec<bool> = set
            .slots()
            .iter()
            .map(|s| s.flags.contains(SlotFlags::EMPTY))
            .collect();
        assert_eq!(empty, vec![true, false, true, false]);
        set.sync(&[1]);
        assert_eq!(set.slots()[0].item, Some(1));
        assert_eq!(set.slots()[1].item, None);
        assert_eq!(set.slots()[1].key, Some(2));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn static_mode_unknown_key_overflows() {
        let mut set = SlotSet::fixed_keys(1..=2);
        let r = set.sync(&[7]);
        assert_eq!(r.overflow, vec![7]);
        assert!(!set.has_free_slot());
    }
}
