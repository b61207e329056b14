//! A fixed window of slots around a selection index.
//!
//! The wallpaper selector shows five slots (`sel-2 ..= sel+2`), the media
//! player strip seven with both outermost slots permanently hidden (they only
//! exist so the renderer can animate tabs in and out).
//!
//! The window is a ring of slot widgets in a [`VecDeque`].  Cycling by one
//! rotates the ring so the slot leaving one edge reappears at the other, and
//! only that slot receives new content.  When the selection wraps around the
//! end of the list the whole window is recomputed instead.  Either way the
//! result equals [`Carousel::expected`], the direct computation from the
//! selection index.

use crate::command::Direction;
use crate::slots::{Slot, SlotFlags, SlotId};
use log::debug;
use std::collections::VecDeque;

/// Width of the wallpaper carousel.
pub const WALLPAPER_SLOTS: usize = 5;
/// Width of the media player tab strip.
pub const MEDIA_SLOTS: usize = 7;

/// What pressing a slot does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressAction {
    /// Nothing: empty, hidden, edge or disabled slot.
    None,
    /// Cycle the window one step.
    Shift(Direction),
    /// Act on the selected item.
    Select,
}

#[derive(Debug, Clone)]
pub struct Carousel<K> {
    items: Vec<K>,
    selected: usize,
    ring: VecDeque<Slot<K>>,
    radius: usize,
    hidden_edges: bool,
    hovered: Option<usize>,
}

impl<K: Clone + PartialEq + std::fmt::Debug> Carousel<K> {
    /// A carousel `width` slots wide (rounded up to an odd number, at least
    /// three).  With `hidden_edges` the outermost slots are never shown.
    pub fn new(width: usize, hidden_edges: bool) -> Self {
        let radius = (width.max(3) - 1).div_ceil(2);
        let ring = (0..2 * radius + 1)
            .map(|i| Slot {
                id: SlotId(i),
                key: None,
                item: None,
                flags: SlotFlags::EMPTY,
            })
            .collect();
        let mut carousel = Self {
            items: Vec::new(),
            selected: 0,
            ring,
            radius,
            hidden_edges,
            hovered: None,
        };
        carousel.rebuild();
        carousel
    }

    //  Accessors

    pub fn width(&self) -> usize {
        self.ring.len()
    }

    pub fn items(&self) -> &[K] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Always `< max(len, 1)`.
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&K> {
        self.items.get(self.selected)
    }

    /// Slots left to right.
    pub fn slots(&self) -> impl Iterator<Item = &Slot<K>> {
        self.ring.iter()
    }

    pub fn slot_items(&self) -> Vec<Option<K>> {
        self.ring.iter().map(|s| s.item.clone()).collect()
    }

    /// The window computed directly from the selection index.
    pub fn expected(&self) -> Vec<Option<K>> {
        (0..self.width()).map(|pos| self.item_for(pos).cloned()).collect()
    }

    //  Mutation

    /// Replace the underlying list.  The selection follows the previously
    /// selected item when it is still present, otherwise it is clamped.
    pub fn set_items(&mut self, items: Vec<K>) {
        let previous = self.selected().cloned();
        self.items.clear();
        for item in items {
            if !self.items.contains(&item) {
                self.items.push(item);
            }
        }
        self.selected = previous
            .and_then(|p| self.items.iter().position(|i| *i == p))
            .unwrap_or(self.selected);
        self.clamp();
        self.rebuild();
    }

    /// Move the selection to `index`, clamped to the list.
    pub fn select(&mut self, index: usize) {
        self.selected = index;
        self.clamp();
        self.rebuild();
    }

    /// Select `item` if present.
    pub fn select_item(&mut self, item: &K) -> bool {
        match self.items.iter().position(|i| i == item) {
            Some(index) => {
                self.select(index);
                true
            }
            None => false,
        }
    }

    /// Insert `item` at the selection so it becomes the centre and its
    /// neighbours shift outward.  An item already present is just selected.
    pub fn insert_at_focus(&mut self, item: K) {
        if self.select_item(&item) {
            return;
        }
        let at = if self.items.is_empty() { 0 } else { self.selected };
        self.items.insert(at, item);
        self.selected = at;
        self.rebuild();
    }

    /// Remove `item`.  Unknown items are ignored.
    pub fn remove(&mut self, item: &K) -> bool {
        let Some(index) = self.items.iter().position(|i| i == item) else {
            debug!("carousel: {:?} not present", item);
            return false;
        };
        self.items.remove(index);
        if index < self.selected {
            self.selected -= 1;
        }
        self.clamp();
        self.rebuild();
        true
    }

    /// Cycle the selection by one, wrapping at the ends.
    ///
    /// Returns `false` when the list is empty.
    pub fn shift(&mut self, direction: Direction) -> bool {
        let len = self.items.len();
        if len == 0 {
            return false;
        }
        let last = self.width() - 1;
        match direction {
            Direction::Forward if self.selected + 1 < len => {
                self.selected += 1;
                self.ring.rotate_left(1);
                self.refresh_content(last);
            }
            Direction::Backward if self.selected > 0 => {
                self.selected -= 1;
                self.ring.rotate_right(1);
                self.refresh_content(0);
            }
            Direction::Forward => {
                self.selected = 0;
                self.refresh_all_content();
            }
            Direction::Backward => {
                self.selected = len - 1;
                self.refresh_all_content();
            }
        }
        self.apply_flags();
        true
    }

    /// Track the hovered slot position (`None` when the pointer left).
    pub fn hover(&mut self, position: Option<usize>) {
        self.hovered = position.filter(|p| *p < self.width());
        self.apply_flags();
    }

    /// What pressing the slot at `position` should do.
    ///
    /// Only the centre slot and its direct neighbours respond.
    pub fn press(&self, position: usize) -> PressAction {
        let Some(slot) = self.ring.get(position) else {
            return PressAction::None;
        };
        if slot.is_empty() || slot.flags.intersects(SlotFlags::DISABLED | SlotFlags::HIDDEN) {
            return PressAction::None;
        }
        match position as isize - self.radius as isize {
            -1 => PressAction::Shift(Direction::Backward),
            0 => PressAction::Select,
            1 => PressAction::Shift(Direction::Forward),
            _ => PressAction::None,
        }
    }

    //  Internal

    fn clamp(&mut self) {
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
    }

    /// The item that belongs at `position` for the current selection.
    fn item_for(&self, position: usize) -> Option<&K> {
        let index = (self.selected + position).checked_sub(self.radius)?;
        self.items.get(index)
    }

    fn refresh_content(&mut self, position: usize) {
        let item = self.item_for(position).cloned();
        if let Some(slot) = self.ring.get_mut(position) {
            slot.item = item;
        }
    }

    fn refresh_all_content(&mut self) {
        for position in 0..self.width() {
            self.refresh_content(position);
        }
    }

    fn rebuild(&mut self) {
        self.refresh_all_content();
        self.apply_flags();
    }

    /// Positional flags depend only on the position, never on the slot
    /// widget that currently sits there.
    fn apply_flags(&mut self) {
        let last = self.width() - 1;
        let centre = self.radius;
        let hovered = self.hovered;
        let hidden_edges = self.hidden_edges;
        for (position, slot) in self.ring.iter_mut().enumerate() {
            let mut flags = SlotFlags::empty();
            if slot.item.is_none() {
                flags |= SlotFlags::EMPTY | SlotFlags::DISABLED;
            }
            if position == centre && slot.item.is_some() {
                flags |= SlotFlags::ACTIVE;
            }
            if position == 0 || position == last {
                flags |= SlotFlags::EDGE;
                if hidden_edges {
                    flags |= SlotFlags::HIDDEN | SlotFlags::DISABLED;
                }
            }
            if let Some(h) = hovered {
                if h == position {
                    flags |= SlotFlags::HOVERED;
                } else if h.abs_diff(position) == 1 {
                    flags |= SlotFlags::SEMI_HOVERED;
                }
            }
            slot.flags = flags;
        }
    }
}
