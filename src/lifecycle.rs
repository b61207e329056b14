//! Per-item lifecycle and superseded-operation tickets.
//!
//! Every item a controller shows (a dock entry, a notification, a media
//! player) walks the same path:
//!
//! ```text
//! Pending ─bind─▶ Shown ◀─▶ Updated
//!                   │  ▲
//!          remove   │  │ replacement
//!                   ▼  │
//!                FadingOut ─fade elapsed─▶ Removed
//! ```
//!
//! Deferred work (fade completion, auto-hide) captures a [`Ticket`] when it
//! is scheduled.  Any later transition bumps the ticket, so a completion
//! carrying an older ticket is recognised as superseded and dropped.

use crate::timer::TimerHandle;
use log::debug;

/// A monotonically increasing generation number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Ticket(u64);

impl Ticket {
    /// Raw value, for logging.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Hands out tickets and remembers the latest one.
#[derive(Debug, Clone, Default)]
pub struct TicketCounter {
    current: u64,
}

impl TicketCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate every outstanding ticket and return the new current one.
    pub fn bump(&mut self) -> Ticket {
        self.current += 1;
        Ticket(self.current)
    }

    pub fn current(&self) -> Ticket {
        Ticket(self.current)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.current
    }
}

/// Where an item is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Known but not yet bound to a slot (e.g. a queued notification).
    Pending,
    /// Bound and visible.
    Shown,
    /// Bound and visible; metadata changed since the last render.
    Updated,
    /// Removal requested; the slot keeps its content until the fade ends.
    FadingOut,
    /// Gone.  The controller drops the item after observing this.
    Removed,
}

impl ItemState {
    /// Whether the item currently occupies a slot.
    pub fn is_bound(self) -> bool {
        matches!(self, ItemState::Shown | ItemState::Updated | ItemState::FadingOut)
    }
}

/// State plus the ticket guarding its deferred transitions.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ItemState,
    tickets: TicketCounter,
    timer: Option<TimerHandle>,
    revision: u32,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// A fresh item in [`ItemState::Pending`].
    pub fn new() -> Self {
        Self {
            state: ItemState::Pending,
            tickets: TicketCounter::new(),
            timer: None,
            revision: 0,
        }
    }

    /// A fresh item whose tickets continue after `last`.
    ///
    /// Used when a slot is reused, so work scheduled for its previous
    /// occupant can never match a ticket issued to the new one.
    pub fn after(last: Ticket) -> Self {
        Self {
            tickets: TicketCounter { current: last.0 },
            ..Self::new()
        }
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    /// The latest ticket issued.
    pub fn ticket(&self) -> Ticket {
        self.tickets.current()
    }

    /// How many metadata updates this item has seen.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// `Pending → Shown` on first bind.
    ///
    /// Returns `false` (and leaves the state alone) from any other state.
    pub fn show(&mut self) -> bool {
        if self.state == ItemState::Pending {
            self.state = ItemState::Shown;
            true
        } else {
            debug!("show ignored in state {:?}", self.state);
            false
        }
    }

    /// `Shown → Updated` on a metadata refresh.  The binding is untouched.
    pub fn update(&mut self) -> bool {
        match self.state {
            ItemState::Shown | ItemState::Updated => {
                self.state = ItemState::Updated;
                self.revision += 1;
                true
            }
            other => {
                debug!("update ignored in state {:?}", other);
                false
            }
        }
    }

    /// `Updated → Shown` once the refresh has been rendered.
    pub fn settle(&mut self) {
        if self.state == ItemState::Updated {
            self.state = ItemState::Shown;
        }
    }

    /// `Shown | Updated → FadingOut`.
    ///
    /// Returns the ticket the fade completion must present, or `None` when
    /// the item is not in a state that can fade.
    pub fn begin_fade(&mut self) -> Option<Ticket> {
        match self.state {
            ItemState::Shown | ItemState::Updated => {
                self.state = ItemState::FadingOut;
                Some(self.tickets.bump())
            }
            other => {
                debug!("fade ignored in state {:?}", other);
                None
            }
        }
    }

    /// `FadingOut → Shown` because a replacement arrived.  Any pending
    /// completion is invalidated and its timer handed back for cancelling.
    pub fn cancel_fade(&mut self) -> Option<TimerHandle> {
        if self.state != ItemState::FadingOut {
            return None;
        }
        self.state = ItemState::Shown;
        self.revision += 1;
        self.tickets.bump();
        self.timer.take()
    }

    /// `FadingOut → Removed` if `ticket` is still current.
    ///
    /// A stale ticket means the fade was superseded; that is expected and
    /// returns `false` without touching the state.
    pub fn finish_fade(&mut self, ticket: Ticket) -> bool {
        if self.state != ItemState::FadingOut || !self.tickets.is_current(ticket) {
            return false;
        }
        self.state = ItemState::Removed;
        self.timer = None;
        true
    }

    /// `any → Removed` without a fade.
    pub fn remove_now(&mut self) -> Option<TimerHandle> {
        self.state = ItemState::Removed;
        self.tickets.bump();
        self.timer.take()
    }

    /// Issue a new ticket for a deferred operation that does not change the
    /// state (e.g. an auto-hide timeout), superseding earlier ones.
    pub fn rearm(&mut self) -> Ticket {
        self.tickets.bump()
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.tickets.is_current(ticket)
    }

    /// Remember the timer for the deferred operation in flight, returning
    /// the one it replaces.
    pub fn set_timer(&mut self, handle: TimerHandle) -> Option<TimerHandle> {
        self.timer.replace(handle)
    }

    pub fn take_timer(&mut self) -> Option<TimerHandle> {
        self.timer.take()
    }
}
