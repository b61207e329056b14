//! On-screen display for volume and brightness changes.
//!
//! The first value reported after startup (or after the service comes back)
//! is only remembered; later changes pop the OSD up and re-arm its
//! auto-hide.  Each re-arm bumps the ticket, so only the latest hide fires.

use crate::lifecycle::{Ticket, TicketCounter};
use crate::timer::{Deferred, Scheduler, TimerHandle};
use log::debug;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OsdKind {
    Volume,
    Brightness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OsdView {
    pub kind: OsdKind,
    pub percent: u32,
    pub muted: bool,
}

#[derive(Debug)]
pub struct Osd {
    timeout: Duration,
    visible: Option<OsdView>,
    volume: Option<(u32, bool)>,
    brightness: Option<u32>,
    tickets: TicketCounter,
    timer: Option<TimerHandle>,
}

impl Osd {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            visible: None,
            volume: None,
            brightness: None,
            tickets: TicketCounter::new(),
            timer: None,
        }
    }

    pub fn view(&self) -> Option<OsdView> {
        self.visible
    }

    /// Returns `true` if the OSD changed.
    pub fn volume(&mut self, percent: u32, muted: bool, sched: &mut Scheduler) -> bool {
        let percent = percent.min(100);
        let previous = self.volume.replace((percent, muted));
        match previous {
            None => false,
            Some(p) if p == (percent, muted) => false,
            Some(_) => {
                self.show(OsdView { kind: OsdKind::Volume, percent, muted }, sched);
                true
            }
        }
    }

    pub fn brightness(&mut self, percent: u32, sched: &mut Scheduler) -> bool {
        let percent = percent.min(100);
        let previous = self.brightness.replace(percent);
        match previous {
            None => false,
            Some(p) if p == percent => false,
            Some(_) => {
                let view = OsdView {
                    kind: OsdKind::Brightness,
                    percent,
                    muted: false,
                };
                self.show(view, sched);
                true
            }
        }
    }

    /// Forget the last value of `kind` and hide it if shown.
    pub fn reset(&mut self, kind: OsdKind, sched: &mut Scheduler) -> bool {
        match kind {
            OsdKind::Volume => self.volume = None,
            OsdKind::Brightness => self.brightness = None,
        }
        if self.visible.is_some_and(|v| v.kind == kind) {
            self.visible = None;
            self.tickets.bump();
            if let Some(timer) = self.timer.take() {
                sched.cancel(timer);
            }
            return true;
        }
        false
    }

    /// Auto-hide elapsed.  Returns `true` if the OSD was hidden.
    pub fn hide(&mut self, ticket: Ticket) -> bool {
        if !self.tickets.is_current(ticket) {
            debug!("osd: stale hide ({})", ticket.value());
            return false;
        }
        self.timer = None;
        self.visible.take().is_some()
    }

    fn show(&mut self, view: OsdView, sched: &mut Scheduler) {
        self.visible = Some(view);
        let ticket = self.tickets.bump();
        if let Some(timer) = self.timer.take() {
            sched.cancel(timer);
        }
        self.timer = Some(sched.schedule(self.timeout, Deferred::OsdHide { ticket }));
    }
}
