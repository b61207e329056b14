//! The dock: pinned applications and running applications side by side.
//!
//! Pinned slots are permanent (until unpinned) and carry
//! [`SlotFlags::RUNNING`] while the application has windows.  Running
//! applications that are not pinned get a live slot; the live strip grows by
//! one slot per application and shrinks again 250 ms after the last window
//! closed, once the fade-out finished.  A window of the same application
//! opening during the fade cancels the removal and keeps the slot.
//!
//! The dock auto-hides while a window on the active workspace overlaps it.
//! Hovering, or a short flash after an application appears or disappears,
//! reveals it.

use crate::command::{ClientInfo, MonitorInfo};
use crate::config::DockConfig;
use crate::lifecycle::{ItemState, Lifecycle, Ticket, TicketCounter};
use crate::slots::{Growth, SlotFlags, SlotSet};
use crate::timer::{Deferred, Scheduler, TimerHandle};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// What pressing a dock slot does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockPress {
    /// Focus this window address.
    Focus(String),
    /// Start the application.
    Launch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockSlotView {
    pub slot: usize,
    pub app_id: String,
    pub flags: u16,
}

/// Snapshot of the dock for the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockView {
    pub pinned: Vec<DockSlotView>,
    pub live: Vec<DockSlotView>,
    pub separator: bool,
    pub revealed: bool,
}

#[derive(Debug)]
struct App {
    /// Window addresses, most recently focused first.
    windows: Vec<String>,
    lifecycle: Lifecycle,
}

#[derive(Debug)]
pub struct Dock {
    config: DockConfig,
    pinned: SlotSet<String>,
    live: SlotSet<String>,
    apps: HashMap<String, App>,
    /// Window address → app id.
    windows: HashMap<String, String>,
    hovered: bool,
    obstructed: bool,
    flashing: bool,
    flash: TicketCounter,
    flash_timer: Option<TimerHandle>,
}

impl Dock {
    pub fn new(config: DockConfig) -> Self {
        Self {
            config,
            pinned: SlotSet::dynamic(0, Growth::Unbounded),
            live: SlotSet::dynamic(0, Growth::Unbounded),
            apps: HashMap::new(),
            windows: HashMap::new(),
            hovered: false,
            obstructed: false,
            flashing: false,
            flash: TicketCounter::new(),
            flash_timer: None,
        }
    }

    //  Queries

    pub fn is_empty(&self) -> bool {
        self.pinned.is_empty() && self.live.is_empty()
    }

    pub fn is_tracked(&self, app_id: &str) -> bool {
        self.apps.contains_key(app_id)
    }

    pub fn state_of(&self, app_id: &str) -> Option<ItemState> {
        self.apps.get(app_id).map(|a| a.lifecycle.state())
    }

    pub fn is_pinned(&self, app_id: &str) -> bool {
        self.pinned.slot_of(&app_id.to_string()).is_some()
    }

    pub fn pinned_ids(&self) -> Vec<String> {
        self.pinned.items()
    }

    pub fn live_ids(&self) -> Vec<String> {
        self.live.items()
    }

    pub fn is_flashing(&self) -> bool {
        self.flashing
    }

    /// The separator between pinned and live slots shows only when both
    /// strips have content.
    pub fn separator_visible(&self) -> bool {
        !self.pinned.is_empty() && !self.live.is_empty()
    }

    /// Whether the dock surface should be on screen.
    pub fn is_revealed(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        let hides = self.config.auto_hide && self.obstructed;
        self.hovered || self.flashing || !hides
    }

    pub fn view(&self) -> DockView {
        let strip = |set: &SlotSet<String>| {
            set.slots()
                .iter()
                .filter_map(|s| {
                    Some(DockSlotView {
                        slot: s.id.0,
                        app_id: s.item.clone()?,
                        flags: s.flags.bits(),
                    })
                })
                .collect()
        };
        DockView {
            pinned: strip(&self.pinned),
            live: strip(&self.live),
            separator: self.separator_visible(),
            revealed: self.is_revealed(),
        }
    }

    //  Pointer and geometry

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    pub fn set_obstructed(&mut self, obstructed: bool) {
        if self.obstructed != obstructed {
            debug!("dock obstructed: {}", obstructed);
        }
        self.obstructed = obstructed;
    }

    /// The dock rectangle (`x, y, w, h`) at the bottom centre of `monitor`.
    pub fn rect_on(&self, monitor: &MonitorInfo) -> (i32, i32, u32, u32) {
        let w = self.config.width.min(monitor.width);
        let h = self.config.height.min(monitor.height);
        let x = monitor.x + ((monitor.width - w) / 2) as i32;
        let y = monitor.y + (monitor.height - h) as i32;
        (x, y, w, h)
    }

    //  Windows

    /// A client window was mapped.
    pub fn window_opened(&mut self, client: &ClientInfo, sched: &mut Scheduler) {
        if self.track(client, sched) && self.config.flash_on_app_added {
            self.flash(Duration::from_millis(self.config.flash_ms), sched);
        }
    }

    /// Load the windows that already exist at startup, without flashing.
    pub fn populate(&mut self, clients: &[ClientInfo], sched: &mut Scheduler) {
        for client in clients {
            self.track(client, sched);
        }
    }

    /// Record a mapped window.  Returns whether it added an unpinned app.
    fn track(&mut self, client: &ClientInfo, sched: &mut Scheduler) -> bool {
        if self.windows.contains_key(&client.address) {
            debug!("dock: window {} already known", client.address);
            return false;
        }
        let app_id = client.app_id.clone();
        self.windows.insert(client.address.clone(), app_id.clone());

        if let Some(app) = self.apps.get_mut(&app_id) {
            app.windows.insert(0, client.address.clone());
            if app.lifecycle.state() == ItemState::FadingOut {
                if let Some(timer) = app.lifecycle.cancel_fade() {
                    sched.cancel(timer);
                }
                self.live.set_flag(&app_id, SlotFlags::FADING, false);
                info!("dock: {} reopened during fade", app_id);
            }
            self.mark_running(&app_id, true);
            return false;
        }

        let mut lifecycle = Lifecycle::new();
        lifecycle.show();
        self.apps.insert(
            app_id.clone(),
            App {
                windows: vec![client.address.clone()],
                lifecycle,
            },
        );
        let added = !self.is_pinned(&app_id);
        if added {
            self.live.insert(app_id.clone());
            info!("dock: added {}", app_id);
        }
        self.mark_running(&app_id, true);
        added
    }

    /// A client window was closed.  The last window of an unpinned app
    /// starts its slot's fade-out.
    pub fn window_closed(&mut self, address: &str, sched: &mut Scheduler) {
        let Some(app_id) = self.windows.remove(address) else {
            debug!("dock: closed window {} unknown", address);
            return;
        };
        let Some(app) = self.apps.get_mut(&app_id) else {
            return;
        };
        app.windows.retain(|w| w != address);
        if !app.windows.is_empty() {
            return;
        }

        if self.pinned.slot_of(&app_id).is_some() {
            self.apps.remove(&app_id);
            self.mark_running(&app_id, false);
            return;
        }

        let Some(ticket) = app.lifecycle.begin_fade() else {
            return;
        };
        let fade = Duration::from_millis(self.config.fade_out_ms);
        let handle = sched.schedule(
            fade,
            Deferred::DockRemove {
                app_id: app_id.clone(),
                ticket,
            },
        );
        if let Some(previous) = app.lifecycle.set_timer(handle) {
            sched.cancel(previous);
        }
        self.live.set_flag(&app_id, SlotFlags::FADING, true);
        self.live.set_flag(&app_id, SlotFlags::RUNNING, false);
        debug!("dock: {} fading", app_id);
        self.flash(fade, sched);
    }

    /// Keyboard focus moved to `address`.
    pub fn window_focused(&mut self, address: &str) {
        self.pinned.clear_flag(SlotFlags::ACTIVE);
        self.live.clear_flag(SlotFlags::ACTIVE);
        let Some(app_id) = self.windows.get(address).cloned() else {
            return;
        };
        if let Some(app) = self.apps.get_mut(&app_id) {
            app.windows.retain(|w| w != address);
            app.windows.insert(0, address.to_string());
        }
        self.pinned.set_flag(&app_id, SlotFlags::ACTIVE, true);
        self.live.set_flag(&app_id, SlotFlags::ACTIVE, true);
    }

    /// Fade-out of a live slot elapsed.
    pub fn complete_remove(&mut self, app_id: &str, ticket: Ticket) {
        let finished = self
            .apps
            .get_mut(app_id)
            .is_some_and(|a| a.lifecycle.finish_fade(ticket));
        if !finished {
            debug!("dock: stale removal of {} ({})", app_id, ticket.value());
            return;
        }
        self.apps.remove(app_id);
        self.live.remove_slot(&app_id.to_string());
        info!("dock: removed {}", app_id);
    }

    //  Flash

    fn flash(&mut self, duration: Duration, sched: &mut Scheduler) {
        let ticket = self.flash.bump();
        if let Some(previous) = self.flash_timer.take() {
            sched.cancel(previous);
        }
        self.flash_timer = Some(sched.schedule(duration, Deferred::DockFlashEnd { ticket }));
        self.flashing = true;
    }

    pub fn flash_end(&mut self, ticket: Ticket) {
        if !self.flash.is_current(ticket) {
            debug!("dock: stale flash end ({})", ticket.value());
            return;
        }
        self.flashing = false;
        self.flash_timer = None;
    }

    //  Pinning

    /// Pin `app_id`.  A running app moves from the live strip to the pinned
    /// one.  Returns `false` if it was already pinned.
    pub fn pin(&mut self, app_id: &str, sched: &mut Scheduler) -> bool {
        let key = app_id.to_string();
        if self.pinned.slot_of(&key).is_some() {
            return false;
        }
        self.pinned.insert(key.clone());
        self.live.remove_slot(&key);

        let fading = self
            .apps
            .get(app_id)
            .is_some_and(|a| a.lifecycle.state() == ItemState::FadingOut);
        if fading {
            if let Some(mut app) = self.apps.remove(app_id) {
                if let Some(timer) = app.lifecycle.remove_now() {
                    sched.cancel(timer);
                }
            }
        }
        let running = self.apps.contains_key(app_id);
        self.mark_running(app_id, running);
        info!("dock: pinned {}", app_id);
        true
    }

    /// Unpin `app_id`.  A running app gets a live slot.
    pub fn unpin(&mut self, app_id: &str) -> bool {
        let key = app_id.to_string();
        if self.pinned.remove_slot(&key).is_none() {
            debug!("dock: {} not pinned", app_id);
            return false;
        }
        if self.apps.contains_key(app_id) {
            self.live.insert(key);
            self.mark_running(app_id, true);
        }
        info!("dock: unpinned {}", app_id);
        true
    }

    /// Replace the pinned list at startup.
    pub fn load_pins(&mut self, ids: &[String]) {
        for id in ids {
            self.pinned.insert(id.clone());
        }
    }

    /// What pressing `app_id`'s slot does.
    pub fn press(&self, app_id: &str) -> Option<DockPress> {
        if let Some(window) = self.apps.get(app_id).and_then(|a| a.windows.first()) {
            return Some(DockPress::Focus(window.clone()));
        }
        if self.is_pinned(app_id) {
            return Some(DockPress::Launch(app_id.to_string()));
        }
        debug!("dock: press on unknown {}", app_id);
        None
    }

    fn mark_running(&mut self, app_id: &str, running: bool) {
        let key = app_id.to_string();
        self.pinned.set_flag(&key, SlotFlags::RUNNING, running);
        self.live.set_flag(&key, SlotFlags::RUNNING, running);
    }
}

/// Whether any window on `workspace` overlaps the dock rectangle.
pub fn check_obstructed(rect: (i32, i32, u32, u32), clients: &[ClientInfo], workspace: i32) -> bool {
    clients
        .iter()
        .filter(|c| c.workspace == workspace)
        .any(|c| c.overlaps(rect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::assert_unique;
    use std::time::Instant;

    fn client(address: &str, app_id: &str) -> ClientInfo {
        ClientInfo {
            address: address.into(),
            app_id: app_id.into(),
            title: app_id.into(),
            workspace: 1,
            at: (0, 0),
            size: (100, 100),
        }
    }

    fn advance(dock: &mut Dock, sched: &mut Scheduler, t0: Instant, ms: u64) {
        sched.set_now(t0 + Duration::from_millis(ms));
        for task in sched.pop_due() {
            match task {
                Deferred::DockRemove { app_id, ticket } => dock.complete_remove(&app_id, ticket),
                Deferred::DockFlashEnd { ticket } => dock.flash_end(ticket),
                other => panic!("unexpected task {:?}", other),
            }
        }
    }

    fn config() -> DockConfig {
        DockConfig {
            flash_ms: 250,
            ..DockConfig::default()
        }
    }

    #[test]
    fn open_close_scenario() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut dock = Dock::new(config());
        dock.set_obstructed(true);
        assert!(!dock.is_revealed());

        dock.window_opened(&client("0x1", "A"), &mut sched);
        assert!(dock.is_flashing());
        assert!(dock.is_revealed());
        assert_eq!(dock.live_ids(), vec!["A".to_string()]);

        advance(&mut dock, &mut sched, t0, 250);
        assert!(!dock.is_revealed(), "obstructed once the flash ends");

        dock.window_closed("0x1", &mut sched);
        assert_eq!(dock.state_of("A"), Some(ItemState::FadingOut));
        assert!(dock.is_revealed());
        assert_eq!(dock.live_ids(), vec!["A".to_string()]);

        advance(&mut dock, &mut sched, t0, 499);
        assert!(dock.is_tracked("A"));
        advance(&mut dock, &mut sched, t0, 500);
        assert!(!dock.is_tracked("A"));
        assert!(dock.is_empty());
        assert!(!dock.is_revealed());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn startup_windows_load_without_flash() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut dock = Dock::new(config());
        dock.load_pins(&["foot".to_string()]);
        dock.populate(&[client("0x1", "A"), client("0x2", "foot"), client("0x3", "A")], &mut sched);
        assert!(!dock.is_flashing());
        assert_eq!(sched.pending(), 0);
        assert_eq!(dock.live_ids(), vec!["A".to_string()]);
        assert_ne!(dock.view().pinned[0].flags & SlotFlags::RUNNING.bits(), 0);

        dock.window_opened(&client("0x4", "B"), &mut sched);
        assert!(dock.is_flashing());
    }

    #[test]
    fn reopen_during_fade_keeps_slot() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut dock = Dock::new(config());
        dock.window_opened(&client("0x1", "A"), &mut sched);
        dock.window_opened(&client("0x2", "B"), &mut sched);
        let slot = dock.view().live[0].slot;

        dock.window_closed("0x1", &mut sched);
        advance(&mut dock, &mut sched, t0, 100);
        dock.window_opened(&client("0x3", "A"), &mut sched);
        assert_eq!(dock.state_of("A"), Some(ItemState::Shown));

        advance(&mut dock, &mut sched, t0, 1000);
        assert!(dock.is_tracked("A"));
        let view = dock.view();
        assert_eq!(view.live[0].slot, slot);
        assert_eq!(view.live[0].app_id, "A");
        assert_eq!(view.live[0].flags & SlotFlags::FADING.bits(), 0);
        assert_unique(dock.live.slots());
    }

    #[test]
    fn second_window_does_not_add_slot() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut dock = Dock::new(config());
        dock.window_opened(&client("0x1", "A"), &mut sched);
        dock.window_opened(&client("0x2", "A"), &mut sched);
        assert_eq!(dock.live_ids().len(), 1);
        dock.window_closed("0x1", &mut sched);
        assert_eq!(dock.state_of("A"), Some(ItemState::Shown));
        assert_eq!(dock.press("A"), Some(DockPress::Focus("0x2".into())));
    }

    #[test]
    fn pinned_apps_show_running_flag() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut dock = Dock::new(config());
        dock.load_pins(&["foot".to_string()]);
        assert!(!dock.separator_visible());

        dock.window_opened(&client("0x1", "foot"), &mut sched);
        assert!(dock.live_ids().is_empty());
        let pinned = &dock.view().pinned[0];
        assert_ne!(pinned.flags & SlotFlags::RUNNING.bits(), 0);

        dock.window_opened(&client("0x2", "firefox"), &mut sched);
        assert!(dock.separator_visible());

        dock.window_closed("0x1", &mut sched);
        assert!(!dock.is_tracked("foot"));
        assert_eq!(dock.pinned_ids(), vec!["foot".to_string()]);
        assert_eq!(dock.press("foot"), Some(DockPress::Launch("foot".into())));
    }

    #[test]
    fn pin_and_unpin_move_between_strips() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut dock = Dock::new(config());
        dock.window_opened(&client("0x1", "A"), &mut sched);
        assert!(dock.pin("A", &mut sched));
        assert!(!dock.pin("A", &mut sched));
        assert!(dock.live_ids().is_empty());
        assert_eq!(dock.pinned_ids(), vec!["A".to_string()]);

        assert!(dock.unpin("A"));
        assert_eq!(dock.live_ids(), vec!["A".to_string()]);
        assert!(!dock.unpin("A"));
    }

    #[test]
    fn hover_reveals_obstructed_dock() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut dock = Dock::new(DockConfig {
            flash_on_app_added: false,
            ..config()
        });
        dock.window_opened(&client("0x1", "A"), &mut sched);
        dock.set_obstructed(true);
        assert!(!dock.is_revealed());
        dock.set_hovered(true);
        assert!(dock.is_revealed());
    }

    #[test]
    fn unknown_window_close_is_noop() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut dock = Dock::new(config());
        dock.window_closed("0xdead", &mut sched);
        assert!(dock.is_empty());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn obstruction_uses_monitor_geometry() {
        let dock = Dock::new(DockConfig {
            width: 600,
            height: 64,
            ..DockConfig::default()
        });
        let monitor = MonitorInfo {
            name: "DP-1".into(),
            width: 2560,
            height: 1440,
            x: 1920,
            y: 0,
        };
        let rect = dock.rect_on(&monitor);
        assert_eq!(rect, (1920 + 980, 1376, 600, 64));

        let mut c = client("0x1", "A");
        c.at = (1920, 0);
        c.size = (2560, 1440);
        assert!(check_obstructed(rect, &[c.clone()], 1));
        assert!(!check_obstructed(rect, &[c.clone()], 2));
        c.size = (2560, 1300);
        assert!(!check_obstructed(rect, &[c], 1));
    }
}
