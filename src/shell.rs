//! The orchestrator that ties the controllers, the compositor and the
//! renderer together.
//!
//! [`Shell`] lives on the UI thread.  It owns every controller, applies one
//! [`ShellEvent`] at a time, runs due deferred tasks, and publishes
//! [`ViewEvent`] snapshots of the surfaces an event touched.

use crate::applet::{AppletEffect, AppletKind, AppletMachine};
use crate::command::{Command, Direction, Key, PointerTarget, Service, ShellEvent, Strip};
use crate::config::Config;
use crate::dock::{check_obstructed, Dock, DockPress};
use crate::exec;
use crate::launcher::{Launcher, LauncherOutcome};
use crate::media::MediaTabs;
use crate::notifications::NotificationStack;
use crate::osd::{Osd, OsdKind};
use crate::power::{PowerAction, PowerMenu, PowerOutcome};
use crate::store::{LaunchHistory, PinStore, StoreError};
use crate::timer::{Deferred, Scheduler};
use crate::traits::{AppInfo, AppRegistry, Compositor, ViewEvent};
use crate::wallpaper::{apply_command, WallpaperSelector};
use crate::workspaces::Workspaces;
use bitflags::bitflags;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Possible errors from the shell.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The compositor returned an error.
    #[error("compositor error: {0}")]
    Compositor(String),

    /// An application could not be started.
    #[error("launch error: {0}")]
    Launch(String),

    /// A persisted state file could not be written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

bitflags! {
    /// Surfaces whose snapshot must be republished.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Surfaces: u16 {
        const PILL = 1 << 0;
        const DOCK = 1 << 1;
        const NOTIFICATIONS = 1 << 2;
        const OSD = 1 << 3;
        const WORKSPACES = 1 << 4;
        const MEDIA = 1 << 5;
        const WALLPAPERS = 1 << 6;
        const LAUNCHER = 1 << 7;
        const POWER = 1 << 8;
    }
}

/// Owns all shell state.
///
/// The shell is generic over any [`Compositor`] and [`AppRegistry`], so the
/// tests drive it with recording doubles instead of Hyprland.
///
/// # Typical usage
///
/// ```ignore
/// let mut shell = Shell::new(HyprlandCompositor::new(), registry, config, history, pins, Instant::now());
/// shell.set_view_sink(view_tx);
/// shell.init()?;
/// shell.handle(ShellEvent::Command(Command::Expand), Instant::now())?;
/// ```
pub struct Shell<C: Compositor, R: AppRegistry> {
    compositor: C,
    registry: R,
    config: Config,
    wallpaper_dir: PathBuf,
    sched: Scheduler,

    applets: AppletMachine,
    power: PowerMenu,
    launcher: Launcher,
    wallpapers: WallpaperSelector,
    media: MediaTabs,
    dock: Dock,
    notifications: NotificationStack,
    osd: Osd,
    workspaces: Workspaces,

    history: LaunchHistory,
    pins: PinStore,
    degraded: HashSet<Service>,
    fullscreen: bool,

    view_tx: Option<mpsc::Sender<ViewEvent>>,
    event_tx: Option<mpsc::Sender<ShellEvent>>,
}

impl<C: Compositor, R: AppRegistry> Shell<C, R> {
    pub fn new(
        compositor: C,
        registry: R,
        config: Config,
        history: LaunchHistory,
        pins: PinStore,
        now: Instant,
    ) -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
        let wallpaper_dir = config.wallpaper.directory_path(&home);
        let mut dock = Dock::new(config.dock.clone());
        dock.load_pins(pins.ids());

        Self {
            applets: AppletMachine::new(),
            power: PowerMenu::new(),
            launcher: Launcher::new(config.launcher.max_results),
            wallpapers: WallpaperSelector::new(),
            media: MediaTabs::new(),
            dock,
            notifications: NotificationStack::new(&config.notifications),
            osd: Osd::new(Duration::from_millis(config.osd.timeout_ms)),
            workspaces: Workspaces::new(config.workspaces.count),
            compositor,
            registry,
            wallpaper_dir,
            config,
            sched: Scheduler::new(now),
            history,
            pins,
            degraded: HashSet::new(),
            fullscreen: false,
            view_tx: None,
            event_tx: None,
        }
    }

    /// Attach the renderer channel.
    pub fn set_view_sink(&mut self, tx: mpsc::Sender<ViewEvent>) {
        self.view_tx = Some(tx);
    }

    /// Attach the UI thread's own event channel.  Background commands
    /// (wallpaper, power actions) report their results through it.
    pub fn set_event_sink(&mut self, tx: mpsc::Sender<ShellEvent>) {
        self.event_tx = Some(tx);
    }

    //  Accessors

    pub fn applets(&self) -> &AppletMachine {
        &self.applets
    }

    pub fn dock(&self) -> &Dock {
        &self.dock
    }

    pub fn notifications(&self) -> &NotificationStack {
        &self.notifications
    }

    pub fn workspaces(&self) -> &Workspaces {
        &self.workspaces
    }

    pub fn wallpapers(&self) -> &WallpaperSelector {
        &self.wallpapers
    }

    pub fn media(&self) -> &MediaTabs {
        &self.media
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn power(&self) -> &PowerMenu {
        &self.power
    }

    pub fn history(&self) -> &LaunchHistory {
        &self.history
    }

    pub fn is_degraded(&self, service: Service) -> bool {
        self.degraded.contains(&service)
    }

    /// When the main loop must wake up next to run deferred work.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sched.next_deadline()
    }

    //  Entry points

    /// Read the initial state from the compositor, the registry and the
    /// wallpaper directory, then publish every surface.
    pub fn init(&mut self) -> Result<(), ShellError> {
        self.launcher.set_apps(self.registry.apps(), &self.history);
        self.wallpapers.rescan(&self.wallpaper_dir);

        let result = self.sync_compositor();
        self.publish(Surfaces::all());
        result
    }

    /// Apply one event at time `now`.
    ///
    /// Every touched surface is republished even when the event fails
    /// halfway (e.g. the compositor is unreachable).
    pub fn handle(&mut self, event: ShellEvent, now: Instant) -> Result<(), ShellError> {
        self.sched.set_now(now);
        let mut dirty = Surfaces::empty();
        let result = self.dispatch(event, &mut dirty);
        self.publish(dirty);
        result
    }

    /// Run every deferred task due at `now`.
    pub fn fire_due(&mut self, now: Instant) {
        self.sched.set_now(now);
        let mut dirty = Surfaces::empty();
        for task in self.sched.pop_due() {
            debug!("deferred: {:?}", task);
            match task {
                Deferred::DockRemove { app_id, ticket } => {
                    self.dock.complete_remove(&app_id, ticket);
                    dirty |= Surfaces::DOCK;
                }
                Deferred::DockFlashEnd { ticket } => {
                    self.dock.flash_end(ticket);
                    dirty |= Surfaces::DOCK;
                }
                Deferred::NotificationExpire { slot, ticket } => {
                    self.notifications.expire(slot, ticket, &mut self.sched);
                    dirty |= Surfaces::NOTIFICATIONS;
                }
                Deferred::NotificationFinalize { slot, ticket } => {
                    self.notifications.finalize(slot, ticket, &mut self.sched);
                    dirty |= Surfaces::NOTIFICATIONS;
                }
                Deferred::OsdHide { ticket } => {
                    if self.osd.hide(ticket) {
                        dirty |= Surfaces::OSD;
                    }
                }
            }
        }
        self.publish(dirty);
    }

    //  Dispatch

    fn dispatch(&mut self, event: ShellEvent, dirty: &mut Surfaces) -> Result<(), ShellError> {
        match event {
            ShellEvent::Command(cmd) => return self.handle_command(cmd, dirty),

            ShellEvent::WindowOpened(client) => {
                debug!("window opened: {} ({})", client.address, client.app_id);
                self.dock.window_opened(&client, &mut self.sched);
                self.workspaces.window_placed(&client.address, client.workspace);
                *dirty |= Surfaces::DOCK | Surfaces::WORKSPACES;
                return self.refresh_obstruction();
            }
            ShellEvent::WindowClosed { address } => {
                debug!("window closed: {}", address);
                self.dock.window_closed(&address, &mut self.sched);
                self.workspaces.window_closed(&address);
                *dirty |= Surfaces::DOCK | Surfaces::WORKSPACES;
                return self.refresh_obstruction();
            }
            ShellEvent::WindowFocused { address } => {
                self.dock.window_focused(&address);
                *dirty |= Surfaces::DOCK;
            }
            ShellEvent::WindowMoved { address, workspace } => {
                self.workspaces.window_placed(&address, workspace);
                *dirty |= Surfaces::DOCK | Surfaces::WORKSPACES;
                return self.refresh_obstruction();
            }
            ShellEvent::WorkspaceChanged { id } => {
                info!("workspace {}", id);
                self.workspaces.set_active(id);
                *dirty |= Surfaces::DOCK | Surfaces::WORKSPACES;
                return self.refresh_obstruction();
            }
            ShellEvent::Fullscreen(on) => {
                self.fullscreen = on;
                *dirty |= Surfaces::DOCK;
                return self.refresh_obstruction();
            }
            ShellEvent::MonitorsChanged => {
                *dirty |= Surfaces::DOCK;
                return self.refresh_obstruction();
            }

            ShellEvent::Notify(notification) => {
                self.notifications.notify(notification, &mut self.sched);
                *dirty |= Surfaces::NOTIFICATIONS;
            }
            ShellEvent::CloseNotification { id } => {
                self.notifications.close(id, &mut self.sched);
                *dirty |= Surfaces::NOTIFICATIONS;
            }
            ShellEvent::DismissNotification { slot } => {
                self.notifications.dismiss(slot, &mut self.sched);
                *dirty |= Surfaces::NOTIFICATIONS;
            }

            ShellEvent::PlayerAdded(player) => {
                self.media.player_added(player);
                *dirty |= Surfaces::MEDIA;
            }
            ShellEvent::PlayerChanged(player) => {
                self.media.player_changed(player);
                *dirty |= Surfaces::MEDIA;
            }
            ShellEvent::PlayerRemoved { name } => {
                self.media.player_removed(&name);
                *dirty |= Surfaces::MEDIA;
            }

            ShellEvent::Volume { percent, muted } => {
                if self.osd.volume(percent, muted, &mut self.sched) {
                    *dirty |= Surfaces::OSD;
                }
            }
            ShellEvent::Brightness { percent } => {
                if self.osd.brightness(percent, &mut self.sched) {
                    *dirty |= Surfaces::OSD;
                }
            }
            ShellEvent::ServiceAvailability { service, available } => {
                self.set_availability(service, available, dirty);
            }

            ShellEvent::Pointer { target, inside } => match target {
                PointerTarget::Pill => {
                    let effects = if inside {
                        self.applets.pointer_enter()
                    } else {
                        self.applets.pointer_leave()
                    };
                    self.apply_effects(effects, dirty);
                }
                PointerTarget::Dock => {
                    self.dock.set_hovered(inside);
                    *dirty |= Surfaces::DOCK;
                }
            },
            ShellEvent::SlotPressed { strip, position } => {
                return self.slot_pressed(strip, position, dirty);
            }
            ShellEvent::DockPressed { app_id } => {
                return match self.dock.press(&app_id) {
                    Some(DockPress::Focus(address)) => self
                        .compositor
                        .focus_window(&address)
                        .map_err(|e| ShellError::Compositor(e.to_string())),
                    Some(DockPress::Launch(id)) => match self.registry.lookup(&id) {
                        Some(app) => self.launch(app),
                        None => {
                            warn!("no application found for pinned {}", id);
                            Ok(())
                        }
                    },
                    None => Ok(()),
                };
            }

            ShellEvent::WallpaperApplied { path, ok } => {
                self.wallpapers.applied(path, ok);
                *dirty |= Surfaces::WALLPAPERS;
            }
            ShellEvent::PowerActionDone { ok } => {
                if !ok {
                    warn!("power action failed");
                }
            }
        }
        Ok(())
    }

    fn handle_command(&mut self, cmd: Command, dirty: &mut Surfaces) -> Result<(), ShellError> {
        match cmd {
            Command::SelectApplet(target) => {
                info!("select applet {} (expand: {})", target.applet, target.expand);
                let effects = self.applets.select_by_name(&target.applet, target.expand);
                self.apply_effects(effects, dirty);
            }
            Command::Peek => {
                let effects = self.applets.peek();
                self.apply_effects(effects, dirty);
            }
            Command::Expand => {
                let effects = self.applets.expand();
                self.apply_effects(effects, dirty);
            }
            Command::Collapse => {
                let effects = self.applets.unpeek();
                self.apply_effects(effects, dirty);
            }
            Command::Key(key) => return self.route_key(key, dirty),
            Command::CycleWallpaper(direction) => {
                self.wallpapers.cycle(direction);
                *dirty |= Surfaces::WALLPAPERS;
            }
            Command::CycleMedia(direction) => {
                self.media.cycle(direction);
                *dirty |= Surfaces::MEDIA;
            }
            Command::RescanWallpapers => {
                self.wallpapers.rescan(&self.wallpaper_dir);
                *dirty |= Surfaces::WALLPAPERS;
            }
            Command::Pin(app_id) => {
                if self.dock.pin(&app_id, &mut self.sched) {
                    *dirty |= Surfaces::DOCK;
                    self.pins.set(self.dock.pinned_ids())?;
                }
            }
            Command::Unpin(app_id) => {
                if self.dock.unpin(&app_id) {
                    *dirty |= Surfaces::DOCK;
                    self.pins.set(self.dock.pinned_ids())?;
                }
            }
            Command::Launch(ident) => match self.registry.lookup(&ident) {
                Some(app) => return self.launch(app),
                None => warn!("no application matches {:?}", ident),
            },
            Command::LauncherQuery(query) => {
                self.launcher.set_query(&query, &self.history);
                *dirty |= Surfaces::LAUNCHER;
            }
        }
        Ok(())
    }

    /// Keys go to the active applet.  Escape closes an open power-menu
    /// popup first; otherwise it is handled by the applet machine.
    fn route_key(&mut self, key: Key, dirty: &mut Surfaces) -> Result<(), ShellError> {
        let active = self.applets.active();
        if key == Key::Escape {
            if active == AppletKind::PowerMenu && self.power.popup_open() {
                self.power.close_popup();
                *dirty |= Surfaces::POWER;
            } else {
                let effects = self.applets.escape();
                self.apply_effects(effects, dirty);
            }
            return Ok(());
        }

        match active {
            AppletKind::Dashboard => debug!("dashboard ignores {:?}", key),
            AppletKind::PowerMenu => match self.power.key(key) {
                PowerOutcome::Run(action) => {
                    self.run_power_action(action);
                    let effects = self.applets.select(AppletKind::Dashboard, false);
                    self.apply_effects(effects, dirty);
                }
                PowerOutcome::Redraw => *dirty |= Surfaces::POWER,
                PowerOutcome::Ignored => {}
            },
            AppletKind::Launcher => match self.launcher.key(key) {
                LauncherOutcome::Launch(app) => {
                    let result = self.launch(app);
                    let effects = self.applets.select(AppletKind::Dashboard, false);
                    self.apply_effects(effects, dirty);
                    return result;
                }
                LauncherOutcome::Redraw => *dirty |= Surfaces::LAUNCHER,
                LauncherOutcome::Ignored => {}
            },
            AppletKind::Wallpaper => {
                match key {
                    Key::Left | Key::Up => {
                        self.wallpapers.cycle(Direction::Backward);
                    }
                    Key::Right | Key::Down => {
                        self.wallpapers.cycle(Direction::Forward);
                    }
                    Key::Enter => {
                        if let Some(path) = self.wallpapers.begin_apply() {
                            self.apply_wallpaper(path);
                        }
                    }
                    Key::Escape => {}
                }
                *dirty |= Surfaces::WALLPAPERS;
            }
        }
        Ok(())
    }

    fn slot_pressed(&mut self, strip: Strip, position: usize, dirty: &mut Surfaces) -> Result<(), ShellError> {
        match strip {
            Strip::Wallpaper => {
                if let Some(path) = self.wallpapers.press(position) {
                    self.apply_wallpaper(path);
                }
                *dirty |= Surfaces::WALLPAPERS;
            }
            Strip::Media => {
                if let Some(player) = self.media.press(position) {
                    info!("media: activate {}", player);
                }
                *dirty |= Surfaces::MEDIA;
            }
            Strip::Workspaces => match self.workspaces.id_at(position) {
                Some(id) => {
                    return self
                        .compositor
                        .focus_workspace(id)
                        .map_err(|e| ShellError::Compositor(e.to_string()));
                }
                None => debug!("no workspace indicator at {}", position),
            },
        }
        Ok(())
    }

    /// Translate applet-machine effects into controller hooks.
    fn apply_effects(&mut self, effects: Vec<AppletEffect>, dirty: &mut Surfaces) {
        for effect in effects {
            debug!("applet effect: {:?}", effect);
            match effect {
                AppletEffect::Hide(AppletKind::PowerMenu) => {
                    self.power.reset();
                    *dirty |= Surfaces::POWER;
                }
                AppletEffect::Hide(AppletKind::Launcher) => {
                    self.launcher.reset(&self.history);
                    *dirty |= Surfaces::LAUNCHER;
                }
                AppletEffect::Hide(_) => {}
                AppletEffect::Unhide {
                    applet: AppletKind::Launcher,
                    ..
                } => {
                    self.launcher.set_apps(self.registry.apps(), &self.history);
                    *dirty |= Surfaces::LAUNCHER;
                }
                AppletEffect::Unhide {
                    applet: AppletKind::PowerMenu,
                    ..
                } => *dirty |= Surfaces::POWER,
                AppletEffect::Unhide {
                    applet: AppletKind::Wallpaper,
                    ..
                } => *dirty |= Surfaces::WALLPAPERS,
                AppletEffect::Unhide { .. } => {}
                AppletEffect::Dashboard(_) | AppletEffect::StealInput | AppletEffect::ReturnInput => {}
            }
            *dirty |= Surfaces::PILL;
        }
    }

    //  Side effects

    fn launch(&mut self, app: AppInfo) -> Result<(), ShellError> {
        self.registry
            .launch(&app)
            .map_err(|e| ShellError::Launch(e.to_string()))?;
        let count = self.history.record(&app.id)?;
        debug!("{} launched {} times", app.id, count);
        Ok(())
    }

    fn run_power_action(&mut self, action: PowerAction) {
        let command = action.command(&self.config.power).to_string();
        info!("power action {}: {}", action, command);
        match &self.event_tx {
            Some(tx) => exec::spawn_shell(command, tx.clone(), |ok| Some(ShellEvent::PowerActionDone { ok })),
            None => warn!("no event sink, not running {}", action),
        }
    }

    fn apply_wallpaper(&mut self, path: PathBuf) {
        let command = apply_command(&self.config.wallpaper.apply_command, &path);
        match &self.event_tx {
            Some(tx) => {
                let result_path = path.clone();
                exec::spawn_shell(command, tx.clone(), move |ok| {
                    Some(ShellEvent::WallpaperApplied { path: result_path, ok })
                });
            }
            None => {
                warn!("no event sink, not applying {}", path.display());
                self.wallpapers.applied(path, false);
            }
        }
    }

    fn set_availability(&mut self, service: Service, available: bool, dirty: &mut Surfaces) {
        let changed = if available {
            self.degraded.remove(&service)
        } else {
            self.degraded.insert(service)
        };
        if !changed {
            return;
        }
        if available {
            info!("{:?} available", service);
        } else {
            warn!("{:?} unavailable", service);
        }
        let kind = match service {
            Service::Audio => Some(OsdKind::Volume),
            Service::Brightness => Some(OsdKind::Brightness),
            _ => None,
        };
        if let Some(kind) = kind {
            if self.osd.reset(kind, &mut self.sched) {
                *dirty |= Surfaces::OSD;
            }
        }
        self.send(ViewEvent::Degraded {
            service,
            degraded: !available,
        });
    }

    //  Compositor state

    fn sync_compositor(&mut self) -> Result<(), ShellError> {
        let clients = self
            .compositor
            .clients()
            .map_err(|e| ShellError::Compositor(e.to_string()))?;
        let active = self
            .compositor
            .active_workspace()
            .map_err(|e| ShellError::Compositor(e.to_string()))?;
        info!("{} client(s), workspace {}", clients.len(), active);
        self.dock.populate(&clients, &mut self.sched);
        self.workspaces.reset(&clients, active);
        self.refresh_obstruction()
    }

    /// Recompute whether a window on the active workspace covers the dock.
    fn refresh_obstruction(&mut self) -> Result<(), ShellError> {
        if !self.config.dock.auto_hide {
            self.dock.set_obstructed(false);
            return Ok(());
        }
        let monitors = self
            .compositor
            .monitors()
            .map_err(|e| ShellError::Compositor(e.to_string()))?;
        let active_name = self
            .compositor
            .active_monitor()
            .map_err(|e| ShellError::Compositor(e.to_string()))?;
        let monitor = monitors
            .iter()
            .find(|m| Some(&m.name) == active_name.as_ref())
            .or_else(|| monitors.first());
        let Some(monitor) = monitor else {
            debug!("no monitors, dock not obstructed");
            self.dock.set_obstructed(self.fullscreen);
            return Ok(());
        };
        let clients = self
            .compositor
            .clients()
            .map_err(|e| ShellError::Compositor(e.to_string()))?;
        let rect = self.dock.rect_on(monitor);
        let covered = check_obstructed(rect, &clients, self.workspaces.active());
        self.dock.set_obstructed(self.fullscreen || covered);
        Ok(())
    }

    //  Publishing

    fn send(&self, event: ViewEvent) {
        if let Some(tx) = &self.view_tx {
            if tx.send(event).is_err() {
                debug!("view receiver gone");
            }
        }
    }

    fn publish(&mut self, dirty: Surfaces) {
        if dirty.contains(Surfaces::PILL) {
            self.send(ViewEvent::Pill {
                active: self.applets.active(),
                dashboard: self.applets.dashboard(),
                input_grabbed: self.applets.input_grabbed(),
            });
        }
        if dirty.contains(Surfaces::DOCK) {
            self.send(ViewEvent::Dock(self.dock.view()));
        }
        if dirty.contains(Surfaces::NOTIFICATIONS) {
            self.send(ViewEvent::Notifications(self.notifications.view()));
            self.notifications.settle();
        }
        if dirty.contains(Surfaces::OSD) {
            self.send(ViewEvent::Osd(self.osd.view()));
        }
        if dirty.contains(Surfaces::WORKSPACES) {
            self.send(ViewEvent::Workspaces(self.workspaces.view()));
        }
        if dirty.contains(Surfaces::MEDIA) {
            self.send(ViewEvent::Media(self.media.view()));
            self.media.settle();
        }
        if dirty.contains(Surfaces::WALLPAPERS) {
            self.send(ViewEvent::Wallpapers(self.wallpapers.view()));
        }
        if dirty.contains(Surfaces::LAUNCHER) {
            self.send(ViewEvent::Launcher {
                query: self.launcher.query().to_string(),
                results: self.launcher.results(),
                selected: self.launcher.selected_index(),
            });
        }
        if dirty.contains(Surfaces::POWER) {
            self.send(ViewEvent::PowerMenu {
                selected: self.power.selected(),
                confirming: self.power.confirming(),
            });
        }
    }
}

//  Tests
