//! Core traits that decouple the shell from any specific compositor,
//! application database or transport.
//!
//! Every concrete backend (Hyprland, the desktop-entry registry, the Unix
//! socket listener, a test harness) implements one of these traits.  The
//! [`Shell`](crate::shell::Shell) only depends on these abstractions.

use crate::applet::{AppletKind, DashboardState};
use crate::command::{ClientInfo, MonitorInfo, Service, ShellEvent};
use crate::dock::DockView;
use crate::notifications::NotificationView;
use crate::osd::OsdView;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;

/// Abstraction over the compositor the shell runs on.
///
/// An implementation might talk to Hyprland via IPC, or it might be a
/// recording stub used in tests.
pub trait Compositor {
    /// The error type produced by this compositor.
    type Error: std::error::Error + Send + 'static;

    /// Return the list of monitors the compositor knows about.
    fn monitors(&self) -> Result<Vec<MonitorInfo>, Self::Error>;

    /// Every mapped client window.
    fn clients(&self) -> Result<Vec<ClientInfo>, Self::Error>;

    /// Id of the workspace shown on the focused monitor.
    fn active_workspace(&self) -> Result<i32, Self::Error>;

    /// Name of the focused monitor, or `None` if no monitor is focused.
    fn active_monitor(&self) -> Result<Option<String>, Self::Error>;

    /// Switch the focused monitor to `workspace_id`.
    fn focus_workspace(&self, workspace_id: i32) -> Result<(), Self::Error>;

    /// Focus the window with the given address.
    fn focus_window(&self, address: &str) -> Result<(), Self::Error>;
}

//  Applications

/// An installed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Desktop-file id (file stem, e.g. `org.mozilla.firefox`).
    pub id: String,
    pub name: String,
    /// Command line with field codes (`%u`, `%F`, ...) already stripped.
    pub exec: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub wm_class: Option<String>,
}

/// The set of launchable applications.
pub trait AppRegistry {
    type Error: std::error::Error + Send + 'static;

    /// Every visible application, sorted by name.
    fn apps(&self) -> Vec<AppInfo>;

    /// Resolve an app id, WM class, display name or executable to an
    /// application.
    fn lookup(&self, ident: &str) -> Option<AppInfo>;

    /// Start `app` detached from the shell.
    fn launch(&self, app: &AppInfo) -> Result<(), Self::Error>;
}

//  Renderer

/// One carousel slot, for the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarouselSlotView {
    pub position: usize,
    pub item: Option<String>,
    pub flags: u16,
}

/// Events sent from the [`Shell`](crate::shell::Shell) to a renderer over an
/// [`mpsc`](std::sync::mpsc) channel.
///
/// Every variant is a complete snapshot of one surface, so a renderer that
/// missed events only has to apply the latest one per surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ViewEvent {
    /// The pill: active applet, dashboard sub-state and keyboard grab.
    Pill {
        active: AppletKind,
        dashboard: DashboardState,
        input_grabbed: bool,
    },
    Dock(DockView),
    Notifications(Vec<NotificationView>),
    /// `None` hides the on-screen display.
    Osd(Option<OsdView>),
    Workspaces(Vec<crate::workspaces::WorkspaceView>),
    Media(Vec<CarouselSlotView>),
    Wallpapers(Vec<CarouselSlotView>),
    Launcher {
        query: String,
        results: Vec<AppInfo>,
        selected: usize,
    },
    PowerMenu {
        selected: crate::power::PowerAction,
        confirming: Option<crate::power::PowerAction>,
    },
    /// A widget lost (or regained) its backing service.
    Degraded { service: Service, degraded: bool },
}

//  Event Source

/// A source of [`ShellEvent`]s.
///
/// Implementations listen on some transport (a Unix socket, Hyprland's
/// event stream, an in-memory channel) and forward parsed events into the
/// provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](EventSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received event must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait EventSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming event into `sink`.
    ///
    /// This method blocks the calling thread.  To run multiple sources
    /// concurrently, spawn each one on its own thread.
    fn run(&mut self, sink: mpsc::Sender<ShellEvent>) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{AppletTarget, Command, Direction};
    use std::cell::RefCell;
    use std::sync::mpsc;

    //  Mock Compositor

    /// A test double that records every call made to it.
    #[derive(Debug, Default)]
    struct MockCompositor {
        focus_log: RefCell<Vec<i32>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("mock error")]
    struct MockError;

    impl Compositor for MockCompositor {
        type Error = MockError;

        fn monitors(&self) -> Result<Vec<MonitorInfo>, MockError> {
            Ok(vec![MonitorInfo {
                name: "MOCK-1".into(),
                width: 1920,
                height: 1080,
                x: 0,
                y: 0,
            }])
        }

        fn clients(&self) -> Result<Vec<ClientInfo>, MockError> {
            Ok(Vec::new())
        }

        fn active_workspace(&self) -> Result<i32, MockError> {
            Ok(1)
        }

        fn active_monitor(&self) -> Result<Option<String>, MockError> {
            Ok(Some("MOCK-1".into()))
        }

        fn focus_workspace(&self, ws: i32) -> Result<(), MockError> {
            self.focus_log.borrow_mut().push(ws);
            Ok(())
        }

        fn focus_window(&self, _address: &str) -> Result<(), MockError> {
            Err(MockError)
        }
    }

    #[test]
    fn mock_compositor_records_focus() {
        let c = MockCompositor::default();
        c.focus_workspace(4).unwrap();
        assert_eq!(*c.focus_log.borrow(), vec![4]);
        assert!(c.focus_window("0x1").is_err());
    }

    //  Mock EventSource

    /// A test double that emits a fixed sequence of events.
    struct MockSource {
        events: Vec<ShellEvent>,
    }

    impl EventSource for MockSource {
        type Error = MockError;

        fn run(&mut self, sink: mpsc::Sender<ShellEvent>) -> Result<(), MockError> {
            for event in self.events.drain(..) {
                let _ = sink.send(event);
            }
            Ok(())
        }
    }

    #[test]
    fn mock_source_emits_events() {
        let mut src = MockSource {
            events: vec![
                ShellEvent::Command(Command::CycleWallpaper(Direction::Forward)),
                ShellEvent::Command(Command::SelectApplet(AppletTarget {
                    applet: "launcher".into(),
                    expand: false,
                })),
                ShellEvent::WorkspaceChanged { id: 3 },
            ],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let events: Vec<ShellEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], ShellEvent::WorkspaceChanged { id: 3 });
    }

    #[test]
    fn view_events_serialize() {
        let event = ViewEvent::Degraded {
            service: Service::Audio,
            degraded: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"Degraded":{"service":"Audio","degraded":true}}"#);
    }
}
