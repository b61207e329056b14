//! Commands, events and shared types used throughout hyprpill.
//!
//! This module defines the vocabulary every component shares:
//! [`Command`] describes what a user (through a keybinding script) can ask
//! the shell to do, [`ShellEvent`] is everything that arrives on the UI
//! thread's channel, and [`Direction`] / [`Key`] / [`ClientInfo`] /
//! [`MonitorInfo`] are the supporting data types.
//!
//! Keybinding scripts forward raw arguments; the daemon parses direction
//! strings (e.g. "next", "left") and key names (e.g. "esc", "Return")
//! leniently.

use crate::media::PlayerInfo;
use crate::notifications::Notification;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Direction for carousel and tab cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Direction::Backward => Direction::Forward,
            Direction::Forward => Direction::Backward,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Backward => write!(f, "backward"),
            Direction::Forward => write!(f, "forward"),
        }
    }
}

/// Parse a direction string (case-insensitive; accepts "forward", "next",
/// "right", "backward", "prev", "left", …).
fn parse_direction(s: &str) -> Option<Direction> {
    let normalized: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect();
    match normalized.as_str() {
        "forward" | "next" | "right" | "down" => Some(Direction::Forward),
        "backward" | "back" | "prev" | "previous" | "left" | "up" => Some(Direction::Backward),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_direction(&s).ok_or_else(|| DeError::custom(format!("invalid direction: {:?}", s)))
    }
}

/// Keys the shell routes to the active applet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Key {
    Escape,
    Enter,
    Left,
    Right,
    Up,
    Down,
}

fn parse_key(s: &str) -> Option<Key> {
    match s.trim().to_lowercase().as_str() {
        "escape" | "esc" => Some(Key::Escape),
        "enter" | "return" | "kp_enter" => Some(Key::Enter),
        "left" => Some(Key::Left),
        "right" => Some(Key::Right),
        "up" => Some(Key::Up),
        "down" => Some(Key::Down),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_key(&s).ok_or_else(|| DeError::custom(format!("invalid key: {:?}", s)))
    }
}

/// Wire format for SelectApplet: accepts `"launcher"` or
/// `{"applet": "launcher", "expand": true}`.
///
/// The applet name is kept as a string so an unknown name reaches the applet
/// state machine, which logs it and leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppletTarget {
    pub applet: String,
    pub expand: bool,
}

impl<'de> Deserialize<'de> for AppletTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = AppletTarget;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "applet name or object {{applet, expand}}")
            }
            fn visit_map<A>(self, mut map: A) -> Result<AppletTarget, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut applet = None;
                let mut expand = false;
                while let Some(k) = map.next_key::<String>()? {
                    match k.as_str() {
                        "applet" => applet = Some(map.next_value()?),
                        "expand" => expand = map.next_value()?,
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                Ok(AppletTarget {
                    applet: applet.ok_or_else(|| DeError::missing_field("applet"))?,
                    expand,
                })
            }
            fn visit_str<E>(self, s: &str) -> Result<AppletTarget, E>
            where
                E: DeError,
            {
                Ok(AppletTarget {
                    applet: s.trim().to_string(),
                    expand: false,
                })
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// Every action a user can request from the shell.
///
/// Commands are produced by [`EventSource`](crate::traits::EventSource)
/// implementations (usually the Unix-socket listener) and consumed by the
/// [`Shell`](crate::shell::Shell).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Switch the pill to the named applet, optionally expanded.
    SelectApplet(AppletTarget),

    /// Partially reveal the dashboard.
    Peek,

    /// Fully reveal the dashboard (sticky until collapsed or Escape).
    Expand,

    /// Collapse the dashboard.
    Collapse,

    /// A key press routed to the active applet.
    Key(Key),

    /// Cycle the wallpaper carousel by one.
    CycleWallpaper(Direction),

    /// Cycle the media player tabs by one.
    CycleMedia(Direction),

    /// Re-read the wallpaper directory.
    RescanWallpapers,

    /// Pin an application (by app id) to the dock.
    Pin(String),

    /// Remove an application from the pinned dock list.
    Unpin(String),

    /// Launch an application by fuzzy identifier.
    Launch(String),

    /// Replace the launcher's search query.
    LauncherQuery(String),
}

/// External services whose absence degrades a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    Audio,
    Brightness,
    Media,
    Battery,
    Network,
    Bluetooth,
}

/// Surfaces that report pointer crossings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerTarget {
    Pill,
    Dock,
}

/// Slot strips whose individual slots can be pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strip {
    Wallpaper,
    Media,
    /// The workspace indicator row.
    Workspaces,
}

/// Everything that can arrive on the UI thread's channel.
///
/// Adapters and background workers never mutate shell state; they send one
/// of these and the UI thread applies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShellEvent {
    /// A user command.
    Command(Command),

    //  Compositor

    /// A client window was mapped.
    WindowOpened(ClientInfo),
    /// A client window was closed.
    WindowClosed { address: String },
    /// Keyboard focus moved to a window.
    WindowFocused { address: String },
    /// A window was moved to another workspace.
    WindowMoved { address: String, workspace: i32 },
    /// The active workspace changed.
    WorkspaceChanged { id: i32 },
    /// The focused window entered or left fullscreen.
    Fullscreen(bool),
    /// A monitor was added or removed.
    MonitorsChanged,

    //  Daemons

    /// A notification arrived (or replaces an earlier one).
    Notify(Notification),
    /// A notification was closed by its sender or the user.
    CloseNotification { id: u32 },
    /// A media player appeared.
    PlayerAdded(PlayerInfo),
    /// A media player's metadata or playback status changed.
    PlayerChanged(PlayerInfo),
    /// A media player vanished.
    PlayerRemoved { name: String },
    /// Audio sink volume changed.
    Volume { percent: u32, muted: bool },
    /// Backlight brightness changed.
    Brightness { percent: u32 },
    /// A daemon appeared or disappeared.
    ServiceAvailability { service: Service, available: bool },

    //  Renderer

    /// The pointer entered (`inside: true`) or left a surface.
    Pointer { target: PointerTarget, inside: bool },
    /// A carousel slot was pressed at `position` (0-based, left to right).
    SlotPressed { strip: Strip, position: usize },
    /// A pinned or live dock slot was pressed.
    DockPressed { app_id: String },
    /// A notification slot was dismissed by the user.
    DismissNotification { slot: usize },

    //  Background workers

    /// A wallpaper command finished.
    WallpaperApplied { path: std::path::PathBuf, ok: bool },
    /// A power action command finished.
    PowerActionDone { ok: bool },
}

/// Static information about a monitor known to the compositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorInfo {
    /// Unique name the compositor uses for this monitor (e.g. `"DP-1"`).
    pub name: String,
    /// Horizontal resolution in pixels.
    pub width: u32,
    /// Vertical resolution in pixels.
    pub height: u32,
    /// X position on the virtual desktop (pixels).
    pub x: i32,
    /// Y position on the virtual desktop (pixels).
    pub y: i32,
}

/// A mapped client window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Compositor address / id.
    pub address: String,
    /// Application id (Wayland app id or X11 class).
    pub app_id: String,
    /// Human-readable title.
    pub title: String,
    /// Workspace the window lives on.
    pub workspace: i32,
    /// Top-left corner on the virtual desktop.
    #[serde(default)]
    pub at: (i32, i32),
    /// Width and height in pixels.
    #[serde(default)]
    pub size: (u32, u32),
}

impl ClientInfo {
    /// Whether this window's rectangle overlaps `rect` (`x, y, w, h`).
    pub fn overlaps(&self, rect: (i32, i32, u32, u32)) -> bool {
        let (x, y) = self.at;
        let (w, h) = (self.size.0 as i32, self.size.1 as i32);
        let (rx, ry, rw, rh) = (rect.0, rect.1, rect.2 as i32, rect.3 as i32);
        x < rx + rw && rx < x + w && y < ry + rh && ry < y + h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Forward.to_string(), "forward");
        assert_eq!(Direction::Backward.to_string(), "backward");
    }

    #[test]
    fn direction_parses_aliases() {
        let d: Direction = serde_json::from_str(r#""Next""#).unwrap();
        assert_eq!(d, Direction::Forward);
        let d: Direction = serde_json::from_str(r#""left""#).unwrap();
        assert_eq!(d, Direction::Backward);
        assert!(serde_json::from_str::<Direction>(r#""sideways""#).is_err());
    }

    #[test]
    fn key_parses_aliases() {
        let k: Key = serde_json::from_str(r#""esc""#).unwrap();
        assert_eq!(k, Key::Escape);
        let k: Key = serde_json::from_str(r#""Return""#).unwrap();
        assert_eq!(k, Key::Enter);
    }

    #[test]
    fn select_applet_accepts_string_or_object() {
        let c: Command = serde_json::from_str(r#"{"SelectApplet":"launcher"}"#).unwrap();
        assert_eq!(
            c,
            Command::SelectApplet(AppletTarget {
                applet: "launcher".into(),
                expand: false
            })
        );
        let c: Command =
            serde_json::from_str(r#"{"SelectApplet":{"applet":"dashboard","expand":true}}"#)
                .unwrap();
        assert_eq!(
            c,
            Command::SelectApplet(AppletTarget {
                applet: "dashboard".into(),
                expand: true
            })
        );
    }

    #[test]
    fn unit_commands_are_strings() {
        let c: Command = serde_json::from_str(r#""Expand""#).unwrap();
        assert_eq!(c, Command::Expand);
        let c: Command = serde_json::from_str(r#"{"CycleWallpaper":"prev"}"#).unwrap();
        assert_eq!(c, Command::CycleWallpaper(Direction::Backward));
    }

    #[test]
    fn client_overlap() {
        let c = ClientInfo {
            address: "0x1".into(),
            app_id: "foot".into(),
            title: "foot".into(),
            workspace: 1,
            at: (0, 900),
            size: (800, 180),
        };
        assert!(c.overlaps((500, 1000, 400, 80)));
        assert!(!c.overlaps((900, 1000, 400, 80)));
        assert!(!c.overlaps((0, 0, 100, 100)));
    }
}
