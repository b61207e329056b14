//! The pill's applet state machine.
//!
//! Exactly one [`AppletKind`] is active at any time.  The Dashboard has a
//! three-way disclosure sub-state ([`DashboardState`]); every other applet is
//! simply shown while active.
//!
//! The machine is pure: each operation returns the [`AppletEffect`]s the
//! renderer (and the compositor, for input grabs) must apply, in order.

use log::{debug, error};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The mutually exclusive top-level panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AppletKind {
    Dashboard,
    PowerMenu,
    Wallpaper,
    Launcher,
}

impl AppletKind {
    pub const ALL: [AppletKind; 4] = [
        AppletKind::Dashboard,
        AppletKind::PowerMenu,
        AppletKind::Wallpaper,
        AppletKind::Launcher,
    ];
}

impl fmt::Display for AppletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppletKind::Dashboard => write!(f, "dashboard"),
            AppletKind::PowerMenu => write!(f, "power"),
            AppletKind::Wallpaper => write!(f, "wallpaper"),
            AppletKind::Launcher => write!(f, "launcher"),
        }
    }
}

/// An applet name that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown applet: {0:?}")]
pub struct UnknownApplet(pub String);

impl FromStr for AppletKind {
    type Err = UnknownApplet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .flat_map(|c| c.to_lowercase())
            .collect();
        match normalized.as_str() {
            "dashboard" => Ok(AppletKind::Dashboard),
            "power" | "powermenu" => Ok(AppletKind::PowerMenu),
            "wallpaper" | "wallpapers" => Ok(AppletKind::Wallpaper),
            "launcher" | "apps" => Ok(AppletKind::Launcher),
            _ => Err(UnknownApplet(s.to_string())),
        }
    }
}

/// Dashboard disclosure level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DashboardState {
    /// Collapsed to the pill.
    Unpeeked,
    /// Quick settings partially revealed (transient, follows the pointer).
    Peeking,
    /// Everything revealed (sticky).
    Expanded,
}

/// Visibility of a binary applet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Hidden,
    Shown,
}

/// Something the outside world has to do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppletEffect {
    /// Run the applet's hide hook (fade out).
    Hide(AppletKind),
    /// Run the applet's unhide hook.
    Unhide { applet: AppletKind, expand: bool },
    /// The dashboard's disclosure changed.
    Dashboard(DashboardState),
    /// Grab exclusive keyboard focus from the compositor.
    StealInput,
    /// Give keyboard focus back.
    ReturnInput,
}

#[derive(Debug, Clone)]
pub struct AppletMachine {
    active: AppletKind,
    dashboard: DashboardState,
    input_grabbed: bool,
}

impl Default for AppletMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl AppletMachine {
    /// Start on a collapsed Dashboard without an input grab.
    pub fn new() -> Self {
        Self {
            active: AppletKind::Dashboard,
            dashboard: DashboardState::Unpeeked,
            input_grabbed: false,
        }
    }

    //  Accessors

    pub fn active(&self) -> AppletKind {
        self.active
    }

    pub fn dashboard(&self) -> DashboardState {
        self.dashboard
    }

    pub fn input_grabbed(&self) -> bool {
        self.input_grabbed
    }

    pub fn visibility(&self, applet: AppletKind) -> Visibility {
        if applet == self.active {
            Visibility::Shown
        } else {
            Visibility::Hidden
        }
    }

    //  Transitions

    /// Switch to `target`.
    ///
    /// Hides the current applet (unless it is the target), unhides the
    /// target and, for the Dashboard, expands or collapses it.
    pub fn select(&mut self, target: AppletKind, expand: bool) -> Vec<AppletEffect> {
        debug!("select applet {} (expand: {})", target, expand);
        let mut effects = Vec::new();
        if self.active != target {
            effects.push(AppletEffect::Hide(self.active));
        }
        self.active = target;
        effects.push(AppletEffect::Unhide {
            applet: target,
            expand,
        });
        if target == AppletKind::Dashboard {
            let state = if expand {
                DashboardState::Expanded
            } else {
                DashboardState::Unpeeked
            };
            self.set_dashboard(state, &mut effects);
        }
        self.sync_input(&mut effects);
        effects
    }

    /// [`select`](Self::select) by name.  Unknown names are logged and
    /// leave the state untouched.
    pub fn select_by_name(&mut self, name: &str, expand: bool) -> Vec<AppletEffect> {
        match name.parse::<AppletKind>() {
            Ok(target) => self.select(target, expand),
            Err(e) => {
                error!("{}", e);
                Vec::new()
            }
        }
    }

    /// Partially reveal the dashboard.  Only meaningful while it is active.
    pub fn peek(&mut self) -> Vec<AppletEffect> {
        self.dashboard_transition(DashboardState::Peeking)
    }

    /// Fully reveal the dashboard.
    pub fn expand(&mut self) -> Vec<AppletEffect> {
        self.dashboard_transition(DashboardState::Expanded)
    }

    /// Collapse the dashboard.
    pub fn unpeek(&mut self) -> Vec<AppletEffect> {
        self.dashboard_transition(DashboardState::Unpeeked)
    }

    /// Pointer entered the pill: peek from the collapsed state only.
    pub fn pointer_enter(&mut self) -> Vec<AppletEffect> {
        if self.active == AppletKind::Dashboard && self.dashboard == DashboardState::Unpeeked {
            self.peek()
        } else {
            Vec::new()
        }
    }

    /// Pointer left the pill: undo a peek, never an expansion.
    pub fn pointer_leave(&mut self) -> Vec<AppletEffect> {
        if self.active == AppletKind::Dashboard && self.dashboard == DashboardState::Peeking {
            self.unpeek()
        } else {
            Vec::new()
        }
    }

    /// Escape on the active applet.
    ///
    /// The Dashboard collapses; any other applet returns to a collapsed
    /// Dashboard.  (A power-menu confirmation popup is closed by the caller
    /// before reaching here.)
    pub fn escape(&mut self) -> Vec<AppletEffect> {
        match self.active {
            AppletKind::Dashboard => self.unpeek(),
            _ => self.select(AppletKind::Dashboard, false),
        }
    }

    //  Internal

    fn dashboard_transition(&mut self, state: DashboardState) -> Vec<AppletEffect> {
        if self.active != AppletKind::Dashboard {
            debug!("dashboard {:?} ignored while {} is active", state, self.active);
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.set_dashboard(state, &mut effects);
        self.sync_input(&mut effects);
        effects
    }

    fn set_dashboard(&mut self, state: DashboardState, effects: &mut Vec<AppletEffect>) {
        if self.dashboard != state {
            self.dashboard = state;
            effects.push(AppletEffect::Dashboard(state));
        }
    }

    /// Non-dashboard applets and the expanded dashboard take the keyboard;
    /// a peeking or collapsed dashboard does not.
    fn sync_input(&mut self, effects: &mut Vec<AppletEffect>) {
        let wants = match self.active {
            AppletKind::Dashboard => self.dashboard == DashboardState::Expanded,
            _ => true,
        };
        if wants != self.input_grabbed {
            self.input_grabbed = wants;
            effects.push(if wants {
                AppletEffect::StealInput
            } else {
                AppletEffect::ReturnInput
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown_count(m: &AppletMachine) -> usize {
        AppletKind::ALL
            .iter()
            .filter(|a| m.visibility(**a) == Visibility::Shown)
            .count()
    }

    #[test]
    fn parse_names() {
        assert_eq!("Launcher".parse::<AppletKind>(), Ok(AppletKind::Launcher));
        assert_eq!("power-menu".parse::<AppletKind>(), Ok(AppletKind::PowerMenu));
        assert!("toaster".parse::<AppletKind>().is_err());
    }

    #[test]
    fn exactly_one_applet_shown() {
        let mut m = AppletMachine::new();
        assert_eq!(shown_count(&m), 1);
        for target in AppletKind::ALL {
            for expand in [false, true] {
                m.select(target, expand);
                assert_eq!(shown_count(&m), 1);
                assert_eq!(m.active(), target);
            }
        }
    }

    #[test]
    fn select_hides_previous_then_unhides_target() {
        let mut m = AppletMachine::new();
        let effects = m.select(AppletKind::Launcher, false);
        assert_eq!(
            effects,
            vec![
                AppletEffect::Hide(AppletKind::Dashboard),
                AppletEffect::Unhide {
                    applet: AppletKind::Launcher,
                    expand: false
                },
                AppletEffect::StealInput,
            ]
        );
        assert!(m.input_grabbed());
    }

    #[test]
    fn returning_to_collapsed_dashboard_returns_input() {
        let mut m = AppletMachine::new();
        m.select(AppletKind::Wallpaper, false);
        let effects = m.select(AppletKind::Dashboard, false);
        assert!(effects.contains(&AppletEffect::ReturnInput));
        assert!(!m.input_grabbed());
        assert_eq!(m.dashboard(), DashboardState::Unpeeked);
    }

    #[test]
    fn unknown_applet_is_noop() {
        let mut m = AppletMachine::new();
        m.select(AppletKind::Launcher, false);
        assert!(m.select_by_name("toaster", true).is_empty());
        assert_eq!(m.active(), AppletKind::Launcher);
        assert!(m.input_grabbed());
    }

    #[test]
    fn hover_peeks_and_unpeeks() {
        let mut m = AppletMachine::new();
        assert_eq!(
            m.pointer_enter(),
            vec![AppletEffect::Dashboard(DashboardState::Peeking)]
        );
        assert!(!m.input_grabbed(), "peeking does not grab input");
        assert_eq!(
            m.pointer_leave(),
            vec![AppletEffect::Dashboard(DashboardState::Unpeeked)]
        );
    }

    #[test]
    fn expansion_is_sticky() {
        let mut m = AppletMachine::new();
        m.pointer_enter();
        m.expand();
        assert!(m.pointer_leave().is_empty());
        assert_eq!(m.dashboard(), DashboardState::Expanded);
        assert!(m.pointer_enter().is_empty());
        let effects = m.escape();
        assert_eq!(
            effects,
            vec![
                AppletEffect::Dashboard(DashboardState::Unpeeked),
                AppletEffect::ReturnInput
            ]
        );
    }

    #[test]
    fn escape_from_other_applet_collapses_dashboard() {
        let mut m = AppletMachine::new();
        m.select(AppletKind::Dashboard, true);
        m.select(AppletKind::PowerMenu, false);
        m.escape();
        assert_eq!(m.active(), AppletKind::Dashboard);
        assert_eq!(m.dashboard(), DashboardState::Unpeeked);
        assert!(!m.input_grabbed());
    }

    #[test]
    fn dashboard_transitions_ignored_elsewhere() {
        let mut m = AppletMachine::new();
        m.select(AppletKind::Launcher, false);
        assert!(m.peek().is_empty());
        assert!(m.pointer_enter().is_empty());
        assert_eq!(m.dashboard(), DashboardState::Unpeeked);
    }

    #[test]
    fn select_dashboard_expanded() {
        let mut m = AppletMachine::new();
        let effects = m.select(AppletKind::Dashboard, true);
        assert_eq!(
            effects,
            vec![
                AppletEffect::Unhide {
                    applet: AppletKind::Dashboard,
                    expand: true
                },
                AppletEffect::Dashboard(DashboardState::Expanded),
                AppletEffect::StealInput,
            ]
        );
    }
}
