//! Power menu applet: a row of actions and a confirmation popup.

use crate::command::Key;
use crate::config::PowerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerAction {
    Lock,
    Suspend,
    Logout,
    Reboot,
    Shutdown,
}

impl PowerAction {
    pub const ALL: [PowerAction; 5] = [
        PowerAction::Lock,
        PowerAction::Suspend,
        PowerAction::Logout,
        PowerAction::Reboot,
        PowerAction::Shutdown,
    ];

    /// The shell command configured for this action.
    pub fn command(self, config: &PowerConfig) -> &str {
        match self {
            PowerAction::Lock => &config.lock,
            PowerAction::Suspend => &config.suspend,
            PowerAction::Logout => &config.logout,
            PowerAction::Reboot => &config.reboot,
            PowerAction::Shutdown => &config.shutdown,
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PowerAction::Lock => "lock",
            PowerAction::Suspend => "suspend",
            PowerAction::Logout => "logout",
            PowerAction::Reboot => "reboot",
            PowerAction::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Result of a key press inside the power menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOutcome {
    /// Nothing for the shell to do besides re-rendering.
    Redraw,
    /// The user confirmed; run the action.
    Run(PowerAction),
    /// Key not handled here.
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct PowerMenu {
    selected: usize,
    confirm: Option<PowerAction>,
}

impl PowerMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> PowerAction {
        PowerAction::ALL[self.selected]
    }

    /// The action awaiting confirmation, if the popup is open.
    pub fn confirming(&self) -> Option<PowerAction> {
        self.confirm
    }

    pub fn popup_open(&self) -> bool {
        self.confirm.is_some()
    }

    pub fn close_popup(&mut self) {
        self.confirm = None;
    }

    /// Back to the first action with no popup (on hide).
    pub fn reset(&mut self) {
        self.selected = 0;
        self.confirm = None;
    }

    /// Arrow keys move the cursor (clamped) while no popup is open; Enter
    /// opens the popup, and Enter again confirms.  Escape is handled by the
    /// shell.
    pub fn key(&mut self, key: Key) -> PowerOutcome {
        match (key, self.confirm) {
            (Key::Enter, Some(action)) => {
                self.confirm = None;
                PowerOutcome::Run(action)
            }
            (Key::Enter, None) => {
                self.confirm = Some(self.selected());
                PowerOutcome::Redraw
            }
            (Key::Left | Key::Up, None) => {
                self.selected = self.selected.saturating_sub(1);
                PowerOutcome::Redraw
            }
            (Key::Right | Key::Down, None) => {
                self.selected = (self.selected + 1).min(PowerAction::ALL.len() - 1);
                PowerOutcome::Redraw
            }
            _ => PowerOutcome::Ignored,
        }
    }
}
