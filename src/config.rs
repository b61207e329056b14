//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/hyprpill/config.json`.
//! Every section is optional and falls back to its compiled-in defaults, so
//! a minimal `{}` file is valid and unknown keys are ignored.
//!
//! # Example
//!
//! ```json
//! {
//!   "dock": { "flash_on_app_added": true, "fade_out_ms": 250 },
//!   "notifications": {
//!     "max_notifications": 3,
//!     "new_notification_from_bottom": false,
//!     "timeout_ms": 5000
//!   },
//!   "wallpaper": {
//!     "directory": "~/Pictures/wallpapers",
//!     "apply_command": "swww img {}"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dock: DockConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub osd: OsdConfig,

    #[serde(default)]
    pub wallpaper: WallpaperConfig,

    #[serde(default)]
    pub power: PowerConfig,

    #[serde(default)]
    pub workspaces: WorkspacesConfig,

    #[serde(default)]
    pub launcher: LauncherConfig,
}

/// Dock behaviour.  Durations are in **milliseconds**.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockConfig {
    /// Briefly reveal the dock when a new application appears.
    pub flash_on_app_added: bool,
    /// How long a flash keeps the dock revealed.
    pub flash_ms: u64,
    /// Delay between a slot starting to fade and its removal.
    pub fade_out_ms: u64,
    /// Hide the dock while a window overlaps it.
    pub auto_hide: bool,
    /// Dock surface width in pixels, used for the overlap test.
    pub width: u32,
    /// Dock surface height in pixels, used for the overlap test.
    pub height: u32,
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            flash_on_app_added: true,
            flash_ms: 1000,
            fade_out_ms: 250,
            auto_hide: true,
            width: 600,
            height: 64,
        }
    }
}

/// Notification popups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Number of popup slots; further notifications wait in a queue.
    pub max_notifications: usize,
    /// Append new popups below existing ones instead of on top.
    pub new_notification_from_bottom: bool,
    /// Display time when the sender does not specify one.
    pub timeout_ms: u64,
    /// Fade-out duration before a slot is freed.
    pub fade_out_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_notifications: 3,
            new_notification_from_bottom: false,
            timeout_ms: 5000,
            fade_out_ms: 300,
        }
    }
}

/// On-screen display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OsdConfig {
    pub timeout_ms: u64,
}

impl Default for OsdConfig {
    fn default() -> Self {
        Self { timeout_ms: 1500 }
    }
}

/// Wallpaper selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WallpaperConfig {
    /// Directory scanned for images.  A leading `~` is expanded.
    pub directory: String,
    /// Command run to apply a wallpaper; `{}` is replaced by the path.
    pub apply_command: String,
}

impl Default for WallpaperConfig {
    fn default() -> Self {
        Self {
            directory: "~/Pictures/wallpapers".into(),
            apply_command: "swww img {}".into(),
        }
    }
}

impl WallpaperConfig {
    /// The wallpaper directory with `~` expanded using `home`.
    pub fn directory_path(&self, home: &Path) -> PathBuf {
        match self.directory.strip_prefix("~/") {
            Some(rest) => home.join(rest),
            None if self.directory == "~" => home.to_path_buf(),
            None => PathBuf::from(&self.directory),
        }
    }
}

/// Commands run by the power menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub lock: String,
    pub suspend: String,
    pub logout: String,
    pub reboot: String,
    pub shutdown: String,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            lock: "loginctl lock-session".into(),
            suspend: "systemctl suspend".into(),
            logout: "hyprctl dispatch exit".into(),
            reboot: "systemctl reboot".into(),
            shutdown: "systemctl poweroff".into(),
        }
    }
}

/// Workspace indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspacesConfig {
    /// Number of fixed indicator slots (workspaces `1..=count`).
    pub count: usize,
}

impl Default for WorkspacesConfig {
    fn default() -> Self {
        Self { count: 10 }
    }
}

/// Application launcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub max_results: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self { max_results: 50 }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
