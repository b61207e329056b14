//! **hyprpill**: state core for a pill-style desktop shell on Hyprland.
//!
//! A single pill at the top of the screen hosts one applet at a time
//! (dashboard, power menu, wallpaper selector, launcher).  Around it live a
//! dock, notification popups, an on-screen display, workspace indicators and
//! media tabs.  This crate owns all of their state; drawing is left to a
//! renderer that consumes [`traits::ViewEvent`] snapshots.
//!
//! # Architecture
//!
//! * [`slots`], [`carousel`] and [`lifecycle`] are the shared building
//!   blocks: bounded slot sets with visual flags, a centred sliding window
//!   over a list, and the per-item show / update / fade / remove cycle.
//! * The controllers ([`dock`], [`notifications`], [`osd`], [`workspaces`],
//!   [`media`], [`wallpaper`], [`launcher`], [`power`], [`applet`]) are
//!   plain state machines.  Anything delayed goes through the
//!   [`timer::Scheduler`] with a ticket so superseded work is dropped.
//! * [`shell::Shell`] owns every controller on the UI thread and applies
//!   one [`command::ShellEvent`] at a time.
//!
//! The shell is decoupled from its environment by three traits:
//!
//! * [`traits::Compositor`] queries windows and monitors and focuses them.
//! * [`traits::AppRegistry`] lists, finds and launches applications.
//! * [`traits::EventSource`] delivers events from some transport.
//!
//! Concrete implementations live in [`hyprland`] (Hyprland IPC),
//! [`desktop`] (freedesktop entries) and [`ipc`] (Unix-socket listener).

pub mod applet;
pub mod carousel;
pub mod command;
pub mod config;
pub mod desktop;
pub mod dock;
pub mod exec;
pub mod hyprland;
pub mod ipc;
pub mod launcher;
pub mod lifecycle;
pub mod media;
pub mod notifications;
pub mod osd;
pub mod power;
pub mod shell;
pub mod slots;
pub mod store;
pub mod timer;
pub mod traits;
pub mod wallpaper;
pub mod workspaces;
