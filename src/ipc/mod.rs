//! IPC listener that accepts commands and events over a Unix socket.
//!
//! Keybinding scripts connect to the socket and send newline-delimited
//! JSON commands.  Bridges for daemons the shell has no native backend for
//! (notifications, media players, audio) send full [`ShellEvent`]s the same
//! way.
//!
//! [`ShellEvent`]: crate::command::ShellEvent

pub mod listener;

pub use listener::UnixSocketListener;
