//! Hyprland-specific implementations.
//!
//! This module provides concrete backends for the
//! [`Compositor`](crate::traits::Compositor) and
//! [`EventSource`](crate::traits::EventSource) traits, powered by
//! Hyprland's IPC sockets.
//!
//! Nothing outside this module should reference Hyprland directly.

use std::path::PathBuf;

pub mod compositor;
pub mod events;

pub use compositor::HyprlandCompositor;
pub use events::HyprlandEventSource;

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandError(String);

/// Resolve one of Hyprland's sockets.
///
/// Hyprland ≥ 0.40 stores them at
/// `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/<name>`: `.socket.sock`
/// for requests and `.socket2.sock` for the event stream.
fn socket_path(name: &str) -> Result<PathBuf, HyprlandError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!("{}/hypr/{}/{}", runtime_dir, his, name)))
}

/// Parse a workspace name as a regular (numbered) workspace id.
///
/// Named and special workspaces (`special:scratch`) yield `None`.
fn workspace_id(name: &str) -> Option<i32> {
    name.trim().parse::<i32>().ok().filter(|id| *id > 0)
}

/// Hyprland prints window addresses without the `0x` prefix in events but
/// with it in JSON; normalise to the JSON form.
fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("0x") {
        address.to_string()
    } else {
        format!("0x{}", address)
    }
}
