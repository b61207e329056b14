//! [`Compositor`] implementation backed by Hyprland IPC.
//!
//! Communicates directly with Hyprland through its request socket
//! (`.socket.sock`).  Each call opens a short-lived connection, sends one
//! request and reads the reply until EOF.

use super::{normalize_address, socket_path, HyprlandError};
use crate::command::{ClientInfo, MonitorInfo};
use crate::traits::Compositor;
use serde::Deserialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;

/// Hyprland-backed compositor.  No child processes are spawned.
#[derive(Debug, Default)]
pub struct HyprlandCompositor;

impl HyprlandCompositor {
    pub fn new() -> Self {
        Self
    }
}

//  Direct Hyprland IPC helpers

/// Send a raw command to the request socket and return the response.
fn ipc_request(command: &str) -> Result<String, HyprlandError> {
    let path = socket_path(".socket.sock")?;
    let mut stream = UnixStream::connect(&path)
        .map_err(|e| HyprlandError(format!("connect to {}: {}", path.display(), e)))?;

    stream
        .write_all(command.as_bytes())
        .map_err(|e| HyprlandError(format!("write: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(|e| HyprlandError(format!("read: {}", e)))?;

    String::from_utf8(response).map_err(|e| HyprlandError(format!("utf-8: {}", e)))
}

/// Send a JSON data query (`j/<command>`) and deserialize the reply.
fn ipc_json<T: for<'de> Deserialize<'de>>(data_command: &str) -> Result<T, HyprlandError> {
    let json = ipc_request(&format!("j/{}", data_command))?;
    serde_json::from_str(&json).map_err(|e| HyprlandError(format!("parse {}: {}", data_command, e)))
}

/// Send a dispatch command and check for `"ok"`.
fn ipc_dispatch(args: &str) -> Result<(), HyprlandError> {
    let response = ipc_request(&format!("/dispatch {}", args))?;
    if response.trim() == "ok" {
        Ok(())
    } else {
        Err(HyprlandError(format!("dispatch error: {}", response)))
    }
}

//  Minimal serde structs for the JSON we care about

/// Subset of `j/monitors`.
#[derive(Deserialize)]
struct MonitorJson {
    name: String,
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    #[serde(default)]
    focused: bool,
}

#[derive(Deserialize)]
struct WorkspaceRefJson {
    id: i32,
}

/// Subset of `j/clients`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientJson {
    address: String,
    #[serde(default = "mapped_default")]
    mapped: bool,
    #[serde(default)]
    class: String,
    #[serde(default)]
    initial_class: String,
    #[serde(default)]
    title: String,
    workspace: WorkspaceRefJson,
    #[serde(default)]
    at: (i32, i32),
    #[serde(default)]
    size: (u32, u32),
}

fn mapped_default() -> bool {
    true
}

impl ClientJson {
    fn into_client(self) -> ClientInfo {
        let app_id = if self.class.is_empty() {
            self.initial_class
        } else {
            self.class
        };
        ClientInfo {
            address: normalize_address(&self.address),
            app_id,
            title: self.title,
            workspace: self.workspace.id,
            at: self.at,
            size: self.size,
        }
    }
}

/// Parse a `j/clients` reply.  Unmapped clients are dropped.
fn parse_clients(json: &str) -> Result<Vec<ClientInfo>, HyprlandError> {
    let clients: Vec<ClientJson> =
        serde_json::from_str(json).map_err(|e| HyprlandError(format!("parse clients: {}", e)))?;
    Ok(clients
        .into_iter()
        .filter(|c| c.mapped)
        .map(ClientJson::into_client)
        .collect())
}

//  Compositor implementation

impl Compositor for HyprlandCompositor {
    type Error = HyprlandError;

    fn monitors(&self) -> Result<Vec<MonitorInfo>, Self::Error> {
        let monitors: Vec<MonitorJson> = ipc_json("monitors")?;
        Ok(monitors
            .into_iter()
            .map(|m| MonitorInfo {
                name: m.name,
                width: m.width,
                height: m.height,
                x: m.x,
                y: m.y,
            })
            .collect())
    }

    fn clients(&self) -> Result<Vec<ClientInfo>, Self::Error> {
        parse_clients(&ipc_request("j/clients")?)
    }

    fn active_workspace(&self) -> Result<i32, Self::Error> {
        let ws: WorkspaceRefJson = ipc_json("activeworkspace")?;
        Ok(ws.id)
    }

    fn active_monitor(&self) -> Result<Option<String>, Self::Error> {
        let monitors: Vec<MonitorJson> = ipc_json("monitors")?;
        Ok(monitors.into_iter().find(|m| m.focused).map(|m| m.name))
    }

    fn focus_workspace(&self, workspace_id: i32) -> Result<(), Self::Error> {
        ipc_dispatch(&format!("workspace {}", workspace_id))
    }

    fn focus_window(&self, address: &str) -> Result<(), Self::Error> {
        ipc_dispatch(&format!("focuswindow address:{}", normalize_address(address)))
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENTS: &str = r#"[
        {"address": "0x55d1a0", "mapped": true, "hidden": false,
         "at": [0, 0], "size": [1920, 1080],
         "workspace": {"id": 2, "name": "2"}, "floating": false,
         "class": "org.mozilla.firefox", "title": "Mozilla Firefox",
         "initialClass": "org.mozilla.firefox", "initialTitle": "Firefox"},
        {"address": "0x55d1b0", "mapped": false,
         "at": [0, 0], "size": [0, 0],
         "workspace": {"id": -1, "name": ""},
         "class": "", "title": "", "initialClass": ""},
        {"address": "0x55d1c0", "mapped": true,
         "at": [10, 20], "size": [300, 200],
         "workspace": {"id": -98, "name": "special:scratch"},
         "class": "", "title": "term", "initialClass": "foot"}
    ]"#;

    #[test]
    fn clients_skip_unmapped() {
        let clients = parse_clients(CLIENTS).unwrap();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].address, "0x55d1a0");
        assert_eq!(clients[0].app_id, "org.mozilla.firefox");
        assert_eq!(clients[0].workspace, 2);
        assert_eq!(clients[0].size, (1920, 1080));
    }

    #[test]
    fn empty_class_falls_back_to_initial_class() {
        let clients = parse_clients(CLIENTS).unwrap();
        assert_eq!(clients[1].app_id, "foot");
        assert_eq!(clients[1].at, (10, 20));
        assert_eq!(clients[1].workspace, -98);
    }

    #[test]
    fn malformed_clients_is_an_error() {
        assert!(parse_clients("not json").is_err());
    }
}
