//! Translates Hyprland's event stream into [`ShellEvent`]s.
//!
//! Hyprland writes one `EVENT>>DATA\n` line per event to `.socket2.sock`.
//! The events the shell reacts to:
//!
//! | Event           | Payload                          | Becomes                          |
//! |-----------------|----------------------------------|----------------------------------|
//! | `openwindow`    | `<addr>,<workspace>,<class>,<title>` | [`ShellEvent::WindowOpened`] |
//! | `closewindow`   | `<addr>`                         | [`ShellEvent::WindowClosed`]     |
//! | `activewindowv2`| `<addr>` (empty when none)       | [`ShellEvent::WindowFocused`]    |
//! | `workspace`     | `<name>`                         | [`ShellEvent::WorkspaceChanged`] |
//! | `workspacev2`   | `<id>,<name>`                    | [`ShellEvent::WorkspaceChanged`] |
//! | `focusedmonv2`  | `<monitor>,<workspace id>`       | [`ShellEvent::WorkspaceChanged`] |
//! | `movewindowv2`  | `<addr>,<workspace id>,<name>`   | [`ShellEvent::WindowMoved`]      |
//! | `fullscreen`    | `0` / `1`                        | [`ShellEvent::Fullscreen`]       |
//! | `monitoradded`, `monitorremoved` | `<name>`        | [`ShellEvent::MonitorsChanged`]  |
//!
//! `workspace` only yields an event for numbered workspaces.  Everything
//! else is ignored.  Window geometry is not part of the event, so
//! opened windows carry an empty rectangle; the shell re-queries clients
//! for obstruction checks.

use super::{normalize_address, socket_path, workspace_id, HyprlandError};
use crate::command::{ClientInfo, ShellEvent};
use crate::traits::EventSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::sync::mpsc;

/// Hyprland's id for windows on special or named workspaces, which the
/// indicator row never shows.
const NON_REGULAR_WORKSPACE: i32 = -99;

/// An [`EventSource`] reading Hyprland's `socket2`.
#[derive(Debug, Default)]
pub struct HyprlandEventSource;

impl HyprlandEventSource {
    pub fn new() -> Self {
        Self
    }
}

/// Split `EVENT>>DATA` into its two halves.
fn split_event_line(line: &str) -> Option<(&str, &str)> {
    let sep = line.find(">>")?;
    Some((&line[..sep], &line[sep + 2..]))
}

/// Translate one raw line.  Returns `None` for events the shell does not
/// care about and for malformed payloads (which are logged).
pub fn parse_event_line(line: &str) -> Option<ShellEvent> {
    let (event, data) = split_event_line(line)?;
    match event {
        "openwindow" => {
            let mut parts = data.splitn(4, ',');
            let (Some(address), Some(workspace), Some(class), title) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                warn!("malformed openwindow: {:?}", data);
                return None;
            };
            Some(ShellEvent::WindowOpened(ClientInfo {
                address: normalize_address(address),
                app_id: class.to_string(),
                title: title.unwrap_or_default().to_string(),
                workspace: workspace_id(workspace).unwrap_or(NON_REGULAR_WORKSPACE),
                at: (0, 0),
                size: (0, 0),
            }))
        }
        "closewindow" => Some(ShellEvent::WindowClosed {
            address: normalize_address(data),
        }),
        "activewindowv2" => {
            let address = data.trim();
            if address.is_empty() || address == "," {
                return None;
            }
            Some(ShellEvent::WindowFocused {
                address: normalize_address(address),
            })
        }
        "workspace" => workspace_id(data).map(|id| ShellEvent::WorkspaceChanged { id }),
        "workspacev2" | "focusedmonv2" => {
            let field = if event == "workspacev2" {
                data.split(',').next()
            } else {
                data.rsplit(',').next()
            };
            match field.and_then(|f| f.trim().parse::<i32>().ok()) {
                Some(id) => Some(ShellEvent::WorkspaceChanged { id }),
                None => {
                    warn!("malformed {}: {:?}", event, data);
                    None
                }
            }
        }
        "movewindowv2" => {
            let mut parts = data.splitn(3, ',');
            let (Some(address), Some(id)) = (parts.next(), parts.next()) else {
                warn!("malformed movewindowv2: {:?}", data);
                return None;
            };
            match id.trim().parse::<i32>() {
                Ok(workspace) => Some(ShellEvent::WindowMoved {
                    address: normalize_address(address),
                    workspace,
                }),
                Err(_) => {
                    warn!("malformed movewindowv2: {:?}", data);
                    None
                }
            }
        }
        "fullscreen" => match data.trim() {
            "0" => Some(ShellEvent::Fullscreen(false)),
            "1" => Some(ShellEvent::Fullscreen(true)),
            _ => {
                warn!("malformed fullscreen: {:?}", data);
                None
            }
        },
        "monitoradded" | "monitorremoved" => Some(ShellEvent::MonitorsChanged),
        _ => None,
    }
}

impl EventSource for HyprlandEventSource {
    type Error = HyprlandError;

    /// Connect to `socket2` and forward events until the stream ends.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<ShellEvent>) -> Result<(), Self::Error> {
        let path = socket_path(".socket2.sock")?;
        let stream = UnixStream::connect(&path)
            .map_err(|e| HyprlandError(format!("connect to {}: {}", path.display(), e)))?;
        info!("event source connected to {}", path.display());

        let reader = BufReader::new(stream);
        for line in reader.lines() {
            match line {
                Ok(line) if line.is_empty() => continue,
                Ok(line) => {
                    let Some(event) = parse_event_line(&line) else {
                        continue;
                    };
                    debug!("hyprland: {:?}", event);
                    if sink.send(event).is_err() {
                        info!("shell gone, closing event source");
                        return Ok(());
                    }
                }
                Err(e) => {
                    error!("socket2 read error: {}", e);
                    return Err(HyprlandError(format!("read error: {}", e)));
                }
            }
        }

        warn!("socket2 stream ended");
        Ok(())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_window_gets_prefixed_address() {
        let event = parse_event_line("openwindow>>55d1a0,2,foot,~: vim, the editor").unwrap();
        let ShellEvent::WindowOpened(client) = event else {
            panic!("expected WindowOpened");
        };
        assert_eq!(client.address, "0x55d1a0");
        assert_eq!(client.workspace, 2);
        assert_eq!(client.app_id, "foot");
        assert_eq!(client.title, "~: vim, the editor");
    }

    #[test]
    fn open_window_on_special_workspace() {
        let event = parse_event_line("openwindow>>abc,special:scratch,foot,t").unwrap();
        let ShellEvent::WindowOpened(client) = event else {
            panic!("expected WindowOpened");
        };
        assert_eq!(client.workspace, NON_REGULAR_WORKSPACE);
    }

    #[test]
    fn window_events() {
        assert_eq!(
            parse_event_line("closewindow>>55d1a0"),
            Some(ShellEvent::WindowClosed {
                address: "0x55d1a0".into()
            })
        );
        assert_eq!(
            parse_event_line("activewindowv2>>55d1a0"),
            Some(ShellEvent::WindowFocused {
                address: "0x55d1a0".into()
            })
        );
        assert_eq!(parse_event_line("activewindowv2>>"), None);
        assert_eq!(
            parse_event_line("movewindowv2>>55d1a0,4,4"),
            Some(ShellEvent::WindowMoved {
                address: "0x55d1a0".into(),
                workspace: 4
            })
        );
    }

    #[test]
    fn workspace_and_monitor_events() {
        assert_eq!(
            parse_event_line("workspace>>3"),
            Some(ShellEvent::WorkspaceChanged { id: 3 })
        );
        assert_eq!(
            parse_event_line("workspacev2>>3,3"),
            Some(ShellEvent::WorkspaceChanged { id: 3 })
        );
        assert_eq!(
            parse_event_line("focusedmonv2>>DP-1,5"),
            Some(ShellEvent::WorkspaceChanged { id: 5 })
        );
        assert_eq!(parse_event_line("fullscreen>>1"), Some(ShellEvent::Fullscreen(true)));
        assert_eq!(parse_event_line("fullscreen>>0"), Some(ShellEvent::Fullscreen(false)));
        assert_eq!(
            parse_event_line("monitoradded>>HDMI-A-1"),
            Some(ShellEvent::MonitorsChanged)
        );
    }

    #[test]
    fn ignored_and_malformed_lines() {
        assert_eq!(parse_event_line("workspace>>special:scratch"), None);
        assert_eq!(parse_event_line("activelayout>>kbd,us"), None);
        assert_eq!(parse_event_line("no separator"), None);
        assert_eq!(parse_event_line("openwindow>>onlyaddress"), None);
        assert_eq!(parse_event_line("workspacev2>>abc,abc"), None);
        assert_eq!(parse_event_line("fullscreen>>yes"), None);
    }
}
