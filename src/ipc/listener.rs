//! Unix-socket [`EventSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.
//! Each line received is parsed as a JSON-encoded [`Command`]; a line that
//! is not a command is tried as a [`ShellEvent`].
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"SelectApplet":"launcher"}
//! {"SelectApplet":{"applet":"dashboard","expand":true}}
//! "Expand"
//! {"Key":"esc"}
//! {"CycleWallpaper":"next"}
//! {"Notify":{"id":7,"app_name":"mail","summary":"New message"}}
//! {"Volume":{"percent":40,"muted":false}}
//! ```

use crate::command::{Command, ShellEvent};
use crate::traits::EventSource;
use log::{debug, error, info};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// An [`EventSource`] that listens on a Unix stream socket for JSON
/// commands and events.
///
/// Each accepted connection can send multiple newline-delimited messages.
/// When the connection closes, the listener waits for the next one.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse one line of the wire format.
///
/// Commands take precedence; the error reported for a line that is neither
/// is the command parse error.
pub fn parse_message(text: &str) -> Result<ShellEvent, UnixSocketError> {
    match serde_json::from_str::<Command>(text) {
        Ok(cmd) => Ok(ShellEvent::Command(cmd)),
        Err(cmd_err) => serde_json::from_str::<ShellEvent>(text).map_err(|_| cmd_err.into()),
    }
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](EventSource::run) is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// This method **blocks** indefinitely.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<ShellEvent>) -> Result<(), Self::Error> {
        // Remove stale socket if present.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("client connected");
                    let reader = BufReader::new(stream);
                    for line in reader.lines() {
                        match line {
                            Ok(ref text) if text.trim().is_empty() => continue,
                            Ok(text) => match parse_message(&text) {
                                Ok(event) => {
                                    debug!("received {:?}", event);
                                    if sink.send(event).is_err() {
                                        info!("sink closed, shutting down");
                                        return Ok(());
                                    }
                                }
                                Err(e) => {
                                    error!("bad message: {}: {}", text, e);
                                }
                            },
                            Err(e) => {
                                error!("read error: {}", e);
                                break;
                            }
                        }
                    }
                    debug!("client disconnected");
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
        Ok(())
    }
}

//  Tests
