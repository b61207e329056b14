//! Blocking command execution off the UI thread.
//!
//! Commands run through `sh -c` on a short-lived thread.  When the command
//! exits the thread reports back by sending a [`ShellEvent`] built from the
//! exit status; the UI thread never waits on a child process.

use crate::command::ShellEvent;
use log::{debug, warn};
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;

/// Quote `s` for inclusion in a POSIX shell command line.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Run `command` with `sh -c` on a background thread.
///
/// `done` maps the success of the command to the event sent back, or to
/// `None` when nobody cares about the outcome.
pub fn spawn_shell<F>(command: String, sink: Sender<ShellEvent>, done: F)
where
    F: FnOnce(bool) -> Option<ShellEvent> + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name("hyprpill-exec".into())
        .spawn(move || {
            debug!("exec: {}", command);
            let ok = match Command::new("sh")
                .arg("-c")
                .arg(&command)
                .stdin(Stdio::null())
                .status()
            {
                Ok(status) if status.success() => true,
                Ok(status) => {
                    warn!("`{}` exited with {}", command, status);
                    false
                }
                Err(e) => {
                    warn!("failed to run `{}`: {}", command, e);
                    false
                }
            };
            if let Some(event) = done(ok) {
                if sink.send(event).is_err() {
                    debug!("exec: shell gone, dropping result of `{}`", command);
                }
            }
        });
    if let Err(e) = spawned {
        warn!("failed to spawn exec thread: {}", e);
    }
}
