//! Entry point for the **hyprpill** daemon.
//!
//! Spawns the event sources (the command socket and Hyprland's event
//! stream) on background threads and runs the [`Shell`] on the main
//! thread.  The main thread sleeps on the event channel until the next
//! event or the next deferred-task deadline, whichever comes first.
//!
//! View snapshots go to a sink thread.  With `--print-views` they are
//! written to stdout as JSON lines for an external renderer; otherwise they
//! are only logged at debug level.

use hyprpill::command::ShellEvent;
use hyprpill::config::Config;
use hyprpill::desktop::DesktopRegistry;
use hyprpill::hyprland::{HyprlandCompositor, HyprlandEventSource};
use hyprpill::ipc::UnixSocketListener;
use hyprpill::shell::Shell;
use hyprpill::store::{LaunchHistory, PinStore};
use hyprpill::traits::{AppRegistry, Compositor, EventSource, ViewEvent};
use log::{debug, error, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Instant;

/// Default socket path for the command listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/hyprpill.sock", runtime)
}

fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_else(|_| "/tmp".into())
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/hyprpill`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| format!("{}/.config", home_dir()));
    PathBuf::from(base).join("hyprpill")
}

/// Resolve the state directory (`$XDG_STATE_HOME/hyprpill`).
fn state_dir() -> PathBuf {
    let base = std::env::var("XDG_STATE_HOME").unwrap_or_else(|_| format!("{}/.local/state", home_dir()));
    PathBuf::from(base).join("hyprpill")
}

/// Try to load the config from `$XDG_CONFIG_HOME/hyprpill/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

/// Load the persisted launch history and pins.  A corrupt file is logged
/// and replaced by an empty store on the next write.
fn load_stores() -> (LaunchHistory, PinStore) {
    let dir = state_dir();
    let history_path = dir.join("history.json");
    let history = LaunchHistory::load(&history_path).unwrap_or_else(|e| {
        warn!("{}", e);
        LaunchHistory::empty(&history_path)
    });
    let pins_path = dir.join("pins.json");
    let pins = PinStore::load(&pins_path).unwrap_or_else(|e| {
        warn!("{}", e);
        PinStore::empty(&pins_path)
    });
    (history, pins)
}

//  Main

fn main() {
    env_logger::init();

    let print_views = std::env::args().any(|a| a == "--print-views");

    let config = load_config();
    let (history, pins) = load_stores();

    let (event_tx, event_rx) = mpsc::channel::<ShellEvent>();
    let (view_tx, view_rx) = mpsc::channel::<ViewEvent>();
    spawn_view_sink(view_rx, print_views);

    let mut shell = Shell::new(
        HyprlandCompositor::new(),
        DesktopRegistry::scan_default(),
        config,
        history,
        pins,
        Instant::now(),
    );
    shell.set_view_sink(view_tx);
    shell.set_event_sink(event_tx.clone());
    if let Err(e) = shell.init() {
        error!("initial sync failed: {}", e);
    }

    spawn_event_sources(event_tx);
    run_event_loop(shell, event_rx);
}

//  Event loop

fn run_event_loop<C: Compositor, R: AppRegistry>(mut shell: Shell<C, R>, rx: mpsc::Receiver<ShellEvent>) {
    info!("hyprpill running");
    loop {
        let received = match shell.next_deadline() {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(event) => {
                if let Err(e) = shell.handle(event, Instant::now()) {
                    error!("event error: {}", e);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        shell.fire_due(Instant::now());
    }
    info!("all event sources closed, exiting");
}

//  Helpers

fn spawn_source<S>(name: &str, mut source: S, tx: mpsc::Sender<ShellEvent>)
where
    S: EventSource + 'static,
{
    let label = name.to_string();
    let spawned = std::thread::Builder::new().name(label.clone()).spawn(move || {
        if let Err(e) = source.run(tx) {
            error!("{} error: {}", label, e);
        }
    });
    if let Err(e) = spawned {
        error!("failed to spawn {}: {}", name, e);
    }
}

fn spawn_event_sources(tx: mpsc::Sender<ShellEvent>) {
    spawn_source(
        "socket-listener",
        UnixSocketListener::new(default_socket_path()),
        tx.clone(),
    );
    spawn_source("hyprland-events", HyprlandEventSource::new(), tx);
}

fn spawn_view_sink(rx: mpsc::Receiver<ViewEvent>, print: bool) {
    let spawned = std::thread::Builder::new().name("view-sink".into()).spawn(move || {
        let stdout = std::io::stdout();
        for view in rx {
            if !print {
                debug!("view: {:?}", view);
                continue;
            }
            match serde_json::to_string(&view) {
                Ok(json) => {
                    let mut out = stdout.lock();
                    if writeln!(out, "{}", json).and_then(|_| out.flush()).is_err() {
                        warn!("stdout closed, no longer printing views");
                        return;
                    }
                }
                Err(e) => error!("cannot serialize view: {}", e),
            }
        }
    });
    if let Err(e) = spawned {
        error!("failed to spawn view sink: {}", e);
    }
}
