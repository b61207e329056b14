//! `hyprpill-msg`: send one command to a running hyprpill daemon.
//!
//! ```text
//! hyprpill-msg select launcher [--expand]
//! hyprpill-msg peek | expand | collapse | rescan
//! hyprpill-msg key esc
//! hyprpill-msg wallpaper next
//! hyprpill-msg media prev
//! hyprpill-msg pin firefox
//! hyprpill-msg launch org.gnome.Nautilus
//! hyprpill-msg query fire fox
//! hyprpill-msg raw '{"Volume":{"percent":40,"muted":false}}'
//! ```
//!
//! Direction and key names are parsed by the daemon's own rules, so
//! `next`/`right`/`forward` and `esc`/`escape` are all accepted.

use clap::{Parser, Subcommand};
use hyprpill::command::{AppletTarget, Command, Direction, Key};
use serde::de::DeserializeOwned;
use std::io::Write;
use std::os::unix::net::UnixStream;

/// Send a command to the hyprpill daemon
#[derive(Parser, Debug)]
#[command(name = "hyprpill-msg", version, about = "Send a command to the hyprpill daemon")]
struct Cli {
    #[command(subcommand)]
    command: Verb,

    /// Socket path (default: $XDG_RUNTIME_DIR/hyprpill.sock)
    #[arg(long)]
    socket: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Verb {
    /// Show an applet
    Select {
        /// Applet name (dashboard, launcher, wallpaper, media, power)
        applet: String,

        /// Open it expanded
        #[arg(long)]
        expand: bool,
    },

    /// Peek the dashboard
    Peek,

    /// Expand the dashboard
    Expand,

    /// Collapse back to the pill
    Collapse,

    /// Rescan the wallpaper directory
    Rescan,

    /// Send a key to the active applet
    Key {
        #[arg(value_parser = lenient::<Key>)]
        key: Key,
    },

    /// Cycle wallpapers
    Wallpaper {
        #[arg(value_parser = lenient::<Direction>)]
        direction: Direction,
    },

    /// Cycle media players
    Media {
        #[arg(value_parser = lenient::<Direction>)]
        direction: Direction,
    },

    /// Pin an app to the dock
    Pin { app_id: String },

    /// Unpin an app from the dock
    Unpin { app_id: String },

    /// Launch an app by id or name
    Launch { app: String },

    /// Set the launcher query
    Query { words: Vec<String> },

    /// Send a JSON command or event as is
    Raw {
        #[arg(required = true)]
        json: Vec<String>,
    },
}

impl Verb {
    /// The JSON line sent to the daemon.
    fn into_line(self) -> Result<String, String> {
        let command = match self {
            Verb::Raw { json } => {
                let json = json.join(" ");
                serde_json::from_str::<serde_json::Value>(&json)
                    .map_err(|e| format!("invalid JSON: {}", e))?;
                return Ok(json);
            }
            Verb::Select { applet, expand } => Command::SelectApplet(AppletTarget { applet, expand }),
            Verb::Peek => Command::Peek,
            Verb::Expand => Command::Expand,
            Verb::Collapse => Command::Collapse,
            Verb::Rescan => Command::RescanWallpapers,
            Verb::Key { key } => Command::Key(key),
            Verb::Wallpaper { direction } => Command::CycleWallpaper(direction),
            Verb::Media { direction } => Command::CycleMedia(direction),
            Verb::Pin { app_id } => Command::Pin(app_id),
            Verb::Unpin { app_id } => Command::Unpin(app_id),
            Verb::Launch { app } => Command::Launch(app),
            Verb::Query { words } => Command::LauncherQuery(words.join(" ")),
        };
        serde_json::to_string(&command).map_err(|e| e.to_string())
    }
}

/// Parse a key or direction name with the daemon's lenient rules.
fn lenient<T: DeserializeOwned>(arg: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(arg.to_string())).map_err(|e| e.to_string())
}

fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/hyprpill.sock", runtime)
}

fn main() {
    let cli = Cli::parse();
    let path = cli.socket.unwrap_or_else(default_socket_path);
    let line = match cli.command.into_line() {
        Ok(line) => line,
        Err(e) => {
            eprintln!("hyprpill-msg: {}", e);
            std::process::exit(2);
        }
    };

    let sent = UnixStream::connect(&path).and_then(|mut stream| writeln!(stream, "{}", line));
    if let Err(e) = sent {
        eprintln!("hyprpill-msg: {}: {}", path, e);
        std::process::exit(1);
    }
}
