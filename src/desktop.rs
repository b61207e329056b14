//! [`AppRegistry`] backed by freedesktop `.desktop` entries.
//!
//! Entries are read from `$XDG_DATA_HOME/applications` and every
//! `$XDG_DATA_DIRS/*/applications`.  Earlier directories win when the same
//! desktop-file id appears twice.  Hidden and `NoDisplay` entries are
//! skipped.

use crate::traits::{AppInfo, AppRegistry};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, thiserror::Error)]
#[error("failed to launch {app}: {source}")]
pub struct LaunchError {
    app: String,
    #[source]
    source: std::io::Error,
}

/// The application directories in precedence order.
pub fn application_dirs() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    let data_home = std::env::var_os("XDG_DATA_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".local/share"));
    let data_dirs = std::env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "/usr/local/share:/usr/share".into());

    std::iter::once(data_home)
        .chain(data_dirs.split(':').filter(|d| !d.is_empty()).map(PathBuf::from))
        .map(|d| d.join("applications"))
        .collect()
}

/// Remove `%f`-style field codes from an `Exec` value.  `%%` becomes `%`.
pub fn strip_field_codes(exec: &str) -> String {
    let mut out = String::with_capacity(exec.len());
    let mut chars = exec.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(_) | None => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse the `[Desktop Entry]` group of a desktop file.
///
/// Returns `None` for non-application, hidden or malformed entries.
pub fn parse_entry(id: &str, contents: &str) -> Option<AppInfo> {
    let mut in_entry = false;
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            // First occurrence wins.  Localised keys (`Name[de]`) are
            // distinct keys and never read.
            fields.entry(key.trim()).or_insert(value.trim());
        }
    }

    if fields.get("Type").copied() != Some("Application") {
        return None;
    }
    let flag = |k: &str| fields.get(k).is_some_and(|v| v.eq_ignore_ascii_case("true"));
    if flag("NoDisplay") || flag("Hidden") {
        return None;
    }
    let name = fields.get("Name")?.to_string();
    let exec = strip_field_codes(fields.get("Exec")?);
    if exec.is_empty() {
        return None;
    }
    Some(AppInfo {
        id: id.to_string(),
        name,
        exec,
        icon: fields.get("Icon").map(|s| s.to_string()),
        wm_class: fields.get("StartupWMClass").map(|s| s.to_string()),
    })
}

/// Installed applications, keyed by desktop-file id.
#[derive(Debug, Default)]
pub struct DesktopRegistry {
    apps: Vec<AppInfo>,
}

impl DesktopRegistry {
    pub fn from_apps(mut apps: Vec<AppInfo>) -> Self {
        apps.sort_by_key(|a| a.name.to_lowercase());
        Self { apps }
    }

    /// Scan the XDG application directories.
    pub fn scan_default() -> Self {
        Self::scan(&application_dirs())
    }

    pub fn scan(dirs: &[PathBuf]) -> Self {
        let mut found: HashMap<String, AppInfo> = HashMap::new();
        for dir in dirs {
            Self::scan_dir(dir, dir, &mut found);
        }
        info!("found {} applications", found.len());
        Self::from_apps(found.into_values().collect())
    }

    /// Recursively collect entries under `root`; subdirectories contribute
    /// ids joined with `-` (`kde/konsole.desktop` is `kde-konsole`).
    fn scan_dir(root: &Path, dir: &Path, found: &mut HashMap<String, AppInfo>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("skipping {}: {}", dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                Self::scan_dir(root, &path, found);
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("desktop") {
                continue;
            }
            let Ok(relative) = path.with_extension("").strip_prefix(root).map(Path::to_path_buf) else {
                continue;
            };
            let id = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("-");
            if found.contains_key(&id) {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(contents) => {
                    if let Some(app) = parse_entry(&id, &contents) {
                        found.insert(id, app);
                    }
                }
                Err(e) => warn!("cannot read {}: {}", path.display(), e),
            }
        }
    }
}

fn exec_basename(exec: &str) -> &str {
    let program = exec.split_whitespace().next().unwrap_or("");
    program.rsplit('/').next().unwrap_or(program)
}

impl AppRegistry for DesktopRegistry {
    type Error = LaunchError;

    fn apps(&self) -> Vec<AppInfo> {
        self.apps.clone()
    }

    /// Exact (case-insensitive) id, WM class, name or executable match
    /// first, then the last component of a reverse-DNS id
    /// (`org.mozilla.firefox` for `firefox`).
    fn lookup(&self, ident: &str) -> Option<AppInfo> {
        let ident = ident.trim().to_lowercase();
        if ident.is_empty() {
            return None;
        }
        let exact = self.apps.iter().find(|a| {
            a.id.to_lowercase() == ident
                || a.wm_class.as_deref().is_some_and(|c| c.to_lowercase() == ident)
                || a.name.to_lowercase() == ident
                || exec_basename(&a.exec).to_lowercase() == ident
        });
        exact
            .or_else(|| {
                self.apps
                    .iter()
                    .find(|a| a.id.rsplit('.').next().is_some_and(|last| last.to_lowercase() == ident))
            })
            .cloned()
    }

    fn launch(&self, app: &AppInfo) -> Result<(), LaunchError> {
        info!("launching {} ({})", app.id, app.exec);
        Command::new("sh")
            .arg("-c")
            .arg(format!("{} &", app.exec))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
            .map_err(|source| LaunchError {
                app: app.id.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_dir() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("hyprpill-desktop-{}-{}", std::process::id(), id));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const FIREFOX: &str = "\
[Desktop Entry]
Type=Application
Name=Firefox
Name[de]=Feuerfuchs
Exec=/usr/lib/firefox/firefox %u
Icon=firefox
StartupWMClass=firefox-esr

[Desktop Action new-window]
Name=New Window
Exec=firefox --new-window %u
";

    #[test]
    fn parses_main_group_only() {
        let app = parse_entry("org.mozilla.firefox", FIREFOX).unwrap();
        assert_eq!(app.name, "Firefox");
        assert_eq!(app.exec, "/usr/lib/firefox/firefox");
        assert_eq!(app.icon.as_deref(), Some("firefox"));
        assert_eq!(app.wm_class.as_deref(), Some("firefox-esr"));
    }

    #[test]
    fn skips_hidden_and_non_applications() {
        let hidden = "[Desktop Entry]\nType=Application\nName=X\nExec=x\nNoDisplay=true\n";
        assert!(parse_entry("x", hidden).is_none());
        let link = "[Desktop Entry]\nType=Link\nName=X\nURL=https://example.org\n";
        assert!(parse_entry("x", link).is_none());
        let no_exec = "[Desktop Entry]\nType=Application\nName=X\n";
        assert!(parse_entry("x", no_exec).is_none());
    }

    #[test]
    fn field_codes_stripped() {
        assert_eq!(strip_field_codes("foo %U --bar %f"), "foo --bar");
        assert_eq!(strip_field_codes("printf 100%%"), "printf 100%");
    }

    #[test]
    fn lookup_by_every_identifier() {
        let reg = DesktopRegistry::from_apps(vec![
            parse_entry("org.mozilla.firefox", FIREFOX).unwrap(),
            AppInfo {
                id: "foot".into(),
                name: "Foot".into(),
                exec: "foot".into(),
                icon: None,
                wm_class: None,
            },
        ]);
        for ident in ["org.mozilla.firefox", "Firefox-ESR", "firefox", "FIREFOX"] {
            assert_eq!(reg.lookup(ident).unwrap().id, "org.mozilla.firefox", "{}", ident);
        }
        assert_eq!(reg.lookup("foot").unwrap().id, "foot");
        assert!(reg.lookup("emacs").is_none());
        assert!(reg.lookup("").is_none());
    }

    #[test]
    fn scan_prefers_earlier_dirs() {
        let first = tmp_dir();
        let second = tmp_dir();
        std::fs::write(first.join("foot.desktop"), "[Desktop Entry]\nType=Application\nName=Foot Mine\nExec=foot\n").unwrap();
        std::fs::write(second.join("foot.desktop"), "[Desktop Entry]\nType=Application\nName=Foot\nExec=foot\n").unwrap();
        std::fs::create_dir_all(second.join("kde")).unwrap();
        std::fs::write(second.join("kde/konsole.desktop"), "[Desktop Entry]\nType=Application\nName=Konsole\nExec=konsole\n").unwrap();

        let reg = DesktopRegistry::scan(&[first.clone(), second.clone()]);
        let apps = reg.apps();
        assert_eq!(apps.len(), 2);
        assert_eq!(reg.lookup("foot").unwrap().name, "Foot Mine");
        assert_eq!(reg.lookup("kde-konsole").unwrap().name, "Konsole");
        let _ = std::fs::remove_dir_all(&first);
        let _ = std::fs::remove_dir_all(&second);
    }
}
