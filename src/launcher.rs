//! Application launcher applet.
//!
//! The query matches an application when it is a case-insensitive
//! substring of its name or id, or a subsequence of its name (`ffx` finds
//! Firefox).  Matches are ranked by how often they were launched, then by
//! name.

use crate::command::Key;
use crate::store::LaunchHistory;
use crate::traits::AppInfo;
use std::cmp::Reverse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherOutcome {
    Redraw,
    Launch(AppInfo),
    Ignored,
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut chars = haystack.chars();
    needle.chars().all(|c| chars.any(|h| h == c))
}

/// Whether `query` (already lowercased) selects `app`.
pub fn matches(query: &str, app: &AppInfo) -> bool {
    if query.is_empty() {
        return true;
    }
    let name = app.name.to_lowercase();
    name.contains(query) || app.id.to_lowercase().contains(query) || is_subsequence(query, &name)
}

#[derive(Debug)]
pub struct Launcher {
    apps: Vec<AppInfo>,
    query: String,
    results: Vec<usize>,
    selected: usize,
    max_results: usize,
}

impl Launcher {
    pub fn new(max_results: usize) -> Self {
        Self {
            apps: Vec::new(),
            query: String::new(),
            results: Vec::new(),
            selected: 0,
            max_results: max_results.max(1),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn results(&self) -> Vec<AppInfo> {
        self.results.iter().map(|i| self.apps[*i].clone()).collect()
    }

    pub fn selected(&self) -> Option<&AppInfo> {
        self.results.get(self.selected).map(|i| &self.apps[*i])
    }

    pub fn set_apps(&mut self, apps: Vec<AppInfo>, history: &LaunchHistory) {
        self.apps = apps;
        self.refilter(history);
    }

    pub fn set_query(&mut self, query: &str, history: &LaunchHistory) {
        self.query = query.to_string();
        self.selected = 0;
        self.refilter(history);
    }

    /// Clear the query (when the applet is hidden).
    pub fn reset(&mut self, history: &LaunchHistory) {
        self.set_query("", history);
    }

    pub fn key(&mut self, key: Key) -> LauncherOutcome {
        match key {
            Key::Up | Key::Left => {
                self.selected = self.selected.saturating_sub(1);
                LauncherOutcome::Redraw
            }
            Key::Down | Key::Right => {
                self.selected = (self.selected + 1).min(self.results.len().saturating_sub(1));
                LauncherOutcome::Redraw
            }
            Key::Enter => match self.selected() {
                Some(app) => LauncherOutcome::Launch(app.clone()),
                None => LauncherOutcome::Ignored,
            },
            Key::Escape => LauncherOutcome::Ignored,
        }
    }

    fn refilter(&mut self, history: &LaunchHistory) {
        let query = self.query.trim().to_lowercase();
        let mut results: Vec<usize> = (0..self.apps.len())
            .filter(|i| matches(&query, &self.apps[*i]))
            .collect();
        let apps = &self.apps;
        results.sort_by_key(|i| (Reverse(history.count(&apps[*i].id)), apps[*i].name.to_lowercase()));
        results.truncate(self.max_results);
        self.results = results;
        self.selected = self.selected.min(self.results.len().saturating_sub(1));
    }
}
