//! Workspace indicators: one static slot per workspace `1..=count`.
//!
//! A slot is bound (not [`SlotFlags::EMPTY`]) while its workspace holds at
//! least one window, and [`SlotFlags::ACTIVE`] while it is shown.  Special
//! and out-of-range workspaces have no slot and are ignored.

use crate::command::ClientInfo;
use crate::slots::{SlotFlags, SlotSet};
use log::warn;
use serde::Serialize;
use std::collections::HashMap;

/// Upper bound on indicator slots.
pub const MAX_WORKSPACES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceView {
    pub id: i32,
    pub flags: u16,
}

#[derive(Debug)]
pub struct Workspaces {
    slots: SlotSet<i32>,
    active: i32,
    /// Window address → workspace.
    windows: HashMap<String, i32>,
}

impl Workspaces {
    pub fn new(count: usize) -> Self {
        if count > MAX_WORKSPACES {
            warn!("workspaces.count {} too large, using {}", count, MAX_WORKSPACES);
        }
        let count = i32::try_from(count.clamp(1, MAX_WORKSPACES)).unwrap_or(1);
        Self {
            slots: SlotSet::fixed_keys(1..=count),
            active: 1,
            windows: HashMap::new(),
        }
    }

    pub fn active(&self) -> i32 {
        self.active
    }

    /// Workspace id of the slot at `position`.
    pub fn id_at(&self, position: usize) -> Option<i32> {
        self.slots.slots().get(position).and_then(|s| s.key)
    }

    pub fn is_occupied(&self, id: i32) -> bool {
        self.slots.slot_of(&id).is_some()
    }

    pub fn view(&self) -> Vec<WorkspaceView> {
        self.slots
            .slots()
            .iter()
            .filter_map(|s| {
                Some(WorkspaceView {
                    id: s.key?,
                    flags: s.flags.bits(),
                })
            })
            .collect()
    }

    /// Replace the window map from a full client list.
    pub fn reset(&mut self, clients: &[ClientInfo], active: i32) {
        self.windows = clients
            .iter()
            .map(|c| (c.address.clone(), c.workspace))
            .collect();
        self.active = active;
        self.resync();
    }

    pub fn set_active(&mut self, id: i32) {
        self.active = id;
        self.apply_active();
    }

    /// A window appeared on, or moved to, `workspace`.
    pub fn window_placed(&mut self, address: &str, workspace: i32) {
        self.windows.insert(address.to_string(), workspace);
        self.resync();
    }

    pub fn window_closed(&mut self, address: &str) {
        if self.windows.remove(address).is_some() {
            self.resync();
        }
    }

    fn resync(&mut self) {
        let mut occupied: Vec<i32> = self.windows.values().copied().collect();
        occupied.sort_unstable();
        self.slots.sync(&occupied);
        self.apply_active();
    }

    fn apply_active(&mut self) {
        let active = self.active;
        let ids: Vec<_> = self.slots.slots().iter().map(|s| (s.id, s.key)).collect();
        for (id, key) in ids {
            if let Some(flags) = self.slots.flags_mut(id) {
                flags.set(SlotFlags::ACTIVE, key == Some(active));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(address: &str, workspace: i32) -> ClientInfo {
        ClientInfo {
            address: address.into(),
            app_id: "app".into(),
            title: String::new(),
            workspace,
            at: (0, 0),
            size: (10, 10),
        }
    }

    fn flags(ws: &Workspaces, id: i32) -> SlotFlags {
        let view = ws.view();
        let v = view.iter().find(|v| v.id == id).unwrap();
        SlotFlags::from_bits_truncate(v.flags)
    }

    #[test]
    fn count_is_clamped() {
        assert_eq!(Workspaces::new(0).view().len(), 1);
        let ws = Workspaces::new(usize::MAX);
        let view = ws.view();
        assert_eq!(view.len(), MAX_WORKSPACES);
        assert_eq!(view.last().map(|v| v.id), Some(MAX_WORKSPACES as i32));
    }

    #[test]
    fn occupancy_follows_windows() {
        let mut ws = Workspaces::new(5);
        ws.reset(&[client("0x1", 1), client("0x2", 3)], 1);
        assert!(ws.is_occupied(1));
        assert!(!ws.is_occupied(2));
        assert!(flags(&ws, 2).contains(SlotFlags::EMPTY));
        assert!(flags(&ws, 1).contains(SlotFlags::ACTIVE));

        ws.window_placed("0x2", 2);
        assert!(ws.is_occupied(2));
        assert!(!ws.is_occupied(3));
        ws.window_closed("0x1");
        assert!(!ws.is_occupied(1));
        assert!(flags(&ws, 1).contains(SlotFlags::ACTIVE), "active survives emptying");
        assert_eq!(ws.view().len(), 5);
    }

    #[test]
    fn active_moves() {
        let mut ws = Workspaces::new(3);
        ws.set_active(2);
        assert!(!flags(&ws, 1).contains(SlotFlags::ACTIVE));
        assert!(flags(&ws, 2).contains(SlotFlags::ACTIVE));
        assert_eq!(ws.id_at(2), Some(3));
        assert_eq!(ws.id_at(3), None);
    }

    #[test]
    fn out_of_range_workspaces_ignored() {
        let mut ws = Workspaces::new(3);
        ws.window_placed("0x1", 9);
        ws.window_placed("0x2", -98);
        assert!(ws.view().iter().all(|v| SlotFlags::from_bits_truncate(v.flags).contains(SlotFlags::EMPTY)));
    }
}
