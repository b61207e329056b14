//! Media player tabs.
//!
//! Players are shown in a seven-slot carousel around the active one.  A new
//! player is inserted at the centre, pushing its neighbours outward; a
//! metadata change marks the player `Updated` without touching any slot
//! binding.

use crate::carousel::{Carousel, PressAction, MEDIA_SLOTS};
use crate::command::Direction;
use crate::lifecycle::{ItemState, Lifecycle};
use crate::traits::CarouselSlotView;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// What the media daemon reports about one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Bus name suffix, e.g. `spotify` or `firefox.instance123`.
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub status: PlaybackStatus,
}

#[derive(Debug)]
struct Player {
    info: PlayerInfo,
    lifecycle: Lifecycle,
}

#[derive(Debug)]
pub struct MediaTabs {
    carousel: Carousel<String>,
    players: HashMap<String, Player>,
}

impl Default for MediaTabs {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaTabs {
    pub fn new() -> Self {
        Self {
            carousel: Carousel::new(MEDIA_SLOTS, true),
            players: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// The player under the centre slot.
    pub fn active(&self) -> Option<&PlayerInfo> {
        let name = self.carousel.selected()?;
        self.players.get(name).map(|p| &p.info)
    }

    pub fn state_of(&self, name: &str) -> Option<ItemState> {
        self.players.get(name).map(|p| p.lifecycle.state())
    }

    pub fn carousel(&self) -> &Carousel<String> {
        &self.carousel
    }

    pub fn view(&self) -> Vec<CarouselSlotView> {
        self.carousel
            .slots()
            .enumerate()
            .map(|(position, slot)| CarouselSlotView {
                position,
                item: slot.item.clone(),
                flags: slot.flags.bits(),
            })
            .collect()
    }

    pub fn player_added(&mut self, info: PlayerInfo) {
        if self.players.contains_key(&info.name) {
            self.player_changed(info);
            return;
        }
        let mut lifecycle = Lifecycle::new();
        lifecycle.show();
        let name = info.name.clone();
        self.players.insert(name.clone(), Player { info, lifecycle });
        self.carousel.insert_at_focus(name.clone());
        info!("media: player {} added", name);
    }

    pub fn player_changed(&mut self, info: PlayerInfo) {
        let Some(player) = self.players.get_mut(&info.name) else {
            debug!("media: change for unknown player {}, adding", info.name);
            self.player_added(info);
            return;
        };
        if player.info != info {
            player.info = info;
            player.lifecycle.update();
        }
    }

    pub fn player_removed(&mut self, name: &str) {
        let Some(mut player) = self.players.remove(name) else {
            debug!("media: unknown player {} removed", name);
            return;
        };
        player.lifecycle.remove_now();
        self.carousel.remove(&name.to_string());
        info!("media: player {} removed", name);
    }

    pub fn cycle(&mut self, direction: Direction) -> bool {
        self.carousel.shift(direction)
    }

    /// Press on the tab at `position`.  Neighbours cycle; the centre returns
    /// the active player's name.
    pub fn press(&mut self, position: usize) -> Option<String> {
        match self.carousel.press(position) {
            PressAction::Shift(direction) => {
                self.carousel.shift(direction);
                None
            }
            PressAction::Select => self.carousel.selected().cloned(),
            PressAction::None => None,
        }
    }

    pub fn hover(&mut self, position: Option<usize>) {
        self.carousel.hover(position);
    }

    pub fn settle(&mut self) {
        for player in self.players.values_mut() {
            player.lifecycle.settle();
        }
    }
}
