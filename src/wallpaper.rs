//! Wallpaper selector.
//!
//! Images from the wallpaper directory are shown five at a time around the
//! selection.  Pressing the centre slot applies the image; its neighbours
//! cycle the carousel.  Applying runs the configured command in the
//! background and the result comes back as
//! [`ShellEvent::WallpaperApplied`](crate::command::ShellEvent::WallpaperApplied).

use crate::carousel::{Carousel, PressAction, WALLPAPER_SLOTS};
use crate::command::Direction;
use crate::exec::shell_quote;
use crate::traits::CarouselSlotView;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// Image files directly inside `dir`, sorted by path.
pub fn scan(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if is_image {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Expand the apply-command template for `path`.
///
/// Every `{}` is replaced by the quoted path; a template without `{}` gets
/// the path appended.
pub fn apply_command(template: &str, path: &Path) -> String {
    let quoted = shell_quote(&path.to_string_lossy());
    if template.contains("{}") {
        template.replace("{}", &quoted)
    } else {
        format!("{} {}", template, quoted)
    }
}

#[derive(Debug)]
pub struct WallpaperSelector {
    carousel: Carousel<PathBuf>,
    current: Option<PathBuf>,
    applying: Option<PathBuf>,
}

impl Default for WallpaperSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl WallpaperSelector {
    pub fn new() -> Self {
        Self {
            carousel: Carousel::new(WALLPAPER_SLOTS, false),
            current: None,
            applying: None,
        }
    }

    pub fn carousel(&self) -> &Carousel<PathBuf> {
        &self.carousel
    }

    pub fn selected(&self) -> Option<&PathBuf> {
        self.carousel.selected()
    }

    /// The wallpaper last applied successfully.
    pub fn current(&self) -> Option<&PathBuf> {
        self.current.as_ref()
    }

    pub fn is_applying(&self) -> bool {
        self.applying.is_some()
    }

    pub fn set_images(&mut self, images: Vec<PathBuf>) {
        info!("wallpaper: {} images", images.len());
        self.carousel.set_items(images);
    }

    /// Re-read `dir`.  A missing directory empties the selector.
    pub fn rescan(&mut self, dir: &Path) {
        match scan(dir) {
            Ok(images) => self.set_images(images),
            Err(e) => {
                warn!("cannot scan {}: {}", dir.display(), e);
                self.set_images(Vec::new());
            }
        }
    }

    pub fn cycle(&mut self, direction: Direction) -> bool {
        self.carousel.shift(direction)
    }

    /// Press on the slot at `position`.  Returns the image to apply when
    /// the centre slot was pressed.
    pub fn press(&mut self, position: usize) -> Option<PathBuf> {
        match self.carousel.press(position) {
            PressAction::Shift(direction) => {
                self.carousel.shift(direction);
                None
            }
            PressAction::Select => self.begin_apply(),
            PressAction::None => None,
        }
    }

    /// Mark the selected image as being applied and return it.  Only one
    /// apply runs at a time.
    pub fn begin_apply(&mut self) -> Option<PathBuf> {
        if let Some(pending) = &self.applying {
            debug!("wallpaper: {} still applying", pending.display());
            return None;
        }
        let path = self.carousel.selected()?.clone();
        self.applying = Some(path.clone());
        Some(path)
    }

    /// The apply command for `path` finished.
    pub fn applied(&mut self, path: PathBuf, ok: bool) {
        if self.applying.as_ref() != Some(&path) {
            debug!("wallpaper: unexpected result for {}", path.display());
        }
        self.applying = None;
        if ok {
            info!("wallpaper: applied {}", path.display());
            self.current = Some(path);
        }
    }

    pub fn hover(&mut self, position: Option<usize>) {
        self.carousel.hover(position);
    }

    pub fn view(&self) -> Vec<CarouselSlotView> {
        self.carousel
            .slots()
            .enumerate()
            .map(|(position, slot)| CarouselSlotView {
                position,
                item: slot
                    .item
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
                flags: slot.flags.bits(),
            })
            .collect()
    }
}
