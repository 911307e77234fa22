use std::path::{Path, PathBuf};

use eframe::egui;

/// Image extensions the drop targets accept; anything else is silently
/// skipped.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// Events delivered by the desktop wrapper's drag-drop bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    DragOver,
    DragLeave,
    DragDrop { paths: Vec<PathBuf> },
}

/// The desktop wrapper as the core sees it: a queue of drag-drop events.
/// The default build runs without a wrapper via [`NullBridge`].
pub trait PlatformBridge {
    fn poll_events(&mut self) -> Vec<PlatformEvent>;
}

/// Bridge for builds without a desktop wrapper; never produces events.
#[derive(Debug, Default)]
pub struct NullBridge;

impl PlatformBridge for NullBridge {
    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        Vec::new()
    }
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// A dropped image ready to hand to the store: original filename + bytes.
#[derive(Debug, Clone)]
pub struct DroppedImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Read the image files among `paths`, skipping unrecognized extensions
/// silently and unreadable files with a log line.
pub fn read_dropped_images(paths: &[PathBuf]) -> Vec<DroppedImage> {
    let mut images = Vec::new();
    for path in paths {
        if !is_image_path(path) {
            continue;
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dropped.png")
            .to_owned();
        match std::fs::read(path) {
            Ok(bytes) => {
                log::info!("read dropped image {} ({} bytes)", path.display(), bytes.len());
                images.push(DroppedImage { name, bytes });
            }
            Err(err) => {
                log::error!("failed to read dropped file {}: {err}", path.display());
            }
        }
    }
    images
}

/// Collects files dropped onto the egui window itself (the non-wrapper
/// path) and shows the hover overlay.
pub struct FileHandler {
    dropped_files: Vec<egui::DroppedFile>,
}

impl Default for FileHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHandler {
    pub fn new() -> Self {
        Self {
            dropped_files: Vec::new(),
        }
    }

    /// Pull any newly dropped files out of the frame input. Returns true
    /// when there is something to process.
    pub fn check_for_dropped_files(&mut self, ctx: &egui::Context) -> bool {
        ctx.input(|i| {
            if !i.raw.dropped_files.is_empty() {
                self.dropped_files = i.raw.dropped_files.clone();
            }
        });
        !self.dropped_files.is_empty()
    }

    /// Drain the queued drops into uploadable images.
    pub fn take_dropped_images(&mut self) -> Vec<DroppedImage> {
        let mut images = Vec::new();
        for file in self.dropped_files.drain(..) {
            if let Some(bytes) = &file.bytes {
                if !file.name.is_empty() {
                    images.push(DroppedImage {
                        name: file.name.clone(),
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }
            if let Some(path) = &file.path {
                if is_image_path(path) {
                    match std::fs::read(path) {
                        Ok(bytes) => images.push(DroppedImage {
                            name: path
                                .file_name()
                                .and_then(|n| n.to_str())
                                .unwrap_or("dropped.png")
                                .to_owned(),
                            bytes,
                        }),
                        Err(err) => {
                            log::error!("failed to read {}: {err}", path.display());
                        }
                    }
                } else {
                    log::warn!("dropped file is not a supported type: {}", path.display());
                }
            }
        }
        images
    }

    /// Darken the window and list the files while a drag hovers over it.
    pub fn preview_files_being_dropped(&self, ctx: &egui::Context) {
        use egui::{Align2, Color32, Id, LayerId, Order, TextStyle};

        if ctx.input(|i| i.raw.hovered_files.is_empty()) {
            return;
        }
        let text = ctx.input(|i| {
            let mut text = "Dropping files:\n".to_owned();
            for file in &i.raw.hovered_files {
                match &file.path {
                    Some(path) => text += &format!("\n{}", path.display()),
                    None => text += "\n(path not available)",
                }
            }
            text
        });

        let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("file_drop_target")));
        let screen_rect = ctx.screen_rect();
        painter.rect_filled(screen_rect, 0.0, Color32::from_black_alpha(192));
        painter.text(
            screen_rect.center(),
            Align2::CENTER_CENTER,
            text,
            ctx.style()
                .text_styles
                .get(&TextStyle::Heading)
                .cloned()
                .unwrap_or_else(|| egui::FontId::proportional(20.0)),
            Color32::WHITE,
        );
    }
}
