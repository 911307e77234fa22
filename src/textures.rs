use std::collections::HashMap;

use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};

use crate::filters::{self, FilterStack};
use crate::persistence::Store;

/// Decoded-and-filtered texture cache for image elements.
///
/// Cache key is `(src, filter fingerprint)`, so live filter preview gets a
/// freshly processed texture per distinct stack while unchanged images are
/// uploaded once. Sources that fail to load or decode are remembered so the
/// store is not hammered every frame.
pub struct ImageCache {
    textures: HashMap<(String, String), TextureHandle>,
    failed: HashMap<String, String>,
    /// Decoded originals, so filter tweaks do not re-read the store.
    decoded: HashMap<String, image::DynamicImage>,
    max_cache_size: usize,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ImageCache {
    pub fn new(max_cache_size: usize) -> Self {
        Self {
            textures: HashMap::new(),
            failed: HashMap::new(),
            decoded: HashMap::new(),
            max_cache_size: max_cache_size.max(1),
        }
    }

    /// Texture for `src` with `filters` applied, loading and decoding on
    /// first use. Returns `None` while unavailable.
    pub fn texture_for(
        &mut self,
        ctx: &Context,
        store: &dyn Store,
        src: &str,
        filters: Option<&FilterStack>,
    ) -> Option<TextureId> {
        let fingerprint = filters.map(FilterStack::fingerprint).unwrap_or_default();
        let key = (src.to_owned(), fingerprint);
        if let Some(handle) = self.textures.get(&key) {
            return Some(handle.id());
        }
        if self.failed.contains_key(src) {
            return None;
        }

        let decoded = match self.decoded.get(src) {
            Some(img) => img.clone(),
            None => {
                let filename = src.rsplit('/').next().unwrap_or(src);
                let bytes = match store.load_image(filename) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::warn!("image {src} unavailable: {e}");
                        self.failed.insert(src.to_owned(), e.to_string());
                        return None;
                    }
                };
                match image::load_from_memory(&bytes) {
                    Ok(img) => {
                        self.decoded.insert(src.to_owned(), img.clone());
                        img
                    }
                    Err(e) => {
                        log::error!("failed to decode image {src}: {e}");
                        self.failed.insert(src.to_owned(), e.to_string());
                        return None;
                    }
                }
            }
        };

        let rgba = match filters {
            Some(f) if !f.is_neutral() => filters::apply_to_image(decoded, f),
            _ => decoded.to_rgba8(),
        };
        let size = [rgba.width() as usize, rgba.height() as usize];
        let color_image = ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());

        self.prune_if_needed();
        let name = format!("img:{}:{}", key.0, key.1);
        let handle = ctx.load_texture(&name, color_image, TextureOptions::LINEAR);
        let id = handle.id();
        self.textures.insert(key, handle);
        Some(id)
    }

    /// Forget a failed source so the next frame retries it.
    pub fn retry(&mut self, src: &str) {
        self.failed.remove(src);
    }

    fn prune_if_needed(&mut self) {
        // Filter preview churns the keyed cache; dropping everything on
        // overflow is crude but the originals stay decoded.
        if self.textures.len() >= self.max_cache_size {
            self.textures.clear();
        }
        if self.decoded.len() >= self.max_cache_size {
            self.decoded.clear();
        }
    }
}
