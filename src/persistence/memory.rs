use std::collections::HashMap;

use parking_lot::RwLock;

use crate::document::{now_rfc3339, Canvas, CANVAS_FORMAT_VERSION};
use crate::error::{BoardError, Result};
use crate::id;
use crate::tree::TreeData;

use super::{validate_identifier, Store, UploadedImage};

#[derive(Default)]
struct Inner {
    canvases: HashMap<String, Canvas>,
    tree: Option<TreeData>,
    images: HashMap<String, Vec<u8>>,
    save_calls: HashMap<String, usize>,
    fail_saves: bool,
}

/// In-memory store used by tests and offline scratch boards.
///
/// Shared via `Arc`: the interior lock lets tests inspect what the app
/// saved, count save calls, and inject transport failures.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_canvas(canvas: Canvas) -> Self {
        let store = Self::new();
        store
            .inner
            .write()
            .canvases
            .insert(canvas.id.clone(), canvas);
        store
    }

    pub fn insert_canvas(&self, canvas: Canvas) {
        self.inner
            .write()
            .canvases
            .insert(canvas.id.clone(), canvas);
    }

    /// Number of `save_canvas` calls made for `id`.
    pub fn save_count(&self, id: &str) -> usize {
        self.inner.read().save_calls.get(id).copied().unwrap_or(0)
    }

    /// Last saved state of a canvas, if any.
    pub fn saved_canvas(&self, id: &str) -> Option<Canvas> {
        self.inner.read().canvases.get(id).cloned()
    }

    /// Make every subsequent `save_canvas` fail with `StoreUnavailable`.
    pub fn set_fail_saves(&self, fail: bool) {
        self.inner.write().fail_saves = fail;
    }
}

impl Store for MemoryStore {
    fn load_canvas(&self, id: &str) -> Result<Canvas> {
        validate_identifier(id)?;
        self.inner
            .read()
            .canvases
            .get(id)
            .cloned()
            .ok_or_else(|| BoardError::NotFound(id.to_owned()))
    }

    fn save_canvas(&self, canvas: &Canvas) -> Result<Canvas> {
        validate_identifier(&canvas.id)?;
        let mut inner = self.inner.write();
        *inner.save_calls.entry(canvas.id.clone()).or_insert(0) += 1;
        if inner.fail_saves {
            return Err(BoardError::StoreUnavailable("injected failure".to_owned()));
        }
        let mut stamped = canvas.clone();
        stamped.modified = now_rfc3339();
        if stamped.version.is_empty() {
            stamped.version = CANVAS_FORMAT_VERSION.to_owned();
        }
        inner.canvases.insert(stamped.id.clone(), stamped.clone());
        Ok(stamped)
    }

    fn delete_canvas(&self, id: &str) -> Result<()> {
        validate_identifier(id)?;
        self.inner
            .write()
            .canvases
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BoardError::NotFound(id.to_owned()))
    }

    fn load_tree(&self) -> Result<TreeData> {
        Ok(self
            .inner
            .read()
            .tree
            .clone()
            .unwrap_or_else(|| TreeData::with_root("main", "Main Canvas")))
    }

    fn save_tree(&self, tree: &TreeData) -> Result<()> {
        self.inner.write().tree = Some(tree.clone());
        Ok(())
    }

    fn upload_image(&self, name: &str, bytes: &[u8]) -> Result<UploadedImage> {
        let filename = id::new_image_filename(name);
        validate_identifier(&filename)?;
        self.inner
            .write()
            .images
            .insert(filename.clone(), bytes.to_vec());
        Ok(UploadedImage {
            url: format!("/api/images/{filename}"),
            filename,
            original_name: name.to_owned(),
            size: bytes.len() as u64,
        })
    }

    fn load_image(&self, filename: &str) -> Result<Vec<u8>> {
        validate_identifier(filename)?;
        self.inner
            .read()
            .images
            .get(filename)
            .cloned()
            .ok_or_else(|| BoardError::NotFound(filename.to_owned()))
    }
}
