use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod autosave;
mod local;
mod memory;

pub use autosave::{AutoSaver, AutosaveOutcome, AUTOSAVE_DELAY, MAX_SAVE_ATTEMPTS};
pub use local::LocalStore;
pub use memory::MemoryStore;

use crate::document::Canvas;
use crate::error::{BoardError, Result};
use crate::tree::TreeData;

/// Record returned by an image upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub url: String,
}

/// The persistence backend as the core sees it.
///
/// Implementations may block; all calls happen on the single event loop and
/// the caller owns any retry/timeout policy. `save_canvas` returns the
/// authoritative record (the store stamps `modified`). Last writer wins;
/// no version check is attempted on save.
pub trait Store {
    fn load_canvas(&self, id: &str) -> Result<Canvas>;
    fn save_canvas(&self, canvas: &Canvas) -> Result<Canvas>;
    fn delete_canvas(&self, id: &str) -> Result<()>;
    fn load_tree(&self) -> Result<TreeData>;
    fn save_tree(&self, tree: &TreeData) -> Result<()>;
    fn upload_image(&self, name: &str, bytes: &[u8]) -> Result<UploadedImage>;
    fn load_image(&self, filename: &str) -> Result<Vec<u8>>;
}

/// Validate a canvas id or image filename before it reaches any I/O.
///
/// Accepted: up to 64 chars of `[A-Za-z0-9_-]` plus an optional simple
/// extension, or a standard UUID. Path separators, `..`, and control
/// characters are rejected.
pub fn validate_identifier(id: &str) -> Result<()> {
    if Uuid::parse_str(id).is_ok() {
        return Ok(());
    }

    let (stem, ext) = match id.split_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (id, None),
    };

    let stem_ok = !stem.is_empty()
        && stem.len() <= 64
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let ext_ok = match ext {
        Some(ext) => !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()),
        None => true,
    };

    if stem_ok && ext_ok {
        Ok(())
    } else {
        Err(BoardError::InvalidInput(format!("unsafe identifier: {id}")))
    }
}
