use std::fs;
use std::path::{Path, PathBuf};

use crate::document::{now_rfc3339, Canvas, CANVAS_FORMAT_VERSION};
use crate::error::{BoardError, Result};
use crate::id;
use crate::tree::TreeData;

use super::{validate_identifier, Store, UploadedImage};

/// Filesystem-backed store.
///
/// Layout under the root: `canvases/<id>.json`, `images/<filename>`, and
/// `tree.json`. First use seeds the `main` canvas and a tree rooted at it.
/// Canvas and tree files are written pretty-printed.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the storage directories and the default `main` canvas/tree
    /// if they are missing.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.canvases_dir()).map_err(io_err)?;
        fs::create_dir_all(self.images_dir()).map_err(io_err)?;

        let main_path = self.canvas_path("main");
        if !main_path.exists() {
            let canvas = Canvas::new("main", "Main Canvas", None);
            self.write_canvas(&main_path, &canvas)?;
        }
        if !self.tree_path().exists() {
            self.save_tree(&TreeData::with_root("main", "Main Canvas"))?;
        }
        Ok(())
    }

    fn canvases_dir(&self) -> PathBuf {
        self.root.join("canvases")
    }

    fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    fn tree_path(&self) -> PathBuf {
        self.root.join("tree.json")
    }

    fn canvas_path(&self, id: &str) -> PathBuf {
        self.canvases_dir().join(format!("{id}.json"))
    }

    fn write_canvas(&self, path: &Path, canvas: &Canvas) -> Result<()> {
        let content = serde_json::to_string_pretty(canvas)
            .map_err(|e| BoardError::StoreUnavailable(format!("serialize canvas: {e}")))?;
        fs::write(path, content).map_err(io_err)
    }
}

impl Store for LocalStore {
    fn load_canvas(&self, id: &str) -> Result<Canvas> {
        validate_identifier(id)?;
        let path = self.canvas_path(id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BoardError::NotFound(id.to_owned()))
            }
            Err(e) => return Err(io_err(e)),
        };
        let mut canvas: Canvas = serde_json::from_str(&content)
            .map_err(|e| BoardError::StoreUnavailable(format!("parse canvas {id}: {e}")))?;

        // Pre-versioning files are stamped and rewritten on first read.
        if canvas.migrate() {
            log::info!("migrated canvas {id} to format {CANVAS_FORMAT_VERSION}");
            self.write_canvas(&path, &canvas)?;
        }
        Ok(canvas)
    }

    fn save_canvas(&self, canvas: &Canvas) -> Result<Canvas> {
        validate_identifier(&canvas.id)?;
        fs::create_dir_all(self.canvases_dir()).map_err(io_err)?;

        let mut stamped = canvas.clone();
        stamped.modified = now_rfc3339();
        if stamped.version.is_empty() {
            stamped.version = CANVAS_FORMAT_VERSION.to_owned();
        }
        self.write_canvas(&self.canvas_path(&stamped.id), &stamped)?;
        Ok(stamped)
    }

    fn delete_canvas(&self, id: &str) -> Result<()> {
        validate_identifier(id)?;
        match fs::remove_file(self.canvas_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BoardError::NotFound(id.to_owned()))
            }
            Err(e) => Err(io_err(e)),
        }
    }

    fn load_tree(&self) -> Result<TreeData> {
        let path = self.tree_path();
        if !path.exists() {
            self.init()?;
        }
        let content = fs::read_to_string(&path).map_err(io_err)?;
        serde_json::from_str(&content)
            .map_err(|e| BoardError::StoreUnavailable(format!("parse tree: {e}")))
    }

    fn save_tree(&self, tree: &TreeData) -> Result<()> {
        let content = serde_json::to_string_pretty(tree)
            .map_err(|e| BoardError::StoreUnavailable(format!("serialize tree: {e}")))?;
        fs::write(self.tree_path(), content).map_err(io_err)
    }

    fn upload_image(&self, name: &str, bytes: &[u8]) -> Result<UploadedImage> {
        let filename = id::new_image_filename(name);
        validate_identifier(&filename)?;
        fs::create_dir_all(self.images_dir()).map_err(io_err)?;
        fs::write(self.images_dir().join(&filename), bytes).map_err(io_err)?;
        Ok(UploadedImage {
            url: format!("/api/images/{filename}"),
            filename,
            original_name: name.to_owned(),
            size: bytes.len() as u64,
        })
    }

    fn load_image(&self, filename: &str) -> Result<Vec<u8>> {
        validate_identifier(filename)?;
        match fs::read(self.images_dir().join(filename)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BoardError::NotFound(filename.to_owned()))
            }
            Err(e) => Err(io_err(e)),
        }
    }
}

fn io_err(e: std::io::Error) -> BoardError {
    BoardError::StoreUnavailable(e.to_string())
}
