use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::viewport::{ViewBox, DEFAULT_VIEW_BOX};

/// Current on-disk canvas format version.
pub const CANVAS_FORMAT_VERSION: &str = "1.0.0";

/// The persisted canvas record: metadata, viewbox, and the full element
/// array (z-order back to front).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Canvas {
    /// Format version; files written before versioning deserialize as
    /// empty and are migrated in place.
    #[serde(default)]
    pub version: String,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
    #[serde(default)]
    pub view_box: ViewBox,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Canvas {
    /// A new empty canvas with the default viewbox, stamped with the
    /// current time.
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent_id: Option<String>) -> Self {
        let now = now_rfc3339();
        Self {
            version: CANVAS_FORMAT_VERSION.to_owned(),
            id: id.into(),
            name: name.into(),
            parent_id,
            created: now.clone(),
            modified: now,
            view_box: DEFAULT_VIEW_BOX,
            elements: Vec::new(),
        }
    }

    /// True when the record predates versioning and needs migration.
    pub fn needs_migration(&self) -> bool {
        self.version.is_empty()
    }

    /// Stamp the current format version and a fresh `modified` time.
    /// Returns true when anything changed (the caller rewrites the file).
    pub fn migrate(&mut self) -> bool {
        if !self.needs_migration() {
            return false;
        }
        self.version = CANVAS_FORMAT_VERSION.to_owned();
        self.modified = now_rfc3339();
        true
    }

    /// Metadata-only copy with a fresh element array swapped in; used when
    /// serializing the live scene for a save.
    pub fn with_elements(&self, elements: Vec<Element>) -> Self {
        Self {
            elements,
            ..self.clone()
        }
    }
}

/// RFC 3339 UTC timestamp, the format the store speaks.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
