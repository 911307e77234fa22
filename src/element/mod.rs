use serde::de::Error as DeError;
use serde::ser::Error as SerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::filters::FilterStack;
use crate::geometry::WorldRect;
use crate::id;

/// A point on a freehand path, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Variant-specific element payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Image {
        src: String,
    },
    Rectangle {
        stroke: String,
        fill: String,
        stroke_width: f64,
    },
    Line {
        stroke: String,
        stroke_width: f64,
    },
    Freehand {
        points: Vec<Point>,
        stroke: String,
        stroke_width: f64,
    },
    Text {
        text: String,
        font: String,
    },
    Folder {
        target_canvas_id: String,
    },
    Group {
        children: Vec<String>,
    },
}

impl ElementKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Image { .. } => "image",
            ElementKind::Rectangle { .. } => "rectangle",
            ElementKind::Line { .. } => "line",
            ElementKind::Freehand { .. } => "freehand",
            ElementKind::Text { .. } => "text",
            ElementKind::Folder { .. } => "folder",
            ElementKind::Group { .. } => "group",
        }
    }
}

/// One displayable entity on a canvas.
///
/// The common header mirrors the persisted JSON object; `extra` carries any
/// fields this build does not recognize so they survive a round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: String,
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub z_index: i64,
    pub group_id: Option<String>,
    pub note: Option<String>,
    pub flip_h: bool,
    pub flip_v: bool,
    pub filters: Option<FilterStack>,
    pub extra: Map<String, Value>,
}

impl Element {
    pub fn new(kind: ElementKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: id::new_element_id(),
            kind,
            x,
            y,
            width,
            height,
            z_index: 0,
            group_id: None,
            note: None,
            flip_h: false,
            flip_v: false,
            filters: None,
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_z(mut self, z: i64) -> Self {
        self.z_index = z;
        self
    }

    /// Highlightable by stroking the element's own outline.
    pub fn can_stroke(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::Rectangle { .. }
                | ElementKind::Line { .. }
                | ElementKind::Freehand { .. }
                | ElementKind::Text { .. }
        )
    }

    /// Images and group frames get a separate overlay selection rectangle.
    pub fn needs_overlay_highlight(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::Image { .. } | ElementKind::Group { .. }
        )
    }

    /// Folders show selection by thickening their border.
    pub fn thickens_border(&self) -> bool {
        matches!(self.kind, ElementKind::Folder { .. })
    }

    /// Axis-aligned bounding box in world units.
    ///
    /// Group bounds are resolved by the scene (union over children); this
    /// returns the group's stored frame.
    pub fn bounds(&self) -> WorldRect {
        match &self.kind {
            ElementKind::Freehand { points, .. } if !points.is_empty() => {
                let mut min_x = points[0].x;
                let mut min_y = points[0].y;
                let mut max_x = points[0].x;
                let mut max_y = points[0].y;
                for p in points {
                    min_x = min_x.min(p.x);
                    min_y = min_y.min(p.y);
                    max_x = max_x.max(p.x);
                    max_y = max_y.max(p.y);
                }
                WorldRect::from_corners((min_x, min_y), (max_x, max_y))
            }
            // Lines keep a signed extent (x,y) -> (x+w, y+h); normalize.
            ElementKind::Line { .. } => WorldRect::from_corners(
                (self.x, self.y),
                (self.x + self.width, self.y + self.height),
            ),
            _ => WorldRect::new(self.x, self.y, self.width, self.height),
        }
    }

    /// Hit test in world units. Lines and freehand paths test distance to
    /// their segments; everything else tests bounds containment.
    pub fn hit_test(&self, px: f64, py: f64) -> bool {
        match &self.kind {
            ElementKind::Line { stroke_width, .. } => {
                let a = (self.x, self.y);
                let b = (self.x + self.width, self.y + self.height);
                segment_distance(a, b, (px, py)) <= stroke_width.max(1.0) + HIT_SLOP
            }
            ElementKind::Freehand {
                points,
                stroke_width,
                ..
            } => {
                let tolerance = stroke_width.max(1.0) + HIT_SLOP;
                points.windows(2).any(|w| {
                    segment_distance((w[0].x, w[0].y), (w[1].x, w[1].y), (px, py)) <= tolerance
                })
            }
            _ => self.bounds().contains(px, py),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        if let ElementKind::Freehand { points, .. } = &mut self.kind {
            for p in points.iter_mut() {
                p.x += dx;
                p.y += dy;
            }
        }
    }

    /// Move and size the element to `rect`, scaling freehand points to fit.
    pub fn set_bounds(&mut self, rect: WorldRect) {
        if let ElementKind::Freehand { points, .. } = &mut self.kind {
            let old = WorldRect::new(self.x, self.y, self.width, self.height);
            let sx = if old.width > 0.0 {
                rect.width / old.width
            } else {
                1.0
            };
            let sy = if old.height > 0.0 {
                rect.height / old.height
            } else {
                1.0
            };
            for p in points.iter_mut() {
                p.x = rect.x + (p.x - old.x) * sx;
                p.y = rect.y + (p.y - old.y) * sy;
            }
        }
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }
}

const HIT_SLOP: f64 = 4.0;

fn segment_distance(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    let (ax, ay) = a;
    let (bx, by) = b;
    let (px, py) = p;
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

// The wire format is a flat JSON object with a `type` tag (see the persisted
// canvas format). Serialization is hand-rolled so unrecognized keys from
// other builds pass through untouched.

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = self.extra.clone();
        map.insert("id".into(), Value::String(self.id.clone()));
        map.insert("type".into(), Value::String(self.kind.type_name().into()));
        map.insert("x".into(), json_num(self.x));
        map.insert("y".into(), json_num(self.y));
        map.insert("width".into(), json_num(self.width));
        map.insert("height".into(), json_num(self.height));
        map.insert("zIndex".into(), Value::from(self.z_index));

        match &self.kind {
            ElementKind::Image { src } => {
                map.insert("src".into(), Value::String(src.clone()));
            }
            ElementKind::Rectangle {
                stroke,
                fill,
                stroke_width,
            } => {
                map.insert("stroke".into(), Value::String(stroke.clone()));
                map.insert("fill".into(), Value::String(fill.clone()));
                map.insert("strokeWidth".into(), json_num(*stroke_width));
            }
            ElementKind::Line {
                stroke,
                stroke_width,
            } => {
                map.insert("stroke".into(), Value::String(stroke.clone()));
                map.insert("strokeWidth".into(), json_num(*stroke_width));
            }
            ElementKind::Freehand {
                points,
                stroke,
                stroke_width,
            } => {
                let pts = serde_json::to_value(points).map_err(S::Error::custom)?;
                map.insert("points".into(), pts);
                map.insert("stroke".into(), Value::String(stroke.clone()));
                map.insert("strokeWidth".into(), json_num(*stroke_width));
            }
            ElementKind::Text { text, font } => {
                map.insert("text".into(), Value::String(text.clone()));
                map.insert("font".into(), Value::String(font.clone()));
            }
            ElementKind::Folder { target_canvas_id } => {
                map.insert(
                    "targetCanvasId".into(),
                    Value::String(target_canvas_id.clone()),
                );
            }
            ElementKind::Group { children } => {
                map.insert(
                    "children".into(),
                    Value::Array(children.iter().cloned().map(Value::String).collect()),
                );
            }
        }

        if let Some(group_id) = &self.group_id {
            map.insert("groupId".into(), Value::String(group_id.clone()));
        }
        if let Some(note) = &self.note {
            map.insert("note".into(), Value::String(note.clone()));
        }
        if self.flip_h {
            map.insert("flipH".into(), Value::Bool(true));
        }
        if self.flip_v {
            map.insert("flipV".into(), Value::Bool(true));
        }
        if let Some(filters) = &self.filters {
            if !filters.is_neutral() {
                let v = serde_json::to_value(filters).map_err(S::Error::custom)?;
                map.insert("filters".into(), v);
            }
        }

        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;

        let id = take_string(&mut map, "id")
            .ok_or_else(|| D::Error::custom("element is missing `id`"))?;
        let type_name = take_string(&mut map, "type")
            .ok_or_else(|| D::Error::custom("element is missing `type`"))?;

        let x = take_f64(&mut map, "x").unwrap_or(0.0);
        let y = take_f64(&mut map, "y").unwrap_or(0.0);
        let width = take_f64(&mut map, "width").unwrap_or(0.0);
        let height = take_f64(&mut map, "height").unwrap_or(0.0);
        let z_index = take_i64(&mut map, "zIndex").unwrap_or(0);

        let kind = match type_name.as_str() {
            "image" => ElementKind::Image {
                src: take_string(&mut map, "src").unwrap_or_default(),
            },
            "rectangle" => ElementKind::Rectangle {
                stroke: take_string(&mut map, "stroke").unwrap_or_else(default_stroke),
                fill: take_string(&mut map, "fill").unwrap_or_else(|| "none".to_owned()),
                stroke_width: take_f64(&mut map, "strokeWidth").unwrap_or(DEFAULT_STROKE_WIDTH),
            },
            "line" => ElementKind::Line {
                stroke: take_string(&mut map, "stroke").unwrap_or_else(default_stroke),
                stroke_width: take_f64(&mut map, "strokeWidth").unwrap_or(DEFAULT_STROKE_WIDTH),
            },
            "freehand" => {
                let points = match map.remove("points") {
                    Some(v) => serde_json::from_value(v).map_err(D::Error::custom)?,
                    None => Vec::new(),
                };
                ElementKind::Freehand {
                    points,
                    stroke: take_string(&mut map, "stroke").unwrap_or_else(default_stroke),
                    stroke_width: take_f64(&mut map, "strokeWidth").unwrap_or(DEFAULT_STROKE_WIDTH),
                }
            }
            "text" => ElementKind::Text {
                text: take_string(&mut map, "text").unwrap_or_default(),
                font: take_string(&mut map, "font").unwrap_or_else(|| DEFAULT_FONT.to_owned()),
            },
            "folder" => ElementKind::Folder {
                target_canvas_id: take_string(&mut map, "targetCanvasId").unwrap_or_default(),
            },
            "group" => {
                let children = match map.remove("children") {
                    Some(v) => serde_json::from_value(v).map_err(D::Error::custom)?,
                    None => Vec::new(),
                };
                ElementKind::Group { children }
            }
            other => {
                return Err(D::Error::custom(format!("unknown element type `{other}`")));
            }
        };

        let group_id = take_string(&mut map, "groupId");
        let note = take_string(&mut map, "note");
        let flip_h = take_bool(&mut map, "flipH").unwrap_or(false);
        let flip_v = take_bool(&mut map, "flipV").unwrap_or(false);

        let filters = match map.remove("filters") {
            Some(v) => {
                let mut f: FilterStack = serde_json::from_value(v).map_err(D::Error::custom)?;
                // Out-of-range values from older files are clamped on read.
                f.normalize();
                if f.is_neutral() {
                    None
                } else {
                    Some(f)
                }
            }
            None => None,
        };

        Ok(Element {
            id,
            kind,
            x,
            y,
            width,
            height,
            z_index,
            group_id,
            note,
            flip_h,
            flip_v,
            filters,
            extra: map,
        })
    }
}

const DEFAULT_STROKE_WIDTH: f64 = 2.0;
const DEFAULT_FONT: &str = "16px sans-serif";

fn default_stroke() -> String {
    "#333333".to_owned()
}

fn json_num(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            // Keep non-string oddities round-trippable.
            map.insert(key.to_owned(), other);
            None
        }
        None => None,
    }
}

fn take_f64(map: &mut Map<String, Value>, key: &str) -> Option<f64> {
    match map.remove(key) {
        Some(v) => match v.as_f64() {
            Some(n) => Some(n),
            None => {
                map.insert(key.to_owned(), v);
                None
            }
        },
        None => None,
    }
}

fn take_i64(map: &mut Map<String, Value>, key: &str) -> Option<i64> {
    match map.remove(key) {
        Some(v) => match v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)) {
            Some(n) => Some(n),
            None => {
                map.insert(key.to_owned(), v);
                None
            }
        },
        None => None,
    }
}

fn take_bool(map: &mut Map<String, Value>, key: &str) -> Option<bool> {
    match map.remove(key) {
        Some(Value::Bool(b)) => Some(b),
        Some(other) => {
            map.insert(key.to_owned(), other);
            None
        }
        None => None,
    }
}

/// Factory functions for creating elements.
pub mod factory {
    use super::*;

    pub fn image(src: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Element {
        Element::new(ElementKind::Image { src: src.into() }, x, y, width, height)
    }

    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Element {
        Element::new(
            ElementKind::Rectangle {
                stroke: default_stroke(),
                fill: "none".to_owned(),
                stroke_width: DEFAULT_STROKE_WIDTH,
            },
            x,
            y,
            width,
            height,
        )
    }

    pub fn line(x: f64, y: f64, dx: f64, dy: f64) -> Element {
        Element::new(
            ElementKind::Line {
                stroke: default_stroke(),
                stroke_width: DEFAULT_STROKE_WIDTH,
            },
            x,
            y,
            dx,
            dy,
        )
    }

    pub fn freehand(points: Vec<Point>) -> Element {
        let mut e = Element::new(
            ElementKind::Freehand {
                points,
                stroke: default_stroke(),
                stroke_width: DEFAULT_STROKE_WIDTH,
            },
            0.0,
            0.0,
            0.0,
            0.0,
        );
        let b = e.bounds();
        e.x = b.x;
        e.y = b.y;
        e.width = b.width;
        e.height = b.height;
        e
    }

    pub fn text(text: impl Into<String>, x: f64, y: f64) -> Element {
        Element::new(
            ElementKind::Text {
                text: text.into(),
                font: DEFAULT_FONT.to_owned(),
            },
            x,
            y,
            200.0,
            24.0,
        )
    }

    pub fn folder(target_canvas_id: impl Into<String>, x: f64, y: f64) -> Element {
        Element::new(
            ElementKind::Folder {
                target_canvas_id: target_canvas_id.into(),
            },
            x,
            y,
            160.0,
            120.0,
        )
    }
}
