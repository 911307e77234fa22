use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};

/// The world-space rectangle currently mapped to the screen. This is the
/// persisted form on the canvas record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ViewBox {
    fn default() -> Self {
        DEFAULT_VIEW_BOX
    }
}

/// Fresh canvases open on a 1920x1080 window at the origin.
pub const DEFAULT_VIEW_BOX: ViewBox = ViewBox {
    x: 0.0,
    y: 0.0,
    width: 1920.0,
    height: 1080.0,
};

/// Zoom clamp: the viewbox width and height each stay within this range.
pub const MIN_VIEW_EXTENT: f64 = 100.0;
pub const MAX_VIEW_EXTENT: f64 = 10_000.0;

/// Pinch/scroll scale changes smaller than this are treated as jitter.
pub const ZOOM_JITTER: f64 = 0.01;

/// Pan/zoom state plus the screen<->world mapping for the active canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    view_box: ViewBox,
    /// Screen-space rectangle the viewbox is projected onto.
    screen: Rect,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            view_box: DEFAULT_VIEW_BOX,
            screen: Rect::from_min_size(Pos2::ZERO, egui::vec2(1920.0, 1080.0)),
        }
    }
}

impl Viewport {
    pub fn new(view_box: ViewBox) -> Self {
        Self {
            view_box,
            ..Self::default()
        }
    }

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    pub fn screen_rect(&self) -> Rect {
        self.screen
    }

    /// Update the on-screen target rectangle (panel resize).
    pub fn set_screen_rect(&mut self, rect: Rect) {
        if rect.width() > 0.0 && rect.height() > 0.0 {
            self.screen = rect;
        }
    }

    /// Reset to a stored or default viewbox.
    pub fn reset(&mut self, view_box: ViewBox) {
        self.view_box = clamped(view_box);
    }

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let (sx, sy) = self.world_per_pixel();
        self.view_box.x -= dx as f64 * sx;
        self.view_box.y -= dy as f64 * sy;
    }

    /// Zoom by `scale` (>1 zooms in) keeping the world point under
    /// `anchor` fixed on screen. Sub-jitter scale changes are ignored; the
    /// resulting extent is clamped to `[100, 10000]` on both axes.
    pub fn zoom_at(&mut self, scale: f64, anchor: Pos2) {
        if (scale - 1.0).abs() < ZOOM_JITTER || scale <= 0.0 {
            return;
        }

        let vb = self.view_box;
        // Clamp the scale so both extents stay in range, preserving aspect.
        let lo = (vb.width / MAX_VIEW_EXTENT).max(vb.height / MAX_VIEW_EXTENT);
        let hi = (vb.width / MIN_VIEW_EXTENT).min(vb.height / MIN_VIEW_EXTENT);
        let applied = scale.clamp(lo, hi);
        if (applied - 1.0).abs() < f64::EPSILON {
            return;
        }

        let world = self.screen_to_world(anchor);
        let fx = ((anchor.x - self.screen.min.x) / self.screen.width()) as f64;
        let fy = ((anchor.y - self.screen.min.y) / self.screen.height()) as f64;

        self.view_box.width = vb.width / applied;
        self.view_box.height = vb.height / applied;
        self.view_box.x = world.0 - fx * self.view_box.width;
        self.view_box.y = world.1 - fy * self.view_box.height;
    }

    pub fn screen_to_world(&self, p: Pos2) -> (f64, f64) {
        let (sx, sy) = self.world_per_pixel();
        (
            self.view_box.x + (p.x - self.screen.min.x) as f64 * sx,
            self.view_box.y + (p.y - self.screen.min.y) as f64 * sy,
        )
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> Pos2 {
        let (sx, sy) = self.world_per_pixel();
        Pos2::new(
            self.screen.min.x + ((wx - self.view_box.x) / sx) as f32,
            self.screen.min.y + ((wy - self.view_box.y) / sy) as f32,
        )
    }

    /// Convert a screen-space pixel delta to world units.
    pub fn screen_delta_to_world(&self, dx: f32, dy: f32) -> (f64, f64) {
        let (sx, sy) = self.world_per_pixel();
        (dx as f64 * sx, dy as f64 * sy)
    }

    fn world_per_pixel(&self) -> (f64, f64) {
        (
            self.view_box.width / self.screen.width().max(1.0) as f64,
            self.view_box.height / self.screen.height().max(1.0) as f64,
        )
    }
}

fn clamped(mut vb: ViewBox) -> ViewBox {
    vb.width = vb.width.clamp(MIN_VIEW_EXTENT, MAX_VIEW_EXTENT);
    vb.height = vb.height.clamp(MIN_VIEW_EXTENT, MAX_VIEW_EXTENT);
    vb
}
