use egui::{Align2, Color32, Context, FontId, Painter, Pos2, Rect, Stroke};

use crate::element::{Element, ElementKind};
use crate::geometry::Handle;
use crate::input::InteractionController;
use crate::persistence::Store;
use crate::scene::Scene;
use crate::selection::Selection;
use crate::textures::ImageCache;
use crate::viewport::Viewport;

const SELECTION_COLOR: Color32 = Color32::from_rgb(30, 120, 255);
const MARQUEE_FILL: Color32 = Color32::from_rgba_premultiplied(30, 120, 255, 24);
const NOTE_COLOR: Color32 = Color32::from_rgb(255, 180, 40);
const FOLDER_FILL: Color32 = Color32::from_rgb(245, 240, 225);
const FOLDER_BORDER: Color32 = Color32::from_rgb(150, 130, 80);
const HANDLE_SIZE: f32 = 8.0;

/// Projects the scene into egui paint commands, back to front, then draws
/// the selection/handle/note overlay pass on top.
///
/// Group frames paint nothing themselves; their children stay direct scene
/// elements at absolute positions and only the overlay shows a group's
/// resolved bounds.
pub struct Renderer {
    images: ImageCache,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            images: ImageCache::default(),
        }
    }

    pub fn images_mut(&mut self) -> &mut ImageCache {
        &mut self.images
    }

    pub fn render(
        &mut self,
        ctx: &Context,
        painter: &Painter,
        store: &dyn Store,
        scene: &Scene,
        viewport: &Viewport,
        selection: &Selection,
        interaction: &InteractionController,
    ) {
        for element in scene.iter_back_to_front() {
            self.draw_element(ctx, painter, store, scene, viewport, selection, element);
        }
        self.draw_overlay(painter, scene, viewport, selection, interaction);
    }

    fn draw_element(
        &mut self,
        ctx: &Context,
        painter: &Painter,
        store: &dyn Store,
        scene: &Scene,
        viewport: &Viewport,
        selection: &Selection,
        element: &Element,
    ) {
        let rect = match scene.bounds(&element.id) {
            Some(b) => world_rect_to_screen(viewport, &b),
            None => return,
        };
        let selected = selection.contains(&element.id);

        match &element.kind {
            ElementKind::Image { src } => {
                match self
                    .images
                    .texture_for(ctx, store, src, element.filters.as_ref())
                {
                    Some(texture) => {
                        let uv = flip_uv(element.flip_h, element.flip_v);
                        painter.image(texture, rect, uv, Color32::WHITE);
                    }
                    None => {
                        // Placeholder while bytes load or after a failure.
                        painter.rect_filled(rect, 2.0, Color32::from_gray(60));
                        painter.text(
                            rect.center(),
                            Align2::CENTER_CENTER,
                            "…",
                            FontId::proportional(16.0),
                            Color32::from_gray(160),
                        );
                    }
                }
            }
            ElementKind::Rectangle {
                stroke,
                fill,
                stroke_width,
            } => {
                if let Some(color) = parse_color(fill) {
                    painter.rect_filled(rect, 0.0, color);
                }
                let color = parse_color(stroke).unwrap_or(Color32::DARK_GRAY);
                painter.rect_stroke(rect, 0.0, Stroke::new(*stroke_width as f32, color));
            }
            ElementKind::Line {
                stroke,
                stroke_width,
            } => {
                let color = parse_color(stroke).unwrap_or(Color32::DARK_GRAY);
                // Lines keep a signed extent: (x,y) -> (x+w, y+h).
                let a = viewport.world_to_screen(element.x, element.y);
                let b = viewport
                    .world_to_screen(element.x + element.width, element.y + element.height);
                let (a, b) = flip_segment(a, b, rect, element.flip_h, element.flip_v);
                painter.line_segment([a, b], Stroke::new(*stroke_width as f32, color));
            }
            ElementKind::Freehand {
                points,
                stroke,
                stroke_width,
            } => {
                let color = parse_color(stroke).unwrap_or(Color32::DARK_GRAY);
                let pen = Stroke::new(*stroke_width as f32, color);
                for pair in points.windows(2) {
                    let a = viewport.world_to_screen(pair[0].x, pair[0].y);
                    let b = viewport.world_to_screen(pair[1].x, pair[1].y);
                    let (a, b) = flip_segment(a, b, rect, element.flip_h, element.flip_v);
                    painter.line_segment([a, b], pen);
                }
            }
            ElementKind::Text { text, .. } => {
                let anchor = if element.flip_h {
                    Align2::RIGHT_TOP
                } else {
                    Align2::LEFT_TOP
                };
                painter.text(
                    if element.flip_h {
                        rect.right_top()
                    } else {
                        rect.left_top()
                    },
                    anchor,
                    text,
                    FontId::proportional(scaled_font_size(viewport)),
                    Color32::BLACK,
                );
            }
            ElementKind::Folder { .. } => {
                painter.rect_filled(rect, 4.0, FOLDER_FILL);
                // Selection thickens the border instead of adding a halo.
                let width = if selected { 4.0 } else { 1.5 };
                painter.rect_stroke(rect, 4.0, Stroke::new(width, FOLDER_BORDER));
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    "📁",
                    FontId::proportional(rect.height().min(48.0) * 0.5),
                    FOLDER_BORDER,
                );
            }
            // Invisible selectable frame; the overlay draws its bounds.
            ElementKind::Group { .. } => {}
        }
    }

    fn draw_overlay(
        &self,
        painter: &Painter,
        scene: &Scene,
        viewport: &Viewport,
        selection: &Selection,
        interaction: &InteractionController,
    ) {
        for id in selection.ids() {
            let Some(element) = scene.get(id) else { continue };
            let Some(bounds) = scene.bounds(id) else {
                continue;
            };
            let rect = world_rect_to_screen(viewport, &bounds);

            if element.thickens_border() {
                // Folders handled in the base pass.
            } else if element.needs_overlay_highlight() {
                painter.rect_stroke(rect.expand(2.0), 0.0, Stroke::new(2.0, SELECTION_COLOR));
            } else if element.can_stroke() {
                painter.rect_stroke(rect, 0.0, Stroke::new(2.0, SELECTION_COLOR));
            }
        }

        // Resize handles: sole selection only, and only while visible.
        if interaction.handles_visible() {
            if let Some(sole) = selection.sole() {
                if let Some(bounds) = scene.bounds(sole) {
                    for handle in Handle::ALL {
                        let (wx, wy) = handle.anchor_on(&bounds);
                        let center = viewport.world_to_screen(wx, wy);
                        let r = Rect::from_center_size(center, egui::vec2(HANDLE_SIZE, HANDLE_SIZE));
                        painter.rect_filled(r, 2.0, SELECTION_COLOR);
                        painter.rect_stroke(r, 2.0, Stroke::new(1.0, Color32::WHITE));
                    }
                }
            }
        }

        // Note indicators at each noted element's top-right corner.
        for element in scene.iter_back_to_front() {
            if element.note.is_none() {
                continue;
            }
            if let Some(pos) = crate::tooltip::note_indicator_pos(scene, viewport, &element.id) {
                painter.circle_filled(pos, 5.0, NOTE_COLOR);
                painter.circle_stroke(pos, 5.0, Stroke::new(1.0, Color32::WHITE));
            }
        }

        if let Some(rect) = interaction.marquee_rect() {
            painter.rect_filled(rect, 0.0, MARQUEE_FILL);
            painter.rect_stroke(rect, 0.0, Stroke::new(1.0, SELECTION_COLOR));
        }
    }
}

fn world_rect_to_screen(viewport: &Viewport, b: &crate::geometry::WorldRect) -> Rect {
    let min = viewport.world_to_screen(b.x, b.y);
    let max = viewport.world_to_screen(b.right(), b.bottom());
    Rect::from_two_pos(min, max)
}

/// UV rectangle mirroring the texture about the element center.
fn flip_uv(flip_h: bool, flip_v: bool) -> Rect {
    let (u0, u1) = if flip_h { (1.0, 0.0) } else { (0.0, 1.0) };
    let (v0, v1) = if flip_v { (1.0, 0.0) } else { (0.0, 1.0) };
    Rect::from_min_max(Pos2::new(u0, v0), Pos2::new(u1, v1))
}

/// Mirror a screen-space segment about the element rect's center.
fn flip_segment(mut a: Pos2, mut b: Pos2, rect: Rect, flip_h: bool, flip_v: bool) -> (Pos2, Pos2) {
    let c = rect.center();
    if flip_h {
        a.x = 2.0 * c.x - a.x;
        b.x = 2.0 * c.x - b.x;
    }
    if flip_v {
        a.y = 2.0 * c.y - a.y;
        b.y = 2.0 * c.y - b.y;
    }
    (a, b)
}

fn scaled_font_size(viewport: &Viewport) -> f32 {
    let vb = viewport.view_box();
    let scale = viewport.screen_rect().width() as f64 / vb.width.max(1.0);
    (16.0 * scale).clamp(6.0, 96.0) as f32
}

/// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, and a few CSS keywords. `none` and
/// `transparent` yield `None`.
pub fn parse_color(s: &str) -> Option<Color32> {
    let s = s.trim();
    match s {
        "" | "none" | "transparent" => return None,
        "black" => return Some(Color32::BLACK),
        "white" => return Some(Color32::WHITE),
        "red" => return Some(Color32::RED),
        "green" => return Some(Color32::GREEN),
        "blue" => return Some(Color32::BLUE),
        "yellow" => return Some(Color32::YELLOW),
        "gray" | "grey" => return Some(Color32::GRAY),
        _ => {}
    }
    let hex = s.strip_prefix('#')?;
    let parse2 = |h: &str| u8::from_str_radix(h, 16).ok();
    match hex.len() {
        3 => {
            let r = parse2(&hex[0..1].repeat(2))?;
            let g = parse2(&hex[1..2].repeat(2))?;
            let b = parse2(&hex[2..3].repeat(2))?;
            Some(Color32::from_rgb(r, g, b))
        }
        6 => {
            let r = parse2(&hex[0..2])?;
            let g = parse2(&hex[2..4])?;
            let b = parse2(&hex[4..6])?;
            Some(Color32::from_rgb(r, g, b))
        }
        8 => {
            let r = parse2(&hex[0..2])?;
            let g = parse2(&hex[2..4])?;
            let b = parse2(&hex[4..6])?;
            let a = parse2(&hex[6..8])?;
            Some(Color32::from_rgba_unmultiplied(r, g, b, a))
        }
        _ => None,
    }
}
