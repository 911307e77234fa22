use egui::Pos2;

use crate::element::ElementKind;
use crate::geometry::{resize_rect, Handle, WorldRect};
use crate::groups::translate_elements;
use crate::history::History;
use crate::scene::Scene;
use crate::selection::{gesture_target, SelectMode, Selection};
use crate::viewport::{Viewport, DEFAULT_VIEW_BOX};

use super::InputEvent;

/// Screen-space pick radius for resize handles. Small enough that the
/// center of a 20 px element still picks the element, not a handle.
pub const HANDLE_HIT_RADIUS: f32 = 8.0;

/// Tunable gesture thresholds.
#[derive(Debug, Clone)]
pub struct InteractionConfig {
    /// Pointer travel (px) before a press becomes a drag or marquee.
    pub drag_threshold: f32,
    /// Two taps within this window (seconds) form a double-tap.
    pub double_tap_delay: f64,
    /// Pinch scale changes below this are ignored as jitter.
    pub pinch_jitter: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 5.0,
            double_tap_delay: 0.3,
            pinch_jitter: 0.01,
        }
    }
}

/// The gesture state machine's current state.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    PressedOnElement {
        id: String,
        down: Pos2,
        mode: SelectMode,
        was_selected: bool,
    },
    PressedOnEmpty {
        down: Pos2,
        mode: SelectMode,
    },
    Dragging {
        ids: Vec<String>,
        last: Pos2,
    },
    Resizing {
        id: String,
        handle: Handle,
        start: WorldRect,
    },
    Pinching {
        initial_distance: f32,
    },
    Marquee {
        from: Pos2,
        to: Pos2,
        mode: SelectMode,
    },
}

/// Side effects the app must carry out after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A folder was double-clicked; navigate to its child canvas.
    NavigateToCanvas(String),
}

/// Pointer/touch state machine for pick, drag, marquee, resize, pinch and
/// double-tap.
///
/// Mutations made during a gesture flow through the scene as usual; one
/// history snapshot is taken when the gesture starts mutating, and a
/// zero-net gesture drops it again on commit. `Cancel` (escape, blur,
/// touchcancel) rolls the scene back to the pre-gesture snapshot.
#[derive(Debug)]
pub struct InteractionController {
    state: InteractionState,
    config: InteractionConfig,
    handles_visible: bool,
    last_tap: Option<(f64, Option<String>)>,
    touches: Vec<(u64, Pos2)>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::with_config(InteractionConfig::default())
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: InteractionConfig) -> Self {
        Self {
            state: InteractionState::Idle,
            config,
            handles_visible: true,
            last_tap: None,
            touches: Vec::new(),
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    /// Resize handles are drawn only for a sole selection, and can be
    /// hidden with a double-tap on the element.
    pub fn handles_visible(&self) -> bool {
        self.handles_visible
    }

    /// Screen rectangle of an in-progress marquee, for the overlay pass.
    pub fn marquee_rect(&self) -> Option<egui::Rect> {
        match &self.state {
            InteractionState::Marquee { from, to, .. } => {
                Some(egui::Rect::from_two_pos(*from, *to))
            }
            _ => None,
        }
    }

    pub fn handle_event(
        &mut self,
        event: &InputEvent,
        scene: &mut Scene,
        selection: &mut Selection,
        history: &mut History,
        viewport: &mut Viewport,
    ) -> Vec<Action> {
        match event {
            InputEvent::PointerDown { pos, mods, time: _ } => {
                self.on_pointer_down(*pos, mods, scene, selection, history, viewport);
                Vec::new()
            }
            InputEvent::PointerMove { pos } => {
                self.on_pointer_move(*pos, scene, selection, history, viewport);
                Vec::new()
            }
            InputEvent::PointerUp { pos, time } => {
                self.on_pointer_up(*pos, *time, scene, selection, history, viewport)
            }
            InputEvent::TouchStart { id, pos } => {
                self.on_touch_start(*id, *pos, scene, history);
                Vec::new()
            }
            InputEvent::TouchMove { id, pos } => {
                self.on_touch_move(*id, *pos, viewport);
                Vec::new()
            }
            InputEvent::TouchEnd { id } => {
                self.on_touch_end(*id);
                Vec::new()
            }
            InputEvent::Cancel => {
                self.cancel(scene, history);
                Vec::new()
            }
        }
    }

    fn on_pointer_down(
        &mut self,
        pos: Pos2,
        mods: &egui::Modifiers,
        scene: &mut Scene,
        selection: &mut Selection,
        history: &mut History,
        viewport: &Viewport,
    ) {
        if !self.is_idle() {
            return;
        }

        // A press on a resize handle of the sole-selected element starts a
        // resize.
        if self.handles_visible {
            if let Some(sole) = selection.sole() {
                if let Some(bounds) = scene.bounds(sole) {
                    if let Some(handle) = handle_at(viewport, &bounds, pos) {
                        history.record_state(scene);
                        self.state = InteractionState::Resizing {
                            id: sole.to_owned(),
                            handle,
                            start: bounds,
                        };
                        return;
                    }
                }
            }
        }

        let mode = super::mode_from_modifiers(mods);
        let (wx, wy) = viewport.screen_to_world(pos);
        match scene.pick_topmost(wx, wy) {
            Some(element) => {
                // Picks promote to the outermost owning group.
                let target = gesture_target(scene, &element.id);
                let was_selected = selection.contains(&target);
                if !was_selected {
                    selection.select(&target, mode);
                }
                self.state = InteractionState::PressedOnElement {
                    id: target,
                    down: pos,
                    mode,
                    was_selected,
                };
            }
            None => {
                self.state = InteractionState::PressedOnEmpty { down: pos, mode };
            }
        }
    }

    fn on_pointer_move(
        &mut self,
        pos: Pos2,
        scene: &mut Scene,
        selection: &mut Selection,
        history: &mut History,
        viewport: &Viewport,
    ) {
        match &mut self.state {
            InteractionState::PressedOnElement { down, .. } => {
                let down = *down;
                if (pos - down).length() >= self.config.drag_threshold {
                    // One snapshot per gesture, taken as the drag begins.
                    history.record_state(scene);
                    let ids = selection.ids().to_vec();
                    self.state = InteractionState::Dragging { ids, last: down };
                    self.on_pointer_move(pos, scene, selection, history, viewport);
                }
            }
            InteractionState::PressedOnEmpty { down, mode } => {
                let (down, mode) = (*down, *mode);
                if (pos - down).length() >= self.config.drag_threshold {
                    self.state = InteractionState::Marquee {
                        from: down,
                        to: pos,
                        mode,
                    };
                }
            }
            InteractionState::Dragging { ids, last } => {
                let (dx, dy) = viewport.screen_delta_to_world(pos.x - last.x, pos.y - last.y);
                let ids = ids.clone();
                *last = pos;
                translate_elements(scene, &ids, dx, dy);
            }
            InteractionState::Resizing { id, handle, start } => {
                let (id, handle, start) = (id.clone(), *handle, *start);
                let (wx, wy) = viewport.screen_to_world(pos);
                let rect = resize_rect(&start, handle, wx, wy);
                apply_resize(scene, &id, &rect);
            }
            InteractionState::Marquee { to, .. } => {
                *to = pos;
            }
            InteractionState::Idle | InteractionState::Pinching { .. } => {}
        }
    }

    fn on_pointer_up(
        &mut self,
        pos: Pos2,
        time: f64,
        scene: &mut Scene,
        selection: &mut Selection,
        history: &mut History,
        viewport: &mut Viewport,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        match std::mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::PressedOnElement {
                id,
                mode,
                was_selected,
                ..
            } => {
                // No drag happened: treat as a click.
                if was_selected {
                    selection.select(&id, mode);
                }
                if self.is_double_tap(time, Some(&id)) {
                    match scene.get(&id).map(|e| &e.kind) {
                        Some(ElementKind::Folder { target_canvas_id }) => {
                            actions.push(Action::NavigateToCanvas(target_canvas_id.clone()));
                        }
                        _ => self.handles_visible = !self.handles_visible,
                    }
                    self.last_tap = None;
                } else {
                    self.last_tap = Some((time, Some(id)));
                }
            }
            InteractionState::PressedOnEmpty { mode, .. } => {
                if self.is_double_tap(time, None) {
                    viewport.reset(DEFAULT_VIEW_BOX);
                    self.last_tap = None;
                } else {
                    if mode == SelectMode::Replace {
                        selection.clear();
                    }
                    self.last_tap = Some((time, None));
                }
            }
            InteractionState::Dragging { .. } | InteractionState::Resizing { .. } => {
                // Commit; a gesture that ended where it started leaves no
                // history entry.
                history.discard_if_unchanged(scene);
            }
            InteractionState::Marquee { from, mode, .. } => {
                let a = viewport.screen_to_world(from);
                let b = viewport.screen_to_world(pos);
                let rect = WorldRect::from_corners(a, b);
                let hits = scene.marquee_hits(&rect);
                match mode {
                    SelectMode::Replace => selection.set_all(hits),
                    SelectMode::Add => selection.extend(hits),
                    SelectMode::Toggle => {
                        for id in hits {
                            selection.select(&id, SelectMode::Toggle);
                        }
                    }
                }
            }
            InteractionState::Pinching { initial_distance } => {
                // The primary pointer lifting does not end a pinch.
                self.state = InteractionState::Pinching { initial_distance };
            }
            InteractionState::Idle => {}
        }
        actions
    }

    fn on_touch_start(&mut self, id: u64, pos: Pos2, scene: &mut Scene, history: &mut History) {
        self.touches.retain(|(tid, _)| *tid != id);
        self.touches.push((id, pos));

        // A second finger starts a pinch from any non-resizing state.
        if self.touches.len() == 2 && !matches!(self.state, InteractionState::Resizing { .. }) {
            if matches!(self.state, InteractionState::Dragging { .. }) {
                history.discard_if_unchanged(scene);
            }
            let d = (self.touches[0].1 - self.touches[1].1).length();
            self.state = InteractionState::Pinching {
                initial_distance: d.max(1.0),
            };
        }
    }

    fn on_touch_move(&mut self, id: u64, pos: Pos2, viewport: &mut Viewport) {
        if let Some(t) = self.touches.iter_mut().find(|(tid, _)| *tid == id) {
            t.1 = pos;
        }
        if let InteractionState::Pinching { initial_distance } = &mut self.state {
            if self.touches.len() >= 2 {
                let a = self.touches[0].1;
                let b = self.touches[1].1;
                let d = (a - b).length().max(1.0);
                let scale = (d / *initial_distance) as f64;
                if (scale - 1.0).abs() >= self.config.pinch_jitter {
                    let center = Pos2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
                    viewport.zoom_at(scale, center);
                    *initial_distance = d;
                }
            }
        }
    }

    fn on_touch_end(&mut self, id: u64) {
        self.touches.retain(|(tid, _)| *tid != id);
        if matches!(self.state, InteractionState::Pinching { .. }) && self.touches.len() < 2 {
            self.state = InteractionState::Idle;
        }
    }

    /// Escape / pointer loss: restore the pre-gesture state.
    fn cancel(&mut self, scene: &mut Scene, history: &mut History) {
        match &self.state {
            InteractionState::Dragging { .. } | InteractionState::Resizing { .. } => {
                history.rollback_last(scene);
            }
            _ => {}
        }
        self.touches.clear();
        self.state = InteractionState::Idle;
    }

    fn is_double_tap(&self, time: f64, target: Option<&str>) -> bool {
        match &self.last_tap {
            Some((at, tapped)) => {
                time - at <= self.config.double_tap_delay && tapped.as_deref() == target
            }
            None => false,
        }
    }
}

/// Which resize handle of `bounds` (world units) sits under the screen
/// point, if any. Handles crowd together on small elements, so the nearest
/// one within the pick radius wins.
pub fn handle_at(viewport: &Viewport, bounds: &WorldRect, pos: Pos2) -> Option<Handle> {
    let mut best: Option<(Handle, f32)> = None;
    for handle in Handle::ALL {
        let (wx, wy) = handle.anchor_on(bounds);
        let screen = viewport.world_to_screen(wx, wy);
        let d = (screen - pos).length();
        if d <= HANDLE_HIT_RADIUS && best.map(|(_, bd)| d < bd).unwrap_or(true) {
            best = Some((handle, d));
        }
    }
    best.map(|(h, _)| h)
}

/// Resize an element to `rect`. Groups map every descendant
/// proportionally into the new frame so the unit scales together.
fn apply_resize(scene: &mut Scene, id: &str, rect: &WorldRect) {
    let is_group = matches!(
        scene.get(id).map(|e| &e.kind),
        Some(ElementKind::Group { .. })
    );
    if !is_group {
        let _ = scene.update(id, |e| e.set_bounds(*rect));
        return;
    }

    let current = match scene.bounds(id) {
        Some(b) => b,
        None => return,
    };
    let sx = if current.width > 0.0 {
        rect.width / current.width
    } else {
        1.0
    };
    let sy = if current.height > 0.0 {
        rect.height / current.height
    } else {
        1.0
    };

    let mut members = vec![id.to_owned()];
    let mut i = 0;
    while i < members.len() {
        if let Some(ElementKind::Group { children }) = scene.get(&members[i]).map(|e| &e.kind) {
            members.extend(children.iter().cloned());
        }
        i += 1;
    }

    for member in members {
        let Some(b) = scene.get(&member).map(|e| e.bounds()) else {
            continue;
        };
        let mapped = WorldRect::new(
            rect.x + (b.x - current.x) * sx,
            rect.y + (b.y - current.y) * sy,
            b.width * sx,
            b.height * sy,
        );
        let _ = scene.update(&member, |e| e.set_bounds(mapped));
    }
}
