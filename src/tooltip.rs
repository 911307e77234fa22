use egui::Pos2;

use crate::scene::Scene;
use crate::viewport::Viewport;

/// Pointer must rest this long over an element before its note shows.
pub const TOOLTIP_DELAY: f64 = 0.6;

/// A tooltip ready to draw: the note text and where the pointer rests.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipDisplay {
    pub element_id: String,
    pub note: String,
    pub at: Pos2,
}

/// Hover tracking for per-element notes.
///
/// The tooltip appears after [`TOOLTIP_DELAY`] seconds of pointer rest over
/// an element that carries a note, and is suppressed while any gesture is
/// in progress.
#[derive(Debug, Default)]
pub struct TooltipState {
    hover: Option<Hover>,
}

#[derive(Debug)]
struct Hover {
    element_id: String,
    since: f64,
    at: Pos2,
}

impl TooltipState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current pointer position (screen space). `interaction_idle`
    /// is false during any non-idle interaction state, which suppresses and
    /// resets the timer.
    pub fn update(
        &mut self,
        now: f64,
        pointer: Option<Pos2>,
        scene: &Scene,
        viewport: &Viewport,
        interaction_idle: bool,
    ) -> Option<TooltipDisplay> {
        if !interaction_idle {
            self.hover = None;
            return None;
        }
        let Some(pos) = pointer else {
            self.hover = None;
            return None;
        };

        let (wx, wy) = viewport.screen_to_world(pos);
        let hit = scene.pick_topmost(wx, wy);

        match hit {
            Some(element) => {
                let moved_to_other = self
                    .hover
                    .as_ref()
                    .map(|h| h.element_id != element.id)
                    .unwrap_or(true);
                if moved_to_other {
                    self.hover = Some(Hover {
                        element_id: element.id.clone(),
                        since: now,
                        at: pos,
                    });
                    return None;
                }

                let hover = self.hover.as_mut().expect("hover set above");
                hover.at = pos;
                if now - hover.since < TOOLTIP_DELAY {
                    return None;
                }
                element.note.as_ref().map(|note| TooltipDisplay {
                    element_id: element.id.clone(),
                    note: note.clone(),
                    at: pos,
                })
            }
            None => {
                self.hover = None;
                None
            }
        }
    }
}

/// Screen position of the note indicator: the element's top-right corner.
/// Recomputed every frame, so viewbox changes and window resizes are
/// picked up for free.
pub fn note_indicator_pos(scene: &Scene, viewport: &Viewport, id: &str) -> Option<Pos2> {
    let bounds = scene.bounds(id)?;
    Some(viewport.world_to_screen(bounds.right(), bounds.y))
}
