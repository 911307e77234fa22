use egui::{Context, Modifiers, Pos2, Rect, TouchPhase};

mod router;
pub use router::{
    handle_at, Action, InteractionConfig, InteractionController, InteractionState,
    HANDLE_HIT_RADIUS,
};

use crate::selection::SelectMode;

/// Domain-level input events fed to the interaction state machine.
///
/// One pointer stream (mouse or first touch); touch events additionally
/// carry ids so a second finger can start a pinch.
#[derive(Debug, Clone)]
pub enum InputEvent {
    PointerDown {
        pos: Pos2,
        mods: Modifiers,
        time: f64,
    },
    PointerMove {
        pos: Pos2,
    },
    PointerUp {
        pos: Pos2,
        time: f64,
    },
    TouchStart {
        id: u64,
        pos: Pos2,
    },
    TouchMove {
        id: u64,
        pos: Pos2,
    },
    TouchEnd {
        id: u64,
    },
    /// Escape, window blur, or touchcancel: abandon the gesture.
    Cancel,
}

/// Selection mode derived from the held modifiers: Shift adds,
/// Ctrl/Cmd toggles, plain click replaces.
pub fn mode_from_modifiers(mods: &Modifiers) -> SelectMode {
    if mods.shift {
        SelectMode::Add
    } else if mods.command {
        SelectMode::Toggle
    } else {
        SelectMode::Replace
    }
}

/// Converts raw egui input into our [`InputEvent`]s.
///
/// Only events inside the canvas rect become pointer events; escape and
/// focus loss always produce `Cancel`.
#[derive(Debug, Default)]
pub struct InputHandler {
    pointer_down: bool,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_input(&mut self, ctx: &Context, canvas_rect: Rect) -> Vec<InputEvent> {
        let mut events = Vec::new();

        ctx.input(|input| {
            let time = input.time;
            let mods = input.modifiers;

            for event in &input.events {
                if let egui::Event::Touch {
                    id, phase, pos, ..
                } = event
                {
                    match phase {
                        TouchPhase::Start => events.push(InputEvent::TouchStart {
                            id: id.0,
                            pos: *pos,
                        }),
                        TouchPhase::Move => events.push(InputEvent::TouchMove {
                            id: id.0,
                            pos: *pos,
                        }),
                        TouchPhase::End => events.push(InputEvent::TouchEnd { id: id.0 }),
                        TouchPhase::Cancel => events.push(InputEvent::Cancel),
                    }
                }
            }

            if input.pointer.primary_pressed() {
                if let Some(pos) = input.pointer.interact_pos() {
                    if canvas_rect.contains(pos) {
                        self.pointer_down = true;
                        events.push(InputEvent::PointerDown { pos, mods, time });
                    }
                }
            }

            if self.pointer_down {
                if let Some(pos) = input.pointer.latest_pos() {
                    events.push(InputEvent::PointerMove { pos });
                }
            }

            if input.pointer.primary_released() {
                if self.pointer_down {
                    let pos = input
                        .pointer
                        .latest_pos()
                        .unwrap_or_else(|| canvas_rect.center());
                    events.push(InputEvent::PointerUp { pos, time });
                }
                self.pointer_down = false;
            }

            if input.key_pressed(egui::Key::Escape) {
                self.pointer_down = false;
                events.push(InputEvent::Cancel);
            }
        });

        // Losing window focus mid-gesture is treated as pointer loss.
        if !ctx.input(|i| i.focused) && self.pointer_down {
            self.pointer_down = false;
            events.push(InputEvent::Cancel);
        }

        events
    }
}
