use std::time::Instant;

use egui::{Context, Key};

use crate::document::Canvas;
use crate::element::{factory, ElementKind};
use crate::error::BoardError;
use crate::filters::{self, FilterEditor, FilterKey, PRESET_NAMES};
use crate::groups;
use crate::history::History;
use crate::id;
use crate::input::{Action, InputHandler, InteractionController};
use crate::navigation::{self, NavigationCtx, Navigator};
use crate::persistence::{AutoSaver, AutosaveOutcome, Store};
use crate::platform::{self, DroppedImage, FileHandler, PlatformBridge, PlatformEvent};
use crate::renderer::Renderer;
use crate::scene::Scene;
use crate::selection::Selection;
use crate::tooltip::TooltipState;
use crate::tree::TreeData;
use crate::viewport::Viewport;

const NOTIFICATION_TTL: f64 = 5.0;

struct Notification {
    text: String,
    at: f64,
}

/// The hierarchical board editor: owns every core service and wires egui
/// input and painting to them once per frame.
pub struct BoardApp {
    store: Box<dyn Store>,
    bridge: Box<dyn PlatformBridge>,

    scene: Scene,
    doc: Canvas,
    tree: TreeData,
    selection: Selection,
    history: History,
    viewport: Viewport,
    interaction: InteractionController,
    input: InputHandler,
    autosaver: AutoSaver,
    navigator: Navigator,
    tooltip: TooltipState,
    renderer: Renderer,
    files: FileHandler,

    filter_editor: Option<FilterEditor>,
    note_draft: String,
    note_target: Option<String>,
    notifications: Vec<Notification>,
    drag_hover: bool,
}

impl BoardApp {
    /// Called once before the first frame.
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        store: Box<dyn Store>,
        bridge: Box<dyn PlatformBridge>,
    ) -> Self {
        let tree = store.load_tree().unwrap_or_else(|e| {
            log::error!("failed to load tree: {e}");
            TreeData::with_root("main", "Main Canvas")
        });
        let initial = tree
            .root_canvases
            .first()
            .cloned()
            .unwrap_or_else(|| "main".to_owned());
        let doc = store
            .load_canvas(&initial)
            .unwrap_or_else(|_| Canvas::new(initial.clone(), "Main Canvas", None));

        let scene = Scene::from_elements(doc.elements.clone());
        let viewport = Viewport::new(doc.view_box);

        Self {
            store,
            bridge,
            scene,
            doc: doc.with_elements(Vec::new()),
            tree,
            selection: Selection::new(),
            history: History::new(),
            viewport,
            interaction: InteractionController::new(),
            input: InputHandler::new(),
            autosaver: AutoSaver::new(),
            navigator: Navigator::new(initial),
            tooltip: TooltipState::new(),
            renderer: Renderer::new(),
            files: FileHandler::new(),
            filter_editor: None,
            note_draft: String::new(),
            note_target: None,
            notifications: Vec::new(),
            drag_hover: false,
        }
    }

    fn notify(&mut self, now: f64, text: impl Into<String>) {
        let text = text.into();
        log::warn!("{text}");
        self.notifications.push(Notification { text, at: now });
    }

    fn navigate(&mut self, target: &str, now: f64) {
        let mut ctx = NavigationCtx {
            scene: &mut self.scene,
            doc: &mut self.doc,
            selection: &mut self.selection,
            history: &mut self.history,
            viewport: &mut self.viewport,
            autosaver: &mut self.autosaver,
            store: self.store.as_ref(),
        };
        if let Err(e) = navigation::navigate_to(&mut self.navigator, &mut ctx, target) {
            self.notify(now, format!("could not open canvas: {e}"));
        }
        self.filter_editor = None;
        self.note_target = None;
        self.scene.take_changes();
    }

    fn go_back(&mut self, now: f64) {
        let mut ctx = NavigationCtx {
            scene: &mut self.scene,
            doc: &mut self.doc,
            selection: &mut self.selection,
            history: &mut self.history,
            viewport: &mut self.viewport,
            autosaver: &mut self.autosaver,
            store: self.store.as_ref(),
        };
        if let Err(e) = navigation::go_back(&mut self.navigator, &mut ctx) {
            self.notify(now, format!("could not go back: {e}"));
        }
        self.scene.take_changes();
    }

    fn go_forward(&mut self, now: f64) {
        let mut ctx = NavigationCtx {
            scene: &mut self.scene,
            doc: &mut self.doc,
            selection: &mut self.selection,
            history: &mut self.history,
            viewport: &mut self.viewport,
            autosaver: &mut self.autosaver,
            store: self.store.as_ref(),
        };
        if let Err(e) = navigation::go_forward(&mut self.navigator, &mut ctx) {
            self.notify(now, format!("could not go forward: {e}"));
        }
        self.scene.take_changes();
    }

    /// Upload dropped blobs and place them as image elements at the view
    /// center.
    fn insert_dropped_images(&mut self, images: Vec<DroppedImage>, now: f64) {
        if images.is_empty() {
            return;
        }
        self.history.record_state(&self.scene);
        for dropped in images {
            let uploaded = match self.store.upload_image(&dropped.name, &dropped.bytes) {
                Ok(u) => u,
                Err(e) => {
                    self.notify(now, format!("upload of {} failed: {e}", dropped.name));
                    continue;
                }
            };
            let (width, height) = match image::load_from_memory(&dropped.bytes) {
                Ok(img) => (img.width() as f64, img.height() as f64),
                Err(_) => (300.0, 200.0),
            };
            let vb = self.viewport.view_box();
            let x = vb.x + (vb.width - width) / 2.0;
            let y = vb.y + (vb.height - height) / 2.0;
            let element = factory::image(uploaded.url.clone(), x, y, width, height)
                .with_z(self.scene.top_z() + 1);
            if let Err(e) = self.scene.insert(element) {
                self.notify(now, format!("could not place image: {e}"));
            }
        }
        self.history.discard_if_unchanged(&self.scene);
    }

    fn delete_selected(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.history.record_state(&self.scene);
        for id in self.selection.ids().to_vec() {
            let _ = self.scene.remove(&id);
        }
        self.selection.clear();
    }

    /// Create a child canvas plus the folder element that opens it.
    fn create_folder(&mut self, now: f64) {
        let child = Canvas::new(
            id::new_canvas_id(),
            "New Canvas",
            Some(self.navigator.active().to_owned()),
        );
        let child_id = child.id.clone();
        if let Err(e) = self.store.save_canvas(&child) {
            self.notify(now, format!("could not create canvas: {e}"));
            return;
        }
        if let Err(e) = self
            .tree
            .add_canvas(child_id.as_str(), Some(self.navigator.active()), "New Canvas")
        {
            self.notify(now, format!("could not update tree: {e}"));
            return;
        }
        if let Err(e) = self.store.save_tree(&self.tree) {
            self.notify(now, format!("could not save tree: {e}"));
        }

        self.history.record_state(&self.scene);
        let vb = self.viewport.view_box();
        let folder = factory::folder(child_id, vb.x + vb.width / 2.0 - 80.0, vb.y + vb.height / 2.0 - 60.0)
            .with_z(self.scene.top_z() + 1);
        let _ = self.scene.insert(folder);
    }

    /// Delete the active canvas: its children re-parent to its parent (or
    /// become roots), and the view moves there.
    fn delete_active_canvas(&mut self, now: f64) {
        let active = self.navigator.active().to_owned();
        let node = match self.tree.get(&active) {
            Some(node) => node.clone(),
            None => return,
        };
        let is_last = self.tree.root_canvases.as_slice() == [active.clone()]
            && node.children.is_empty();
        if is_last {
            self.notify(now, "cannot delete the last canvas");
            return;
        }

        if let Err(e) = self.tree.remove_canvas(&active) {
            self.notify(now, format!("could not delete canvas: {e}"));
            return;
        }
        if let Err(e) = self.store.delete_canvas(&active) {
            self.notify(now, format!("store did not delete {active}: {e}"));
        }
        if let Err(e) = self.store.save_tree(&self.tree) {
            self.notify(now, format!("could not save tree: {e}"));
        }

        // The pending autosave would resurrect the deleted file.
        self.autosaver.reset();

        let target = node
            .parent
            .or_else(|| self.tree.root_canvases.first().cloned());
        if let Some(target) = target {
            self.navigate(&target, now);
        }
    }

    fn handle_shortcuts(&mut self, ctx: &Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (undo, redo, group, ungroup, flip_h, flip_v) = ctx.input(|i| {
            let cmd = i.modifiers.command;
            let shift = i.modifiers.shift;
            (
                cmd && !shift && i.key_pressed(Key::Z),
                cmd && ((shift && i.key_pressed(Key::Z)) || i.key_pressed(Key::Y)),
                cmd && !shift && i.key_pressed(Key::G),
                cmd && shift && i.key_pressed(Key::G),
                cmd && shift && i.key_pressed(Key::H),
                i.modifiers.alt && i.key_pressed(Key::V),
            )
        });

        // Input focus is exclusive: no undo/redo mid-gesture.
        if undo && self.interaction.is_idle() {
            self.history.undo(&mut self.scene);
            self.selection.retain_existing(&self.scene);
        }
        if redo && self.interaction.is_idle() {
            self.history.redo(&mut self.scene);
            self.selection.retain_existing(&self.scene);
        }
        if group {
            let _ = groups::group_selection(&mut self.scene, &mut self.selection, &mut self.history);
        }
        if ungroup {
            if let Some(sole) = self.selection.sole().map(str::to_owned) {
                let _ = groups::ungroup(&mut self.scene, &mut self.selection, &mut self.history, &sole);
            }
        }
        if flip_h || flip_v {
            for id in self.selection.ids().to_vec() {
                filters::toggle_flip(&mut self.scene, &mut self.history, &id, flip_h);
            }
        }
    }

    fn breadcrumb_bar(&mut self, ctx: &Context, now: f64) {
        let crumbs = self.navigator.breadcrumbs(&self.tree);
        let mut navigate_to: Option<String> = None;
        let mut back = false;
        let mut forward = false;

        egui::TopBottomPanel::top("breadcrumbs").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(self.navigator.can_go_back(), egui::Button::new("←"))
                    .clicked()
                {
                    back = true;
                }
                if ui
                    .add_enabled(self.navigator.can_go_forward(), egui::Button::new("→"))
                    .clicked()
                {
                    forward = true;
                }
                ui.separator();
                for (i, crumb) in crumbs.iter().enumerate() {
                    if i > 0 {
                        ui.label("/");
                    }
                    if ui.button(&crumb.name).clicked() {
                        navigate_to = Some(crumb.id.clone());
                    }
                }
                ui.separator();
                if self.autosaver.is_dirty() {
                    ui.weak("saving…");
                }
            });
        });

        if back {
            self.go_back(now);
        }
        if forward {
            self.go_forward(now);
        }
        if let Some(target) = navigate_to {
            self.navigate(&target, now);
        }
    }

    fn tree_sidebar(&mut self, ctx: &Context, now: f64) {
        let mut navigate_to: Option<String> = None;
        egui::SidePanel::left("tree")
            .default_width(180.0)
            .show(ctx, |ui| {
                ui.heading("Canvases");
                ui.separator();
                let roots = self.tree.root_canvases.clone();
                for root in roots {
                    show_tree_node(ui, &self.tree, &root, self.navigator.active(), &mut navigate_to);
                }
                ui.separator();
                if ui.button("New folder here").clicked() {
                    self.create_folder(now);
                }
                if ui.button("Delete this canvas").clicked() {
                    self.delete_active_canvas(now);
                }
            });
        if let Some(target) = navigate_to {
            self.navigate(&target, now);
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Rectangle").clicked() {
                self.history.record_state(&self.scene);
                let vb = self.viewport.view_box();
                let e = factory::rectangle(vb.x + vb.width / 2.0 - 100.0, vb.y + vb.height / 2.0 - 75.0, 200.0, 150.0)
                    .with_z(self.scene.top_z() + 1);
                let _ = self.scene.insert(e);
            }
            if ui.button("Text").clicked() {
                self.history.record_state(&self.scene);
                let vb = self.viewport.view_box();
                let e = factory::text("New text", vb.x + vb.width / 2.0, vb.y + vb.height / 2.0)
                    .with_z(self.scene.top_z() + 1);
                let _ = self.scene.insert(e);
            }
            ui.separator();
            let can_group = self.selection.len() >= 2;
            if ui.add_enabled(can_group, egui::Button::new("Group")).clicked() {
                let _ = groups::group_selection(&mut self.scene, &mut self.selection, &mut self.history);
            }
            let sole_group = self
                .selection
                .sole()
                .and_then(|id| self.scene.get(id))
                .map(|e| matches!(e.kind, ElementKind::Group { .. }))
                .unwrap_or(false);
            if ui.add_enabled(sole_group, egui::Button::new("Ungroup")).clicked() {
                if let Some(sole) = self.selection.sole().map(str::to_owned) {
                    let _ = groups::ungroup(&mut self.scene, &mut self.selection, &mut self.history, &sole);
                }
            }
            ui.separator();
            if ui
                .add_enabled(!self.selection.is_empty(), egui::Button::new("Delete"))
                .clicked()
            {
                self.delete_selected();
            }
            ui.separator();
            let idle = self.interaction.is_idle();
            if ui
                .add_enabled(self.history.can_undo() && idle, egui::Button::new("Undo"))
                .clicked()
            {
                self.history.undo(&mut self.scene);
                self.selection.retain_existing(&self.scene);
            }
            if ui
                .add_enabled(self.history.can_redo() && idle, egui::Button::new("Redo"))
                .clicked()
            {
                self.history.redo(&mut self.scene);
                self.selection.retain_existing(&self.scene);
            }
            ui.separator();
            let sole_image = self
                .selection
                .sole()
                .and_then(|id| self.scene.get(id))
                .map(|e| matches!(e.kind, ElementKind::Image { .. }))
                .unwrap_or(false);
            if ui
                .add_enabled(sole_image && self.filter_editor.is_none(), egui::Button::new("Filters"))
                .clicked()
            {
                if let Some(sole) = self.selection.sole() {
                    self.filter_editor = FilterEditor::open(&self.scene, sole);
                }
            }
        });
    }

    fn filter_editor_window(&mut self, ctx: &Context) {
        let Some(editor) = &mut self.filter_editor else {
            return;
        };
        let mut apply = false;
        let mut cancel = false;

        egui::Window::new("Filters")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                for key in FilterKey::ALL {
                    let (min, max) = key.range();
                    let mut value = editor.working().get(key);
                    if ui
                        .add(egui::Slider::new(&mut value, min..=max).text(key.as_str()))
                        .changed()
                    {
                        editor.set(&mut self.scene, key, value);
                    }
                }
                ui.separator();
                ui.horizontal_wrapped(|ui| {
                    for name in PRESET_NAMES {
                        if ui.small_button(name).clicked() {
                            editor.apply_preset(&mut self.scene, name);
                        }
                    }
                });
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Apply").clicked() {
                        apply = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if apply {
            if let Some(editor) = self.filter_editor.take() {
                editor.apply(&mut self.scene, &mut self.history);
            }
        } else if cancel {
            if let Some(editor) = self.filter_editor.take() {
                editor.cancel(&mut self.scene);
            }
        }
    }

    fn note_panel(&mut self, ctx: &Context) {
        let Some(sole) = self.selection.sole().map(str::to_owned) else {
            self.note_target = None;
            return;
        };
        if self.note_target.as_deref() != Some(sole.as_str()) {
            self.note_draft = self
                .scene
                .get(&sole)
                .and_then(|e| e.note.clone())
                .unwrap_or_default();
            self.note_target = Some(sole.clone());
        }

        egui::TopBottomPanel::bottom("note").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Note:");
                ui.text_edit_singleline(&mut self.note_draft);
                if ui.button("Save note").clicked() {
                    self.history.record_state(&self.scene);
                    let draft = self.note_draft.trim().to_owned();
                    let _ = self.scene.update(&sole, |e| {
                        e.note = if draft.is_empty() { None } else { Some(draft) };
                    });
                }
            });
        });
    }

    fn canvas_panel(&mut self, ctx: &Context, now: f64) {
        let mut pending_nav: Option<String> = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            self.toolbar(ui);
            let canvas_rect = ui.available_rect_before_wrap();
            let (response, painter) =
                ui.allocate_painter(canvas_rect.size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            self.viewport.set_screen_rect(rect);

            // Wheel pan / ctrl-wheel zoom, only while the pointer hovers
            // the canvas and no gesture owns the input.
            if response.hovered() && self.interaction.is_idle() {
                let (scroll, zoom, hover) = ctx.input(|i| {
                    (i.raw_scroll_delta, i.zoom_delta(), i.pointer.hover_pos())
                });
                if zoom != 1.0 {
                    let anchor = hover.unwrap_or_else(|| rect.center());
                    self.viewport.zoom_at(zoom as f64, anchor);
                } else if scroll != egui::Vec2::ZERO {
                    self.viewport.pan(scroll.x, scroll.y);
                }
            }

            let canvas_hovered = response.hovered();
            for event in self.input.process_input(ctx, rect) {
                // Presses claimed by floating windows never start gestures;
                // hover belongs to the topmost layer.
                if !canvas_hovered && matches!(event, crate::input::InputEvent::PointerDown { .. })
                {
                    continue;
                }
                let actions = self.interaction.handle_event(
                    &event,
                    &mut self.scene,
                    &mut self.selection,
                    &mut self.history,
                    &mut self.viewport,
                );
                for action in actions {
                    match action {
                        Action::NavigateToCanvas(target) => pending_nav = Some(target),
                    }
                }
            }

            self.renderer.render(
                ctx,
                &painter,
                self.store.as_ref(),
                &self.scene,
                &self.viewport,
                &self.selection,
                &self.interaction,
            );

            // Hover tooltip for element notes.
            let pointer = ctx.input(|i| i.pointer.hover_pos());
            if let Some(tip) = self.tooltip.update(
                now,
                pointer.filter(|p| rect.contains(*p)),
                &self.scene,
                &self.viewport,
                self.interaction.is_idle(),
            ) {
                painter.text(
                    tip.at + egui::vec2(12.0, 12.0),
                    egui::Align2::LEFT_TOP,
                    &tip.note,
                    egui::FontId::proportional(13.0),
                    ui.visuals().strong_text_color(),
                );
            }
        });

        if let Some(target) = pending_nav {
            self.navigate(&target, now);
        }
    }

    fn notifications_overlay(&mut self, ctx: &Context, now: f64) {
        self.notifications.retain(|n| now - n.at < NOTIFICATION_TTL);
        if self.notifications.is_empty() && !self.drag_hover {
            return;
        }
        egui::TopBottomPanel::bottom("notifications").show(ctx, |ui| {
            if self.drag_hover {
                ui.label("Drop images to add them to the board");
            }
            for n in &self.notifications {
                ui.colored_label(egui::Color32::LIGHT_RED, &n.text);
            }
        });
    }

    fn pump_autosave(&mut self, now: f64) {
        if self.scene.has_changes() {
            let changes = self.scene.take_changes();
            log::debug!("{} scene change(s) this frame", changes.len());
            self.autosaver.schedule(Instant::now());
        }

        let now_mono = Instant::now();
        if !self.autosaver.due(now_mono) {
            return;
        }
        // The scene is serialized at the moment the debounce fires.
        self.doc.view_box = self.viewport.view_box();
        let record = self.doc.with_elements(self.scene.clone_elements());
        match self.autosaver.tick(now_mono, self.store.as_ref(), &record) {
            Some(AutosaveOutcome::Saved(saved)) => {
                self.doc.version = saved.version;
                self.doc.modified = saved.modified;
            }
            Some(AutosaveOutcome::Failed { error, gave_up }) => {
                if gave_up {
                    self.notify(now, format!("autosave failed, changes kept locally: {error}"));
                } else if matches!(error, BoardError::StoreUnavailable(_)) {
                    log::warn!("autosave retrying: {error}");
                }
            }
            None => {}
        }
    }

    fn pump_platform(&mut self, ctx: &Context, now: f64) {
        for event in self.bridge.poll_events() {
            match event {
                PlatformEvent::DragOver => self.drag_hover = true,
                PlatformEvent::DragLeave => self.drag_hover = false,
                PlatformEvent::DragDrop { paths } => {
                    self.drag_hover = false;
                    let images = platform::read_dropped_images(&paths);
                    self.insert_dropped_images(images, now);
                }
            }
        }

        self.files.preview_files_being_dropped(ctx);
        if self.files.check_for_dropped_files(ctx) {
            let images = self.files.take_dropped_images();
            self.insert_dropped_images(images, now);
        }
    }
}

impl eframe::App for BoardApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|i| i.time);

        self.pump_platform(ctx, now);
        self.handle_shortcuts(ctx);

        self.breadcrumb_bar(ctx, now);
        self.tree_sidebar(ctx, now);
        self.note_panel(ctx);
        self.canvas_panel(ctx, now);
        self.filter_editor_window(ctx);
        self.notifications_overlay(ctx, now);

        self.pump_autosave(now);

        // Keep the debounce timer ticking even without input.
        if self.autosaver.is_dirty() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

fn show_tree_node(
    ui: &mut egui::Ui,
    tree: &TreeData,
    id: &str,
    active: &str,
    navigate_to: &mut Option<String>,
) {
    let Some(node) = tree.get(id) else { return };
    let selected = id == active;
    if node.children.is_empty() {
        if ui.selectable_label(selected, &node.name).clicked() {
            *navigate_to = Some(id.to_owned());
        }
    } else {
        let resp = egui::CollapsingHeader::new(&node.name)
            .id_salt(id)
            .default_open(true)
            .show(ui, |ui| {
                for child in &node.children {
                    show_tree_node(ui, tree, child, active, navigate_to);
                }
            });
        if resp.header_response.clicked() {
            *navigate_to = Some(id.to_owned());
        }
    }
}
