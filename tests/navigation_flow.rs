use std::time::Instant;

use eframe_board::document::Canvas;
use eframe_board::element::factory;
use eframe_board::error::BoardError;
use eframe_board::history::History;
use eframe_board::navigation::{self, NavigationCtx, Navigator};
use eframe_board::persistence::{AutoSaver, MemoryStore};
use eframe_board::scene::Scene;
use eframe_board::selection::Selection;
use eframe_board::tree::TreeData;
use eframe_board::viewport::{ViewBox, Viewport};

struct Rig {
    store: MemoryStore,
    tree: TreeData,
    nav: Navigator,
    scene: Scene,
    doc: Canvas,
    selection: Selection,
    history: History,
    viewport: Viewport,
    autosaver: AutoSaver,
}

impl Rig {
    /// `main` holds a folder element that opens `child1`.
    fn new() -> Self {
        let store = MemoryStore::new();

        let mut main = Canvas::new("main", "Main Canvas", None);
        main.elements
            .push(factory::folder("child1", 400.0, 300.0).with_id("f"));
        store.insert_canvas(main.clone());

        let mut child = Canvas::new("child1", "Child One", Some("main".to_owned()));
        child.view_box = ViewBox {
            x: 50.0,
            y: 60.0,
            width: 800.0,
            height: 600.0,
        };
        store.insert_canvas(child);

        let mut tree = TreeData::with_root("main", "Main Canvas");
        tree.add_canvas("child1", Some("main"), "Child One").unwrap();

        let scene = Scene::from_elements(main.elements.clone());
        let viewport = Viewport::new(main.view_box);

        Self {
            store,
            tree,
            nav: Navigator::new("main"),
            scene,
            doc: main.with_elements(Vec::new()),
            selection: Selection::new(),
            history: History::new(),
            viewport,
            autosaver: AutoSaver::new(),
        }
    }

    fn navigate_to(&mut self, target: &str) -> Result<(), BoardError> {
        let mut ctx = NavigationCtx {
            scene: &mut self.scene,
            doc: &mut self.doc,
            selection: &mut self.selection,
            history: &mut self.history,
            viewport: &mut self.viewport,
            autosaver: &mut self.autosaver,
            store: &self.store,
        };
        navigation::navigate_to(&mut self.nav, &mut ctx, target)
    }

    fn go_back(&mut self) -> Result<bool, BoardError> {
        let mut ctx = NavigationCtx {
            scene: &mut self.scene,
            doc: &mut self.doc,
            selection: &mut self.selection,
            history: &mut self.history,
            viewport: &mut self.viewport,
            autosaver: &mut self.autosaver,
            store: &self.store,
        };
        navigation::go_back(&mut self.nav, &mut ctx)
    }

    fn go_forward(&mut self) -> Result<bool, BoardError> {
        let mut ctx = NavigationCtx {
            scene: &mut self.scene,
            doc: &mut self.doc,
            selection: &mut self.selection,
            history: &mut self.history,
            viewport: &mut self.viewport,
            autosaver: &mut self.autosaver,
            store: &self.store,
        };
        navigation::go_forward(&mut self.nav, &mut ctx)
    }
}

#[test]
fn folder_navigation_and_browser_back() {
    let mut rig = Rig::new();

    // Entering child1 loads its stored viewbox and updates breadcrumbs.
    rig.navigate_to("child1").unwrap();
    assert_eq!(rig.nav.active(), "child1");
    assert_eq!(rig.viewport.view_box().x, 50.0);
    assert_eq!(rig.viewport.view_box().width, 800.0);

    let crumbs = rig.nav.breadcrumbs(&rig.tree);
    let ids: Vec<&str> = crumbs.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["main", "child1"]);
    assert_eq!(crumbs[1].name, "Child One");

    // Browser back returns to main with the identical viewbox.
    assert!(rig.go_back().unwrap());
    assert_eq!(rig.nav.active(), "main");
    assert_eq!(rig.viewport.view_box(), rig.doc.view_box);
    assert_eq!(rig.scene.len(), 1);
    assert!(rig.scene.get("f").is_some());

    // And forward re-enters child1.
    assert!(rig.go_forward().unwrap());
    assert_eq!(rig.nav.active(), "child1");
    assert!(!rig.go_forward().unwrap());
}

#[test]
fn switching_flushes_pending_autosave_first() {
    let mut rig = Rig::new();

    // Mutate main and leave the autosave pending.
    rig.scene
        .insert(factory::rectangle(10.0, 10.0, 50.0, 50.0).with_id("r"))
        .unwrap();
    rig.autosaver.schedule(Instant::now());
    assert_eq!(rig.store.save_count("main"), 0);

    rig.navigate_to("child1").unwrap();

    // The flush ran before the load: main is saved with the new element.
    assert_eq!(rig.store.save_count("main"), 1);
    let saved = rig.store.saved_canvas("main").unwrap();
    assert!(saved.elements.iter().any(|e| e.id == "r"));
    assert!(!rig.autosaver.is_dirty());
}

#[test]
fn switching_clears_history_and_selection() {
    let mut rig = Rig::new();
    rig.history.record_state(&rig.scene);
    rig.scene
        .insert(factory::rectangle(0.0, 0.0, 5.0, 5.0).with_id("x"))
        .unwrap();
    rig.selection.set_all(vec!["x".to_owned()]);
    assert!(rig.history.can_undo());

    rig.navigate_to("child1").unwrap();
    assert!(!rig.history.can_undo());
    assert!(!rig.history.can_redo());
    assert!(rig.selection.is_empty());
    assert!(rig.scene.is_empty());
}

#[test]
fn navigating_to_a_missing_canvas_fails_cleanly() {
    let mut rig = Rig::new();
    assert!(matches!(
        rig.navigate_to("nope"),
        Err(BoardError::NotFound(_))
    ));
    // The active canvas is unchanged and back has nothing new.
    assert_eq!(rig.nav.active(), "main");
    assert!(!rig.nav.can_go_back());
}

#[test]
fn navigating_to_the_active_canvas_is_a_no_op() {
    let mut rig = Rig::new();
    rig.navigate_to("main").unwrap();
    assert!(!rig.nav.can_go_back());
}

#[test]
fn panned_viewbox_rides_along_on_the_flush() {
    let mut rig = Rig::new();
    rig.viewport.pan(100.0, 0.0);
    rig.scene
        .insert(factory::rectangle(0.0, 0.0, 5.0, 5.0).with_id("x"))
        .unwrap();
    rig.autosaver.schedule(Instant::now());

    rig.navigate_to("child1").unwrap();
    let saved = rig.store.saved_canvas("main").unwrap();
    assert_ne!(saved.view_box.x, 0.0);

    // Back restores exactly what was saved.
    rig.go_back().unwrap();
    assert_eq!(rig.viewport.view_box(), saved.view_box);
}
