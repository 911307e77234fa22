use eframe_board::element::factory;
use eframe_board::history::{History, MAX_HISTORY};
use eframe_board::scene::Scene;

fn one_rect_scene() -> Scene {
    let mut scene = Scene::new();
    scene
        .insert(factory::rectangle(0.0, 0.0, 10.0, 10.0).with_id("r"))
        .unwrap();
    scene.take_changes();
    scene
}

#[test]
fn undo_then_redo_restores_the_pre_undo_state() {
    let mut scene = one_rect_scene();
    let mut history = History::new();

    history.record_state(&scene);
    scene.update("r", |e| e.x = 100.0).unwrap();
    history.record_state(&scene);
    scene.update("r", |e| e.y = 50.0).unwrap();

    let pre_undo = scene.clone_elements();
    assert!(history.undo(&mut scene));
    assert_eq!(scene.get("r").unwrap().x, 100.0);
    assert_eq!(scene.get("r").unwrap().y, 0.0);

    assert!(history.redo(&mut scene));
    assert_eq!(scene.clone_elements(), pre_undo);
}

#[test]
fn identical_states_coalesce() {
    let scene = one_rect_scene();
    let mut history = History::new();

    history.record_state(&scene);
    history.record_state(&scene);
    history.record_state(&scene);
    assert_eq!(history.depth(), 1);
}

#[test]
fn recording_clears_redo() {
    let mut scene = one_rect_scene();
    let mut history = History::new();

    history.record_state(&scene);
    scene.update("r", |e| e.x = 5.0).unwrap();
    assert!(history.undo(&mut scene));
    assert!(history.can_redo());

    scene.update("r", |e| e.x = 9.0).unwrap();
    history.record_state(&scene);
    assert!(!history.can_redo());
}

#[test]
fn capacity_drops_oldest_entries() {
    let mut scene = one_rect_scene();
    let mut history = History::with_capacity(3);

    for i in 0..6 {
        history.record_state(&scene);
        scene.update("r", |e| e.x = i as f64 + 1.0).unwrap();
    }
    assert_eq!(history.depth(), 3);

    // Undo bottoms out at the oldest retained snapshot.
    while history.undo(&mut scene) {}
    assert_eq!(scene.get("r").unwrap().x, 3.0);
}

#[test]
fn default_capacity_matches_max_history() {
    let mut scene = one_rect_scene();
    let mut history = History::new();
    for i in 0..(MAX_HISTORY + 10) {
        history.record_state(&scene);
        scene.update("r", |e| e.x = i as f64 + 1.0).unwrap();
    }
    assert_eq!(history.depth(), MAX_HISTORY);
}

#[test]
fn undo_on_empty_history_is_a_no_op() {
    let mut scene = one_rect_scene();
    let mut history = History::new();
    let before = scene.clone_elements();
    assert!(!history.undo(&mut scene));
    assert!(!history.redo(&mut scene));
    assert_eq!(scene.clone_elements(), before);
}

#[test]
fn rollback_restores_without_touching_redo() {
    let mut scene = one_rect_scene();
    let mut history = History::new();

    history.record_state(&scene);
    scene.update("r", |e| e.x = 77.0).unwrap();

    assert!(history.rollback_last(&mut scene));
    assert_eq!(scene.get("r").unwrap().x, 0.0);
    assert_eq!(history.depth(), 0);
    assert!(!history.can_redo());
}

#[test]
fn zero_net_gestures_leave_no_entry() {
    let mut scene = one_rect_scene();
    let mut history = History::new();

    history.record_state(&scene);
    scene.update("r", |e| e.x += 10.0).unwrap();
    scene.update("r", |e| e.x -= 10.0).unwrap();
    history.discard_if_unchanged(&scene);
    assert_eq!(history.depth(), 0);
}

#[test]
fn sequence_numbers_are_monotonic() {
    let mut scene = one_rect_scene();
    let mut history = History::new();

    history.record_state(&scene);
    let first = history.last_recorded_seq().unwrap();
    scene.update("r", |e| e.x = 1.0).unwrap();
    history.record_state(&scene);
    let second = history.last_recorded_seq().unwrap();
    assert!(second > first);
}

#[test]
fn clear_empties_both_stacks() {
    let mut scene = one_rect_scene();
    let mut history = History::new();

    history.record_state(&scene);
    scene.update("r", |e| e.x = 3.0).unwrap();
    history.undo(&mut scene);

    history.clear();
    assert!(!history.can_undo());
    assert!(!history.can_redo());
}
