use std::time::{Duration, Instant};

use eframe_board::document::Canvas;
use eframe_board::element::factory;
use eframe_board::error::BoardError;
use eframe_board::persistence::{
    validate_identifier, AutoSaver, AutosaveOutcome, MemoryStore, Store, AUTOSAVE_DELAY,
    MAX_SAVE_ATTEMPTS,
};
use eframe_board::scene::Scene;

fn main_canvas_with_image() -> (MemoryStore, Canvas, Scene) {
    let store = MemoryStore::new();
    let doc = Canvas::new("main", "Main Canvas", None);
    store.insert_canvas(doc.clone());

    let mut scene = Scene::new();
    scene
        .insert(factory::image("/api/images/i1.png", 100.0, 100.0, 300.0, 200.0).with_id("i1"))
        .unwrap();
    (store, doc, scene)
}

#[test]
fn debounce_fires_exactly_one_save() {
    let (store, doc, scene) = main_canvas_with_image();
    let mut saver = AutoSaver::new();
    let t0 = Instant::now();

    saver.schedule(t0);
    let record = doc.with_elements(scene.clone_elements());

    // Before the 500 ms window closes nothing happens.
    assert!(saver
        .tick(t0 + Duration::from_millis(400), &store, &record)
        .is_none());
    assert_eq!(store.save_count("main"), 0);

    // After it closes exactly one save fires, with the scene serialized.
    let outcome = saver
        .tick(t0 + AUTOSAVE_DELAY + Duration::from_millis(1), &store, &record)
        .expect("save should fire");
    assert!(matches!(outcome, AutosaveOutcome::Saved(_)));
    assert_eq!(store.save_count("main"), 1);

    let saved = store.saved_canvas("main").unwrap();
    assert_eq!(saved.elements.len(), 1);
    assert_eq!(saved.elements[0].id, "i1");
    assert!(!saved.modified.is_empty());
    assert_ne!(saved.modified, doc.modified);

    // Nothing left pending.
    assert!(!saver.is_dirty());
    assert!(saver
        .tick(t0 + Duration::from_secs(10), &store, &record)
        .is_none());
}

#[test]
fn mutations_reset_the_debounce_window() {
    let (store, doc, scene) = main_canvas_with_image();
    let mut saver = AutoSaver::new();
    let record = doc.with_elements(scene.clone_elements());
    let t0 = Instant::now();

    saver.schedule(t0);
    saver.schedule(t0 + Duration::from_millis(300));

    // The first deadline has been pushed out.
    assert!(saver
        .tick(t0 + Duration::from_millis(600), &store, &record)
        .is_none());
    assert!(saver
        .tick(t0 + Duration::from_millis(801), &store, &record)
        .is_some());
    assert_eq!(store.save_count("main"), 1);
}

#[test]
fn failed_saves_retry_with_backoff_then_give_up() {
    let (store, doc, scene) = main_canvas_with_image();
    let mut saver = AutoSaver::new();
    let record = doc.with_elements(scene.clone_elements());
    let mut now = Instant::now();

    store.set_fail_saves(true);
    saver.schedule(now);

    let mut failures = 0;
    for _ in 0..MAX_SAVE_ATTEMPTS {
        // Jump far enough ahead to pass any backoff deadline.
        now += Duration::from_secs(60);
        match saver.tick(now, &store, &record) {
            Some(AutosaveOutcome::Failed { gave_up, .. }) => {
                failures += 1;
                if failures == MAX_SAVE_ATTEMPTS {
                    assert!(gave_up);
                } else {
                    assert!(!gave_up);
                }
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
    assert_eq!(store.save_count("main"), MAX_SAVE_ATTEMPTS as usize);

    // Gave up: no more attempts without a new mutation, state stays dirty.
    now += Duration::from_secs(60);
    assert!(saver.tick(now, &store, &record).is_none());
    assert!(saver.is_dirty());

    // The store coming back plus a new mutation recovers.
    store.set_fail_saves(false);
    saver.schedule(now);
    now += Duration::from_secs(1);
    assert!(matches!(
        saver.tick(now, &store, &record),
        Some(AutosaveOutcome::Saved(_))
    ));
    assert!(!saver.is_dirty());
}

#[test]
fn backoff_delays_grow() {
    let (store, doc, scene) = main_canvas_with_image();
    let mut saver = AutoSaver::new();
    let record = doc.with_elements(scene.clone_elements());
    let t0 = Instant::now();

    store.set_fail_saves(true);
    saver.schedule(t0);

    // First attempt at t0+delay fails; the retry waits another full delay.
    assert!(saver
        .tick(t0 + AUTOSAVE_DELAY + Duration::from_millis(1), &store, &record)
        .is_some());
    assert!(saver
        .tick(t0 + AUTOSAVE_DELAY + Duration::from_millis(400), &store, &record)
        .is_none());
    assert!(saver
        .tick(t0 + AUTOSAVE_DELAY * 2 + Duration::from_millis(10), &store, &record)
        .is_some());
}

#[test]
fn flush_saves_immediately() {
    let (store, doc, scene) = main_canvas_with_image();
    let mut saver = AutoSaver::new();
    let record = doc.with_elements(scene.clone_elements());

    saver.schedule(Instant::now());
    assert!(matches!(
        saver.flush(&store, &record),
        Some(AutosaveOutcome::Saved(_))
    ));
    assert_eq!(store.save_count("main"), 1);
    assert!(!saver.is_dirty());

    // Nothing pending, nothing flushed.
    assert!(saver.flush(&store, &record).is_none());
}

#[test]
fn store_reports_not_found() {
    let store = MemoryStore::new();
    assert!(matches!(
        store.load_canvas("missing"),
        Err(BoardError::NotFound(_))
    ));
    assert!(matches!(
        store.delete_canvas("missing"),
        Err(BoardError::NotFound(_))
    ));
}

#[test]
fn identifier_validation_rejects_traversal() {
    validate_identifier("main").unwrap();
    validate_identifier("canvas_2-final").unwrap();
    validate_identifier("abc123.png").unwrap();
    validate_identifier("550e8400-e29b-41d4-a716-446655440000").unwrap();
    validate_identifier("550e8400-e29b-41d4-a716-446655440000.jpeg").unwrap();

    for bad in [
        "",
        "..",
        "../etc",
        "a/b",
        "a\\b",
        "a..b.png",
        "name.",
        ".hidden",
        "semi;colon",
        "with space",
        "ctrl\u{7}char",
    ] {
        assert!(
            matches!(validate_identifier(bad), Err(BoardError::InvalidInput(_))),
            "{bad:?} should be rejected"
        );
    }

    let long = "x".repeat(65);
    assert!(validate_identifier(&long).is_err());
    assert!(validate_identifier(&"x".repeat(64)).is_ok());
}

#[test]
fn upload_keeps_extension_and_original_name() {
    let store = MemoryStore::new();
    let uploaded = store.upload_image("photo of cat.webp", &[1, 2, 3]).unwrap();
    assert!(uploaded.filename.ends_with(".webp"));
    assert_eq!(uploaded.original_name, "photo of cat.webp");
    assert_eq!(uploaded.size, 3);
    assert_eq!(uploaded.url, format!("/api/images/{}", uploaded.filename));
    assert_eq!(store.load_image(&uploaded.filename).unwrap(), vec![1, 2, 3]);
}
