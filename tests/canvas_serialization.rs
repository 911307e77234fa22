use eframe_board::document::{Canvas, CANVAS_FORMAT_VERSION};
use eframe_board::element::{Element, ElementKind};
use eframe_board::persistence::{LocalStore, MemoryStore, Store};
use serde_json::json;

#[test]
fn element_round_trip_preserves_unknown_fields() {
    let raw = json!({
        "id": "i1",
        "type": "image",
        "src": "/api/images/cat.png",
        "x": 100.0,
        "y": 100.0,
        "width": 300.0,
        "height": 200.0,
        "zIndex": 3,
        "flipH": true,
        "note": "holiday",
        "filters": { "grayscale": 100.0 },
        "legacyTag": { "nested": [1, 2, 3] },
        "futureField": "keep me"
    });

    let element: Element = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(element.id, "i1");
    assert!(matches!(&element.kind, ElementKind::Image { src } if src == "/api/images/cat.png"));
    assert_eq!(element.z_index, 3);
    assert!(element.flip_h);
    assert!(!element.flip_v);
    assert_eq!(element.note.as_deref(), Some("holiday"));

    let back = serde_json::to_value(&element).unwrap();
    assert_eq!(back["legacyTag"], raw["legacyTag"]);
    assert_eq!(back["futureField"], "keep me");
    assert_eq!(back["type"], "image");
    assert_eq!(back["filters"]["grayscale"], 100.0);
    // Unset optionals stay off the wire.
    assert!(back.get("flipV").is_none());
    assert!(back.get("groupId").is_none());
}

#[test]
fn every_variant_round_trips() {
    let raw = json!([
        { "id": "e1", "type": "image", "src": "a.png", "x": 0, "y": 0, "width": 10, "height": 10, "zIndex": 0 },
        { "id": "e2", "type": "rectangle", "stroke": "#ff0000", "fill": "#00ff00", "strokeWidth": 3.0,
          "x": 1, "y": 2, "width": 30, "height": 40, "zIndex": 1 },
        { "id": "e3", "type": "line", "stroke": "#000000", "strokeWidth": 2.0,
          "x": 0, "y": 0, "width": 50, "height": -20, "zIndex": 2 },
        { "id": "e4", "type": "freehand", "points": [ {"x": 1.0, "y": 2.0}, {"x": 3.0, "y": 4.0} ],
          "stroke": "#123456", "strokeWidth": 1.5, "x": 1, "y": 2, "width": 2, "height": 2, "zIndex": 3 },
        { "id": "e5", "type": "text", "text": "hello", "font": "20px serif",
          "x": 5, "y": 5, "width": 100, "height": 20, "zIndex": 4 },
        { "id": "e6", "type": "folder", "targetCanvasId": "child1",
          "x": 9, "y": 9, "width": 160, "height": 120, "zIndex": 5 },
        { "id": "e7", "type": "group", "children": ["e1", "e2"],
          "x": 0, "y": 0, "width": 31, "height": 42, "zIndex": 6 }
    ]);

    let elements: Vec<Element> = serde_json::from_value(raw).unwrap();
    assert_eq!(elements.len(), 7);
    assert!(matches!(&elements[2].kind, ElementKind::Line { .. }));
    assert!(
        matches!(&elements[4].kind, ElementKind::Text { text, font } if text == "hello" && font == "20px serif")
    );
    assert!(
        matches!(&elements[6].kind, ElementKind::Group { children } if children == &vec!["e1".to_owned(), "e2".to_owned()])
    );

    let round: Vec<Element> =
        serde_json::from_value(serde_json::to_value(&elements).unwrap()).unwrap();
    assert_eq!(round, elements);
}

#[test]
fn unknown_element_types_are_rejected() {
    let raw = json!({ "id": "z", "type": "hologram", "x": 0, "y": 0, "width": 1, "height": 1 });
    assert!(serde_json::from_value::<Element>(raw).is_err());
}

#[test]
fn neutral_filters_are_dropped_from_the_wire() {
    let raw = json!({
        "id": "i1", "type": "image", "src": "a.png",
        "x": 0, "y": 0, "width": 1, "height": 1,
        "filters": { "grayscale": 0.0, "brightness": 100.0 }
    });
    let element: Element = serde_json::from_value(raw).unwrap();
    assert!(element.filters.is_none());
    let back = serde_json::to_value(&element).unwrap();
    assert!(back.get("filters").is_none());
}

#[test]
fn out_of_range_filters_clamp_on_read() {
    let raw = json!({
        "id": "i1", "type": "image", "src": "a.png",
        "x": 0, "y": 0, "width": 1, "height": 1,
        "filters": { "brightness": 900.0 }
    });
    let element: Element = serde_json::from_value(raw).unwrap();
    let filters = element.filters.unwrap();
    assert_eq!(filters.get(eframe_board::FilterKey::Brightness), 200.0);
}

#[test]
fn canvas_json_shape_matches_the_store_format() {
    let mut canvas = Canvas::new("main", "Main Canvas", None);
    canvas
        .elements
        .push(serde_json::from_value(json!({
            "id": "r1", "type": "rectangle", "x": 0, "y": 0, "width": 10, "height": 10
        }))
        .unwrap());

    let v = serde_json::to_value(&canvas).unwrap();
    assert_eq!(v["version"], CANVAS_FORMAT_VERSION);
    assert_eq!(v["id"], "main");
    assert!(v["parentId"].is_null());
    assert!(v.get("viewBox").is_some());
    assert_eq!(v["viewBox"]["width"], 1920.0);
    assert!(v["elements"].is_array());

    let back: Canvas = serde_json::from_value(v).unwrap();
    assert_eq!(back, canvas);
}

#[test]
fn missing_version_migrates_in_place() {
    let raw = json!({
        "id": "old",
        "name": "Old Canvas",
        "parentId": null,
        "created": "2020-01-01T00:00:00+00:00",
        "modified": "2020-01-01T00:00:00+00:00",
        "viewBox": { "x": 0.0, "y": 0.0, "width": 1920.0, "height": 1080.0 },
        "elements": []
    });
    let mut canvas: Canvas = serde_json::from_value(raw).unwrap();
    assert!(canvas.needs_migration());

    assert!(canvas.migrate());
    assert_eq!(canvas.version, CANVAS_FORMAT_VERSION);
    assert_ne!(canvas.modified, "2020-01-01T00:00:00+00:00");
    // Migration is one-shot.
    assert!(!canvas.migrate());
}

#[test]
fn store_round_trip_is_lossless_modulo_modified() {
    let store = MemoryStore::new();
    let mut canvas = Canvas::new("main", "Main Canvas", None);
    canvas.elements.push(
        serde_json::from_value(json!({
            "id": "i1", "type": "image", "src": "a.png",
            "x": 1, "y": 2, "width": 3, "height": 4, "zIndex": 9,
            "mystery": true
        }))
        .unwrap(),
    );
    store.insert_canvas(canvas.clone());

    let loaded = store.load_canvas("main").unwrap();
    let saved = store.save_canvas(&loaded).unwrap();

    let mut expected = canvas.clone();
    expected.modified = saved.modified.clone();
    assert_eq!(saved, expected);
}

#[test]
fn local_store_seeds_and_migrates_files() {
    let root = std::env::temp_dir().join(format!("eframe_board_test_{}", uuid::Uuid::new_v4()));
    let store = LocalStore::new(&root);
    store.init().unwrap();

    // First run seeds the main canvas and the tree.
    let main = store.load_canvas("main").unwrap();
    assert_eq!(main.name, "Main Canvas");
    assert_eq!(main.version, CANVAS_FORMAT_VERSION);
    let tree = store.load_tree().unwrap();
    assert_eq!(tree.root_canvases, ["main"]);

    // A pre-versioning file on disk is rewritten on first read.
    let legacy = json!({
        "id": "legacy",
        "name": "Legacy",
        "parentId": null,
        "created": "2020-01-01T00:00:00+00:00",
        "modified": "2020-01-01T00:00:00+00:00",
        "viewBox": { "x": 0.0, "y": 0.0, "width": 1920.0, "height": 1080.0 },
        "elements": []
    });
    std::fs::write(
        root.join("canvases").join("legacy.json"),
        serde_json::to_string_pretty(&legacy).unwrap(),
    )
    .unwrap();

    let migrated = store.load_canvas("legacy").unwrap();
    assert_eq!(migrated.version, CANVAS_FORMAT_VERSION);
    let on_disk: Canvas = serde_json::from_str(
        &std::fs::read_to_string(root.join("canvases").join("legacy.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(on_disk.version, CANVAS_FORMAT_VERSION);

    // Uploads land under images/ with a fresh name.
    let uploaded = store.upload_image("pic.png", &[9, 9, 9]).unwrap();
    assert!(root.join("images").join(&uploaded.filename).exists());
    assert_eq!(store.load_image(&uploaded.filename).unwrap(), vec![9, 9, 9]);

    std::fs::remove_dir_all(&root).ok();
}
