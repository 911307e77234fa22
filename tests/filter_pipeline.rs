use eframe_board::element::factory;
use eframe_board::filters::{preset, toggle_flip, FilterEditor, FilterKey, FilterStack, PRESET_NAMES};
use eframe_board::history::History;
use eframe_board::scene::Scene;

fn image_scene(filters: Option<FilterStack>) -> Scene {
    let mut scene = Scene::new();
    let mut img = factory::image("/api/images/pic.png", 0.0, 0.0, 300.0, 200.0).with_id("i1");
    img.filters = filters;
    scene.insert(img).unwrap();
    scene.take_changes();
    scene
}

fn grayscale_only() -> FilterStack {
    let mut f = FilterStack::default();
    f.set(FilterKey::Grayscale, 100.0);
    f
}

#[test]
fn values_clamp_to_declared_ranges() {
    let mut f = FilterStack::default();
    f.set(FilterKey::Brightness, 500.0);
    assert_eq!(f.get(FilterKey::Brightness), 200.0);
    f.set(FilterKey::Blur, -3.0);
    assert_eq!(f.get(FilterKey::Blur), 0.0);
    f.set(FilterKey::HueRotate, 400.0);
    assert_eq!(f.get(FilterKey::HueRotate), 360.0);
}

#[test]
fn defaults_are_not_stored() {
    let mut f = FilterStack::default();
    f.set(FilterKey::Grayscale, 80.0);
    f.set(FilterKey::Grayscale, 0.0);
    assert!(f.is_neutral());

    // Storage minimality: only edited keys serialize.
    let mut f = grayscale_only();
    f.set(FilterKey::Brightness, 100.0);
    let json = serde_json::to_value(f).unwrap();
    let obj = json.as_object().unwrap();
    assert_eq!(obj.len(), 1);
    assert_eq!(obj["grayscale"], 100.0);
}

#[test]
fn every_preset_resolves_and_is_minimal() {
    for name in PRESET_NAMES {
        let p = preset(name).unwrap_or_else(|| panic!("missing preset {name}"));
        assert!(!p.is_neutral(), "preset {name} is empty");
        let json = serde_json::to_value(p).unwrap();
        for (key, value) in json.as_object().unwrap() {
            let key = FilterKey::ALL
                .iter()
                .find(|k| k.as_str() == key)
                .unwrap_or_else(|| panic!("unknown key {key} in preset {name}"));
            assert_ne!(value.as_f64().unwrap(), key.default_value());
        }
    }
    assert!(preset("Nope").is_none());
}

#[test]
fn editor_cancel_restores_the_open_snapshot() {
    let mut scene = image_scene(Some(grayscale_only()));
    let mut history = History::new();

    let mut editor = FilterEditor::open(&scene, "i1").unwrap();
    editor.set(&mut scene, FilterKey::Brightness, 50.0);

    // Live preview wrote through to the scene without history.
    let live = scene.get("i1").unwrap().filters.unwrap();
    assert_eq!(live.get(FilterKey::Brightness), 50.0);
    assert_eq!(history.depth(), 0);

    editor.cancel(&mut scene);
    let stored = scene.get("i1").unwrap().filters.unwrap();
    assert_eq!(stored, grayscale_only());
    assert_eq!(history.depth(), 0);
}

#[test]
fn editor_apply_records_one_entry() {
    let mut scene = image_scene(Some(grayscale_only()));
    let mut history = History::new();

    let mut editor = FilterEditor::open(&scene, "i1").unwrap();
    editor.set(&mut scene, FilterKey::Brightness, 50.0);
    editor.apply(&mut scene, &mut history);

    let stored = scene.get("i1").unwrap().filters.unwrap();
    assert_eq!(stored.get(FilterKey::Grayscale), 100.0);
    assert_eq!(stored.get(FilterKey::Brightness), 50.0);
    assert_eq!(history.depth(), 1);

    history.undo(&mut scene);
    assert_eq!(scene.get("i1").unwrap().filters.unwrap(), grayscale_only());
}

#[test]
fn clearing_every_key_removes_the_record() {
    let mut scene = image_scene(Some(grayscale_only()));
    let mut history = History::new();

    let mut editor = FilterEditor::open(&scene, "i1").unwrap();
    editor.set(&mut scene, FilterKey::Grayscale, 0.0);
    editor.apply(&mut scene, &mut history);

    assert!(scene.get("i1").unwrap().filters.is_none());
}

#[test]
fn editor_only_opens_on_images() {
    let mut scene = Scene::new();
    scene
        .insert(factory::rectangle(0.0, 0.0, 10.0, 10.0).with_id("r"))
        .unwrap();
    assert!(FilterEditor::open(&scene, "r").is_none());
    assert!(FilterEditor::open(&scene, "missing").is_none());
}

#[test]
fn presets_preview_through_the_editor() {
    let mut scene = image_scene(None);
    let mut editor = FilterEditor::open(&scene, "i1").unwrap();
    editor.apply_preset(&mut scene, "BW");
    let live = scene.get("i1").unwrap().filters.unwrap();
    assert_eq!(live.get(FilterKey::Grayscale), 100.0);
}

#[test]
fn flip_toggles_are_idempotent_pairs() {
    let mut scene = image_scene(None);
    let mut history = History::new();

    toggle_flip(&mut scene, &mut history, "i1", true);
    assert!(scene.get("i1").unwrap().flip_h);
    toggle_flip(&mut scene, &mut history, "i1", true);
    assert!(!scene.get("i1").unwrap().flip_h);
    assert_eq!(history.depth(), 2);

    toggle_flip(&mut scene, &mut history, "i1", false);
    assert!(scene.get("i1").unwrap().flip_v);
    assert_eq!(history.depth(), 3);

    // Each toggle is one undo step.
    history.undo(&mut scene);
    assert!(!scene.get("i1").unwrap().flip_v);
}

#[test]
fn pixel_pipeline_applies_invert_and_opacity() {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        2,
        2,
        image::Rgba([200, 100, 50, 255]),
    ));

    let mut f = FilterStack::default();
    f.set(FilterKey::Invert, 100.0);
    f.set(FilterKey::Opacity, 50.0);

    let out = eframe_board::filters::apply_to_image(img, &f);
    let p = out.get_pixel(0, 0);
    assert_eq!(p.0[0], 55);
    assert_eq!(p.0[1], 155);
    assert_eq!(p.0[2], 205);
    assert_eq!(p.0[3], 128);
}

#[test]
fn grayscale_pipeline_flattens_channels() {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        1,
        1,
        image::Rgba([200, 100, 50, 255]),
    ));
    let out = eframe_board::filters::apply_to_image(img, &grayscale_only());
    let p = out.get_pixel(0, 0);
    assert_eq!(p.0[0], p.0[1]);
    assert_eq!(p.0[1], p.0[2]);
}
