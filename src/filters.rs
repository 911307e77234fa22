use serde::{Deserialize, Serialize};

use crate::element::ElementKind;
use crate::history::History;
use crate::scene::Scene;

/// The recognized per-image filter options.
///
/// Declaration order is the composition order: filters are applied to the
/// decoded pixels top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Grayscale,
    Brightness,
    Contrast,
    Blur,
    Sepia,
    Saturate,
    HueRotate,
    Invert,
    Opacity,
}

impl FilterKey {
    pub const ALL: [FilterKey; 9] = [
        FilterKey::Grayscale,
        FilterKey::Brightness,
        FilterKey::Contrast,
        FilterKey::Blur,
        FilterKey::Sepia,
        FilterKey::Saturate,
        FilterKey::HueRotate,
        FilterKey::Invert,
        FilterKey::Opacity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Grayscale => "grayscale",
            FilterKey::Brightness => "brightness",
            FilterKey::Contrast => "contrast",
            FilterKey::Blur => "blur",
            FilterKey::Sepia => "sepia",
            FilterKey::Saturate => "saturate",
            FilterKey::HueRotate => "hueRotate",
            FilterKey::Invert => "invert",
            FilterKey::Opacity => "opacity",
        }
    }

    /// Allowed `[min, max]` slider range for this option.
    pub fn range(&self) -> (f64, f64) {
        match self {
            FilterKey::Grayscale => (0.0, 100.0),
            FilterKey::Brightness => (0.0, 200.0),
            FilterKey::Contrast => (0.0, 200.0),
            FilterKey::Blur => (0.0, 20.0),
            FilterKey::Sepia => (0.0, 100.0),
            FilterKey::Saturate => (0.0, 200.0),
            FilterKey::HueRotate => (0.0, 360.0),
            FilterKey::Invert => (0.0, 100.0),
            FilterKey::Opacity => (0.0, 100.0),
        }
    }

    /// The neutral value; keys at their default are omitted from storage.
    pub fn default_value(&self) -> f64 {
        match self {
            FilterKey::Grayscale => 0.0,
            FilterKey::Brightness => 100.0,
            FilterKey::Contrast => 100.0,
            FilterKey::Blur => 0.0,
            FilterKey::Sepia => 0.0,
            FilterKey::Saturate => 100.0,
            FilterKey::HueRotate => 0.0,
            FilterKey::Invert => 0.0,
            FilterKey::Opacity => 100.0,
        }
    }
}

/// Non-destructive filter record stored on image elements.
///
/// Fields hold `None` when the option sits at its default, so the serialized
/// form only carries edited keys.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterStack {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grayscale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blur: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sepia: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue_rotate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invert: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl FilterStack {
    fn slot(&self, key: FilterKey) -> Option<f64> {
        match key {
            FilterKey::Grayscale => self.grayscale,
            FilterKey::Brightness => self.brightness,
            FilterKey::Contrast => self.contrast,
            FilterKey::Blur => self.blur,
            FilterKey::Sepia => self.sepia,
            FilterKey::Saturate => self.saturate,
            FilterKey::HueRotate => self.hue_rotate,
            FilterKey::Invert => self.invert,
            FilterKey::Opacity => self.opacity,
        }
    }

    fn slot_mut(&mut self, key: FilterKey) -> &mut Option<f64> {
        match key {
            FilterKey::Grayscale => &mut self.grayscale,
            FilterKey::Brightness => &mut self.brightness,
            FilterKey::Contrast => &mut self.contrast,
            FilterKey::Blur => &mut self.blur,
            FilterKey::Sepia => &mut self.sepia,
            FilterKey::Saturate => &mut self.saturate,
            FilterKey::HueRotate => &mut self.hue_rotate,
            FilterKey::Invert => &mut self.invert,
            FilterKey::Opacity => &mut self.opacity,
        }
    }

    /// Effective value for `key`, falling back to the default.
    pub fn get(&self, key: FilterKey) -> f64 {
        self.slot(key).unwrap_or_else(|| key.default_value())
    }

    /// Set `key` to `value`, clamping to the declared range. A value equal
    /// to the default clears the key.
    pub fn set(&mut self, key: FilterKey, value: f64) {
        let (min, max) = key.range();
        let clamped = value.clamp(min, max);
        *self.slot_mut(key) = if clamped == key.default_value() {
            None
        } else {
            Some(clamped)
        };
    }

    /// True when every key sits at its default.
    pub fn is_neutral(&self) -> bool {
        FilterKey::ALL.iter().all(|k| self.slot(*k).is_none())
    }

    /// Re-clamp every stored value and drop keys equal to their default.
    /// Applied on commit and on load of untrusted data.
    pub fn normalize(&mut self) {
        for key in FilterKey::ALL {
            if let Some(v) = self.slot(key) {
                self.set(key, v);
            }
        }
    }

    /// Cache key for the rendered-pixel cache; identical stacks share
    /// a processed texture.
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        for key in FilterKey::ALL {
            if let Some(v) = self.slot(key) {
                out.push_str(key.as_str());
                out.push('=');
                out.push_str(&format!("{v};"));
            }
        }
        out
    }
}

/// Named partial filter records offered by the filter editor.
pub const PRESET_NAMES: [&str; 8] = [
    "BW",
    "Vintage",
    "High-Contrast",
    "Faded",
    "Dramatic",
    "Muted",
    "Warm",
    "Cool",
];

/// Look up a preset by name. Unknown names return `None`.
pub fn preset(name: &str) -> Option<FilterStack> {
    let mut f = FilterStack::default();
    match name {
        "BW" => {
            f.set(FilterKey::Grayscale, 100.0);
        }
        "Vintage" => {
            f.set(FilterKey::Sepia, 60.0);
            f.set(FilterKey::Contrast, 90.0);
            f.set(FilterKey::Brightness, 110.0);
        }
        "High-Contrast" => {
            f.set(FilterKey::Contrast, 160.0);
        }
        "Faded" => {
            f.set(FilterKey::Saturate, 60.0);
            f.set(FilterKey::Brightness, 115.0);
            f.set(FilterKey::Contrast, 85.0);
        }
        "Dramatic" => {
            f.set(FilterKey::Contrast, 140.0);
            f.set(FilterKey::Brightness, 85.0);
            f.set(FilterKey::Saturate, 120.0);
        }
        "Muted" => {
            f.set(FilterKey::Saturate, 40.0);
        }
        "Warm" => {
            f.set(FilterKey::Sepia, 30.0);
            f.set(FilterKey::Saturate, 110.0);
        }
        "Cool" => {
            f.set(FilterKey::HueRotate, 180.0);
            f.set(FilterKey::Saturate, 90.0);
        }
        _ => return None,
    }
    Some(f)
}

/// Editing session for one image's filter stack.
///
/// Slider motion writes straight to the scene for live preview without
/// touching history; `cancel` restores the stack captured at open time and
/// `apply` commits the normalized stack as a single history entry.
#[derive(Debug, Clone)]
pub struct FilterEditor {
    element_id: String,
    saved: Option<FilterStack>,
    working: FilterStack,
}

impl FilterEditor {
    /// Open an editing session for `element_id`. Fails silently (returns
    /// `None`) for ids that are not image elements.
    pub fn open(scene: &Scene, element_id: &str) -> Option<Self> {
        let element = scene.get(element_id)?;
        if !matches!(element.kind, ElementKind::Image { .. }) {
            return None;
        }
        Some(Self {
            element_id: element_id.to_owned(),
            saved: element.filters,
            working: element.filters.unwrap_or_default(),
        })
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn working(&self) -> &FilterStack {
        &self.working
    }

    /// Live-preview mutation: clamp, store, and push to the scene without a
    /// history entry.
    pub fn set(&mut self, scene: &mut Scene, key: FilterKey, value: f64) {
        self.working.set(key, value);
        self.push_preview(scene);
    }

    /// Replace the working stack with a preset, as a live preview.
    pub fn apply_preset(&mut self, scene: &mut Scene, name: &str) {
        if let Some(p) = preset(name) {
            self.working = p;
            self.push_preview(scene);
        }
    }

    fn push_preview(&self, scene: &mut Scene) {
        let working = self.working;
        let _ = scene.update(&self.element_id, |e| {
            e.filters = if working.is_neutral() {
                None
            } else {
                Some(working)
            };
        });
    }

    /// Restore the stack captured when the editor opened. No history entry.
    pub fn cancel(self, scene: &mut Scene) {
        let saved = self.saved;
        let _ = scene.update(&self.element_id, |e| {
            e.filters = saved;
        });
    }

    /// Commit the working stack: one history entry, minimal storage.
    pub fn apply(self, scene: &mut Scene, history: &mut History) {
        let saved = self.saved;
        // Rewind the preview so the snapshot captures the pre-edit state.
        let _ = scene.update(&self.element_id, |e| {
            e.filters = saved;
        });
        history.record_state(scene);

        let mut working = self.working;
        working.normalize();
        let _ = scene.update(&self.element_id, |e| {
            e.filters = if working.is_neutral() {
                None
            } else {
                Some(working)
            };
        });
    }
}

/// Toggle a flip flag on an element, recording one history entry.
pub fn toggle_flip(scene: &mut Scene, history: &mut History, id: &str, horizontal: bool) {
    if scene.get(id).is_none() {
        return;
    }
    history.record_state(scene);
    let _ = scene.update(id, |e| {
        if horizontal {
            e.flip_h = !e.flip_h;
        } else {
            e.flip_v = !e.flip_v;
        }
    });
}

/// Run the filter stack over decoded pixels, in table order.
///
/// `image` supplies grayscale/contrast/hue/invert/blur; sepia, saturation,
/// percentage grayscale, and opacity are per-pixel passes.
pub fn apply_to_image(img: image::DynamicImage, filters: &FilterStack) -> image::RgbaImage {
    let mut rgba = img.to_rgba8();

    let grayscale = filters.get(FilterKey::Grayscale);
    if grayscale > 0.0 {
        blend_toward_gray(&mut rgba, grayscale / 100.0);
    }

    let brightness = filters.get(FilterKey::Brightness);
    if brightness != 100.0 {
        scale_channels(&mut rgba, brightness / 100.0);
    }

    let contrast = filters.get(FilterKey::Contrast);
    if contrast != 100.0 {
        rgba = image::DynamicImage::ImageRgba8(rgba)
            .adjust_contrast((contrast - 100.0) as f32)
            .to_rgba8();
    }

    let blur = filters.get(FilterKey::Blur);
    if blur > 0.0 {
        rgba = image::imageops::blur(&rgba, blur as f32);
    }

    let sepia = filters.get(FilterKey::Sepia);
    if sepia > 0.0 {
        apply_sepia(&mut rgba, sepia / 100.0);
    }

    let saturate = filters.get(FilterKey::Saturate);
    if saturate != 100.0 {
        apply_saturation(&mut rgba, saturate / 100.0);
    }

    let hue = filters.get(FilterKey::HueRotate);
    if hue != 0.0 {
        rgba = image::DynamicImage::ImageRgba8(rgba)
            .huerotate(hue.round() as i32)
            .to_rgba8();
    }

    let invert = filters.get(FilterKey::Invert);
    if invert > 0.0 {
        apply_invert(&mut rgba, invert / 100.0);
    }

    let opacity = filters.get(FilterKey::Opacity);
    if opacity < 100.0 {
        let factor = (opacity / 100.0) as f32;
        for p in rgba.pixels_mut() {
            p.0[3] = (p.0[3] as f32 * factor).round().clamp(0.0, 255.0) as u8;
        }
    }

    rgba
}

fn luma(p: &[u8; 4]) -> f32 {
    0.2126 * p[0] as f32 + 0.7152 * p[1] as f32 + 0.0722 * p[2] as f32
}

fn blend_toward_gray(rgba: &mut image::RgbaImage, amount: f64) {
    let t = amount as f32;
    for p in rgba.pixels_mut() {
        let g = luma(&p.0);
        for c in 0..3 {
            let v = p.0[c] as f32;
            p.0[c] = (v + (g - v) * t).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn scale_channels(rgba: &mut image::RgbaImage, factor: f64) {
    let f = factor as f32;
    for p in rgba.pixels_mut() {
        for c in 0..3 {
            p.0[c] = (p.0[c] as f32 * f).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn apply_sepia(rgba: &mut image::RgbaImage, amount: f64) {
    let t = amount as f32;
    for p in rgba.pixels_mut() {
        let (r, g, b) = (p.0[0] as f32, p.0[1] as f32, p.0[2] as f32);
        let sr = 0.393 * r + 0.769 * g + 0.189 * b;
        let sg = 0.349 * r + 0.686 * g + 0.168 * b;
        let sb = 0.272 * r + 0.534 * g + 0.131 * b;
        p.0[0] = (r + (sr - r) * t).round().clamp(0.0, 255.0) as u8;
        p.0[1] = (g + (sg - g) * t).round().clamp(0.0, 255.0) as u8;
        p.0[2] = (b + (sb - b) * t).round().clamp(0.0, 255.0) as u8;
    }
}

fn apply_saturation(rgba: &mut image::RgbaImage, factor: f64) {
    let f = factor as f32;
    for p in rgba.pixels_mut() {
        let g = luma(&p.0);
        for c in 0..3 {
            let v = p.0[c] as f32;
            p.0[c] = (g + (v - g) * f).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn apply_invert(rgba: &mut image::RgbaImage, amount: f64) {
    let t = amount as f32;
    for p in rgba.pixels_mut() {
        for c in 0..3 {
            let v = p.0[c] as f32;
            p.0[c] = (v + ((255.0 - v) - v) * t).round().clamp(0.0, 255.0) as u8;
        }
    }
}
