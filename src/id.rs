use uuid::Uuid;

/// Generate a fresh element id.
pub fn new_element_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a fresh canvas id.
pub fn new_canvas_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a stored filename for an uploaded image, keeping the original
/// extension when it has one.
pub fn new_image_filename(original_name: &str) -> String {
    let ext = std::path::Path::new(original_name)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("png");
    format!("{}.{}", Uuid::new_v4(), ext)
}
