use crate::scene::Scene;

/// How a pick modifies the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// S becomes {id}.
    Replace,
    /// S grows by id.
    Add,
    /// id flips in or out of S.
    Toggle,
}

/// The ordered set of selected element ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    /// The sole member, when exactly one element is selected. Resize
    /// handles are shown only in this case.
    pub fn sole(&self) -> Option<&str> {
        match self.ids.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn select(&mut self, id: &str, mode: SelectMode) {
        match mode {
            SelectMode::Replace => {
                self.ids.clear();
                self.ids.push(id.to_owned());
            }
            SelectMode::Add => {
                if !self.contains(id) {
                    self.ids.push(id.to_owned());
                }
            }
            SelectMode::Toggle => {
                if let Some(pos) = self.ids.iter().position(|s| s == id) {
                    self.ids.remove(pos);
                } else {
                    self.ids.push(id.to_owned());
                }
            }
        }
    }

    /// Replace the whole selection (marquee completion, ungroup result).
    pub fn set_all(&mut self, ids: Vec<String>) {
        self.ids = ids;
        self.ids.dedup();
    }

    /// Extend with ids not already present, preserving order.
    pub fn extend(&mut self, ids: impl IntoIterator<Item = String>) {
        for id in ids {
            if !self.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that no longer exist on the scene.
    pub fn retain_existing(&mut self, scene: &Scene) {
        self.ids.retain(|id| scene.contains(id));
    }
}

/// Resolve the element a gesture on `id` actually targets: when the element
/// belongs to a group the pick promotes to the outermost group, so groups
/// move as a unit.
pub fn gesture_target(scene: &Scene, id: &str) -> String {
    let mut current = id.to_owned();
    let mut hops = 0;
    while let Some(owner) = scene.get(&current).and_then(|e| e.group_id.clone()) {
        current = owner;
        hops += 1;
        if hops > scene.len() {
            break;
        }
    }
    current
}
