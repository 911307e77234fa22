use std::collections::{HashMap, HashSet};

use crate::element::{Element, ElementKind};
use crate::error::{BoardError, Result};
use crate::geometry::WorldRect;

/// Change notification emitted by every scene mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneChange {
    Inserted(String),
    Updated(String),
    Removed(String),
    Reordered(String),
    /// The whole elements array was swapped out (load, undo/redo).
    Replaced,
}

impl SceneChange {
    /// The affected element id, if the change names one.
    pub fn id(&self) -> Option<&str> {
        match self {
            SceneChange::Inserted(id)
            | SceneChange::Updated(id)
            | SceneChange::Removed(id)
            | SceneChange::Reordered(id) => Some(id),
            SceneChange::Replaced => None,
        }
    }
}

/// Authoritative in-memory state of one canvas.
///
/// `elements` is the z-order from back to front; a secondary id index is
/// rebuilt whenever the array is replaced from outside. All mutations go
/// through this API and queue a [`SceneChange`].
#[derive(Debug, Default)]
pub struct Scene {
    elements: Vec<Element>,
    index: HashMap<String, usize>,
    changes: Vec<SceneChange>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: Vec<Element>) -> Self {
        let mut scene = Self::default();
        scene.replace_elements(elements);
        scene.changes.clear();
        scene
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Back-to-front element slice; the paint order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn iter_back_to_front(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn iter_front_to_back(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().rev()
    }

    /// Deep copy of the elements array, for history snapshots and saves.
    pub fn clone_elements(&self) -> Vec<Element> {
        self.elements.clone()
    }

    /// Highest z-index currently on the canvas.
    pub fn top_z(&self) -> i64 {
        self.elements.iter().map(|e| e.z_index).max().unwrap_or(0)
    }

    pub fn insert(&mut self, element: Element) -> Result<()> {
        if self.index.contains_key(&element.id) {
            return Err(BoardError::InvariantViolation(format!(
                "duplicate element id {}",
                element.id
            )));
        }
        let id = element.id.clone();
        self.elements.push(element);
        self.resort();
        self.changes.push(SceneChange::Inserted(id));
        Ok(())
    }

    /// Apply `patch` to the element with `id`. Re-sorts if the patch touched
    /// the z-index.
    pub fn update<F: FnOnce(&mut Element)>(&mut self, id: &str, patch: F) -> Result<()> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| BoardError::NotFound(id.to_owned()))?;
        let old_z = self.elements[i].z_index;
        patch(&mut self.elements[i]);
        if self.elements[i].z_index != old_z {
            self.resort();
        }
        self.changes.push(SceneChange::Updated(id.to_owned()));
        Ok(())
    }

    /// Remove an element, keeping the group invariants intact: a removed
    /// child leaves its owner's `children`; a removed group frees its
    /// children (they stay on the canvas).
    pub fn remove(&mut self, id: &str) -> Result<Element> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| BoardError::NotFound(id.to_owned()))?;
        let removed = self.elements.remove(i);
        self.reindex();

        if let Some(owner) = removed.group_id.clone() {
            let _ = self.update(&owner, |g| {
                if let ElementKind::Group { children } = &mut g.kind {
                    children.retain(|c| c != id);
                }
            });
        }
        if let ElementKind::Group { children } = &removed.kind {
            for child in children.clone() {
                let _ = self.update(&child, |c| c.group_id = None);
            }
        }

        self.changes.push(SceneChange::Removed(id.to_owned()));
        Ok(removed)
    }

    pub fn reorder(&mut self, id: &str, new_z: i64) -> Result<()> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| BoardError::NotFound(id.to_owned()))?;
        self.elements[i].z_index = new_z;
        self.resort();
        self.changes.push(SceneChange::Reordered(id.to_owned()));
        Ok(())
    }

    /// Swap in a whole elements array (load, undo/redo) and rebuild the
    /// index.
    pub fn replace_elements(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        self.resort();
        self.changes.push(SceneChange::Replaced);
    }

    /// Bounding box in world units. Group bounds are the union over their
    /// children, resolved recursively.
    pub fn bounds(&self, id: &str) -> Option<WorldRect> {
        let mut visited = HashSet::new();
        self.bounds_inner(id, &mut visited)
    }

    fn bounds_inner(&self, id: &str, visited: &mut HashSet<String>) -> Option<WorldRect> {
        if !visited.insert(id.to_owned()) {
            return None;
        }
        let element = self.get(id)?;
        match &element.kind {
            ElementKind::Group { children } => {
                let mut acc: Option<WorldRect> = None;
                for child in children {
                    if let Some(b) = self.bounds_inner(child, visited) {
                        acc = Some(match acc {
                            Some(u) => u.union(&b),
                            None => b,
                        });
                    }
                }
                acc.or_else(|| Some(element.bounds()))
            }
            _ => Some(element.bounds()),
        }
    }

    /// Topmost element whose shape contains the world point. Group frames
    /// pick through their resolved bounds.
    pub fn pick_topmost(&self, px: f64, py: f64) -> Option<&Element> {
        self.iter_front_to_back().find(|e| match &e.kind {
            ElementKind::Group { .. } => self
                .bounds(&e.id)
                .map(|b| b.contains(px, py))
                .unwrap_or(false),
            _ => e.hit_test(px, py),
        })
    }

    /// Ids of top-level elements (no owning group) whose bounds intersect
    /// the marquee rectangle, back to front.
    pub fn marquee_hits(&self, rect: &WorldRect) -> Vec<String> {
        self.elements
            .iter()
            .filter(|e| e.group_id.is_none())
            .filter(|e| {
                self.bounds(&e.id)
                    .map(|b| b.intersects(rect))
                    .unwrap_or(false)
            })
            .map(|e| e.id.clone())
            .collect()
    }

    /// Drain queued change events.
    pub fn take_changes(&mut self) -> Vec<SceneChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Verify the central scene invariants. Used as a bug guard; a failure
    /// means an operation was refused or must be rolled back.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for e in &self.elements {
            if !seen.insert(e.id.as_str()) {
                return Err(BoardError::InvariantViolation(format!(
                    "duplicate element id {}",
                    e.id
                )));
            }
        }
        for e in &self.elements {
            if let ElementKind::Group { children } = &e.kind {
                for child_id in children {
                    if child_id == &e.id {
                        return Err(BoardError::InvariantViolation(format!(
                            "group {} contains itself",
                            e.id
                        )));
                    }
                    let child = self.get(child_id).ok_or_else(|| {
                        BoardError::InvariantViolation(format!(
                            "group {} references missing child {}",
                            e.id, child_id
                        ))
                    })?;
                    if child.group_id.as_deref() != Some(e.id.as_str()) {
                        return Err(BoardError::InvariantViolation(format!(
                            "child {} does not point back at group {}",
                            child_id, e.id
                        )));
                    }
                }
            }
            if let Some(owner) = &e.group_id {
                let ok = matches!(
                    self.get(owner).map(|g| &g.kind),
                    Some(ElementKind::Group { children }) if children.contains(&e.id)
                );
                if !ok {
                    return Err(BoardError::InvariantViolation(format!(
                        "element {} claims membership in group {} which does not list it",
                        e.id, owner
                    )));
                }
            }
        }
        Ok(())
    }

    // Stable sort keeps insertion order as the tie-break among equal
    // z-indices.
    fn resort(&mut self) {
        self.elements.sort_by_key(|e| e.z_index);
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
    }
}
