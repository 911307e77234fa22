use std::collections::HashSet;

use crate::element::{Element, ElementKind};
use crate::error::{BoardError, Result};
use crate::geometry::WorldRect;
use crate::history::History;
use crate::scene::Scene;
use crate::selection::Selection;

/// Compose the current selection into a new group element.
///
/// Requires at least two members. The group's frame is the axis-aligned
/// union of the members' bounds, its children keep their current z-order,
/// and the frame itself goes to the front. The selection collapses to the
/// new group. Returns the group id.
pub fn group_selection(
    scene: &mut Scene,
    selection: &mut Selection,
    history: &mut History,
) -> Result<String> {
    let member_ids: Vec<String> = selection
        .ids()
        .iter()
        .filter(|id| scene.contains(id))
        .cloned()
        .collect();
    if member_ids.len() < 2 {
        return Err(BoardError::InvalidInput(
            "grouping needs at least two elements".to_owned(),
        ));
    }

    history.record_state(scene);

    // Children keep canvas z-order, not click order.
    let ordered: Vec<String> = scene
        .iter_back_to_front()
        .filter(|e| member_ids.iter().any(|id| id == &e.id))
        .map(|e| e.id.clone())
        .collect();

    let mut bounds: Option<WorldRect> = None;
    for id in &ordered {
        if let Some(b) = scene.bounds(id) {
            bounds = Some(match bounds {
                Some(u) => u.union(&b),
                None => b,
            });
        }
    }
    let bounds = bounds.ok_or_else(|| {
        BoardError::InvariantViolation("selection has no measurable bounds".to_owned())
    })?;

    let group = Element::new(
        ElementKind::Group {
            children: ordered.clone(),
        },
        bounds.x,
        bounds.y,
        bounds.width,
        bounds.height,
    )
    .with_z(scene.top_z() + 1);
    let group_id = group.id.clone();

    scene.insert(group)?;
    for id in &ordered {
        scene.update(id, |e| e.group_id = Some(group_id.clone()))?;
    }

    selection.set_all(vec![group_id.clone()]);
    debug_assert!(scene.validate().is_ok());
    Ok(group_id)
}

/// Dissolve one level of the group: the frame is removed, its children are
/// freed and become the selection.
pub fn ungroup(
    scene: &mut Scene,
    selection: &mut Selection,
    history: &mut History,
    group_id: &str,
) -> Result<Vec<String>> {
    let children = match scene.get(group_id).map(|e| &e.kind) {
        Some(ElementKind::Group { children }) => children.clone(),
        Some(_) => {
            return Err(BoardError::InvalidInput(format!(
                "{group_id} is not a group"
            )))
        }
        None => return Err(BoardError::NotFound(group_id.to_owned())),
    };

    history.record_state(scene);

    // Scene::remove clears the children's back-references.
    scene.remove(group_id)?;

    selection.set_all(children.clone());
    debug_assert!(scene.validate().is_ok());
    Ok(children)
}

/// Translate a drag set by a world-space delta.
///
/// Group members expand to their children recursively; an id whose owning
/// group is also in the set is skipped so nothing moves twice.
pub fn translate_elements(scene: &mut Scene, ids: &[String], dx: f64, dy: f64) {
    let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();

    // Keep only ids with no ancestor group inside the same set.
    let mut roots: Vec<&str> = Vec::new();
    for id in ids {
        let mut covered = false;
        let mut current = scene.get(id).and_then(|e| e.group_id.clone());
        let mut hops = 0;
        while let Some(owner) = current {
            if id_set.contains(owner.as_str()) {
                covered = true;
                break;
            }
            hops += 1;
            if hops > scene.len() {
                break;
            }
            current = scene.get(&owner).and_then(|e| e.group_id.clone());
        }
        if !covered {
            roots.push(id);
        }
    }

    // Expand group roots into their descendant closure, once each.
    let mut targets: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<String> = roots.iter().map(|s| (*s).to_owned()).collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if let Some(ElementKind::Group { children }) = scene.get(&id).map(|e| &e.kind) {
            stack.extend(children.iter().cloned());
        }
        targets.push(id);
    }

    for id in targets {
        let _ = scene.update(&id, |e| e.translate(dx, dy));
    }
}
