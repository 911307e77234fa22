use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, Result};

/// One canvas entry in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

/// The canvas hierarchy: a forest of canvases addressed by id.
///
/// Every id appears in exactly one parent's `children` or in
/// `root_canvases`, never both; parent edges are acyclic. Mutations that
/// would break this fail with `InvalidTreeEdit` and leave the tree
/// unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeData {
    pub root_canvases: Vec<String>,
    pub canvases: HashMap<String, TreeNode>,
}

impl TreeData {
    /// A tree holding a single root canvas.
    pub fn with_root(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let mut canvases = HashMap::new();
        canvases.insert(
            id.clone(),
            TreeNode {
                name: name.into(),
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            root_canvases: vec![id],
            canvases,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.canvases.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.canvases.get(id)
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.canvases.get(id).map(|n| n.name.as_str())
    }

    /// Register a canvas under `parent_id`, or as a root when `None`.
    pub fn add_canvas(
        &mut self,
        id: impl Into<String>,
        parent_id: Option<&str>,
        name: impl Into<String>,
    ) -> Result<()> {
        let id = id.into();
        if self.canvases.contains_key(&id) {
            return Err(BoardError::InvalidTreeEdit(format!(
                "canvas {id} already exists"
            )));
        }
        if let Some(parent) = parent_id {
            if !self.canvases.contains_key(parent) {
                return Err(BoardError::InvalidTreeEdit(format!(
                    "parent canvas {parent} does not exist"
                )));
            }
        }

        self.canvases.insert(
            id.clone(),
            TreeNode {
                name: name.into(),
                parent: parent_id.map(str::to_owned),
                children: Vec::new(),
            },
        );
        match parent_id {
            Some(parent) => self
                .canvases
                .get_mut(parent)
                .expect("parent checked above")
                .children
                .push(id),
            None => self.root_canvases.push(id),
        }
        Ok(())
    }

    /// Remove a canvas. Its children are re-parented to the removed
    /// canvas's parent (or become roots), preserving the forest shape.
    pub fn remove_canvas(&mut self, id: &str) -> Result<TreeNode> {
        let node = self
            .canvases
            .remove(id)
            .ok_or_else(|| BoardError::NotFound(id.to_owned()))?;

        // Detach from the old position.
        match &node.parent {
            Some(parent) => {
                if let Some(p) = self.canvases.get_mut(parent) {
                    p.children.retain(|c| c != id);
                }
            }
            None => self.root_canvases.retain(|c| c != id),
        }

        // Promote the orphaned subtrees.
        for child_id in &node.children {
            if let Some(child) = self.canvases.get_mut(child_id) {
                child.parent = node.parent.clone();
            }
            match &node.parent {
                Some(parent) => {
                    if let Some(p) = self.canvases.get_mut(parent) {
                        p.children.push(child_id.clone());
                    }
                }
                None => self.root_canvases.push(child_id.clone()),
            }
        }
        Ok(node)
    }

    /// Re-parent `id` under `new_parent` (or make it a root). Moving a
    /// canvas under its own subtree is a cycle and is refused.
    pub fn move_canvas(&mut self, id: &str, new_parent: Option<&str>) -> Result<()> {
        if !self.canvases.contains_key(id) {
            return Err(BoardError::NotFound(id.to_owned()));
        }
        if let Some(parent) = new_parent {
            if !self.canvases.contains_key(parent) {
                return Err(BoardError::InvalidTreeEdit(format!(
                    "parent canvas {parent} does not exist"
                )));
            }
            if parent == id || self.is_descendant(parent, id) {
                return Err(BoardError::InvalidTreeEdit(format!(
                    "moving {id} under {parent} would create a cycle"
                )));
            }
        }

        let old_parent = self.canvases[id].parent.clone();
        match &old_parent {
            Some(p) => {
                if let Some(node) = self.canvases.get_mut(p) {
                    node.children.retain(|c| c != id);
                }
            }
            None => self.root_canvases.retain(|c| c != id),
        }

        self.canvases.get_mut(id).expect("checked above").parent =
            new_parent.map(str::to_owned);
        match new_parent {
            Some(p) => self
                .canvases
                .get_mut(p)
                .expect("checked above")
                .children
                .push(id.to_owned()),
            None => self.root_canvases.push(id.to_owned()),
        }
        Ok(())
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<()> {
        let node = self
            .canvases
            .get_mut(id)
            .ok_or_else(|| BoardError::NotFound(id.to_owned()))?;
        node.name = name.into();
        Ok(())
    }

    /// Ordered path root → `id`, for breadcrumbs.
    pub fn path_to(&self, id: &str) -> Result<Vec<String>> {
        if !self.canvases.contains_key(id) {
            return Err(BoardError::NotFound(id.to_owned()));
        }
        let mut path = vec![id.to_owned()];
        let mut current = id.to_owned();
        while let Some(parent) = self.canvases[&current].parent.clone() {
            if path.contains(&parent) {
                return Err(BoardError::InvariantViolation(format!(
                    "cycle in parent chain at {parent}"
                )));
            }
            if !self.canvases.contains_key(&parent) {
                return Err(BoardError::InvariantViolation(format!(
                    "dangling parent {parent}"
                )));
            }
            path.push(parent.clone());
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// True when `id` lives somewhere in the subtree rooted at `ancestor`.
    pub fn is_descendant(&self, id: &str, ancestor: &str) -> bool {
        let mut current = match self.canvases.get(id) {
            Some(node) => node.parent.as_deref(),
            None => return false,
        };
        let mut hops = 0;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.canvases.len() {
                return false;
            }
            current = self.canvases.get(p).and_then(|n| n.parent.as_deref());
        }
        false
    }

    /// Check the forest invariant: each id in exactly one of the root list
    /// or one parent's children, all edges resolvable, no cycles.
    pub fn validate(&self) -> Result<()> {
        for (id, node) in &self.canvases {
            let in_roots = self.root_canvases.iter().filter(|r| *r == id).count();
            let in_children: usize = self
                .canvases
                .values()
                .map(|n| n.children.iter().filter(|c| *c == id).count())
                .sum();
            if in_roots + in_children != 1 {
                return Err(BoardError::InvariantViolation(format!(
                    "canvas {id} appears {} times in the forest",
                    in_roots + in_children
                )));
            }
            match (&node.parent, in_roots) {
                (None, 1) | (Some(_), 0) => {}
                _ => {
                    return Err(BoardError::InvariantViolation(format!(
                        "canvas {id} parent edge disagrees with its placement"
                    )))
                }
            }
            if let Some(parent) = &node.parent {
                if !self.canvases.contains_key(parent) {
                    return Err(BoardError::InvariantViolation(format!(
                        "canvas {id} has dangling parent {parent}"
                    )));
                }
            }
            // path_to walks the parent chain and detects cycles.
            self.path_to(id)?;
        }
        Ok(())
    }
}
