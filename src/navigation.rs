use crate::document::Canvas;
use crate::error::Result;
use crate::history::History;
use crate::persistence::{AutoSaver, Store};
use crate::scene::Scene;
use crate::selection::Selection;
use crate::tree::TreeData;
use crate::viewport::Viewport;

/// One entry of the breadcrumb path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub id: String,
    pub name: String,
}

/// Active-canvas tracking plus back/forward history.
///
/// Models the browser integration: every navigation pushes an entry,
/// back/forward pops re-enter the switch protocol without pushing.
#[derive(Debug, Clone)]
pub struct Navigator {
    active: String,
    back: Vec<String>,
    forward: Vec<String>,
}

impl Navigator {
    pub fn new(active: impl Into<String>) -> Self {
        Self {
            active: active.into(),
            back: Vec::new(),
            forward: Vec::new(),
        }
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Ordered root -> active path for the breadcrumb bar. Falls back to a
    /// single entry when the active canvas is not in the tree.
    pub fn breadcrumbs(&self, tree: &TreeData) -> Vec<Breadcrumb> {
        match tree.path_to(&self.active) {
            Ok(path) => path
                .into_iter()
                .map(|id| {
                    let name = tree
                        .name_of(&id)
                        .map(str::to_owned)
                        .unwrap_or_else(|| id.clone());
                    Breadcrumb { id, name }
                })
                .collect(),
            Err(_) => vec![Breadcrumb {
                id: self.active.clone(),
                name: self.active.clone(),
            }],
        }
    }
}

/// Services touched by a canvas switch, borrowed together so navigation
/// entry points stay readable.
pub struct NavigationCtx<'a> {
    pub scene: &'a mut Scene,
    pub doc: &'a mut Canvas,
    pub selection: &'a mut Selection,
    pub history: &'a mut History,
    pub viewport: &'a mut Viewport,
    pub autosaver: &'a mut AutoSaver,
    pub store: &'a dyn Store,
}

/// Navigate to `target`, pushing the current canvas onto the back stack.
/// Used by folder double-clicks, breadcrumb clicks, and the tree sidebar.
pub fn navigate_to(nav: &mut Navigator, ctx: &mut NavigationCtx<'_>, target: &str) -> Result<()> {
    if target == nav.active {
        return Ok(());
    }
    let previous = nav.active.clone();
    enter(nav, ctx, target)?;
    nav.back.push(previous);
    nav.forward.clear();
    Ok(())
}

/// History-pop navigation: step back without pushing a new entry.
pub fn go_back(nav: &mut Navigator, ctx: &mut NavigationCtx<'_>) -> Result<bool> {
    let Some(target) = nav.back.pop() else {
        return Ok(false);
    };
    let previous = nav.active.clone();
    match enter(nav, ctx, &target) {
        Ok(()) => {
            nav.forward.push(previous);
            Ok(true)
        }
        Err(e) => {
            nav.back.push(target);
            Err(e)
        }
    }
}

/// History-pop navigation in the other direction.
pub fn go_forward(nav: &mut Navigator, ctx: &mut NavigationCtx<'_>) -> Result<bool> {
    let Some(target) = nav.forward.pop() else {
        return Ok(false);
    };
    let previous = nav.active.clone();
    match enter(nav, ctx, &target) {
        Ok(()) => {
            nav.back.push(previous);
            Ok(true)
        }
        Err(e) => {
            nav.forward.push(target);
            Err(e)
        }
    }
}

/// The switch protocol: flush pending autosave, clear history, load the
/// target, reset the viewport to its stored viewbox. Saves and loads stay
/// ordered because the flush completes before the load starts.
fn enter(nav: &mut Navigator, ctx: &mut NavigationCtx<'_>, target: &str) -> Result<()> {
    if ctx.autosaver.is_dirty() {
        ctx.doc.view_box = ctx.viewport.view_box();
        let outgoing = ctx.doc.with_elements(ctx.scene.clone_elements());
        if let Some(crate::persistence::AutosaveOutcome::Failed { error, .. }) =
            ctx.autosaver.flush(ctx.store, &outgoing)
        {
            log::warn!("flush before navigation failed: {error}");
        }
    }

    ctx.history.clear();

    let canvas = ctx.store.load_canvas(target)?;
    ctx.viewport.reset(canvas.view_box);
    ctx.scene.replace_elements(canvas.elements.clone());
    *ctx.doc = canvas.with_elements(Vec::new());
    ctx.selection.clear();

    nav.active = target.to_owned();
    log::info!("switched to canvas {target}");
    Ok(())
}
