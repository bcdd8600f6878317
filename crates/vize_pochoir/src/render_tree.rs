//! The optimizer's output and its per-request consumer.
//!
//! A [`RenderTree`] mirrors component nesting. Each entry carries the render
//! function its component should use from now on. Entries for components
//! that folded completely are removed once their parent no longer calls
//! them, and their styles move up to the parent.

use vize_carton::CompactString;
use vize_maquette::{
    render_to_html, ComponentDef, RenderEngine, RenderError, RenderFunction, RenderPlan, Styles,
    VNodeData, VNodeRef,
};
use vize_relief::AstId;

/// Render function and style metadata for one component slot
#[derive(Debug, Clone)]
pub struct RenderTree {
    pub component: CompactString,
    pub render: RenderFunction,
    /// The render function returns a single literal.
    pub is_static: bool,
    pub styles: Styles,
    /// Child slots, in the order the render function addresses them.
    pub children: Vec<RenderTree>,
}

impl RenderTree {
    /// Number of entries in the tree.
    pub fn entry_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(entry) = stack.pop() {
            count += 1;
            stack.extend(entry.children.iter());
        }
        count
    }

    /// Styles of every entry in the tree.
    pub fn all_styles(&self) -> Styles {
        let mut styles = Styles::default();
        let mut stack = vec![self];
        while let Some(entry) = stack.pop() {
            for (id, css) in &entry.styles {
                styles.insert(id.clone(), css.clone());
            }
            stack.extend(entry.children.iter());
        }
        styles
    }

    pub fn plan(&self) -> RenderTreePlan<'_> {
        RenderTreePlan::new(self)
    }

    /// Render `root` using the functions recorded in this tree.
    pub async fn render_html<E>(&self, engine: &E, root: VNodeRef) -> Result<String, RenderError>
    where
        E: RenderEngine + ?Sized,
    {
        render_to_html(engine, root, &mut self.plan()).await
    }
}

impl Drop for RenderTree {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut entry) = pending.pop() {
            pending.append(&mut entry.children);
        }
    }
}

/// Serves a [`RenderTree`] to the serializer.
///
/// The root entry matches the first component entered. Below it, a
/// component matches the child entry named by the `treeSlot` marker in its
/// node data. Components without a match, and everything below them, keep
/// their own render function.
#[derive(Debug)]
pub struct RenderTreePlan<'t> {
    root: &'t RenderTree,
    stack: Vec<Option<&'t RenderTree>>,
}

impl<'t> RenderTreePlan<'t> {
    pub fn new(root: &'t RenderTree) -> Self {
        Self {
            root,
            stack: Vec::new(),
        }
    }
}

impl RenderPlan for RenderTreePlan<'_> {
    fn enter(&mut self, def: &ComponentDef, data: &VNodeData) -> Option<RenderFunction> {
        let entry = match self.stack.last() {
            None => Some(self.root),
            Some(None) => None,
            Some(Some(parent)) => data.tree_slot.and_then(|i| parent.children.get(i)),
        }
        .filter(|entry| entry.component == def.name);
        self.stack.push(entry);
        entry.map(|entry| entry.render.clone())
    }

    fn leave(&mut self) {
        self.stack.pop();
    }
}

struct OpenEntry {
    component: CompactString,
    styles: Styles,
    children: Vec<(AstId, RenderTree)>,
}

/// Builds the [`RenderTree`] while component frames open and close.
#[derive(Default)]
pub(crate) struct TreeBuilder {
    open: Vec<OpenEntry>,
    root: Option<RenderTree>,
}

impl TreeBuilder {
    pub fn open(&mut self, component: &str, styles: Styles) {
        self.open.push(OpenEntry {
            component: component.into(),
            styles,
            children: Vec::new(),
        });
    }

    /// Slots of the closed children of the innermost open entry.
    pub fn child_slots(&self) -> Vec<AstId> {
        self.open
            .last()
            .map(|entry| entry.children.iter().map(|(slot, _)| *slot).collect())
            .unwrap_or_default()
    }

    /// Close the innermost entry and attach it to its parent under `slot`.
    ///
    /// With `retain`, children whose flag is `false` are removed and their
    /// styles, including those of their own descendants, move into the
    /// closed entry.
    pub fn close(
        &mut self,
        slot: AstId,
        render: RenderFunction,
        is_static: bool,
        retain: Option<&[bool]>,
    ) {
        let Some(entry) = self.open.pop() else {
            return;
        };
        let mut styles = entry.styles;
        let mut children = Vec::with_capacity(entry.children.len());
        for (i, (_, child)) in entry.children.into_iter().enumerate() {
            if retain.map_or(true, |flags| flags.get(i).copied().unwrap_or(true)) {
                children.push(child);
            } else {
                tracing::trace!(component = %child.component, "pruned static slot");
                for (id, css) in child.all_styles() {
                    styles.entry(id).or_insert(css);
                }
            }
        }
        let tree = RenderTree {
            component: entry.component,
            render,
            is_static,
            styles,
            children,
        };
        match self.open.last_mut() {
            Some(parent) => parent.children.push((slot, tree)),
            None => {
                if self.root.is_none() {
                    self.root = Some(tree);
                }
            }
        }
    }

    pub fn finish(self) -> Option<RenderTree> {
        self.root
    }
}
