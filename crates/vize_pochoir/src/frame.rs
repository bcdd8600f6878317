//! Traversal frames.
//!
//! One frame is open per container whose children are being compared. A
//! frame owns the node pairs it still has to visit together with the AST
//! slot each pair was correlated to.

use std::sync::Arc;

use vize_maquette::{ComponentDef, Instance, RenderFunction, TagContext, VNodeRef};
use vize_relief::AstId;

/// Two nodes at the same position of the static and dynamic trees
#[derive(Debug, Clone)]
pub struct PatchPair {
    pub static_node: VNodeRef,
    pub dynamic_node: VNodeRef,
    /// AST expression believed to produce the static node.
    pub slot: AstId,
    pub static_ctx: TagContext,
    pub dynamic_ctx: TagContext,
}

/// Children of a frame and the position of the next one to visit
#[derive(Debug, Default)]
pub struct FrameChildren {
    pairs: Vec<PatchPair>,
    cursor: usize,
}

impl FrameChildren {
    pub fn new(pairs: Vec<PatchPair>) -> Self {
        Self { pairs, cursor: 0 }
    }

    /// Take the next unvisited pair.
    pub fn next_pair(&mut self) -> Option<PatchPair> {
        let pair = self.pairs.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(pair)
    }

    pub fn slots(&self) -> Vec<AstId> {
        self.pairs.iter().map(|pair| pair.slot).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.pairs.len()
    }
}

/// Component instances whose render output is currently being compared
#[derive(Debug, Clone, Default)]
pub struct ActiveInstances {
    pub static_instance: Option<Arc<Instance>>,
    pub dynamic_instance: Option<Arc<Instance>>,
}

impl ActiveInstances {
    fn scope_id(instance: &Option<Arc<Instance>>) -> Option<&str> {
        instance.as_ref().and_then(|i| i.def().scope_id.as_deref())
    }

    /// Tag contexts for elements rendered directly by the active components.
    pub fn element_contexts(&self) -> (TagContext, TagContext) {
        (
            TagContext::owned_by(Self::scope_id(&self.static_instance)),
            TagContext::owned_by(Self::scope_id(&self.dynamic_instance)),
        )
    }
}

/// An open component boundary
#[derive(Debug)]
pub struct ComponentFrame {
    /// Expression in the parent render function that created the component.
    /// Its grafted render function is linked through
    /// [`Annotations::render_ast`](crate::Annotations::render_ast).
    pub slot: AstId,
    /// The expression returning the component's root node.
    pub root_slot: AstId,
    pub def: Arc<ComponentDef>,
    pub static_instance: Arc<Instance>,
    /// Render function the component would use without optimization.
    pub original: RenderFunction,
    pub previous: ActiveInstances,
    pub children: FrameChildren,
}

#[derive(Debug)]
pub enum PatchFrame {
    /// An element or string fragment. `close` is appended after the children
    /// when the level folds.
    Element {
        slot: AstId,
        close: String,
        children: FrameChildren,
    },
    /// Nodes produced together by one expression, e.g. an async component
    /// resolving to several nodes.
    Fragment { slot: AstId, children: FrameChildren },
    Component(ComponentFrame),
}

impl PatchFrame {
    pub fn children_mut(&mut self) -> &mut FrameChildren {
        match self {
            Self::Element { children, .. } | Self::Fragment { children, .. } => children,
            Self::Component(frame) => &mut frame.children,
        }
    }

    pub fn slot(&self) -> AstId {
        match self {
            Self::Element { slot, .. } | Self::Fragment { slot, .. } => *slot,
            Self::Component(frame) => frame.slot,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Element { .. } => "element",
            Self::Fragment { .. } => "fragment",
            Self::Component(_) => "component",
        }
    }
}
