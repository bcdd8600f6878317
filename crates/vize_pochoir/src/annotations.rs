//! Optimizer annotations, kept beside the AST rather than inside it.

use vize_carton::{bitflags, FxHashMap};
use vize_relief::AstId;

bitflags! {
    /// Facts established about an AST node
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnnotationFlags: u8 {
        /// The node renders the same text in every request.
        const STATIC = 1 << 0;
        /// The node's children could not be correlated with the rendered tree.
        const UNMATCHED = 1 << 1;
    }
}

/// Everything recorded for one AST node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Resolved literal text. For a static node this is its whole output;
    /// for an element being folded it is the start tag.
    pub ssr_string: Option<String>,
    pub flags: AnnotationFlags,
    /// Render function attached at a component boundary.
    pub render_ast: Option<AstId>,
}

/// Side table mapping AST node ids to their annotations
#[derive(Debug, Default)]
pub struct Annotations {
    table: FxHashMap<AstId, Annotation>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: AstId) -> Option<&Annotation> {
        self.table.get(&id)
    }

    pub fn entry(&mut self, id: AstId) -> &mut Annotation {
        self.table.entry(id).or_default()
    }

    pub fn ssr_string(&self, id: AstId) -> Option<&str> {
        self.get(id).and_then(|a| a.ssr_string.as_deref())
    }

    pub fn is_static(&self, id: AstId) -> bool {
        self.get(id)
            .is_some_and(|a| a.flags.contains(AnnotationFlags::STATIC))
    }

    pub fn is_unmatched(&self, id: AstId) -> bool {
        self.get(id)
            .is_some_and(|a| a.flags.contains(AnnotationFlags::UNMATCHED))
    }

    /// The literal of a node proven static.
    pub fn static_literal(&self, id: AstId) -> Option<&str> {
        if self.is_static(id) {
            self.ssr_string(id)
        } else {
            None
        }
    }

    pub fn mark_static(&mut self, id: AstId, text: impl Into<String>) {
        let annotation = self.entry(id);
        annotation.ssr_string = Some(text.into());
        annotation.flags.insert(AnnotationFlags::STATIC);
    }

    pub fn mark_unmatched(&mut self, id: AstId) {
        self.entry(id).flags.insert(AnnotationFlags::UNMATCHED);
    }

    /// Record the literal that opens a node without claiming the node is static.
    pub fn set_literal(&mut self, id: AstId, text: impl Into<String>) {
        self.entry(id).ssr_string = Some(text.into());
    }

    pub fn render_ast(&self, id: AstId) -> Option<AstId> {
        self.get(id).and_then(|a| a.render_ast)
    }

    pub fn set_render_ast(&mut self, id: AstId, function: AstId) {
        self.entry(id).render_ast = Some(function);
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
