//! Node classification and the equality policy.
//!
//! Each pair of nodes taken from the same position of the static and dynamic
//! trees is compared by kind. Pairs proven identical get a literal recorded
//! against their AST slot; containers whose children can be correlated with
//! the AST push a frame so their children are compared next. A mismatch is
//! never an error: the pair simply stays dynamic.

use std::sync::Arc;

use futures::future::try_join;
use futures::FutureExt;
use vize_maquette::{
    end_tag, AsyncResolution, ComponentDef, Instance, Pass, RenderEngine, RenderFunction,
    TagContext, VNodeData, VNodeKind, VNodeRef,
};
use vize_relief::rewrite::{array_elements, child_array_of, is_node_construct, is_placeholder, single_return};
use vize_relief::AstId;

use crate::context::{Continuation, Outcome, PatchContext, Pending, Resolved, Suspension};
use crate::errors::OptimizeError;
use crate::frame::{ActiveInstances, ComponentFrame, FrameChildren, PatchFrame, PatchPair};

/// A component whose instances exist but have not rendered yet
#[derive(Debug)]
pub(crate) struct PendingComponent {
    slot: AstId,
    function: AstId,
    def: Arc<ComponentDef>,
    static_instance: Arc<Instance>,
    dynamic_instance: Arc<Instance>,
    original: RenderFunction,
    /// Contexts of the component's root element on each side.
    static_ctx: TagContext,
    dynamic_ctx: TagContext,
}

impl<E: RenderEngine + ?Sized> PatchContext<'_, E> {
    pub(crate) fn classify(&mut self, pair: PatchPair) -> Result<Outcome, OptimizeError> {
        let static_node = Arc::clone(&pair.static_node);
        let dynamic_node = Arc::clone(&pair.dynamic_node);
        match (&static_node.kind, &dynamic_node.kind) {
            (VNodeKind::Text { .. }, VNodeKind::Text { .. }) => {
                self.classify_text(&pair);
                Ok(Outcome::Continue)
            }
            (VNodeKind::Comment { text: a }, VNodeKind::Comment { text: b }) => {
                if a == b && self.options.fold_comments {
                    self.annotations.mark_static(pair.slot, format!("<!--{}-->", a));
                }
                Ok(Outcome::Continue)
            }
            (
                VNodeKind::StringFragment { open: so, close: sc },
                VNodeKind::StringFragment { open: dop, close: dc },
            ) => {
                self.classify_string_fragment(&pair, (so.as_str(), sc.as_str()), (dop.as_str(), dc.as_str()));
                Ok(Outcome::Continue)
            }
            (VNodeKind::Element { tag: st, data: sd }, VNodeKind::Element { tag: dt, data: dd }) => {
                if st != dt {
                    tracing::debug!(static_tag = %st, dynamic_tag = %dt, "element tags differ");
                    return Ok(Outcome::Continue);
                }
                self.classify_element(&pair, st, sd, dd);
                Ok(Outcome::Continue)
            }
            (VNodeKind::Component { def: s, data: sd }, VNodeKind::Component { def: d, data: dd }) => {
                self.classify_component(&pair, s, sd, d, dd)
            }
            (
                VNodeKind::AsyncComponent { factory: s, data: sd },
                VNodeKind::AsyncComponent { factory: d, data: dd },
            ) => {
                if let (Some(static_side), Some(dynamic_side)) = (s.resolution(), d.resolution()) {
                    return self.classify_resolved(pair, sd.clone(), dd.clone(), static_side, dynamic_side);
                }
                let both = try_join(s.resolve(), d.resolve());
                let future = async move {
                    let (static_side, dynamic_side) = both.await?;
                    Ok::<_, OptimizeError>(Resolved::Async {
                        static_side,
                        dynamic_side,
                    })
                }
                .boxed_local();
                Ok(Outcome::Suspend(Suspension {
                    future,
                    continuation: Continuation(Pending::Async {
                        pair,
                        static_data: sd.clone(),
                        dynamic_data: dd.clone(),
                    }),
                }))
            }
            _ => {
                tracing::debug!(
                    static_kind = ?static_node.node_kind(),
                    dynamic_kind = ?dynamic_node.node_kind(),
                    "node kinds differ"
                );
                Ok(Outcome::Continue)
            }
        }
    }

    fn classify_text(&mut self, pair: &PatchPair) {
        let (Some(a), Some(b)) = (pair.static_node.text_markup(), pair.dynamic_node.text_markup())
        else {
            return;
        };
        if a == b {
            self.annotations.mark_static(pair.slot, a.into_owned());
        }
    }

    fn classify_string_fragment(
        &mut self,
        pair: &PatchPair,
        (static_open, static_close): (&str, &str),
        (dynamic_open, dynamic_close): (&str, &str),
    ) {
        let static_children = &pair.static_node.children;
        let dynamic_children = &pair.dynamic_node.children;
        if static_children.is_empty() && dynamic_children.is_empty() {
            let a = format!("{}{}", static_open, static_close);
            let b = format!("{}{}", dynamic_open, dynamic_close);
            if a.trim() == b.trim() {
                self.annotations.mark_static(pair.slot, a);
            }
            return;
        }
        if static_children.len() != dynamic_children.len()
            || static_open != dynamic_open
            || static_close != dynamic_close
        {
            tracing::debug!(slot = ?pair.slot, "string fragments differ");
            return;
        }
        self.annotations.set_literal(pair.slot, static_open);
        let children = self.correlate(pair.slot, static_children, dynamic_children);
        self.push_frame(PatchFrame::Element {
            slot: pair.slot,
            close: static_close.to_owned(),
            children,
        });
    }

    fn classify_element(&mut self, pair: &PatchPair, tag: &str, sd: &VNodeData, dd: &VNodeData) {
        let registry = self.engine.registry();
        let static_start = registry.render_start_tag(tag, sd, &pair.static_ctx);
        let dynamic_start = registry.render_start_tag(tag, dd, &pair.dynamic_ctx);
        let same_start = static_start == dynamic_start;

        let Some(close) = end_tag(tag) else {
            if same_start {
                self.annotations.mark_static(pair.slot, static_start);
            }
            return;
        };

        let static_content = sd.content_override();
        let dynamic_content = dd.content_override();
        if static_content.is_some() || dynamic_content.is_some() {
            if same_start && static_content == dynamic_content {
                let content = static_content.unwrap_or_default();
                self.annotations
                    .mark_static(pair.slot, format!("{}{}{}", static_start, content, close));
            }
            return;
        }

        let static_children = &pair.static_node.children;
        let dynamic_children = &pair.dynamic_node.children;
        if static_children.is_empty() && dynamic_children.is_empty() {
            if same_start {
                self.annotations
                    .mark_static(pair.slot, format!("{}{}", static_start, close));
            }
            return;
        }
        if static_children.len() != dynamic_children.len() {
            tracing::debug!(
                tag,
                static_count = static_children.len(),
                dynamic_count = dynamic_children.len(),
                "child counts differ"
            );
            return;
        }

        // Children are compared even when the start tags differ. The element
        // itself then carries no literal and is never folded, but static
        // subtrees below it still are.
        if same_start {
            self.annotations.set_literal(pair.slot, static_start);
        }
        let children = self.correlate(pair.slot, static_children, dynamic_children);
        self.push_frame(PatchFrame::Element {
            slot: pair.slot,
            close,
            children,
        });
    }

    /// AST slots for the children of the node produced by `slot`.
    ///
    /// Children are correlated positionally with the elements of the node's
    /// child array literal. When that is impossible the node is marked
    /// unmatched and its children get detached placeholders, so they are
    /// still compared but never rewritten in place.
    fn correlate(
        &mut self,
        slot: AstId,
        static_children: &[VNodeRef],
        dynamic_children: &[VNodeRef],
    ) -> FrameChildren {
        let count = static_children.len();
        let array = child_array_of(&self.ast, slot);
        let slots = array
            .and_then(|array| array_elements(&self.ast, array))
            .filter(|elements| {
                elements.len() == count && elements.iter().all(|&e| is_node_construct(&self.ast, e))
            })
            .map(<[AstId]>::to_vec);

        let slots = match slots {
            Some(slots) => slots,
            None => {
                if is_placeholder(&self.ast, slot) {
                    tracing::trace!(?slot, "children of an uncorrelated node");
                } else if array.is_none() {
                    tracing::warn!(?slot, "no child array literal to correlate with");
                } else {
                    tracing::debug!(?slot, count, "child array does not match rendered children");
                }
                self.annotations.mark_unmatched(slot);
                (0..count).map(|_| self.ast.placeholder()).collect()
            }
        };

        let (static_ctx, dynamic_ctx) = self.active.element_contexts();
        let pairs = static_children
            .iter()
            .zip(dynamic_children)
            .zip(slots)
            .map(|((s, d), slot)| PatchPair {
                static_node: Arc::clone(s),
                dynamic_node: Arc::clone(d),
                slot,
                static_ctx: static_ctx.clone(),
                dynamic_ctx: dynamic_ctx.clone(),
            })
            .collect();
        FrameChildren::new(pairs)
    }

    fn classify_component(
        &mut self,
        pair: &PatchPair,
        static_def: &Arc<ComponentDef>,
        static_data: &VNodeData,
        dynamic_def: &Arc<ComponentDef>,
        dynamic_data: &VNodeData,
    ) -> Result<Outcome, OptimizeError> {
        if static_def.name != dynamic_def.name {
            tracing::debug!(
                static_component = %static_def.name,
                dynamic_component = %dynamic_def.name,
                "component names differ"
            );
            return Ok(Outcome::Continue);
        }

        let static_instance = self.engine.instantiate(
            static_def,
            static_data,
            self.active.static_instance.as_ref(),
            Pass::Static,
        );
        let dynamic_instance = self.engine.instantiate(
            dynamic_def,
            dynamic_data,
            self.active.dynamic_instance.as_ref(),
            Pass::Dynamic,
        );
        let original = self.engine.ensure_render(&static_instance)?;
        self.engine.ensure_render(&dynamic_instance)?;

        let function = self.ast.graft(original.ast(), original.root());
        self.annotations.set_render_ast(pair.slot, function);
        tracing::debug!(component = %static_def.name, "entering component");

        let pending = PendingComponent {
            slot: pair.slot,
            function,
            def: Arc::clone(static_def),
            static_ctx: pair.static_ctx.nest(static_data, static_def.scope_id.as_deref()),
            dynamic_ctx: pair
                .dynamic_ctx
                .nest(dynamic_data, dynamic_def.scope_id.as_deref()),
            static_instance,
            dynamic_instance,
            original,
        };

        if self.engine.has_prefetch(&pending.static_instance)
            || self.engine.has_prefetch(&pending.dynamic_instance)
        {
            let both = try_join(
                self.engine.prefetch(&pending.static_instance),
                self.engine.prefetch(&pending.dynamic_instance),
            );
            let future = async move {
                both.await?;
                Ok::<_, OptimizeError>(Resolved::Prefetched)
            }
            .boxed_local();
            return Ok(Outcome::Suspend(Suspension {
                future,
                continuation: Continuation(Pending::Component(pending)),
            }));
        }
        self.render_component(pending)
    }

    /// Render both instances and descend into their roots.
    pub(crate) fn render_component(&mut self, pending: PendingComponent) -> Result<Outcome, OptimizeError> {
        let static_root = self.engine.render(&pending.static_instance)?;
        let dynamic_root = self.engine.render(&pending.dynamic_instance)?;

        let root_slot = match single_return(&self.ast, pending.function) {
            Some(root) => root,
            None => {
                tracing::debug!(component = %pending.def.name, "render function has no single node return");
                self.annotations.mark_unmatched(pending.function);
                self.ast.placeholder()
            }
        };

        let previous = std::mem::replace(
            &mut self.active,
            ActiveInstances {
                static_instance: Some(Arc::clone(&pending.static_instance)),
                dynamic_instance: Some(pending.dynamic_instance),
            },
        );
        self.tree.open(&pending.def.name, pending.def.styles.clone());

        let root = PatchPair {
            static_node: static_root,
            dynamic_node: dynamic_root,
            slot: root_slot,
            static_ctx: pending.static_ctx,
            dynamic_ctx: pending.dynamic_ctx,
        };
        self.push_frame(PatchFrame::Component(ComponentFrame {
            slot: pending.slot,
            root_slot,
            def: pending.def,
            static_instance: pending.static_instance,
            original: pending.original,
            previous,
            children: FrameChildren::new(vec![root]),
        }));
        Ok(Outcome::Continue)
    }

    /// Classify an async component pair once both factories have resolved.
    pub(crate) fn classify_resolved(
        &mut self,
        pair: PatchPair,
        static_data: VNodeData,
        dynamic_data: VNodeData,
        static_side: AsyncResolution,
        dynamic_side: AsyncResolution,
    ) -> Result<Outcome, OptimizeError> {
        match (static_side, dynamic_side) {
            (AsyncResolution::Component(s), AsyncResolution::Component(d)) => {
                self.classify_component(&pair, &s, &static_data, &d, &dynamic_data)
            }
            (AsyncResolution::Node(static_node), AsyncResolution::Node(dynamic_node)) => {
                self.classify(PatchPair {
                    static_node,
                    dynamic_node,
                    ..pair
                })
            }
            (AsyncResolution::Nodes(s), AsyncResolution::Nodes(d)) => {
                if s.len() != d.len() {
                    tracing::debug!(
                        static_count = s.len(),
                        dynamic_count = d.len(),
                        "async node lists differ in length"
                    );
                    return Ok(Outcome::Continue);
                }
                let pairs = s
                    .into_iter()
                    .zip(d)
                    .map(|(static_node, dynamic_node)| PatchPair {
                        static_node,
                        dynamic_node,
                        slot: self.ast.placeholder(),
                        static_ctx: pair.static_ctx.clone(),
                        dynamic_ctx: pair.dynamic_ctx.clone(),
                    })
                    .collect();
                self.push_frame(PatchFrame::Fragment {
                    slot: pair.slot,
                    children: FrameChildren::new(pairs),
                });
                Ok(Outcome::Continue)
            }
            _ => {
                tracing::debug!(slot = ?pair.slot, "async components resolved asymmetrically");
                self.annotations.mark_static(pair.slot, "<!---->");
                Ok(Outcome::Continue)
            }
        }
    }
}
