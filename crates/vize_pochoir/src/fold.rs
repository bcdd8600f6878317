//! The static-folding engine.
//!
//! Runs when a frame's children have all been classified. Adjacent static
//! children are merged into one literal, fully static levels collapse into a
//! single literal-text construct, and closing component frames decide which
//! render function their slot in the [`RenderTree`](crate::RenderTree) gets.

use vize_maquette::RenderEngine;
use vize_relief::rewrite::{
    child_array_of, fold_plus, helper_of, literal_text_node, replace_with_fragment,
    replace_with_literal_text, replace_with_text, set_array_elements, set_data_property,
    text_construct_argument,
};
use vize_relief::{AstId, RenderHelper};

use crate::annotations::Annotations;
use crate::context::PatchContext;
use crate::errors::OptimizeError;
use crate::frame::{ComponentFrame, PatchFrame};

/// One run of reduced children
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduced {
    /// Adjacent static children, concatenated.
    Literal(String),
    /// A child that has to be rendered.
    Dynamic(AstId),
}

/// Merge adjacent static children into literal runs, left to right.
pub fn reduce_children(annotations: &Annotations, slots: &[AstId]) -> Vec<Reduced> {
    let mut reduced = Vec::with_capacity(slots.len());
    for &slot in slots {
        match annotations.static_literal(slot) {
            Some(text) => match reduced.last_mut() {
                Some(Reduced::Literal(run)) => run.push_str(text),
                _ => reduced.push(Reduced::Literal(text.to_owned())),
            },
            None => reduced.push(Reduced::Dynamic(slot)),
        }
    }
    reduced
}

/// The children's combined literal when they are all static.
pub fn child_static_literal(reduced: &[Reduced]) -> Option<&str> {
    match reduced {
        [] => Some(""),
        [Reduced::Literal(text)] => Some(text),
        _ => None,
    }
}

impl<E: RenderEngine + ?Sized> PatchContext<'_, E> {
    pub(crate) fn finish_frame(&mut self, frame: PatchFrame) -> Result<(), OptimizeError> {
        match frame {
            PatchFrame::Element {
                slot,
                close,
                children,
            } => {
                self.fold_level(slot, &close, &children.slots());
                Ok(())
            }
            PatchFrame::Fragment { slot, children } => {
                self.fold_fragment(slot, &children.slots());
                Ok(())
            }
            PatchFrame::Component(frame) => self.fold_component(frame),
        }
    }

    fn fold_to_literal(&mut self, slot: AstId, text: String) {
        replace_with_literal_text(&mut self.ast, slot, &text);
        self.annotations.mark_static(slot, text);
    }

    fn materialize(&mut self, reduced: Vec<Reduced>) -> Vec<AstId> {
        reduced
            .into_iter()
            .filter_map(|run| match run {
                Reduced::Literal(text) if text.is_empty() => None,
                Reduced::Literal(text) => Some(literal_text_node(&mut self.ast, &text)),
                Reduced::Dynamic(id) => Some(id),
            })
            .collect()
    }

    /// Fold one element level whose children are `slots`.
    pub(crate) fn fold_level(&mut self, slot: AstId, close: &str, slots: &[AstId]) {
        if self.annotations.is_static(slot) {
            return;
        }
        let reduced = reduce_children(&self.annotations, slots);
        let child_literal = child_static_literal(&reduced).map(str::to_owned);
        let node_literal = self.annotations.ssr_string(slot).map(str::to_owned);

        if self.annotations.is_unmatched(slot) {
            if let (Some(open), Some(child)) = (node_literal, child_literal) {
                self.fold_to_literal(slot, format!("{}{}{}", open, child, close));
            }
            return;
        }

        match (node_literal, child_literal) {
            (Some(open), Some(child)) => {
                self.fold_to_literal(slot, format!("{}{}{}", open, child, close));
            }
            (None, Some(child)) => {
                if let Some(array) = child_array_of(&self.ast, slot) {
                    let elements = if child.is_empty() {
                        Vec::new()
                    } else {
                        vec![literal_text_node(&mut self.ast, &child)]
                    };
                    set_array_elements(&mut self.ast, array, elements);
                }
            }
            (Some(open), None) => {
                let elements = self.materialize(reduced);
                let single = match elements.as_slice() {
                    [only] => text_construct_argument(&self.ast, *only),
                    _ => None,
                };
                match single {
                    Some(argument) => {
                        let open = self.ast.str(open);
                        let close = self.ast.str(close);
                        let left = fold_plus(&mut self.ast, open, argument);
                        let joined = fold_plus(&mut self.ast, left, close);
                        replace_with_text(&mut self.ast, slot, joined);
                    }
                    None => replace_with_fragment(&mut self.ast, slot, &open, close, elements),
                }
            }
            (None, None) => {
                if let Some(array) = child_array_of(&self.ast, slot) {
                    let elements = self.materialize(reduced);
                    set_array_elements(&mut self.ast, array, elements);
                }
            }
        }
    }

    fn fold_fragment(&mut self, slot: AstId, slots: &[AstId]) {
        if self.annotations.is_static(slot) {
            return;
        }
        let reduced = reduce_children(&self.annotations, slots);
        if let Some(child) = child_static_literal(&reduced).map(str::to_owned) {
            self.fold_to_literal(slot, child);
        }
    }

    fn fold_component(&mut self, frame: ComponentFrame) -> Result<(), OptimizeError> {
        let ComponentFrame {
            slot,
            root_slot,
            def,
            static_instance,
            original,
            previous,
            children: _,
        } = frame;
        self.active = previous;
        let hoist = self.options.hoist_styles;
        let child_slots = self.tree.child_slots();

        if let Some(text) = self.annotations.static_literal(root_slot).map(str::to_owned) {
            tracing::debug!(component = %def.name, "component folded to a literal");
            let render = self.synth.literal(&text)?;
            self.fold_to_literal(slot, text);
            let retain = vec![false; child_slots.len()];
            self.tree
                .close(slot, render, true, hoist.then_some(retain.as_slice()));
            return Ok(());
        }

        let Some(function) = self.annotations.render_ast(slot) else {
            tracing::warn!(component = %def.name, ?slot, "component slot has no render function");
            self.tree.close(slot, original, false, None);
            return Ok(());
        };
        if self.annotations.is_unmatched(function) {
            tracing::debug!(component = %def.name, "keeping original render function");
            self.tree.close(slot, original, false, None);
            return Ok(());
        }

        let reachable = self.ast.reachable(function);
        let survivors: Vec<bool> = child_slots
            .iter()
            .map(|child| {
                reachable.contains(child)
                    && helper_of(&self.ast, *child) == Some(RenderHelper::CreateElement)
            })
            .collect();
        let mut next = 0;
        for (i, (&child, &alive)) in child_slots.iter().zip(&survivors).enumerate() {
            if !alive {
                continue;
            }
            let index = if hoist { next } else { i };
            next += 1;
            let value = self.ast.num(index as f64);
            if !set_data_property(&mut self.ast, child, "treeSlot", value) {
                tracing::warn!(component = %def.name, ?child, "cannot mark child component slot");
            }
        }

        match self
            .synth
            .synthesize(self.engine, &self.ast, function, &static_instance)
        {
            Some(render) => {
                self.tree
                    .close(slot, render, false, hoist.then_some(survivors.as_slice()));
            }
            None => self.tree.close(slot, original, false, None),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vize_maquette::{Maquette, VNode};
    use vize_relief::{generate_expression, AstKind};

    use crate::options::OptimizeOptions;

    #[test]
    fn test_reduce_merges_adjacent_literals() {
        let mut annotations = Annotations::new();
        let [a, b, c, d] = [0, 1, 2, 3].map(AstId::new);
        annotations.mark_static(a, "<b>");
        annotations.mark_static(b, "x</b>");
        annotations.mark_static(d, "!");

        let reduced = reduce_children(&annotations, &[a, b, c, d]);
        assert_eq!(
            reduced,
            vec![
                Reduced::Literal("<b>x</b>".into()),
                Reduced::Dynamic(c),
                Reduced::Literal("!".into()),
            ]
        );
        assert_eq!(child_static_literal(&reduced), None);
        assert_eq!(
            child_static_literal(&reduce_children(&annotations, &[a, b])),
            Some("<b>x</b>")
        );
        assert_eq!(child_static_literal(&[]), Some(""));
    }

    /// `_c("p", [_v("a"), _v("b")])` with both texts already folded.
    fn static_paragraph(ctx: &mut PatchContext<'_, Maquette>) -> (AstId, [AstId; 2]) {
        let mut text = |value: &str| {
            let argument = ctx.ast.str(value);
            let call = ctx.ast.helper_call(RenderHelper::CreateText, vec![argument]);
            ctx.annotations.mark_static(call, value);
            call
        };
        let children = [text("a"), text("b")];
        let tag = ctx.ast.str("p");
        let array = ctx.ast.alloc(AstKind::Array(children.to_vec()));
        let paragraph = ctx.ast.helper_call(RenderHelper::CreateElement, vec![tag, array]);
        ctx.annotations.set_literal(paragraph, "<p>");
        (paragraph, children)
    }

    #[test]
    fn test_fold_level_concatenates_literals() {
        let engine = Maquette::new();
        let root = VNode::text("");
        let mut ctx = PatchContext::new(&engine, Arc::clone(&root), root, OptimizeOptions::default());
        let (paragraph, children) = static_paragraph(&mut ctx);

        ctx.fold_level(paragraph, "</p>", &children);
        assert!(ctx.annotations().is_static(paragraph));
        assert_eq!(ctx.annotations().ssr_string(paragraph), Some("<p>ab</p>"));
        assert_eq!(generate_expression(ctx.ast(), paragraph), r#"_ssrNode("<p>ab</p>")"#);
    }

    #[test]
    fn test_fold_level_is_idempotent() {
        let engine = Maquette::new();
        let root = VNode::text("");
        let mut ctx = PatchContext::new(&engine, Arc::clone(&root), root, OptimizeOptions::default());
        let (paragraph, children) = static_paragraph(&mut ctx);

        ctx.fold_level(paragraph, "</p>", &children);
        let printed = generate_expression(ctx.ast(), paragraph);
        let nodes = ctx.ast().len();

        ctx.fold_level(paragraph, "</p>", &children);
        assert_eq!(ctx.annotations().ssr_string(paragraph), Some("<p>ab</p>"));
        assert_eq!(generate_expression(ctx.ast(), paragraph), printed);
        assert_eq!(ctx.ast().len(), nodes);
    }

    #[test]
    fn test_compaction_folds_operands() {
        let mut ast = vize_relief::Ast::new();
        let name = ast.ident("name");
        let escaped = ast.helper_call(RenderHelper::SsrEscape, vec![name]);
        let open = ast.str("<p>");
        let close = ast.str("</p>");
        let left = fold_plus(&mut ast, open, escaped);
        let joined = fold_plus(&mut ast, left, close);
        assert_eq!(generate_expression(&ast, joined), r#""<p>" + _ssrEscape(name) + "</p>""#);
    }
}
