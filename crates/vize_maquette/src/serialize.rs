//! HTML serialization of rendered trees.
//!
//! The walk keeps an explicit work stack so arbitrarily deep component
//! chains never grow the native stack. Component boundaries consult a
//! [`RenderPlan`], which may substitute the render function a component uses.

use std::sync::Arc;

use crate::async_factory::AsyncResolution;
use crate::component::{ComponentDef, Instance, Pass};
use crate::engine::RenderEngine;
use crate::errors::RenderError;
use crate::registry::{end_tag, TagContext};
use crate::render_fn::RenderFunction;
use crate::vnode::{VNodeData, VNodeKind, VNodeRef};

/// Chooses the render function of each component during serialization
pub trait RenderPlan {
    /// Called when a component is entered. `None` keeps the component's own
    /// render function.
    fn enter(&mut self, def: &ComponentDef, data: &VNodeData) -> Option<RenderFunction>;

    /// Called after the component's subtree has been written.
    fn leave(&mut self);
}

/// Plan that never substitutes anything
#[derive(Debug, Default, Clone, Copy)]
pub struct BaselinePlan;

impl RenderPlan for BaselinePlan {
    fn enter(&mut self, _def: &ComponentDef, _data: &VNodeData) -> Option<RenderFunction> {
        None
    }

    fn leave(&mut self) {}
}

enum Work {
    Node {
        node: VNodeRef,
        owner: Option<Arc<Instance>>,
        ctx: TagContext,
    },
    Markup(String),
    Leave,
}

fn owned_ctx(owner: &Option<Arc<Instance>>) -> TagContext {
    TagContext::owned_by(owner.as_ref().and_then(|i| i.def().scope_id.as_deref()))
}

fn push_children(
    stack: &mut Vec<Work>,
    children: &[VNodeRef],
    owner: &Option<Arc<Instance>>,
) {
    let ctx = owned_ctx(owner);
    for child in children.iter().rev() {
        stack.push(Work::Node {
            node: Arc::clone(child),
            owner: owner.clone(),
            ctx: ctx.clone(),
        });
    }
}

/// Serialize `root` to HTML.
pub async fn render_to_html<E>(
    engine: &E,
    root: VNodeRef,
    plan: &mut dyn RenderPlan,
) -> Result<String, RenderError>
where
    E: RenderEngine + ?Sized,
{
    let mut out = String::new();
    let mut stack = vec![Work::Node {
        node: root,
        owner: None,
        ctx: TagContext::default(),
    }];

    while let Some(work) = stack.pop() {
        let (node, owner, ctx) = match work {
            Work::Markup(markup) => {
                out.push_str(&markup);
                continue;
            }
            Work::Leave => {
                plan.leave();
                continue;
            }
            Work::Node { node, owner, ctx } => (node, owner, ctx),
        };

        // Async components resolve to a component definition or to nodes.
        let (def, data) = match &node.kind {
            VNodeKind::Text { .. } => {
                if let Some(markup) = node.text_markup() {
                    out.push_str(&markup);
                }
                continue;
            }
            VNodeKind::Comment { text } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
                continue;
            }
            VNodeKind::StringFragment { open, close } => {
                out.push_str(open);
                stack.push(Work::Markup(close.clone()));
                push_children(&mut stack, &node.children, &owner);
                continue;
            }
            VNodeKind::Element { tag, data } => {
                out.push_str(&engine.registry().render_start_tag(tag, data, &ctx));
                let Some(close) = end_tag(tag) else {
                    continue;
                };
                if let Some(content) = data.content_override() {
                    out.push_str(&content);
                    out.push_str(&close);
                } else {
                    stack.push(Work::Markup(close));
                    push_children(&mut stack, &node.children, &owner);
                }
                continue;
            }
            VNodeKind::Component { def, data } => (Arc::clone(def), data.clone()),
            VNodeKind::AsyncComponent { factory, data } => match factory.resolve().await? {
                AsyncResolution::Component(def) => (def, data.clone()),
                AsyncResolution::Node(resolved) => {
                    stack.push(Work::Node {
                        node: resolved,
                        owner,
                        ctx,
                    });
                    continue;
                }
                AsyncResolution::Nodes(resolved) => {
                    for child in resolved.into_iter().rev() {
                        stack.push(Work::Node {
                            node: child,
                            owner: owner.clone(),
                            ctx: ctx.clone(),
                        });
                    }
                    continue;
                }
            },
        };

        let instance = engine.instantiate(&def, &data, owner.as_ref(), Pass::Dynamic);
        if let Some(render) = plan.enter(&def, &data) {
            instance.replace_render(Some(render));
        }
        engine.ensure_render(&instance)?;
        if engine.has_prefetch(&instance) {
            engine.prefetch(&instance).await?;
        }
        let rendered = engine.render(&instance)?;
        stack.push(Work::Leave);
        stack.push(Work::Node {
            node: rendered,
            ctx: ctx.nest(&data, def.scope_id.as_deref()),
            owner: Some(instance),
        });
    }

    Ok(out)
}
