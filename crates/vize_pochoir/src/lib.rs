//! Dual-pass static folding for Vize server rendering.
//!
//! A component tree is rendered twice: once with no request data (the static
//! pass) and once with real data (the dynamic pass). Walking both results in
//! lock-step shows which parts of the output never depend on the request.
//! Those parts are folded into string literals inside the component render
//! functions, and the rewritten functions are collected into a
//! [`RenderTree`] that later requests render through.
//!
//! - [`PatchContext`] drives the traversal and suspends on prefetch hooks and
//!   async components
//! - classification compares node pairs and records literals in
//!   [`Annotations`]
//! - folding rewrites the render-function AST level by level
//! - [`Synthesizer`] prints, compiles and validates the rewritten functions
//!
//! ## Name Origin
//!
//! **Pochoir** is a stencil printing technique: the parts of a print that
//! never change are cut once into a stencil and reused for every copy. Static
//! markup is cut into the render functions the same way.

pub mod annotations;
mod classify;
pub mod context;
pub mod errors;
pub mod fold;
pub mod frame;
pub mod options;
pub mod render_tree;
pub mod synth;

use std::sync::Arc;

use serde_json::Value;
use vize_maquette::{ComponentDef, RenderEngine, VNode, VNodeData, VNodeRef};

pub use annotations::{Annotation, AnnotationFlags, Annotations};
pub use context::{Continuation, PatchContext, Resolved, Step, Suspension};
pub use errors::{ErrorKind, OptimizeError};
pub use fold::{child_static_literal, reduce_children, Reduced};
pub use frame::{ActiveInstances, ComponentFrame, FrameChildren, PatchFrame, PatchPair};
pub use options::OptimizeOptions;
pub use render_tree::{RenderTree, RenderTreePlan};
pub use synth::{validate, Synthesizer};

/// Optimize the component tree rooted at the given pair of nodes.
///
/// `static_root` and `dynamic_root` must be the same component node created
/// for the static and the dynamic pass.
pub async fn optimize<E>(
    engine: &E,
    static_root: VNodeRef,
    dynamic_root: VNodeRef,
    options: OptimizeOptions,
) -> Result<RenderTree, OptimizeError>
where
    E: RenderEngine + ?Sized,
{
    PatchContext::new(engine, static_root, dynamic_root, options)
        .run()
        .await
}

/// Optimize a root component, rendering the dynamic pass with `props`.
pub async fn optimize_component<E>(
    engine: &E,
    def: &Arc<ComponentDef>,
    props: Value,
    options: OptimizeOptions,
) -> Result<RenderTree, OptimizeError>
where
    E: RenderEngine + ?Sized,
{
    let static_root = VNode::component(Arc::clone(def), VNodeData::default());
    let dynamic_root = VNode::component(Arc::clone(def), VNodeData::with_props(props));
    optimize(engine, static_root, dynamic_root, options).await
}
