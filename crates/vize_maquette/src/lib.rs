//! Maquette - The reference rendering engine for Vize render functions.
//!
//! This crate provides the runtime side of server rendering:
//! - component definitions, instances and async factories
//! - a sandboxed interpreter for render functions
//! - the directive/module registry that builds start tags
//! - an iterative HTML serializer whose component boundaries can be
//!   redirected through a [`RenderPlan`]
//!
//! The [`RenderEngine`] trait is the seam the static-folding optimizer talks
//! to; [`Maquette`] is its reference implementation.
//!
//! ## Name Origin
//!
//! A **maquette** is a sculptor's small working model, built to try a piece
//! out before committing to the final material. Render functions are tried
//! out here before their output is frozen into strings.

pub mod async_factory;
pub mod component;
pub mod engine;
pub mod errors;
pub mod interpreter;
pub mod registry;
pub mod render_fn;
pub mod serialize;
pub mod vnode;

pub use async_factory::{AdvancedAsync, AsyncFactory, AsyncResolution, ResolveCallback};
pub use component::{
    ComponentDef, ComponentDefBuilder, ComponentEntry, Components, Instance, Pass,
    PrefetchFuture, PrefetchHook, PrefetchRequest, Styles,
};
pub use engine::{Maquette, RenderEngine, TemplateCompiler};
pub use errors::RenderError;
pub use registry::{end_tag, style_declarations, DirectiveFn, ModuleFn, Registry, TagContext};
pub use render_fn::RenderFunction;
pub use serialize::{render_to_html, BaselinePlan, RenderPlan};
pub use vnode::{DirectiveBinding, NodeKind, VNode, VNodeData, VNodeKind, VNodeRef};
