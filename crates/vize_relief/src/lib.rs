//! Relief - The sculptured AST surface for Vize render functions.
//!
//! This crate defines the render-function AST consumed and rewritten by the
//! static-folding optimizer, together with the narrow predicate/rewriter
//! interface it is manipulated through and the printer that turns it back
//! into source text.
//!
//! ## Name Origin
//!
//! **Relief** is a sculptural technique where shapes are carved so that they
//! stand out from a flat background. The AST is the raised surface of a render
//! function: everything the optimizer inspects or carves away lives here.

pub mod ast;
pub mod codegen;
pub mod helpers;
pub mod rewrite;

pub use ast::*;
pub use codegen::{generate, generate_expression, quote_string, CodegenContext};
pub use helpers::RenderHelper;
