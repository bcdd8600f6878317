//! Armature - The structural parser for Vize render functions.
//!
//! Turns render-function source text into the arena AST defined by
//! `vize_relief`. The accepted language is the closed subset emitted by the
//! template compiler and by the static-folding optimizer: helper calls,
//! literals, member access, `+`, comparisons, logical operators, ternaries,
//! arrow callbacks, `const`/`let`, `if`/`else` and `return`.
//!
//! ## Name Origin
//!
//! An **armature** is the internal frame a sculptor builds before applying
//! clay. The parser builds that frame; everything else is modelled on top.

pub mod parser;
pub mod tokenizer;

pub use parser::{parse_into, parse_render_fn, Parser, MAX_NESTING};

use thiserror::Error;

/// A syntax error with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}
