//! Carton - shared utilities for the Vize render pipeline.
//!
//! The engine, the AST printer and the static folder all need the same small
//! set of tools: tag tables, HTML escaping and source-keyed caches. They live
//! here, alongside re-exports of the collection crates every other Vize crate
//! builds on.
//!
//! # Modules
//!
//! - **dom_tag_config**: void and raw-text tag tables
//! - **escape**: text and attribute escaping
//! - **hash**: xxHash3 source keys and [`hash::SourceCache`]
//!
//! # Example
//!
//! ```
//! use vize_carton::{escape_html, is_void_tag};
//!
//! assert!(is_void_tag("br"));
//! assert_eq!(escape_html("<b>"), "&lt;b&gt;");
//! ```
//!
//! ## Name Origin
//!
//! A **carton** is the artist's portfolio case: the tools every piece of work
//! starts from.

pub mod dom_tag_config;
pub mod escape;
pub mod hash;

pub use bitflags::bitflags;
pub use compact_str::CompactString;
pub use rustc_hash::{FxHashMap, FxHashSet};
pub use smallvec::SmallVec;

pub use dom_tag_config::*;
pub use escape::*;
