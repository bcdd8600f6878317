//! Render helpers callable from render functions.
//!
//! Compiled render functions build their output exclusively through these
//! helpers, which is what lets the optimizer recognise node constructors
//! structurally.

use serde::{Deserialize, Serialize};

/// Render helper identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RenderHelper {
    /// `_c(tag, data?, children?)` - element or component node
    CreateElement,
    /// `_v(text)` - text node
    CreateText,
    /// `_e(text?)` - comment / empty node
    CreateEmpty,
    /// `_s(value)` - display string
    ToDisplayString,
    /// `_l(list, fn)` - render list
    RenderList,
    /// `_ssrNode(open, close?, children?)` - pre-serialized string fragment
    SsrNode,
    /// `_ssrEscape(value)` - HTML-escaped display string
    SsrEscape,
}

impl RenderHelper {
    pub const ALL: [RenderHelper; 7] = [
        Self::CreateElement,
        Self::CreateText,
        Self::CreateEmpty,
        Self::ToDisplayString,
        Self::RenderList,
        Self::SsrNode,
        Self::SsrEscape,
    ];

    /// Name the helper is called by in render-function source.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateElement => "_c",
            Self::CreateText => "_v",
            Self::CreateEmpty => "_e",
            Self::ToDisplayString => "_s",
            Self::RenderList => "_l",
            Self::SsrNode => "_ssrNode",
            Self::SsrEscape => "_ssrEscape",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.name() == name)
    }

    /// Whether a call to this helper produces a virtual node.
    pub const fn constructs_node(self) -> bool {
        matches!(
            self,
            Self::CreateElement | Self::CreateText | Self::CreateEmpty | Self::SsrNode
        )
    }
}
