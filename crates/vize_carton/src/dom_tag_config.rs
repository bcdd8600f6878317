//! Static tag tables for HTML serialization.

use phf::phf_set;

/// Elements that never have children or a closing tag.
static VOID_TAGS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen",
    "link", "meta", "param", "source", "track", "wbr",
};

/// Elements whose text content is emitted verbatim.
static RAW_TEXT_TAGS: phf::Set<&'static str> = phf_set! {
    "script", "style",
};

/// Check whether a tag is self-closing (unary).
#[inline]
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag)
}

/// Check whether text inside this tag must not be escaped.
#[inline]
pub fn is_raw_text_tag(tag: &str) -> bool {
    RAW_TEXT_TAGS.contains(tag)
}
