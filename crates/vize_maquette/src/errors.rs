//! Rendering errors.

use thiserror::Error;
use vize_armature::ParseError;
use vize_carton::CompactString;

/// Errors raised while compiling, preparing or invoking a render function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("failed to parse render function: {0}")]
    Parse(#[from] ParseError),

    #[error("`{name}` is not a function")]
    UnknownFunction { name: CompactString },

    #[error("type error: {0}")]
    TypeError(String),

    #[error("render function of `{component}` did not return a node")]
    NotANode { component: CompactString },

    #[error("render function of `{component}` returned nothing")]
    NoReturn { component: CompactString },

    #[error("prefetch hook of `{component}` failed: {message}")]
    Prefetch {
        component: CompactString,
        message: String,
    },

    #[error("async component rejected: {0}")]
    AsyncRejected(String),

    #[error("async component resolution was cancelled")]
    AsyncCancelled,

    #[error("failed to compile template of `{component}`: {message}")]
    TemplateCompile {
        component: CompactString,
        message: String,
    },

    #[error("`{component}` has a template but no template compiler is configured")]
    MissingCompiler { component: CompactString },

    #[error("component `{name}` has neither a render function nor a template")]
    MissingRender { name: CompactString },
}
