//! Optimizer errors.
//!
//! Only configuration and user-code failures abort a traversal. Anything the
//! optimizer cannot correlate or validate is absorbed where it happens and
//! the affected subtree keeps its original render path.

use thiserror::Error;
use vize_carton::CompactString;
use vize_maquette::RenderError;

/// Broad category of an [`OptimizeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A component is missing what it needs to render.
    Configuration,
    /// A render function, template or prefetch hook failed.
    UserCode,
    /// The traversal API was driven incorrectly.
    Usage,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error("component `{name}` has neither a render function nor a template")]
    MissingRender { name: CompactString },

    #[error(transparent)]
    Render(RenderError),

    #[error("traversal advanced while a suspension is outstanding")]
    NotResumed,

    #[error("resumed value does not match the outstanding suspension")]
    ResumeMismatch,

    #[error("traversal has not finished")]
    Incomplete,

    #[error("the root node pair is not a matching component")]
    RootNotComponent,
}

impl From<RenderError> for OptimizeError {
    fn from(error: RenderError) -> Self {
        match error {
            RenderError::MissingRender { name } => Self::MissingRender { name },
            other => Self::Render(other),
        }
    }
}

impl OptimizeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingRender { .. }
            | Self::Render(RenderError::MissingCompiler { .. })
            | Self::Render(RenderError::MissingRender { .. }) => ErrorKind::Configuration,
            Self::Render(_) => ErrorKind::UserCode,
            Self::NotResumed | Self::ResumeMismatch | Self::Incomplete | Self::RootNotComponent => {
                ErrorKind::Usage
            }
        }
    }
}
