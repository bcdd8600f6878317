//! Compiled render functions.

use std::fmt;
use std::sync::Arc;

use vize_armature::{parse_render_fn, ParseError};
use vize_carton::hash::{hash_str, hash_to_hex};
use vize_relief::{Ast, AstId};

struct Compiled {
    source: String,
    ast: Ast,
    root: AstId,
    hash: u64,
}

/// A parsed render function, cheap to clone and share between instances.
///
/// Compiling only parses; nothing in the source is evaluated until the
/// interpreter invokes it against an instance.
#[derive(Clone)]
pub struct RenderFunction(Arc<Compiled>);

impl RenderFunction {
    pub fn compile(source: impl Into<String>) -> Result<Self, ParseError> {
        let source = source.into();
        let (ast, root) = parse_render_fn(&source)?;
        let hash = hash_str(&source);
        Ok(Self(Arc::new(Compiled {
            source,
            ast,
            root,
            hash,
        })))
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.0.source
    }

    #[inline]
    pub fn ast(&self) -> &Ast {
        &self.0.ast
    }

    /// Id of the `Function` node inside [`Self::ast`].
    #[inline]
    pub fn root(&self) -> AstId {
        self.0.root
    }

    /// xxHash3 of the source text.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.0.hash
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for RenderFunction {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other) || (self.hash() == other.hash() && self.source() == other.source())
    }
}

impl Eq for RenderFunction {}

impl fmt::Debug for RenderFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderFunction")
            .field("hash", &hash_to_hex(self.hash()))
            .field("source", &self.source())
            .finish()
    }
}
