//! Render-function AST node types.
//!
//! Nodes live in a flat arena ([`Ast`]) and reference each other through
//! [`AstId`] indices. Keeping identities stable lets optimizer passes attach
//! metadata in side tables keyed by id, and lets a node be rewritten in place
//! without invalidating the references its parent holds.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use vize_carton::{CompactString, FxHashSet, SmallVec};

use crate::helpers::RenderHelper;

/// Index of a node inside an [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AstId(u32);

impl AstId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Binary operators understood by render functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BinaryOp {
    Add,
    StrictEq,
    StrictNotEq,
    And,
    Or,
}

impl BinaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::StrictEq => "===",
            Self::StrictNotEq => "!==",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Binding power used by the printer and the parser.
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Or => 3,
            Self::And => 4,
            Self::StrictEq | Self::StrictNotEq => 5,
            Self::Add => 6,
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum UnaryOp {
    Not,
}

/// Variable declaration keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeclKind {
    #[default]
    Const,
    Let,
}

impl DeclKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Let => "let",
        }
    }
}

/// Object literal property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: CompactString,
    pub value: AstId,
}

/// A render-function AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstKind {
    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------
    Function {
        name: Option<CompactString>,
        params: Vec<CompactString>,
        body: Vec<AstId>,
    },
    Return(Option<AstId>),
    Declare {
        kind: DeclKind,
        name: CompactString,
        init: AstId,
    },
    If {
        test: AstId,
        consequent: Vec<AstId>,
        alternate: Option<Vec<AstId>>,
    },
    Expr(AstId),

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Ident(CompactString),
    Member {
        object: AstId,
        property: CompactString,
    },
    Index {
        object: AstId,
        index: AstId,
    },
    Call {
        callee: AstId,
        arguments: Vec<AstId>,
    },
    Array(Vec<AstId>),
    Object(Vec<Property>),
    Unary {
        op: UnaryOp,
        argument: AstId,
    },
    Binary {
        op: BinaryOp,
        left: AstId,
        right: AstId,
    },
    Conditional {
        test: AstId,
        consequent: AstId,
        alternate: AstId,
    },
    Arrow {
        params: Vec<CompactString>,
        body: AstId,
    },

    /// Synthetic node standing in for an expression that could not be
    /// located. Never produced by the parser.
    Placeholder,
}

impl AstKind {
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Self::Function { .. }
                | Self::Return(_)
                | Self::Declare { .. }
                | Self::If { .. }
                | Self::Expr(_)
        )
    }

    /// Direct children in source order.
    pub fn children(&self) -> SmallVec<[AstId; 4]> {
        let mut out = SmallVec::new();
        match self {
            Self::Function { body, .. } => out.extend(body.iter().copied()),
            Self::Return(arg) => out.extend(arg.iter().copied()),
            Self::Declare { init, .. } => out.push(*init),
            Self::If {
                test,
                consequent,
                alternate,
            } => {
                out.push(*test);
                out.extend(consequent.iter().copied());
                if let Some(alternate) = alternate {
                    out.extend(alternate.iter().copied());
                }
            }
            Self::Expr(expr) => out.push(*expr),
            Self::Member { object, .. } => out.push(*object),
            Self::Index { object, index } => {
                out.push(*object);
                out.push(*index);
            }
            Self::Call { callee, arguments } => {
                out.push(*callee);
                out.extend(arguments.iter().copied());
            }
            Self::Array(elements) => out.extend(elements.iter().copied()),
            Self::Object(properties) => out.extend(properties.iter().map(|p| p.value)),
            Self::Unary { argument, .. } => out.push(*argument),
            Self::Binary { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            Self::Conditional {
                test,
                consequent,
                alternate,
            } => {
                out.push(*test);
                out.push(*consequent);
                out.push(*alternate);
            }
            Self::Arrow { body, .. } => out.push(*body),
            Self::Str(_)
            | Self::Num(_)
            | Self::Bool(_)
            | Self::Null
            | Self::Ident(_)
            | Self::Placeholder => {}
        }
        out
    }

    /// Clone this node with every child id passed through `f`.
    pub fn remap(&self, f: impl Fn(AstId) -> AstId) -> AstKind {
        let all = |ids: &Vec<AstId>| ids.iter().map(|&id| f(id)).collect::<Vec<_>>();
        match self {
            Self::Function { name, params, body } => Self::Function {
                name: name.clone(),
                params: params.clone(),
                body: all(body),
            },
            Self::Return(arg) => Self::Return(arg.map(&f)),
            Self::Declare { kind, name, init } => Self::Declare {
                kind: *kind,
                name: name.clone(),
                init: f(*init),
            },
            Self::If {
                test,
                consequent,
                alternate,
            } => Self::If {
                test: f(*test),
                consequent: all(consequent),
                alternate: alternate.as_ref().map(|ids| all(ids)),
            },
            Self::Expr(expr) => Self::Expr(f(*expr)),
            Self::Member { object, property } => Self::Member {
                object: f(*object),
                property: property.clone(),
            },
            Self::Index { object, index } => Self::Index {
                object: f(*object),
                index: f(*index),
            },
            Self::Call { callee, arguments } => Self::Call {
                callee: f(*callee),
                arguments: all(arguments),
            },
            Self::Array(elements) => Self::Array(all(elements)),
            Self::Object(properties) => Self::Object(
                properties
                    .iter()
                    .map(|p| Property {
                        key: p.key.clone(),
                        value: f(p.value),
                    })
                    .collect(),
            ),
            Self::Unary { op, argument } => Self::Unary {
                op: *op,
                argument: f(*argument),
            },
            Self::Binary { op, left, right } => Self::Binary {
                op: *op,
                left: f(*left),
                right: f(*right),
            },
            Self::Conditional {
                test,
                consequent,
                alternate,
            } => Self::Conditional {
                test: f(*test),
                consequent: f(*consequent),
                alternate: f(*alternate),
            },
            Self::Arrow { params, body } => Self::Arrow {
                params: params.clone(),
                body: f(*body),
            },
            leaf => leaf.clone(),
        }
    }
}

/// Arena holding every node of one or more render functions.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<AstKind>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new node and return its id.
    pub fn alloc(&mut self, kind: AstKind) -> AstId {
        let id = AstId(self.nodes.len() as u32);
        self.nodes.push(kind);
        id
    }

    #[inline]
    pub fn get(&self, id: AstId) -> &AstKind {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: AstId) -> &mut AstKind {
        &mut self.nodes[id.index()]
    }

    /// Rewrite a node in place, returning its previous shape.
    pub fn replace(&mut self, id: AstId, kind: AstKind) -> AstKind {
        std::mem::replace(&mut self.nodes[id.index()], kind)
    }

    pub fn str(&mut self, value: impl Into<String>) -> AstId {
        self.alloc(AstKind::Str(value.into()))
    }

    pub fn num(&mut self, value: f64) -> AstId {
        self.alloc(AstKind::Num(value))
    }

    pub fn ident(&mut self, name: &str) -> AstId {
        self.alloc(AstKind::Ident(CompactString::from(name)))
    }

    pub fn placeholder(&mut self) -> AstId {
        self.alloc(AstKind::Placeholder)
    }

    /// Allocate `helper(arguments...)`.
    pub fn helper_call(&mut self, helper: RenderHelper, arguments: Vec<AstId>) -> AstId {
        let callee = self.ident(helper.name());
        self.alloc(AstKind::Call { callee, arguments })
    }

    /// Deep-copy the subtree rooted at `root` of `source` into this arena.
    ///
    /// The copy is iterative so that arbitrarily deep trees can be grafted.
    pub fn graft(&mut self, source: &Ast, root: AstId) -> AstId {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(source.get(id).children());
        }

        let mut mapping = vize_carton::FxHashMap::default();
        for &old in &order {
            let new = self.alloc(AstKind::Placeholder);
            mapping.insert(old, new);
        }
        for &old in &order {
            let kind = source.get(old).remap(|child| mapping[&child]);
            self.nodes[mapping[&old].index()] = kind;
        }
        mapping[&root]
    }

    /// Ids of every node reachable from `root`, including `root`.
    pub fn reachable(&self, root: AstId) -> FxHashSet<AstId> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                stack.extend(self.get(id).children());
            }
        }
        seen
    }
}

impl Index<AstId> for Ast {
    type Output = AstKind;

    fn index(&self, id: AstId) -> &AstKind {
        self.get(id)
    }
}
