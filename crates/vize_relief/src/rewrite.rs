//! Structural predicates and rewriters over the render-function AST.
//!
//! The optimizer never matches on [`AstKind`] directly. Everything it needs
//! to know about the shape of a render function goes through this module, so
//! the policy code stays independent of the concrete expression tree.

use crate::ast::{Ast, AstId, AstKind, BinaryOp, Property};
use crate::helpers::RenderHelper;

/// The helper a call expression invokes, if any.
pub fn helper_of(ast: &Ast, id: AstId) -> Option<RenderHelper> {
    let AstKind::Call { callee, .. } = ast.get(id) else {
        return None;
    };
    match ast.get(*callee) {
        AstKind::Ident(name) => RenderHelper::from_name(name),
        _ => None,
    }
}

/// Arguments of a call expression (empty for anything else).
pub fn call_arguments(ast: &Ast, id: AstId) -> &[AstId] {
    match ast.get(id) {
        AstKind::Call { arguments, .. } => arguments,
        _ => &[],
    }
}

/// The value of a string literal node.
pub fn string_literal(ast: &Ast, id: AstId) -> Option<&str> {
    match ast.get(id) {
        AstKind::Str(value) => Some(value),
        _ => None,
    }
}

/// Elements of an array literal.
pub fn array_elements(ast: &Ast, id: AstId) -> Option<&[AstId]> {
    match ast.get(id) {
        AstKind::Array(elements) => Some(elements),
        _ => None,
    }
}

/// Replace the contents of an array literal. Returns `false` when `id` is not an array.
pub fn set_array_elements(ast: &mut Ast, id: AstId, elements: Vec<AstId>) -> bool {
    match ast.get_mut(id) {
        AstKind::Array(current) => {
            *current = elements;
            true
        }
        _ => false,
    }
}

/// Whether the expression is a call to a node-constructing helper.
pub fn is_node_construct(ast: &Ast, id: AstId) -> bool {
    helper_of(ast, id).is_some_and(RenderHelper::constructs_node)
}

/// Whether the expression is the literal-text construct `_ssrNode(x)`.
pub fn is_text_construct(ast: &Ast, id: AstId) -> bool {
    helper_of(ast, id) == Some(RenderHelper::SsrNode) && call_arguments(ast, id).len() == 1
}

/// The single argument of a literal-text construct.
pub fn text_construct_argument(ast: &Ast, id: AstId) -> Option<AstId> {
    if is_text_construct(ast, id) {
        call_arguments(ast, id).first().copied()
    } else {
        None
    }
}

/// The literal carried by `_ssrNode("...")`.
pub fn text_construct_literal(ast: &Ast, id: AstId) -> Option<&str> {
    text_construct_argument(ast, id).and_then(|arg| string_literal(ast, arg))
}

/// Locate the array literal holding the children of a node constructor.
///
/// Recognises `_c(tag, [children])`, `_c(tag, data, [children])` and
/// `_ssrNode(open, close, [children])`. Children produced any other way
/// (render lists, computed arrays) cannot be correlated positionally.
pub fn child_array_of(ast: &Ast, id: AstId) -> Option<AstId> {
    let arguments = call_arguments(ast, id);
    let candidates: &[usize] = match helper_of(ast, id)? {
        RenderHelper::CreateElement => &[1, 2],
        RenderHelper::SsrNode => &[2],
        _ => return None,
    };
    candidates
        .iter()
        .filter_map(|&i| arguments.get(i).copied())
        .find(|&arg| matches!(ast.get(arg), AstKind::Array(_)))
}

/// The expression returned by a render function, when it is the only,
/// unconditional return and it constructs a node.
///
/// Declarations before the return are allowed; branches, expression
/// statements with a second return, or a bare `return;` disqualify.
pub fn single_return(ast: &Ast, function: AstId) -> Option<AstId> {
    let AstKind::Function { body, .. } = ast.get(function) else {
        return None;
    };
    let mut found = None;
    for &stmt in body {
        match ast.get(stmt) {
            AstKind::Return(Some(argument)) => {
                if found.is_some() {
                    return None;
                }
                found = Some(*argument);
            }
            AstKind::Return(None) | AstKind::If { .. } => return None,
            _ => {}
        }
    }
    found.filter(|&argument| is_node_construct(ast, argument))
}

/// Wrap an expression as `_ssrNode(argument)`.
pub fn wrap_text(ast: &mut Ast, argument: AstId) -> AstId {
    ast.helper_call(RenderHelper::SsrNode, vec![argument])
}

/// Allocate `_ssrNode("text")`.
pub fn literal_text_node(ast: &mut Ast, text: &str) -> AstId {
    let argument = ast.str(text);
    wrap_text(ast, argument)
}

/// Whether `id` is a placeholder standing in for an expression that could
/// not be correlated.
pub fn is_placeholder(ast: &Ast, id: AstId) -> bool {
    matches!(ast.get(id), AstKind::Placeholder)
}

fn replace_with_helper(ast: &mut Ast, id: AstId, helper: RenderHelper, arguments: Vec<AstId>) {
    let callee = ast.ident(helper.name());
    ast.replace(id, AstKind::Call { callee, arguments });
}

/// Rewrite `id` in place into `_ssrNode(argument)`.
pub fn replace_with_text(ast: &mut Ast, id: AstId, argument: AstId) {
    replace_with_helper(ast, id, RenderHelper::SsrNode, vec![argument]);
}

/// Rewrite `id` in place into `_ssrNode("text")`.
pub fn replace_with_literal_text(ast: &mut Ast, id: AstId, text: &str) {
    let argument = ast.str(text);
    replace_with_text(ast, id, argument);
}

/// Rewrite `id` in place into `_ssrNode("open", "close", [children])`.
pub fn replace_with_fragment(ast: &mut Ast, id: AstId, open: &str, close: &str, children: Vec<AstId>) {
    let open = ast.str(open);
    let close = ast.str(close);
    let children = ast.alloc(AstKind::Array(children));
    replace_with_helper(ast, id, RenderHelper::SsrNode, vec![open, close, children]);
}

/// Allocate `function render() { return _ssrNode("text"); }`.
pub fn literal_render_function(ast: &mut Ast, text: &str) -> AstId {
    let node = literal_text_node(ast, text);
    let ret = ast.alloc(AstKind::Return(Some(node)));
    ast.alloc(AstKind::Function {
        name: Some("render".into()),
        params: Vec::new(),
        body: vec![ret],
    })
}

/// Set `key: value` on the data object of a `_c(tag, data?, children?)` call.
///
/// A data object is inserted when the call has none. Returns `false` when the
/// call is not `_c` or its second argument is neither an object nor an array
/// literal, since inserting would change how the remaining arguments are read.
pub fn set_data_property(ast: &mut Ast, call: AstId, key: &str, value: AstId) -> bool {
    if helper_of(ast, call) != Some(RenderHelper::CreateElement) {
        return false;
    }
    let data = call_arguments(ast, call).get(1).copied();
    match data {
        Some(data) if matches!(ast.get(data), AstKind::Object(_)) => {
            if let AstKind::Object(properties) = ast.get_mut(data) {
                match properties.iter_mut().find(|p| p.key.as_str() == key) {
                    Some(existing) => existing.value = value,
                    None => properties.push(Property {
                        key: key.into(),
                        value,
                    }),
                }
            }
            true
        }
        Some(other) if !matches!(ast.get(other), AstKind::Array(_)) => false,
        _ => {
            let object = ast.alloc(AstKind::Object(vec![Property {
                key: key.into(),
                value,
            }]));
            if let AstKind::Call { arguments, .. } = ast.get_mut(call) {
                if arguments.is_empty() {
                    return false;
                }
                arguments.insert(1, object);
            }
            true
        }
    }
}

fn extreme_literal(ast: &Ast, id: AstId, leftmost: bool) -> Option<AstId> {
    let mut cur = id;
    loop {
        match ast.get(cur) {
            AstKind::Binary {
                op: BinaryOp::Add,
                left,
                right,
            } => cur = if leftmost { *left } else { *right },
            AstKind::Str(_) => return Some(cur),
            _ => return None,
        }
    }
}

/// Build `left + right`, folding string literals where possible.
///
/// - literal + literal becomes one literal;
/// - a literal next to a `+` chain is absorbed into the chain's outermost
///   literal operand on that side;
/// - anything else becomes a plain binary `+`. No deeper simplification is
///   attempted.
pub fn fold_plus(ast: &mut Ast, left: AstId, right: AstId) -> AstId {
    let left_literal = string_literal(ast, left).map(str::to_owned);
    let right_literal = string_literal(ast, right).map(str::to_owned);

    match (left_literal, right_literal) {
        (Some(mut a), Some(b)) => {
            a.push_str(&b);
            return ast.str(a);
        }
        (Some(a), None) => {
            if let Some(target) = extreme_literal(ast, right, true) {
                if let AstKind::Str(value) = ast.get_mut(target) {
                    value.insert_str(0, &a);
                }
                return right;
            }
        }
        (None, Some(b)) => {
            if let Some(target) = extreme_literal(ast, left, false) {
                if let AstKind::Str(value) = ast.get_mut(target) {
                    value.push_str(&b);
                }
                return left;
            }
        }
        (None, None) => {}
    }

    ast.alloc(AstKind::Binary {
        op: BinaryOp::Add,
        left,
        right,
    })
}
