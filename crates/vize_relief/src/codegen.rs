//! Render-function printer.
//!
//! Turns an AST back into source text. Strings are always emitted
//! double-quoted with JSON-style escapes, so parsing the output and printing
//! it again is byte-stable.

use crate::ast::{Ast, AstId, AstKind, UnaryOp};

const PREC_ARROW: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_UNARY: u8 = 7;
const PREC_POSTFIX: u8 = 8;
const PREC_PRIMARY: u8 = 9;

/// Code generation context using byte buffer for performance
pub struct CodegenContext<'a> {
    ast: &'a Ast,
    /// Generated code buffer (bytes)
    code: Vec<u8>,
    /// Current indentation level
    indent_level: u32,
}

impl<'a> CodegenContext<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            code: Vec::with_capacity(1024),
            indent_level: 0,
        }
    }

    /// Push string to buffer
    #[inline]
    pub fn push(&mut self, code: &str) {
        self.code.extend_from_slice(code.as_bytes());
    }

    /// Add newline with proper indentation
    #[inline]
    pub fn newline(&mut self) {
        self.code.push(b'\n');
        for _ in 0..self.indent_level {
            self.code.extend_from_slice(b"  ");
        }
    }

    #[inline]
    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    #[inline]
    pub fn deindent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    /// Get the generated code as a String
    pub fn into_code(self) -> String {
        // Only valid UTF-8 is ever pushed.
        String::from_utf8(self.code).unwrap_or_default()
    }

    /// Print a statement or, for expression roots, the bare expression.
    pub fn gen_root(&mut self, id: AstId) {
        if self.ast.get(id).is_statement() {
            self.gen_statement(id);
        } else {
            self.gen_expression(id, 0);
        }
    }

    fn gen_block(&mut self, body: &[AstId]) {
        self.push("{");
        self.indent();
        for &stmt in body {
            self.newline();
            self.gen_statement(stmt);
        }
        self.deindent();
        self.newline();
        self.push("}");
    }

    fn gen_statement(&mut self, id: AstId) {
        let ast = self.ast;
        match ast.get(id) {
            AstKind::Function { name, params, body } => {
                self.push("function ");
                if let Some(name) = name {
                    self.push(name);
                }
                self.push("(");
                self.gen_params(params);
                self.push(") ");
                self.gen_block(body);
            }
            AstKind::Return(argument) => {
                self.push("return");
                if let Some(argument) = argument {
                    self.push(" ");
                    self.gen_expression(*argument, 0);
                }
                self.push(";");
            }
            AstKind::Declare { kind, name, init } => {
                self.push(kind.as_str());
                self.push(" ");
                self.push(name);
                self.push(" = ");
                self.gen_expression(*init, PREC_ARROW);
                self.push(";");
            }
            AstKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.push("if (");
                self.gen_expression(*test, 0);
                self.push(") ");
                self.gen_block(consequent);
                if let Some(alternate) = alternate {
                    self.push(" else ");
                    self.gen_block(alternate);
                }
            }
            AstKind::Expr(expr) => {
                self.gen_expression(*expr, 0);
                self.push(";");
            }
            _ => {
                self.gen_expression(id, 0);
                self.push(";");
            }
        }
    }

    fn precedence(&self, id: AstId) -> u8 {
        match self.ast.get(id) {
            AstKind::Arrow { .. } => PREC_ARROW,
            AstKind::Conditional { .. } => PREC_CONDITIONAL,
            AstKind::Binary { op, .. } => op.precedence(),
            AstKind::Unary { .. } => PREC_UNARY,
            AstKind::Call { .. } | AstKind::Member { .. } | AstKind::Index { .. } => PREC_POSTFIX,
            _ => PREC_PRIMARY,
        }
    }

    fn gen_params(&mut self, params: &[vize_carton::CompactString]) {
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(param);
        }
    }

    fn gen_list(&mut self, items: &[AstId]) {
        for (i, &item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.gen_expression(item, PREC_ARROW);
        }
    }

    /// Print an expression, parenthesizing when it binds looser than `min_prec`.
    pub fn gen_expression(&mut self, id: AstId, min_prec: u8) {
        let wrap = self.precedence(id) < min_prec;
        if wrap {
            self.push("(");
        }

        let ast = self.ast;
        match ast.get(id) {
            AstKind::Str(value) => self.push(&quote_string(value)),
            AstKind::Num(value) => self.push(&format_number(*value)),
            AstKind::Bool(value) => self.push(if *value { "true" } else { "false" }),
            AstKind::Null | AstKind::Placeholder => self.push("null"),
            AstKind::Ident(name) => self.push(name),
            AstKind::Member { object, property } => {
                self.gen_expression(*object, PREC_POSTFIX);
                self.push(".");
                self.push(property);
            }
            AstKind::Index { object, index } => {
                self.gen_expression(*object, PREC_POSTFIX);
                self.push("[");
                self.gen_expression(*index, 0);
                self.push("]");
            }
            AstKind::Call { callee, arguments } => {
                self.gen_expression(*callee, PREC_POSTFIX);
                self.push("(");
                self.gen_list(arguments);
                self.push(")");
            }
            AstKind::Array(elements) => {
                self.push("[");
                self.gen_list(elements);
                self.push("]");
            }
            AstKind::Object(properties) => {
                self.push("{");
                for (i, property) in properties.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    if is_identifier(&property.key) {
                        self.push(&property.key);
                    } else {
                        self.push(&quote_string(&property.key));
                    }
                    self.push(": ");
                    self.gen_expression(property.value, PREC_ARROW);
                }
                self.push("}");
            }
            AstKind::Unary { op, argument } => {
                match op {
                    UnaryOp::Not => self.push("!"),
                }
                self.gen_expression(*argument, PREC_UNARY);
            }
            AstKind::Binary { op, left, right } => {
                let prec = op.precedence();
                self.gen_expression(*left, prec);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.gen_expression(*right, prec + 1);
            }
            AstKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.gen_expression(*test, PREC_CONDITIONAL + 1);
                self.push(" ? ");
                self.gen_expression(*consequent, PREC_ARROW);
                self.push(" : ");
                self.gen_expression(*alternate, PREC_ARROW);
            }
            AstKind::Arrow { params, body } => {
                self.push("(");
                self.gen_params(params);
                self.push(") => ");
                if matches!(ast.get(*body), AstKind::Object(_)) {
                    self.push("(");
                    self.gen_expression(*body, 0);
                    self.push(")");
                } else {
                    self.gen_expression(*body, PREC_ARROW);
                }
            }
            AstKind::Function { .. }
            | AstKind::Return(_)
            | AstKind::Declare { .. }
            | AstKind::If { .. }
            | AstKind::Expr(_) => {
                // Statements never appear in expression position.
                self.gen_statement(id);
            }
        }

        if wrap {
            self.push(")");
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Quote a string as a double-quoted literal.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Generate source text for the node at `root`.
pub fn generate(ast: &Ast, root: AstId) -> String {
    let mut ctx = CodegenContext::new(ast);
    ctx.gen_root(root);
    if ast.get(root).is_statement() {
        ctx.push("\n");
    }
    ctx.into_code()
}

/// Generate source text for a single expression.
pub fn generate_expression(ast: &Ast, id: AstId) -> String {
    let mut ctx = CodegenContext::new(ast);
    ctx.gen_expression(id, 0);
    ctx.into_code()
}
