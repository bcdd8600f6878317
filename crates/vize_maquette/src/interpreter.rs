//! Sandboxed render-function interpreter.
//!
//! A render function sees exactly three things: the render helpers, its own
//! locals, and the scope of the instance it renders. Identifiers that resolve
//! to none of these read as `null`. There is no access to globals, I/O or the
//! host, which keeps compiled-at-runtime code isolated from the application.

use std::rc::Rc;

use serde_json::{Map, Number, Value};
use vize_carton::{escape_html, is_raw_text_tag, CompactString, FxHashMap};
use vize_relief::{generate_expression, Ast, AstId, AstKind, BinaryOp, RenderHelper, UnaryOp};

use crate::component::{ComponentEntry, Components, Instance};
use crate::errors::RenderError;
use crate::render_fn::RenderFunction;
use crate::vnode::{VNode, VNodeData, VNodeKind, VNodeRef};

type Frame = FxHashMap<CompactString, RtValue>;

struct Closure {
    params: Vec<CompactString>,
    body: AstId,
    env: Vec<Frame>,
}

/// Runtime value
#[derive(Clone)]
enum RtValue {
    Json(Value),
    Node(VNodeRef),
    List(Vec<RtValue>),
    Closure(Rc<Closure>),
}

const NULL: RtValue = RtValue::Json(Value::Null);

enum Flow {
    Normal,
    Return(RtValue),
}

/// Format a number the way JavaScript's `String(n)` does for common values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// JavaScript `String(value)`.
pub fn js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// The `_s` helper: `null` renders empty, structures render as indented JSON.
pub fn to_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
        other => js_string(other),
    }
}

/// JavaScript truthiness.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl RtValue {
    fn truthy(&self) -> bool {
        match self {
            RtValue::Json(value) => truthy(value),
            _ => true,
        }
    }

    fn into_json(self) -> Value {
        match self {
            RtValue::Json(value) => value,
            RtValue::List(items) => Value::Array(items.into_iter().map(Self::into_json).collect()),
            RtValue::Node(_) | RtValue::Closure(_) => Value::Null,
        }
    }

    fn string(&self) -> String {
        match self {
            RtValue::Json(value) => js_string(value),
            RtValue::List(items) => items
                .iter()
                .map(RtValue::string)
                .collect::<Vec<_>>()
                .join(","),
            RtValue::Node(_) => "[object Object]".to_string(),
            RtValue::Closure(_) => "[function]".to_string(),
        }
    }

    fn display(&self) -> String {
        match self {
            RtValue::Json(value) => to_display(value),
            other => other.clone().into_json().to_string(),
        }
    }
}

/// Invoke `render` against `instance` and return the root node it produces.
///
/// Component tags resolve against the instance's own registrations first,
/// then against `globals`.
pub fn render(
    render: &RenderFunction,
    instance: &Instance,
    globals: &Components,
) -> Result<VNodeRef, RenderError> {
    let mut interpreter = Interpreter {
        ast: render.ast(),
        instance,
        scope: instance.scope(),
        globals,
        locals: Vec::new(),
    };
    interpreter.run(render.root())
}

struct Interpreter<'a> {
    ast: &'a Ast,
    instance: &'a Instance,
    scope: Map<String, Value>,
    globals: &'a Components,
    locals: Vec<Frame>,
}

impl<'a> Interpreter<'a> {
    fn component_name(&self) -> CompactString {
        self.instance.def().name.clone()
    }

    fn run(&mut self, function: AstId) -> Result<VNodeRef, RenderError> {
        let ast = self.ast;
        let AstKind::Function { body, .. } = ast.get(function) else {
            return Err(RenderError::TypeError(
                "render function root is not a function".into(),
            ));
        };
        match self.exec_block(body)? {
            Flow::Normal => Err(RenderError::NoReturn {
                component: self.component_name(),
            }),
            Flow::Return(value) => self.root_node(value),
        }
    }

    fn root_node(&self, value: RtValue) -> Result<VNodeRef, RenderError> {
        match value {
            RtValue::Node(node) => Ok(node),
            RtValue::List(items) => {
                let mut nodes = Vec::new();
                flatten(RtValue::List(items), false, &mut nodes);
                if nodes.len() == 1 {
                    Ok(nodes.remove(0))
                } else {
                    Err(RenderError::NotANode {
                        component: self.component_name(),
                    })
                }
            }
            _ => Err(RenderError::NotANode {
                component: self.component_name(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn exec_block(&mut self, body: &[AstId]) -> Result<Flow, RenderError> {
        self.locals.push(Frame::default());
        let flow = self.exec_statements(body);
        self.locals.pop();
        flow
    }

    fn exec_statements(&mut self, body: &[AstId]) -> Result<Flow, RenderError> {
        let ast = self.ast;
        for &stmt in body {
            match ast.get(stmt) {
                AstKind::Return(argument) => {
                    let value = match argument {
                        Some(argument) => self.eval(*argument)?,
                        None => NULL,
                    };
                    return Ok(Flow::Return(value));
                }
                AstKind::Declare { name, init, .. } => {
                    let value = self.eval(*init)?;
                    if let Some(frame) = self.locals.last_mut() {
                        frame.insert(name.clone(), value);
                    }
                }
                AstKind::If {
                    test,
                    consequent,
                    alternate,
                } => {
                    let flow = if self.eval(*test)?.truthy() {
                        self.exec_block(consequent)?
                    } else if let Some(alternate) = alternate {
                        self.exec_block(alternate)?
                    } else {
                        Flow::Normal
                    };
                    if let Flow::Return(_) = flow {
                        return Ok(flow);
                    }
                }
                AstKind::Expr(expr) => {
                    self.eval(*expr)?;
                }
                _ => {
                    return Err(RenderError::TypeError(
                        "unsupported statement in render function".into(),
                    ));
                }
            }
        }
        Ok(Flow::Normal)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn lookup(&self, name: &str) -> RtValue {
        for frame in self.locals.iter().rev() {
            if let Some(value) = frame.get(name) {
                return value.clone();
            }
        }
        if name == "this" {
            return RtValue::Json(Value::Object(self.scope.clone()));
        }
        self.scope
            .get(name)
            .cloned()
            .map(RtValue::Json)
            .unwrap_or(NULL)
    }

    fn is_local(&self, name: &str) -> bool {
        self.locals.iter().any(|frame| frame.contains_key(name))
    }

    fn eval(&mut self, id: AstId) -> Result<RtValue, RenderError> {
        let ast = self.ast;
        Ok(match ast.get(id) {
            AstKind::Str(value) => RtValue::Json(Value::String(value.clone())),
            AstKind::Num(value) => RtValue::Json(number(*value)),
            AstKind::Bool(value) => RtValue::Json(Value::Bool(*value)),
            AstKind::Null | AstKind::Placeholder => NULL,
            AstKind::Ident(name) => self.lookup(name),
            AstKind::Member { object, property } => {
                let object = self.eval(*object)?;
                member(object, property)?
            }
            AstKind::Index { object, index } => {
                let object = self.eval(*object)?;
                let index = self.eval(*index)?;
                index_value(object, index)?
            }
            AstKind::Call { callee, arguments } => self.call(*callee, arguments)?,
            AstKind::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for &element in elements {
                    items.push(self.eval(element)?);
                }
                if items.iter().all(|item| matches!(item, RtValue::Json(_))) {
                    RtValue::Json(Value::Array(
                        items.into_iter().map(RtValue::into_json).collect(),
                    ))
                } else {
                    RtValue::List(items)
                }
            }
            AstKind::Object(properties) => {
                let mut map = Map::new();
                for property in properties {
                    let value = self.eval(property.value)?;
                    map.insert(property.key.to_string(), value.into_json());
                }
                RtValue::Json(Value::Object(map))
            }
            AstKind::Unary {
                op: UnaryOp::Not,
                argument,
            } => RtValue::Json(Value::Bool(!self.eval(*argument)?.truthy())),
            AstKind::Binary { op, left, right } => self.binary(*op, *left, *right)?,
            AstKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(*test)?.truthy() {
                    self.eval(*consequent)?
                } else {
                    self.eval(*alternate)?
                }
            }
            AstKind::Arrow { params, body } => RtValue::Closure(Rc::new(Closure {
                params: params.clone(),
                body: *body,
                env: self.locals.clone(),
            })),
            AstKind::Function { .. }
            | AstKind::Return(_)
            | AstKind::Declare { .. }
            | AstKind::If { .. }
            | AstKind::Expr(_) => {
                return Err(RenderError::TypeError(
                    "statement in expression position".into(),
                ));
            }
        })
    }

    fn binary(&mut self, op: BinaryOp, left: AstId, right: AstId) -> Result<RtValue, RenderError> {
        let lhs = self.eval(left)?;
        match op {
            BinaryOp::And => {
                if lhs.truthy() {
                    self.eval(right)
                } else {
                    Ok(lhs)
                }
            }
            BinaryOp::Or => {
                if lhs.truthy() {
                    Ok(lhs)
                } else {
                    self.eval(right)
                }
            }
            BinaryOp::StrictEq | BinaryOp::StrictNotEq => {
                let rhs = self.eval(right)?;
                let equal = strict_equals(&lhs, &rhs);
                Ok(RtValue::Json(Value::Bool(
                    equal == (op == BinaryOp::StrictEq),
                )))
            }
            BinaryOp::Add => {
                let rhs = self.eval(right)?;
                if let (RtValue::Json(Value::Number(a)), RtValue::Json(Value::Number(b))) =
                    (&lhs, &rhs)
                {
                    let sum = a.as_f64().unwrap_or(f64::NAN) + b.as_f64().unwrap_or(f64::NAN);
                    return Ok(RtValue::Json(number(sum)));
                }
                let mut out = lhs.string();
                out.push_str(&rhs.string());
                Ok(RtValue::Json(Value::String(out)))
            }
        }
    }

    fn call(&mut self, callee: AstId, arguments: &[AstId]) -> Result<RtValue, RenderError> {
        let ast = self.ast;
        if let AstKind::Ident(name) = ast.get(callee) {
            if !self.is_local(name) {
                let Some(helper) = RenderHelper::from_name(name) else {
                    return Err(RenderError::UnknownFunction { name: name.clone() });
                };
                let mut args = Vec::with_capacity(arguments.len());
                for &argument in arguments {
                    args.push(self.eval(argument)?);
                }
                return self.call_helper(helper, args);
            }
        }

        let function = self.eval(callee)?;
        let RtValue::Closure(closure) = function else {
            return Err(RenderError::UnknownFunction {
                name: generate_expression(ast, callee).into(),
            });
        };
        let mut args = Vec::with_capacity(arguments.len());
        for &argument in arguments {
            args.push(self.eval(argument)?);
        }
        self.invoke(&closure, args)
    }

    fn invoke(&mut self, closure: &Closure, args: Vec<RtValue>) -> Result<RtValue, RenderError> {
        let mut frame = Frame::default();
        let mut args = args.into_iter();
        for param in &closure.params {
            frame.insert(param.clone(), args.next().unwrap_or(NULL));
        }
        let saved = std::mem::replace(&mut self.locals, closure.env.clone());
        self.locals.push(frame);
        let result = self.eval(closure.body);
        self.locals = saved;
        result
    }

    fn call_helper(
        &mut self,
        helper: RenderHelper,
        args: Vec<RtValue>,
    ) -> Result<RtValue, RenderError> {
        let mut args = args.into_iter();
        match helper {
            RenderHelper::CreateElement => {
                let tag = match args.next() {
                    Some(RtValue::Json(Value::String(tag))) => tag,
                    _ => return Err(RenderError::TypeError("`_c` expects a tag name".into())),
                };
                let (data, children) = match args.next() {
                    Some(RtValue::Json(data @ Value::Object(_))) => (Some(data), args.next()),
                    Some(RtValue::Json(Value::Null)) => (None, args.next()),
                    other => (None, other),
                };
                self.create_element(&tag, data, children)
            }
            RenderHelper::CreateText => {
                let text = args.next().map(|v| v.string()).unwrap_or_default();
                Ok(RtValue::Node(VNode::text(text)))
            }
            RenderHelper::CreateEmpty => {
                let text = match args.next() {
                    Some(RtValue::Json(Value::Null)) | None => String::new(),
                    Some(value) => value.string(),
                };
                Ok(RtValue::Node(VNode::comment(text)))
            }
            RenderHelper::ToDisplayString => {
                let value = args.next().unwrap_or(NULL);
                Ok(RtValue::Json(Value::String(value.display())))
            }
            RenderHelper::RenderList => {
                let list = args.next().unwrap_or(NULL);
                let Some(RtValue::Closure(closure)) = args.next() else {
                    return Err(RenderError::TypeError(
                        "`_l` expects a render callback".into(),
                    ));
                };
                self.render_list(list, &closure)
            }
            RenderHelper::SsrNode => {
                let open = args.next().map(|v| v.string()).unwrap_or_default();
                let close = match args.next() {
                    Some(RtValue::Json(Value::Null)) | None => String::new(),
                    Some(value) => value.string(),
                };
                let mut children = Vec::new();
                if let Some(list) = args.next() {
                    flatten(list, false, &mut children);
                }
                Ok(RtValue::Node(VNode::new(
                    VNodeKind::StringFragment { open, close },
                    children,
                )))
            }
            RenderHelper::SsrEscape => {
                let value = args.next().unwrap_or(NULL);
                Ok(RtValue::Json(Value::String(
                    escape_html(&value.display()).into_owned(),
                )))
            }
        }
    }

    fn create_element(
        &mut self,
        tag: &str,
        data: Option<Value>,
        children: Option<RtValue>,
    ) -> Result<RtValue, RenderError> {
        let data = match data {
            Some(data) => VNodeData::from_json(&data)?,
            None => VNodeData::default(),
        };
        let entry = self
            .instance
            .def()
            .components
            .get(tag)
            .or_else(|| self.globals.get(tag));
        let node = match entry {
            Some(ComponentEntry::Sync(def)) => VNode::component(def.clone(), data),
            Some(ComponentEntry::Async(factory)) => VNode::new(
                VNodeKind::AsyncComponent {
                    factory: factory.clone(),
                    data,
                },
                Vec::new(),
            ),
            None => {
                let mut nodes = Vec::new();
                if let Some(children) = children {
                    flatten(children, is_raw_text_tag(tag), &mut nodes);
                }
                VNode::element(tag, data, nodes)
            }
        };
        Ok(RtValue::Node(node))
    }

    fn render_list(&mut self, list: RtValue, closure: &Closure) -> Result<RtValue, RenderError> {
        let mut out = Vec::new();
        match list {
            RtValue::Json(Value::Array(items)) => {
                for (i, item) in items.into_iter().enumerate() {
                    let args = vec![RtValue::Json(item), RtValue::Json(Value::from(i))];
                    out.push(self.invoke(closure, args)?);
                }
            }
            RtValue::List(items) => {
                for (i, item) in items.into_iter().enumerate() {
                    out.push(self.invoke(closure, vec![item, RtValue::Json(Value::from(i))])?);
                }
            }
            RtValue::Json(Value::Number(n)) => {
                let count = n.as_f64().unwrap_or(0.0).max(0.0) as usize;
                for i in 0..count {
                    let args = vec![
                        RtValue::Json(Value::from(i + 1)),
                        RtValue::Json(Value::from(i)),
                    ];
                    out.push(self.invoke(closure, args)?);
                }
            }
            RtValue::Json(Value::String(s)) => {
                for (i, ch) in s.chars().enumerate() {
                    let args = vec![
                        RtValue::Json(Value::String(ch.to_string())),
                        RtValue::Json(Value::from(i)),
                    ];
                    out.push(self.invoke(closure, args)?);
                }
            }
            RtValue::Json(Value::Object(map)) => {
                for (i, (key, value)) in map.into_iter().enumerate() {
                    let args = vec![
                        RtValue::Json(value),
                        RtValue::Json(Value::String(key)),
                        RtValue::Json(Value::from(i)),
                    ];
                    out.push(self.invoke(closure, args)?);
                }
            }
            _ => {}
        }
        Ok(RtValue::List(out))
    }
}

fn member(object: RtValue, property: &str) -> Result<RtValue, RenderError> {
    Ok(match object {
        RtValue::Json(Value::Null) => {
            return Err(RenderError::TypeError(format!(
                "cannot read properties of null (reading '{}')",
                property
            )));
        }
        RtValue::Json(Value::Object(mut map)) => map.remove(property).map(RtValue::Json).unwrap_or(NULL),
        RtValue::Json(Value::Array(items)) if property == "length" => {
            RtValue::Json(Value::from(items.len()))
        }
        RtValue::Json(Value::String(s)) if property == "length" => {
            RtValue::Json(Value::from(s.chars().count()))
        }
        RtValue::List(items) if property == "length" => RtValue::Json(Value::from(items.len())),
        _ => NULL,
    })
}

fn index_value(object: RtValue, index: RtValue) -> Result<RtValue, RenderError> {
    let position = match &index {
        RtValue::Json(Value::Number(n)) => n.as_f64().filter(|n| *n >= 0.0).map(|n| n as usize),
        _ => None,
    };
    Ok(match object {
        RtValue::Json(Value::Null) => {
            return Err(RenderError::TypeError(format!(
                "cannot read properties of null (reading '{}')",
                index.string()
            )));
        }
        RtValue::Json(Value::Array(mut items)) => match position {
            Some(i) if i < items.len() => RtValue::Json(items.swap_remove(i)),
            _ => NULL,
        },
        RtValue::List(mut items) => match position {
            Some(i) if i < items.len() => items.swap_remove(i),
            _ => NULL,
        },
        RtValue::Json(Value::Object(mut map)) => {
            map.remove(&index.string()).map(RtValue::Json).unwrap_or(NULL)
        }
        _ => NULL,
    })
}

fn strict_equals(a: &RtValue, b: &RtValue) -> bool {
    match (a, b) {
        (RtValue::Json(Value::Number(x)), RtValue::Json(Value::Number(y))) => {
            x.as_f64() == y.as_f64()
        }
        (RtValue::Json(x), RtValue::Json(y)) => match (x, y) {
            // Structures compare by identity in JavaScript; fresh values never match.
            (Value::Array(_) | Value::Object(_), _) => false,
            _ => x == y,
        },
        (RtValue::Node(x), RtValue::Node(y)) => VNodeRef::ptr_eq(x, y),
        (RtValue::Closure(x), RtValue::Closure(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// Normalize a children value into nodes: arrays are flattened, `null` and
/// booleans are dropped, other primitives become text nodes.
fn flatten(value: RtValue, raw: bool, out: &mut Vec<VNodeRef>) {
    match value {
        RtValue::Node(node) => match &node.kind {
            VNodeKind::Text { text, raw: false } if raw => out.push(VNode::new(
                VNodeKind::Text {
                    text: text.clone(),
                    raw: true,
                },
                Vec::new(),
            )),
            _ => out.push(node),
        },
        RtValue::List(items) => {
            for item in items {
                flatten(item, raw, out);
            }
        }
        RtValue::Json(Value::Array(items)) => {
            for item in items {
                flatten(RtValue::Json(item), raw, out);
            }
        }
        RtValue::Json(Value::Null | Value::Bool(_)) | RtValue::Closure(_) => {}
        RtValue::Json(value) => out.push(VNode::new(
            VNodeKind::Text {
                text: js_string(&value),
                raw,
            },
            Vec::new(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentDef, Pass};
    use serde_json::json;
    use std::sync::Arc;

    fn instance(source: &str, data: Value) -> Instance {
        let def = ComponentDef::builder("test")
            .render(source)
            .data(data)
            .build()
            .unwrap();
        Instance::new(def, &VNodeData::default(), None, Pass::Dynamic)
    }

    fn run(source: &str, data: Value) -> Result<VNodeRef, RenderError> {
        let instance = instance(source, data);
        let f = instance.render_fn().unwrap();
        render(&f, &instance, &Components::default())
    }

    fn texts(node: &VNode) -> Vec<String> {
        node.children
            .iter()
            .filter_map(|c| match &c.kind {
                VNodeKind::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_element_with_data() {
        let node = run(
            r#"return _c("div", {attrs: {id: "app"}}, [_v("hi " + name)])"#,
            json!({"name": "bob"}),
        )
        .unwrap();
        let VNodeKind::Element { tag, data } = &node.kind else {
            panic!("expected element");
        };
        assert_eq!(tag, "div");
        assert_eq!(data.attrs["id"], json!("app"));
        assert_eq!(texts(&node), vec!["hi bob"]);
    }

    #[test]
    fn test_render_list() {
        let node = run(
            r#"return _c("ul", [_l(items, (item, i) => _c("li", [_v(i + ": " + _s(item.n))]))])"#,
            json!({"items": [{"n": 1}, {"n": 2}]}),
        )
        .unwrap();
        assert_eq!(node.children.len(), 2);
        assert_eq!(texts(&node.children[1]), vec!["1: 2"]);
    }

    #[test]
    fn test_primitive_children() {
        let node = run(r#"return _c("p", ["a", 1, null, true])"#, json!({})).unwrap();
        assert_eq!(texts(&node), vec!["a", "1"]);
    }

    #[test]
    fn test_raw_text_children() {
        let node = run(r#"return _c("script", [_v("a < b")])"#, json!({})).unwrap();
        assert!(matches!(
            node.children[0].kind,
            VNodeKind::Text { raw: true, .. }
        ));
    }

    #[test]
    fn test_display_string() {
        let node = run(
            r#"return _c("p", [_v(_s(missing)), _v(_s(obj)), _v(_ssrEscape("<b>"))])"#,
            json!({"obj": {"a": 1}}),
        )
        .unwrap();
        assert_eq!(texts(&node), vec!["", "{\n  \"a\": 1\n}", "&lt;b&gt;"]);
    }

    #[test]
    fn test_locals_and_branches() {
        let source = r#"
            const label = ok ? "yes" : "no";
            if (!ok) { return _e("off") }
            return _v(label)
        "#;
        let on = run(source, json!({"ok": true})).unwrap();
        assert!(matches!(&on.kind, VNodeKind::Text { text, .. } if text == "yes"));
        let off = run(source, json!({"ok": false})).unwrap();
        assert!(matches!(&off.kind, VNodeKind::Comment { text } if text == "off"));
    }

    #[test]
    fn test_string_fragment() {
        let node = run(
            r#"return _ssrNode("<p>", "</p>", [_v(a === 1 && "one")])"#,
            json!({"a": 1}),
        )
        .unwrap();
        let VNodeKind::StringFragment { open, close } = &node.kind else {
            panic!("expected fragment");
        };
        assert_eq!((open.as_str(), close.as_str()), ("<p>", "</p>"));
        assert_eq!(texts(&node), vec!["one"]);
    }

    #[test]
    fn test_components_resolve_locally_then_globally() {
        let child = ComponentDef::builder("child")
            .render(r#"return _v("c")"#)
            .build()
            .unwrap();
        let def = ComponentDef::builder("parent")
            .render(r#"return _c("div", [_c("child"), _c("global-one")])"#)
            .component("child", child)
            .build()
            .unwrap();
        let global = ComponentDef::builder("global-one")
            .render(r#"return _v("g")"#)
            .build()
            .unwrap();
        let mut globals = Components::default();
        globals.insert("global-one".into(), ComponentEntry::Sync(Arc::clone(&global)));

        let instance = Instance::new(def, &VNodeData::default(), None, Pass::Static);
        let node = render(&instance.render_fn().unwrap(), &instance, &globals).unwrap();
        assert!(matches!(&node.children[0].kind, VNodeKind::Component { def, .. } if def.name == "child"));
        assert!(matches!(&node.children[1].kind, VNodeKind::Component { def, .. } if def.name == "global-one"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            run(r#"return _c("p", [_v(user.name)])"#, json!({})),
            Err(RenderError::TypeError(_))
        ));
        assert!(matches!(
            run(r#"return explode()"#, json!({})),
            Err(RenderError::UnknownFunction { name }) if name == "explode"
        ));
        assert!(matches!(
            run(r#"_v("x")"#, json!({})),
            Err(RenderError::NoReturn { .. })
        ));
        assert!(matches!(
            run(r#"return "text""#, json!({})),
            Err(RenderError::NotANode { .. })
        ));
    }

    #[test]
    fn test_isolation() {
        // Helpers and scope are all a render function can reach.
        assert!(matches!(
            run(r#"return _v(_s(process))"#, json!({})).unwrap().kind,
            VNodeKind::Text { ref text, .. } if text.is_empty()
        ));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(js_string(&json!(2)), "2");
        assert_eq!(js_string(&json!(["a", null, 1])), "a,,1");
    }
}
