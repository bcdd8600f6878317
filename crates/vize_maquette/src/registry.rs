//! Directive and module registry.
//!
//! Start tags are produced in a fixed order: directives other than `show`
//! mutate the node data, the `show` bindings of the node and of the component
//! nodes it is the root of are merged, every module appends its text, then
//! scope ids are added.

use std::sync::Arc;

use serde_json::{Map, Value};
use vize_carton::{escape_html, is_void_tag, CompactString, FxHashMap, SmallVec};

use crate::interpreter::{js_string, truthy};
use crate::vnode::{DirectiveBinding, VNodeData};

/// Mutates node data before the start tag is built
pub type DirectiveFn = Arc<dyn Fn(&mut VNodeData, &DirectiveBinding) + Send + Sync>;

/// Contributes text to the start tag
pub type ModuleFn = Arc<dyn Fn(&VNodeData) -> Option<String> + Send + Sync>;

/// Context an element inherits from its position in the tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagContext {
    /// `show` values of the component nodes this element is the root of.
    pub inherited_show: SmallVec<[bool; 2]>,
    pub scope_ids: SmallVec<[CompactString; 2]>,
}

impl TagContext {
    /// Context of an element rendered by a component with `scope_id`.
    pub fn owned_by(scope_id: Option<&str>) -> Self {
        Self {
            inherited_show: SmallVec::new(),
            scope_ids: scope_id.map(CompactString::from).into_iter().collect(),
        }
    }

    /// Context of the root of a component whose node sits at `self`.
    pub fn nest(&self, data: &VNodeData, scope_id: Option<&str>) -> Self {
        let mut nested = self.clone();
        if let Some(show) = data.directive("show") {
            nested.inherited_show.push(truthy(&show.value));
        }
        if let Some(id) = scope_id {
            nested.scope_ids.push(id.into());
        }
        nested
    }
}

/// Named directives and ordered modules
#[derive(Clone)]
pub struct Registry {
    directives: FxHashMap<CompactString, DirectiveFn>,
    modules: Vec<(CompactString, ModuleFn)>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .module("attrs", |data| render_attrs(&data.attrs, false))
            .module("domProps", |data| render_attrs(&data.dom_props, true))
            .module("class", render_class)
            .module("style", render_style);
        registry
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("directives", &self.directives.keys().collect::<Vec<_>>())
            .field(
                "modules",
                &self.modules.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Registry {
    /// A registry with no directives or modules.
    pub fn empty() -> Self {
        Self {
            directives: FxHashMap::default(),
            modules: Vec::new(),
        }
    }

    pub fn directive<F>(&mut self, name: &str, directive: F) -> &mut Self
    where
        F: Fn(&mut VNodeData, &DirectiveBinding) + Send + Sync + 'static,
    {
        self.directives.insert(name.into(), Arc::new(directive));
        self
    }

    /// Append a module. Modules run in registration order.
    pub fn module<F>(&mut self, name: &str, module: F) -> &mut Self
    where
        F: Fn(&VNodeData) -> Option<String> + Send + Sync + 'static,
    {
        self.modules.push((name.into(), Arc::new(module)));
        self
    }

    /// Build the start tag of an element.
    pub fn render_start_tag(&self, tag: &str, data: &VNodeData, ctx: &TagContext) -> String {
        let mut data = data.clone();

        let bindings = std::mem::take(&mut data.directives);
        for binding in &bindings {
            if binding.name == "show" {
                continue;
            }
            match self.directives.get(&binding.name) {
                Some(directive) => directive(&mut data, binding),
                None => tracing::trace!(directive = %binding.name, "unknown directive ignored"),
            }
        }

        let hidden = bindings
            .iter()
            .filter(|b| b.name == "show")
            .map(|b| truthy(&b.value))
            .chain(ctx.inherited_show.iter().copied())
            .any(|shown| !shown);
        if hidden {
            let mut declarations = style_declarations(&data);
            declarations.retain(|(name, _)| name != "display");
            declarations.push(("display".into(), "none".into()));
            data.static_style = None;
            data.style = Some(Value::Object(
                declarations
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect::<Map<_, _>>(),
            ));
        }
        data.directives = bindings;

        let mut out = String::with_capacity(tag.len() + 16);
        out.push('<');
        out.push_str(tag);
        for (_, module) in &self.modules {
            if let Some(text) = module(&data) {
                out.push_str(&text);
            }
        }
        let mut seen: SmallVec<[&str; 2]> = SmallVec::new();
        for id in &ctx.scope_ids {
            if !seen.contains(&id.as_str()) {
                seen.push(id.as_str());
                out.push(' ');
                out.push_str(id);
            }
        }
        out.push('>');
        out
    }
}

/// Closing tag, or `None` for void elements.
pub fn end_tag(tag: &str) -> Option<String> {
    if is_void_tag(tag) {
        None
    } else {
        Some(format!("</{}>", tag))
    }
}

fn render_attrs(attrs: &Map<String, Value>, dom_props: bool) -> Option<String> {
    let mut out = String::new();
    for (name, value) in attrs {
        if dom_props && (name == "innerHTML" || name == "textContent") {
            continue;
        }
        match value {
            Value::Null | Value::Bool(false) => {}
            Value::Bool(true) => {
                out.push(' ');
                out.push_str(name);
            }
            other => {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_html(&js_string(other)));
                out.push('"');
            }
        }
    }
    (!out.is_empty()).then_some(out)
}

fn class_names(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(s.split_whitespace().map(str::to_owned)),
        Value::Array(items) => {
            for item in items {
                class_names(item, out);
            }
        }
        Value::Object(map) => {
            for (name, enabled) in map {
                if truthy(enabled) {
                    out.push(name.clone());
                }
            }
        }
        _ => {}
    }
}

fn render_class(data: &VNodeData) -> Option<String> {
    let mut names = Vec::new();
    if let Some(static_class) = &data.static_class {
        names.extend(static_class.split_whitespace().map(str::to_owned));
    }
    if let Some(class) = &data.class {
        class_names(class, &mut names);
    }
    if names.is_empty() {
        return None;
    }
    Some(format!(" class=\"{}\"", escape_html(&names.join(" "))))
}

fn parse_style_text(text: &str, out: &mut Vec<(String, String)>) {
    for declaration in text.split(';') {
        if let Some((name, value)) = declaration.split_once(':') {
            let (name, value) = (name.trim(), value.trim());
            if !name.is_empty() && !value.is_empty() {
                out.push((name.to_string(), value.to_string()));
            }
        }
    }
}

fn push_style_value(value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::String(text) => parse_style_text(text, out),
        Value::Array(items) => {
            for item in items {
                push_style_value(item, out);
            }
        }
        Value::Object(map) => {
            for (name, value) in map {
                if matches!(value, Value::Null) {
                    continue;
                }
                out.retain(|(existing, _)| existing != name);
                out.push((name.clone(), js_string(value)));
            }
        }
        _ => {}
    }
}

/// Style declarations of a node in application order, later ones winning.
pub fn style_declarations(data: &VNodeData) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let Some(text) = &data.static_style {
        parse_style_text(text, &mut out);
    }
    if let Some(style) = &data.style {
        push_style_value(style, &mut out);
    }
    out
}

fn render_style(data: &VNodeData) -> Option<String> {
    let declarations = style_declarations(data);
    if declarations.is_empty() {
        return None;
    }
    let text = declarations
        .iter()
        .map(|(name, value)| format!("{}:{}", name, value))
        .collect::<Vec<_>>()
        .join(";");
    Some(format!(" style=\"{}\"", escape_html(&text)))
}
