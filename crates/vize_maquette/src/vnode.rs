//! Virtual nodes produced by render functions.
//!
//! Nodes are immutable once built and shared through [`VNodeRef`]. Anything
//! the optimizer learns about a node is kept outside of it.

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::{Map, Value};
use vize_carton::{escape_html, CompactString};

use crate::async_factory::AsyncFactory;
use crate::component::ComponentDef;
use crate::errors::RenderError;

pub type VNodeRef = Arc<VNode>;

/// A node of a rendered tree
#[derive(Debug, Clone)]
pub struct VNode {
    pub kind: VNodeKind,
    pub children: Vec<VNodeRef>,
}

impl Drop for VNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Ok(mut node) = Arc::try_unwrap(node) {
                pending.append(&mut node.children);
            }
        }
    }
}

/// Node payload
#[derive(Debug, Clone)]
pub enum VNodeKind {
    /// Text. `raw` text (content of `<script>`/`<style>`) is emitted unescaped.
    Text { text: String, raw: bool },
    Comment { text: String },
    Element { tag: CompactString, data: VNodeData },
    Component {
        def: Arc<ComponentDef>,
        data: VNodeData,
    },
    AsyncComponent {
        factory: AsyncFactory,
        data: VNodeData,
    },
    /// Pre-serialized markup: `open`, then the children, then `close`.
    StringFragment { open: String, close: String },
}

/// Kind discriminant used for pairing and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Text,
    Comment,
    Element,
    Component,
    AsyncComponent,
    StringFragment,
}

impl VNode {
    pub fn new(kind: VNodeKind, children: Vec<VNodeRef>) -> VNodeRef {
        Arc::new(Self { kind, children })
    }

    pub fn text(text: impl Into<String>) -> VNodeRef {
        Self::new(
            VNodeKind::Text {
                text: text.into(),
                raw: false,
            },
            Vec::new(),
        )
    }

    pub fn comment(text: impl Into<String>) -> VNodeRef {
        Self::new(VNodeKind::Comment { text: text.into() }, Vec::new())
    }

    pub fn element(tag: &str, data: VNodeData, children: Vec<VNodeRef>) -> VNodeRef {
        Self::new(
            VNodeKind::Element {
                tag: tag.into(),
                data,
            },
            children,
        )
    }

    /// A component placeholder node.
    pub fn component(def: Arc<ComponentDef>, data: VNodeData) -> VNodeRef {
        Self::new(VNodeKind::Component { def, data }, Vec::new())
    }

    pub fn async_component(factory: AsyncFactory, data: VNodeData) -> VNodeRef {
        Self::new(VNodeKind::AsyncComponent { factory, data }, Vec::new())
    }

    pub fn node_kind(&self) -> NodeKind {
        match &self.kind {
            VNodeKind::Text { .. } => NodeKind::Text,
            VNodeKind::Comment { .. } => NodeKind::Comment,
            VNodeKind::Element { .. } => NodeKind::Element,
            VNodeKind::Component { .. } => NodeKind::Component,
            VNodeKind::AsyncComponent { .. } => NodeKind::AsyncComponent,
            VNodeKind::StringFragment { .. } => NodeKind::StringFragment,
        }
    }

    /// Serialized form of a text node: raw text verbatim, anything else escaped.
    pub fn text_markup(&self) -> Option<Cow<'_, str>> {
        match &self.kind {
            VNodeKind::Text { text, raw: true } => Some(Cow::Borrowed(text)),
            VNodeKind::Text { text, raw: false } => Some(escape_html(text)),
            _ => None,
        }
    }
}

/// A directive applied to an element, e.g. `v-show`
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveBinding {
    pub name: CompactString,
    pub value: Value,
}

/// Node data decoded from the object literal passed to `_c`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VNodeData {
    pub attrs: Map<String, Value>,
    pub dom_props: Map<String, Value>,
    pub static_class: Option<String>,
    pub class: Option<Value>,
    pub static_style: Option<String>,
    pub style: Option<Value>,
    pub props: Map<String, Value>,
    pub directives: Vec<DirectiveBinding>,
    /// Position of this component among the children of the enclosing
    /// render tree slot. Stamped into synthesized render functions.
    pub tree_slot: Option<usize>,
}

fn expect_object(key: &str, value: &Value) -> Result<Map<String, Value>, RenderError> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        _ => Err(RenderError::TypeError(format!(
            "`{}` must be an object",
            key
        ))),
    }
}

impl VNodeData {
    /// Data carrying only component props. Non-object values give no props.
    pub fn with_props(props: Value) -> Self {
        Self {
            props: match props {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            ..Self::default()
        }
    }

    /// Decode node data from an evaluated object literal. Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self, RenderError> {
        let Value::Object(map) = value else {
            return Err(RenderError::TypeError("node data must be an object".into()));
        };
        let mut data = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "attrs" => data.attrs = expect_object(key, value)?,
                "domProps" => data.dom_props = expect_object(key, value)?,
                "props" => data.props = expect_object(key, value)?,
                "staticClass" => data.static_class = value.as_str().map(str::to_owned),
                "class" => data.class = Some(value.clone()),
                "staticStyle" => data.static_style = value.as_str().map(str::to_owned),
                "style" => data.style = Some(value.clone()),
                "treeSlot" => data.tree_slot = value.as_u64().map(|n| n as usize),
                "directives" => {
                    let Value::Array(items) = value else {
                        return Err(RenderError::TypeError(
                            "`directives` must be an array".into(),
                        ));
                    };
                    for item in items {
                        let name = item.get("name").and_then(Value::as_str).ok_or_else(|| {
                            RenderError::TypeError("directive binding needs a `name`".into())
                        })?;
                        data.directives.push(DirectiveBinding {
                            name: name.into(),
                            value: item.get("value").cloned().unwrap_or(Value::Null),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(data)
    }

    /// Markup replacing the element's children, from `innerHTML` (raw) or
    /// `textContent` (escaped).
    pub fn content_override(&self) -> Option<String> {
        if let Some(html) = self.dom_props.get("innerHTML") {
            return Some(crate::interpreter::to_display(html));
        }
        self.dom_props
            .get("textContent")
            .map(|text| escape_html(&crate::interpreter::to_display(text)).into_owned())
    }

    pub fn directive(&self, name: &str) -> Option<&DirectiveBinding> {
        self.directives.iter().find(|d| d.name.as_str() == name)
    }
}
