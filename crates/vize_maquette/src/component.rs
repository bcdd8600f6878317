//! Component definitions and instances.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use vize_carton::{CompactString, FxHashMap};

use crate::async_factory::AsyncFactory;
use crate::errors::RenderError;
use crate::render_fn::RenderFunction;
use crate::vnode::VNodeData;

/// Which of the two optimizer passes an instance belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Rendered without request-specific data.
    Static,
    /// Rendered with the real request data.
    Dynamic,
}

/// Input handed to a prefetch hook
#[derive(Debug, Clone)]
pub struct PrefetchRequest {
    pub pass: Pass,
    /// Snapshot of the instance scope (data overlaid with props).
    pub scope: Value,
}

pub type PrefetchFuture = BoxFuture<'static, Result<Value, String>>;

/// Asynchronous data hook run before a component renders. The returned
/// object is merged into the instance scope.
pub type PrefetchHook = Arc<dyn Fn(PrefetchRequest) -> PrefetchFuture + Send + Sync>;

/// Style metadata keyed by style id
pub type Styles = FxHashMap<CompactString, String>;

/// A locally or globally registered component
#[derive(Clone)]
pub enum ComponentEntry {
    Sync(Arc<ComponentDef>),
    Async(AsyncFactory),
}

impl fmt::Debug for ComponentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(def) => f.debug_tuple("Sync").field(&def.name).finish(),
            Self::Async(factory) => f.debug_tuple("Async").field(factory).finish(),
        }
    }
}

pub type Components = FxHashMap<CompactString, ComponentEntry>;

/// A component definition
pub struct ComponentDef {
    pub name: CompactString,
    pub render: Option<RenderFunction>,
    pub template: Option<String>,
    pub data: Map<String, Value>,
    pub prefetch: Vec<PrefetchHook>,
    pub components: Components,
    pub styles: Styles,
    pub scope_id: Option<CompactString>,
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("name", &self.name)
            .field("render", &self.render.as_ref().map(RenderFunction::source))
            .field("template", &self.template)
            .field("prefetch", &self.prefetch.len())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("scope_id", &self.scope_id)
            .finish_non_exhaustive()
    }
}

impl ComponentDef {
    pub fn builder(name: &str) -> ComponentDefBuilder {
        ComponentDefBuilder {
            name: name.into(),
            render: None,
            template: None,
            data: Map::new(),
            prefetch: Vec::new(),
            components: Components::default(),
            styles: Styles::default(),
            scope_id: None,
        }
    }
}

/// Builder for [`ComponentDef`]
pub struct ComponentDefBuilder {
    name: CompactString,
    render: Option<String>,
    template: Option<String>,
    data: Map<String, Value>,
    prefetch: Vec<PrefetchHook>,
    components: Components,
    styles: Styles,
    scope_id: Option<CompactString>,
}

impl ComponentDefBuilder {
    pub fn render(mut self, source: impl Into<String>) -> Self {
        self.render = Some(source.into());
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Default data. Non-object values are ignored.
    pub fn data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = map;
        }
        self
    }

    pub fn prefetch<F>(mut self, hook: F) -> Self
    where
        F: Fn(PrefetchRequest) -> PrefetchFuture + Send + Sync + 'static,
    {
        self.prefetch.push(Arc::new(hook));
        self
    }

    pub fn component(mut self, name: &str, def: Arc<ComponentDef>) -> Self {
        self.components.insert(name.into(), ComponentEntry::Sync(def));
        self
    }

    pub fn async_component(mut self, name: &str, factory: AsyncFactory) -> Self {
        self.components
            .insert(name.into(), ComponentEntry::Async(factory));
        self
    }

    pub fn style(mut self, id: &str, css: impl Into<String>) -> Self {
        self.styles.insert(id.into(), css.into());
        self
    }

    pub fn scope_id(mut self, id: &str) -> Self {
        self.scope_id = Some(id.into());
        self
    }

    /// Finish the definition, compiling the render source if one was given.
    pub fn build(self) -> Result<Arc<ComponentDef>, RenderError> {
        let render = self.render.map(RenderFunction::compile).transpose()?;
        Ok(Arc::new(ComponentDef {
            name: self.name,
            render,
            template: self.template,
            data: self.data,
            prefetch: self.prefetch,
            components: self.components,
            styles: self.styles,
            scope_id: self.scope_id,
        }))
    }
}

/// A live component instance for one pass
pub struct Instance {
    def: Arc<ComponentDef>,
    pass: Pass,
    parent: Option<Arc<Instance>>,
    scope: Mutex<Map<String, Value>>,
    render: Mutex<Option<RenderFunction>>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("component", &self.def.name)
            .field("pass", &self.pass)
            .field("parent", &self.parent.as_ref().map(|p| p.def.name.clone()))
            .finish_non_exhaustive()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        // Unlink uniquely owned ancestors one at a time.
        let mut parent = self.parent.take();
        while let Some(instance) = parent {
            parent = match Arc::try_unwrap(instance) {
                Ok(mut instance) => instance.parent.take(),
                Err(_) => None,
            };
        }
    }
}

impl Instance {
    /// Create an instance whose scope is the definition's data overlaid with
    /// the node's props.
    pub fn new(
        def: Arc<ComponentDef>,
        data: &VNodeData,
        parent: Option<Arc<Instance>>,
        pass: Pass,
    ) -> Self {
        let mut scope = def.data.clone();
        for (key, value) in &data.props {
            scope.insert(key.clone(), value.clone());
        }
        let render = def.render.clone();
        Self {
            def,
            pass,
            parent,
            scope: Mutex::new(scope),
            render: Mutex::new(render),
        }
    }

    #[inline]
    pub fn def(&self) -> &Arc<ComponentDef> {
        &self.def
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    #[inline]
    pub fn pass(&self) -> Pass {
        self.pass
    }

    pub fn parent(&self) -> Option<&Arc<Instance>> {
        self.parent.as_ref()
    }

    /// Snapshot of the current scope.
    pub fn scope(&self) -> Map<String, Value> {
        self.scope.lock().clone()
    }

    /// Merge an object into the scope. Non-object values are ignored.
    pub fn merge_data(&self, value: Value) {
        if let Value::Object(map) = value {
            let mut scope = self.scope.lock();
            for (key, value) in map {
                scope.insert(key, value);
            }
        }
    }

    pub fn render_fn(&self) -> Option<RenderFunction> {
        self.render.lock().clone()
    }

    /// Swap the render function, returning the previous one.
    pub fn replace_render(&self, render: Option<RenderFunction>) -> Option<RenderFunction> {
        std::mem::replace(&mut *self.render.lock(), render)
    }
}
