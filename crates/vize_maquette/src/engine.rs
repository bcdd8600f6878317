//! The rendering engine interface and its reference implementation.

use std::sync::Arc;

use futures::future::{try_join_all, LocalBoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use vize_carton::hash::SourceCache;

use crate::async_factory::AsyncFactory;
use crate::component::{
    ComponentDef, ComponentEntry, Components, Instance, Pass, PrefetchRequest,
};
use crate::errors::RenderError;
use crate::interpreter;
use crate::registry::Registry;
use crate::render_fn::RenderFunction;
use crate::serialize::{render_to_html, BaselinePlan};
use crate::vnode::{VNodeData, VNodeRef};

/// Compiles a template into render-function source
pub type TemplateCompiler = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

/// Everything the optimizer and the serializer need from a rendering engine.
pub trait RenderEngine {
    fn registry(&self) -> &Registry;

    /// Create an instance for a component node under `parent`.
    fn instantiate(
        &self,
        def: &Arc<ComponentDef>,
        data: &VNodeData,
        parent: Option<&Arc<Instance>>,
        pass: Pass,
    ) -> Arc<Instance>;

    fn compile_template(&self, def: &ComponentDef) -> Result<RenderFunction, RenderError>;

    /// Run the instance's prefetch hooks concurrently and merge their results
    /// into its scope.
    fn prefetch(&self, instance: &Arc<Instance>) -> LocalBoxFuture<'static, Result<(), RenderError>>;

    /// Invoke the instance's current render function.
    fn render(&self, instance: &Instance) -> Result<VNodeRef, RenderError>;

    fn has_prefetch(&self, instance: &Instance) -> bool {
        !instance.def().prefetch.is_empty()
    }

    /// The instance's render function, compiling its template when it has none.
    fn ensure_render(&self, instance: &Instance) -> Result<RenderFunction, RenderError> {
        if let Some(render) = instance.render_fn() {
            return Ok(render);
        }
        if instance.def().template.is_none() {
            return Err(RenderError::MissingRender {
                name: instance.def().name.clone(),
            });
        }
        let render = self.compile_template(instance.def())?;
        instance.replace_render(Some(render.clone()));
        Ok(render)
    }
}

/// Reference engine: globally registered components, a directive/module
/// registry and an optional template compiler.
pub struct Maquette {
    registry: Registry,
    components: Components,
    compiler: Option<TemplateCompiler>,
    template_cache: Mutex<SourceCache<RenderFunction>>,
}

impl Default for Maquette {
    fn default() -> Self {
        Self {
            registry: Registry::default(),
            components: Components::default(),
            compiler: None,
            template_cache: Mutex::new(SourceCache::new()),
        }
    }
}

impl Maquette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Register a global component.
    pub fn component(mut self, name: &str, def: Arc<ComponentDef>) -> Self {
        self.components.insert(name.into(), ComponentEntry::Sync(def));
        self
    }

    pub fn async_component(mut self, name: &str, factory: AsyncFactory) -> Self {
        self.components
            .insert(name.into(), ComponentEntry::Async(factory));
        self
    }

    pub fn template_compiler<F>(mut self, compiler: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.compiler = Some(Arc::new(compiler));
        self
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    /// Render a tree to HTML with every component using its own render function.
    pub async fn render_to_string(&self, root: VNodeRef) -> Result<String, RenderError> {
        render_to_html(self, root, &mut BaselinePlan).await
    }
}

impl RenderEngine for Maquette {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn instantiate(
        &self,
        def: &Arc<ComponentDef>,
        data: &VNodeData,
        parent: Option<&Arc<Instance>>,
        pass: Pass,
    ) -> Arc<Instance> {
        Arc::new(Instance::new(Arc::clone(def), data, parent.cloned(), pass))
    }

    fn compile_template(&self, def: &ComponentDef) -> Result<RenderFunction, RenderError> {
        let template = def.template.as_deref().ok_or_else(|| RenderError::MissingRender {
            name: def.name.clone(),
        })?;
        if let Some(cached) = self.template_cache.lock().get(template) {
            return Ok(cached);
        }
        let compiler = self
            .compiler
            .as_ref()
            .ok_or_else(|| RenderError::MissingCompiler {
                component: def.name.clone(),
            })?;
        let source = compiler(template).map_err(|message| RenderError::TemplateCompile {
            component: def.name.clone(),
            message,
        })?;
        let render = RenderFunction::compile(source)?;
        tracing::debug!(component = %def.name, "compiled template");
        self.template_cache.lock().insert(template, render.clone());
        Ok(render)
    }

    fn prefetch(&self, instance: &Arc<Instance>) -> LocalBoxFuture<'static, Result<(), RenderError>> {
        let instance = Arc::clone(instance);
        async move {
            let hooks = instance.def().prefetch.clone();
            if hooks.is_empty() {
                return Ok(());
            }
            let request = PrefetchRequest {
                pass: instance.pass(),
                scope: Value::Object(instance.scope()),
            };
            let results = try_join_all(hooks.iter().map(|hook| hook(request.clone())))
                .await
                .map_err(|message| RenderError::Prefetch {
                    component: instance.def().name.clone(),
                    message,
                })?;
            for result in results {
                instance.merge_data(result);
            }
            tracing::debug!(
                component = %instance.def().name,
                pass = ?instance.pass(),
                hooks = hooks.len(),
                "prefetched"
            );
            Ok(())
        }
        .boxed_local()
    }

    fn render(&self, instance: &Instance) -> Result<VNodeRef, RenderError> {
        let render = instance
            .render_fn()
            .ok_or_else(|| RenderError::MissingRender {
                name: instance.def().name.clone(),
            })?;
        interpreter::render(&render, instance, &self.components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_prefetch_merges_results() {
        let def = ComponentDef::builder("user")
            .render(r#"return _v(name)"#)
            .prefetch(|req| {
                async move {
                    Ok(match req.pass {
                        Pass::Static => json!({}),
                        Pass::Dynamic => json!({"name": "alice"}),
                    })
                }
                .boxed()
            })
            .build()
            .unwrap();
        let engine = Maquette::new();
        let instance = engine.instantiate(&def, &VNodeData::default(), None, Pass::Dynamic);
        assert!(engine.has_prefetch(&instance));
        engine.prefetch(&instance).await.unwrap();
        assert_eq!(instance.scope()["name"], json!("alice"));
    }

    #[tokio::test]
    async fn test_prefetch_failure() {
        let def = ComponentDef::builder("broken")
            .render(r#"return _v("x")"#)
            .prefetch(|_| async { Err("db down".to_string()) }.boxed())
            .build()
            .unwrap();
        let engine = Maquette::new();
        let instance = engine.instantiate(&def, &VNodeData::default(), None, Pass::Static);
        let err = engine.prefetch(&instance).await.unwrap_err();
        assert!(matches!(err, RenderError::Prefetch { message, .. } if message == "db down"));
    }

    #[test]
    fn test_ensure_render_compiles_template() {
        let def = ComponentDef::builder("tpl")
            .template("<p>hi</p>")
            .build()
            .unwrap();
        let engine = Maquette::new().template_compiler(|template| {
            Ok(format!("return _ssrNode({:?})", template))
        });
        let instance = engine.instantiate(&def, &VNodeData::default(), None, Pass::Static);
        let render = engine.ensure_render(&instance).unwrap();
        assert_eq!(render.source(), r#"return _ssrNode("<p>hi</p>")"#);
        assert_eq!(instance.render_fn(), Some(render));
    }

    #[test]
    fn test_ensure_render_errors() {
        let engine = Maquette::new();
        let bare = ComponentDef::builder("bare").build().unwrap();
        let instance = engine.instantiate(&bare, &VNodeData::default(), None, Pass::Static);
        assert!(matches!(
            engine.ensure_render(&instance),
            Err(RenderError::MissingRender { name }) if name == "bare"
        ));

        let tpl = ComponentDef::builder("tpl").template("<p></p>").build().unwrap();
        let instance = engine.instantiate(&tpl, &VNodeData::default(), None, Pass::Static);
        assert!(matches!(
            engine.ensure_render(&instance),
            Err(RenderError::MissingCompiler { .. })
        ));
    }
}
