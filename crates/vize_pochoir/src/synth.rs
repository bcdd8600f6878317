//! Render-function synthesis and validation.
//!
//! A rewritten render function is printed, parsed back into a fresh
//! [`RenderFunction`] and executed once against the live static instance.
//! Anything that fails to parse or to run is discarded and the caller keeps
//! the component's original render function.

use vize_carton::hash::SourceCache;
use vize_maquette::{Instance, RenderEngine, RenderError, RenderFunction, VNodeRef};
use vize_relief::rewrite::literal_render_function;
use vize_relief::{generate, Ast, AstId};

use crate::errors::OptimizeError;

/// Compiles synthesized render functions, sharing identical sources
#[derive(Debug)]
pub struct Synthesizer {
    cache: SourceCache<RenderFunction>,
    validate: bool,
}

impl Synthesizer {
    pub fn new(validate: bool) -> Self {
        Self {
            cache: SourceCache::new(),
            validate,
        }
    }

    fn compile(&mut self, source: String) -> Result<RenderFunction, RenderError> {
        if let Some(cached) = self.cache.get(&source) {
            return Ok(cached);
        }
        let render = RenderFunction::compile(source)?;
        self.cache.insert(render.source(), render.clone());
        Ok(render)
    }

    /// A render function that emits `text` verbatim.
    pub fn literal(&mut self, text: &str) -> Result<RenderFunction, OptimizeError> {
        let mut ast = Ast::new();
        let function = literal_render_function(&mut ast, text);
        Ok(self.compile(generate(&ast, function))?)
    }

    /// Print `function` and compile it, validating it against `instance`.
    ///
    /// Returns `None` when the result cannot be used.
    pub fn synthesize<E>(
        &mut self,
        engine: &E,
        ast: &Ast,
        function: AstId,
        instance: &Instance,
    ) -> Option<RenderFunction>
    where
        E: RenderEngine + ?Sized,
    {
        let render = match self.compile(generate(ast, function)) {
            Ok(render) => render,
            Err(error) => {
                tracing::warn!(component = %instance.name(), %error, "synthesized render function does not compile");
                return None;
            }
        };
        if self.validate {
            if let Err(error) = validate(engine, instance, &render) {
                tracing::warn!(component = %instance.name(), %error, "synthesized render function failed validation");
                return None;
            }
        }
        tracing::debug!(component = %instance.name(), hash = render.hash(), "synthesized render function");
        Some(render)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Run `render` as the instance's render function once, then restore the
/// instance's own function whatever the outcome.
pub fn validate<E>(
    engine: &E,
    instance: &Instance,
    render: &RenderFunction,
) -> Result<VNodeRef, RenderError>
where
    E: RenderEngine + ?Sized,
{
    let previous = instance.replace_render(Some(render.clone()));
    let result = engine.render(instance);
    instance.replace_render(previous);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use vize_maquette::{ComponentDef, Maquette, Pass, VNodeData, VNodeKind};

    fn instance(engine: &Maquette, source: &str) -> std::sync::Arc<Instance> {
        let def = ComponentDef::builder("probe").render(source).build().unwrap();
        engine.instantiate(&def, &VNodeData::default(), None, Pass::Static)
    }

    #[test]
    fn test_literal_is_verbatim() {
        let mut synth = Synthesizer::new(true);
        let render = synth.literal("<p title=\"${x}\">\\</p>").unwrap();
        insta::assert_snapshot!(render.source(), @r#"
        function render() {
          return _ssrNode("<p title=\"${x}\">\\</p>");
        }
        "#);

        let engine = Maquette::new();
        let probe = instance(&engine, r#"return _v("x")"#);
        let node = validate(&engine, &probe, &render).unwrap();
        let VNodeKind::StringFragment { open, .. } = &node.kind else {
            panic!("expected a string fragment");
        };
        assert_eq!(open, "<p title=\"${x}\">\\</p>");
    }

    #[test]
    fn test_identical_sources_are_shared() {
        let mut synth = Synthesizer::new(true);
        let a = synth.literal("<b>").unwrap();
        let b = synth.literal("<b>").unwrap();
        assert!(RenderFunction::ptr_eq(&a, &b));
        assert_eq!(synth.cached(), 1);
    }

    #[test]
    fn test_validation_restores_render() {
        let engine = Maquette::new();
        let probe = instance(&engine, r#"return _c("p")"#);
        let original = probe.render_fn();

        let mut ast = Ast::new();
        let function = vize_armature::parse_into(&mut ast, r#"return _c("p", [_v(user.name)])"#).unwrap();
        let mut synth = Synthesizer::new(true);
        assert!(synth.synthesize(&engine, &ast, function, &probe).is_none());
        assert_eq!(probe.render_fn(), original);

        let mut lenient = Synthesizer::new(false);
        assert!(lenient.synthesize(&engine, &ast, function, &probe).is_some());
        assert_eq!(probe.render_fn(), original);
    }

    #[test]
    fn test_synthesize_accepts_working_function() {
        let engine = Maquette::new();
        let probe = instance(&engine, r#"return _c("p")"#);
        let mut ast = Ast::new();
        let function = vize_armature::parse_into(&mut ast, r#"return _ssrNode("<p>", "</p>", [_v("x")])"#).unwrap();
        let render = Synthesizer::new(true)
            .synthesize(&engine, &ast, function, &probe)
            .unwrap();
        assert!(render.source().starts_with("function () {"));
    }
}
