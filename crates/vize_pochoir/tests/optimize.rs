//! End-to-end optimizer tests against the reference engine.

use std::cell::Cell;
use std::sync::Arc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};
use vize_maquette::{
    AsyncFactory, AsyncResolution, ComponentDef, Instance, Maquette, Pass, Registry, RenderEngine,
    RenderError, RenderFunction, VNode, VNodeData, VNodeRef,
};
use vize_pochoir::{
    optimize, optimize_component, ErrorKind, OptimizeError, OptimizeOptions, PatchContext,
    RenderTree, Resolved, Step, Suspension,
};
use vize_relief::AstKind;

fn node(def: &Arc<ComponentDef>, props: &Value) -> VNodeRef {
    VNode::component(Arc::clone(def), VNodeData::with_props(props.clone()))
}

/// Optimize `def`, then render it with `props` both through the tree and the
/// baseline pipeline.
async fn optimize_and_render<E>(
    engine: &E,
    baseline: &Maquette,
    def: &Arc<ComponentDef>,
    props: Value,
    options: OptimizeOptions,
) -> (RenderTree, String, String)
where
    E: RenderEngine + ?Sized,
{
    let tree = optimize_component(engine, def, props.clone(), options)
        .await
        .unwrap();
    let optimized = tree.render_html(engine, node(def, &props)).await.unwrap();
    let expected = baseline.render_to_string(node(def, &props)).await.unwrap();
    (tree, optimized, expected)
}

// =============================================================================
// Folding
// =============================================================================

mod folding {
    use super::*;

    #[tokio::test]
    async fn static_component_becomes_literal() {
        let page = ComponentDef::builder("page")
            .render(r#"return _c("div", {staticClass: "box"}, [_c("h1", [_v("Hello")]), _c("p", [_v("static")])])"#)
            .build()
            .unwrap();
        let engine = Maquette::new();
        let (tree, html, expected) =
            optimize_and_render(&engine, &engine, &page, json!({}), OptimizeOptions::default()).await;

        assert!(tree.is_static);
        assert_eq!(tree.component, "page");
        insta::assert_snapshot!(tree.render.source(), @r#"
        function render() {
          return _ssrNode("<div class=\"box\"><h1>Hello</h1><p>static</p></div>");
        }
        "#);
        assert_eq!(html, expected);
        assert_eq!(html, r#"<div class="box"><h1>Hello</h1><p>static</p></div>"#);
    }

    #[tokio::test]
    async fn mixed_content_keeps_dynamic_parts() {
        let greet = ComponentDef::builder("greet")
            .render(r#"return _c("div", [_c("h1", [_v("Title")]), _c("p", [_v(_s(name))])])"#)
            .build()
            .unwrap();
        let engine = Maquette::new();
        let (tree, html, expected) = optimize_and_render(
            &engine,
            &engine,
            &greet,
            json!({"name": "ada"}),
            OptimizeOptions::default(),
        )
        .await;

        assert!(!tree.is_static);
        let source = tree.render.source();
        assert!(source.contains(r#"_ssrNode("<h1>Title</h1>")"#), "{}", source);
        assert!(source.contains(r#"_ssrNode("<p>", "</p>", [_v(_s(name))])"#), "{}", source);
        assert_eq!(html, expected);
        assert_eq!(html, "<div><h1>Title</h1><p>ada</p></div>");
    }

    #[tokio::test]
    async fn single_text_construct_is_compacted() {
        let label = ComponentDef::builder("label")
            .render(r#"return _c("p", [_ssrNode(_ssrEscape(name))])"#)
            .build()
            .unwrap();
        let engine = Maquette::new();
        let (tree, html, expected) = optimize_and_render(
            &engine,
            &engine,
            &label,
            json!({"name": "<ada>"}),
            OptimizeOptions::default(),
        )
        .await;

        assert!(tree
            .render
            .source()
            .contains(r#"return _ssrNode("<p>" + _ssrEscape(name) + "</p>");"#));
        assert_eq!(html, expected);
        assert_eq!(html, "<p>&lt;ada&gt;</p>");
    }

    #[tokio::test]
    async fn child_count_mismatch_stays_dynamic() {
        let list = ComponentDef::builder("list")
            .render(r#"return _c("ul", _l(items, (x) => _c("li", [_v(x)])))"#)
            .data(json!({"items": []}))
            .build()
            .unwrap();
        let engine = Maquette::new();
        let (tree, html, expected) = optimize_and_render(
            &engine,
            &engine,
            &list,
            json!({"items": ["x", "y"]}),
            OptimizeOptions::default(),
        )
        .await;

        assert!(!tree.is_static);
        assert!(tree.render.source().contains("_l(items"));
        assert_eq!(html, expected);
        assert_eq!(html, "<ul><li>x</li><li>y</li></ul>");
    }

    #[tokio::test]
    async fn different_start_tags_still_fold_children() {
        let link = ComponentDef::builder("link")
            .render(r#"return _c("a", {attrs: {href: url}}, [_c("b", [_v("home")])])"#)
            .build()
            .unwrap();
        let engine = Maquette::new();
        let (tree, html, expected) = optimize_and_render(
            &engine,
            &engine,
            &link,
            json!({"url": "/"}),
            OptimizeOptions::default(),
        )
        .await;

        assert!(!tree.is_static);
        let source = tree.render.source();
        assert!(source.contains(r#"[_ssrNode("<b>home</b>")]"#), "{}", source);
        assert!(source.contains("_c(\"a\""), "{}", source);
        assert_eq!(html, expected);
    }

    #[tokio::test]
    async fn template_components_are_compiled_first() {
        let def = ComponentDef::builder("tpl").template("hello").build().unwrap();
        let engine = Maquette::new()
            .template_compiler(|t| Ok(format!(r#"return _c("p", [_v("{}")])"#, t)));
        let (tree, html, expected) =
            optimize_and_render(&engine, &engine, &def, json!({}), OptimizeOptions::default()).await;

        assert!(tree.is_static);
        assert_eq!(html, expected);
        assert_eq!(html, "<p>hello</p>");
    }

    #[tokio::test]
    async fn comments_fold_unless_disabled() {
        let def = ComponentDef::builder("note")
            .render(r#"return _c("div", [_e("todo")])"#)
            .build()
            .unwrap();
        let engine = Maquette::new();
        let (tree, html, _) =
            optimize_and_render(&engine, &engine, &def, json!({}), OptimizeOptions::default()).await;
        assert!(tree.is_static);
        assert_eq!(html, "<div><!--todo--></div>");

        let options = OptimizeOptions {
            fold_comments: false,
            ..OptimizeOptions::default()
        };
        let (tree, html, expected) = optimize_and_render(&engine, &engine, &def, json!({}), options).await;
        assert!(!tree.is_static);
        assert_eq!(html, expected);
    }
}

// =============================================================================
// Components
// =============================================================================

mod components {
    use super::*;

    fn logo() -> Arc<ComponentDef> {
        ComponentDef::builder("logo")
            .render(r#"return _c("img", {attrs: {src: "/logo.png"}})"#)
            .style("logo", ".logo{}")
            .build()
            .unwrap()
    }

    fn header() -> Arc<ComponentDef> {
        ComponentDef::builder("site-header")
            .render(r#"return _c("header", [_c("logo"), _c("span", [_v(title)])])"#)
            .component("logo", logo())
            .style("site-header", ".site-header{}")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn static_children_are_pruned_and_styles_hoisted() {
        let engine = Maquette::new();
        let (tree, html, expected) = optimize_and_render(
            &engine,
            &engine,
            &header(),
            json!({"title": "Hi"}),
            OptimizeOptions::default(),
        )
        .await;

        assert!(!tree.is_static);
        assert!(tree.children.is_empty());
        assert!(tree.styles.contains_key("logo"));
        assert!(tree.styles.contains_key("site-header"));
        assert_eq!(tree.entry_count(), 1);
        assert_eq!(html, expected);
    }

    #[tokio::test]
    async fn static_children_stay_without_hoisting() {
        let engine = Maquette::new();
        let options = OptimizeOptions {
            hoist_styles: false,
            ..OptimizeOptions::default()
        };
        let (tree, html, expected) =
            optimize_and_render(&engine, &engine, &header(), json!({"title": "Hi"}), options).await;

        assert_eq!(tree.children.len(), 1);
        assert!(tree.children[0].is_static);
        assert_eq!(tree.children[0].component, "logo");
        assert!(!tree.styles.contains_key("logo"));
        assert_eq!(tree.all_styles().len(), 2);
        assert_eq!(html, expected);
    }

    #[tokio::test]
    async fn dynamic_children_are_matched_by_slot() {
        let card = ComponentDef::builder("card")
            .render(r#"return _c("b", [_v(_s(name))])"#)
            .build()
            .unwrap();
        let root = ComponentDef::builder("users")
            .render(r#"return _c("main", [_c("h2", [_v("Users")]), _c("card", {props: {name: who}})])"#)
            .component("card", card)
            .build()
            .unwrap();
        let engine = Maquette::new();
        let (tree, html, expected) = optimize_and_render(
            &engine,
            &engine,
            &root,
            json!({"who": "ada"}),
            OptimizeOptions::default(),
        )
        .await;

        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].component, "card");
        assert!(tree.render.source().contains("treeSlot: 0"));
        assert!(tree.children[0]
            .render
            .source()
            .contains(r#"_ssrNode("<b>", "</b>", [_v(_s(name))])"#));
        assert_eq!(html, expected);
        assert_eq!(html, "<main><h2>Users</h2><b>ada</b></main>");
    }

    #[tokio::test]
    async fn scope_ids_fold_into_the_literal() {
        let badge = ComponentDef::builder("badge")
            .render(r#"return _c("span", {staticClass: "badge"}, [_v("new")])"#)
            .scope_id("data-v-badge")
            .build()
            .unwrap();
        let card = ComponentDef::builder("card")
            .render(r#"return _c("div", [_c("badge")])"#)
            .scope_id("data-v-card")
            .build()
            .unwrap();
        let engine = Maquette::new().component("badge", badge);
        let (tree, html, expected) =
            optimize_and_render(&engine, &engine, &card, json!({}), OptimizeOptions::default()).await;

        assert!(tree.is_static);
        assert_eq!(html, expected);
        assert_eq!(
            html,
            r#"<div data-v-card><span class="badge" data-v-card data-v-badge>new</span></div>"#
        );
    }

    #[tokio::test]
    async fn show_on_a_component_root() {
        let inner = ComponentDef::builder("inner")
            .render(r#"return _c("p", {staticStyle: "color:red"}, [_v("x")])"#)
            .build()
            .unwrap();
        let outer = ComponentDef::builder("outer")
            .render(r#"return _c("div", [_c("inner", {directives: [{name: "show", value: visible}]})])"#)
            .component("inner", inner)
            .build()
            .unwrap();
        let engine = Maquette::new();

        let (tree, html, expected) = optimize_and_render(
            &engine,
            &engine,
            &outer,
            json!({"visible": true}),
            OptimizeOptions::default(),
        )
        .await;
        assert!(!tree.is_static);
        assert_eq!(html, expected);
        assert_eq!(html, r#"<div><p style="color:red">x</p></div>"#);

        let hidden = optimize_and_render(
            &engine,
            &engine,
            &outer,
            json!({"visible": false}),
            OptimizeOptions::default(),
        )
        .await;
        assert_eq!(hidden.1, hidden.2);
        assert_eq!(hidden.1, r#"<div><p style="color:red;display:none">x</p></div>"#);
    }

    #[tokio::test]
    async fn deep_component_chain() {
        const DEPTH: usize = 3000;
        let mut engine = Maquette::new();
        let leaf = ComponentDef::builder(&format!("n{}", DEPTH))
            .render(r#"return _c("i", [_v("end")])"#)
            .build()
            .unwrap();
        engine = engine.component(&format!("n{}", DEPTH), leaf);
        for depth in (0..DEPTH).rev() {
            let def = ComponentDef::builder(&format!("n{}", depth))
                .render(format!(r#"return _c("n{}")"#, depth + 1))
                .build()
                .unwrap();
            engine = engine.component(&format!("n{}", depth), def);
        }
        let root = ComponentDef::builder("chain")
            .render(r#"return _c("n0")"#)
            .build()
            .unwrap();

        let tree = optimize_component(&engine, &root, json!({}), OptimizeOptions::default())
            .await
            .unwrap();
        assert!(tree.is_static);
        assert_eq!(tree.entry_count(), 1);
        let html = tree.render_html(&engine, node(&root, &json!({}))).await.unwrap();
        assert_eq!(html, "<i>end</i>");
    }

    #[tokio::test]
    async fn deep_dynamic_chain_keeps_every_entry() {
        const DEPTH: usize = 20_000;
        let mut engine = Maquette::new();
        let leaf = ComponentDef::builder(&format!("n{}", DEPTH))
            .render(r#"return _c("i", [_v(name)])"#)
            .build()
            .unwrap();
        engine = engine.component(&format!("n{}", DEPTH), leaf);
        for depth in (0..DEPTH).rev() {
            let def = ComponentDef::builder(&format!("n{}", depth))
                .render(format!(r#"return _c("n{}", {{props: {{name: name}}}})"#, depth + 1))
                .build()
                .unwrap();
            engine = engine.component(&format!("n{}", depth), def);
        }
        let root = ComponentDef::builder("chain")
            .render(r#"return _c("n0", {props: {name: name}})"#)
            .build()
            .unwrap();

        let (tree, html, expected) = optimize_and_render(
            &engine,
            &engine,
            &root,
            json!({"name": "deep"}),
            OptimizeOptions::default(),
        )
        .await;
        assert!(!tree.is_static);
        assert_eq!(tree.entry_count(), DEPTH + 2);
        assert_eq!(html, "<i>deep</i>");
        assert_eq!(html, expected);
        drop(tree);
    }
}

// =============================================================================
// Asynchronous boundaries
// =============================================================================

mod suspension {
    use super::*;

    #[tokio::test]
    async fn prefetched_data_is_compared() {
        let motd = ComponentDef::builder("motd")
            .render(r#"return _c("p", [_v(message)])"#)
            .prefetch(|_| async { Ok(json!({"message": "hi"})) }.boxed())
            .build()
            .unwrap();
        let engine = Maquette::new();
        let root = node(&motd, &json!({}));
        let mut ctx = PatchContext::new(&engine, Arc::clone(&root), root, OptimizeOptions::default());

        let Step::Suspended(Suspension {
            future,
            continuation,
        }) = ctx.advance().unwrap()
        else {
            panic!("expected the prefetch hooks to suspend the traversal");
        };
        assert!(matches!(ctx.advance(), Err(OptimizeError::NotResumed)));

        let resolved = future.await.unwrap();
        assert!(matches!(resolved, Resolved::Prefetched));
        ctx.resume(continuation, resolved).unwrap();
        assert!(matches!(ctx.advance().unwrap(), Step::Done));
        let function = ctx.annotations().render_ast(ctx.root_slot()).unwrap();
        assert!(matches!(ctx.ast().get(function), AstKind::Function { .. }));

        let tree = ctx.into_tree().unwrap();
        assert!(tree.is_static);
        assert!(tree.render.source().contains("<p>hi</p>"));
    }

    #[tokio::test]
    async fn prefetch_by_pass_stays_dynamic() {
        let user = ComponentDef::builder("user")
            .render(r#"return _c("b", [_v(name)])"#)
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
        let (tree, html, expected) =
            optimize_and_render(&engine, &engine, &user, json!({}), OptimizeOptions::default()).await;
        assert!(!tree.is_static);
        assert_eq!(html, expected);
        assert_eq!(html, "<b>alice</b>");
    }

    #[tokio::test]
    async fn callback_factory_folds() {
        let late = ComponentDef::builder("late")
            .render(r#"return _c("em", [_v("late")])"#)
            .build()
            .unwrap();
        let factory = AsyncFactory::callback(move |done| {
            done(Ok(AsyncResolution::Component(late.clone())));
        });
        let host = ComponentDef::builder("host")
            .render(r#"return _c("div", [_c("late")])"#)
            .async_component("late", factory)
            .build()
            .unwrap();
        let engine = Maquette::new();
        let (tree, html, expected) =
            optimize_and_render(&engine, &engine, &host, json!({}), OptimizeOptions::default()).await;

        assert!(tree.is_static);
        assert_eq!(tree.entry_count(), 1);
        assert_eq!(html, expected);
        assert_eq!(html, "<div><em>late</em></div>");
    }

    #[tokio::test]
    async fn node_list_factory_folds_as_fragment() {
        let factory = AsyncFactory::future(|| {
            async { Ok(AsyncResolution::Nodes(vec![VNode::text("a"), VNode::comment("b")])) }.boxed()
        });
        let host = ComponentDef::builder("host")
            .render(r#"return _c("section", [_c("many")])"#)
            .async_component("many", factory)
            .build()
            .unwrap();
        let engine = Maquette::new();
        let (tree, html, expected) =
            optimize_and_render(&engine, &engine, &host, json!({}), OptimizeOptions::default()).await;

        assert!(tree.is_static);
        assert_eq!(html, expected);
        assert_eq!(html, "<section>a<!--b--></section>");
    }

    #[tokio::test]
    async fn asymmetric_resolution_becomes_empty_comment() {
        let target = ComponentDef::builder("target")
            .render(r#"return _c("em")"#)
            .build()
            .unwrap();
        let host = ComponentDef::builder("host")
            .render(r#"return _c("div", [_c(which)])"#)
            .data(json!({"which": "as-component"}))
            .async_component(
                "as-component",
                AsyncFactory::future(move || {
                    let target = target.clone();
                    async move { Ok(AsyncResolution::Component(target)) }.boxed()
                }),
            )
            .async_component(
                "as-node",
                AsyncFactory::future(|| async { Ok(AsyncResolution::Node(VNode::text("n"))) }.boxed()),
            )
            .build()
            .unwrap();
        let engine = Maquette::new();
        let tree = optimize_component(
            &engine,
            &host,
            json!({"which": "as-node"}),
            OptimizeOptions::default(),
        )
        .await
        .unwrap();

        assert!(tree.is_static);
        assert!(tree.render.source().contains("<div><!----></div>"));
    }

    #[tokio::test]
    async fn completion_callback_fires_once() {
        let def = ComponentDef::builder("once")
            .render(r#"return _c("hr")"#)
            .build()
            .unwrap();
        let engine = Maquette::new();
        let root = node(&def, &json!({}));
        let calls = Cell::new(0);
        PatchContext::new(&engine, Arc::clone(&root), root, OptimizeOptions::default())
            .run_with(|result| {
                calls.set(calls.get() + 1);
                assert!(result.unwrap().is_static);
            })
            .await;
        assert_eq!(calls.get(), 1);
    }
}

// =============================================================================
// Errors and fallbacks
// =============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn missing_render_aborts() {
        let bare = ComponentDef::builder("bare").build().unwrap();
        let err = optimize_component(&Maquette::new(), &bare, json!({}), OptimizeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, OptimizeError::MissingRender { name: "bare".into() });
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn failing_prefetch_aborts() {
        let def = ComponentDef::builder("feed")
            .render(r#"return _c("ul")"#)
            .prefetch(|_| async { Err("backend down".to_string()) }.boxed())
            .build()
            .unwrap();
        let err = optimize_component(&Maquette::new(), &def, json!({}), OptimizeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            &err,
            OptimizeError::Render(RenderError::Prefetch { message, .. }) if message == "backend down"
        ));
        assert_eq!(err.kind(), ErrorKind::UserCode);
    }

    #[tokio::test]
    async fn element_root_is_rejected() {
        let root = VNode::element("div", VNodeData::default(), Vec::new());
        let err = optimize(
            &Maquette::new(),
            Arc::clone(&root),
            root,
            OptimizeOptions::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, OptimizeError::RootNotComponent);
    }

    /// Refuses to run any render function other than the definition's own.
    struct StrictEngine(Maquette);

    impl RenderEngine for StrictEngine {
        fn registry(&self) -> &Registry {
            self.0.registry()
        }

        fn instantiate(
            &self,
            def: &Arc<ComponentDef>,
            data: &VNodeData,
            parent: Option<&Arc<Instance>>,
            pass: Pass,
        ) -> Arc<Instance> {
            self.0.instantiate(def, data, parent, pass)
        }

        fn compile_template(&self, def: &ComponentDef) -> Result<RenderFunction, RenderError> {
            self.0.compile_template(def)
        }

        fn prefetch(&self, instance: &Arc<Instance>) -> LocalBoxFuture<'static, Result<(), RenderError>> {
            self.0.prefetch(instance)
        }

        fn render(&self, instance: &Instance) -> Result<VNodeRef, RenderError> {
            if let (Some(current), Some(own)) = (instance.render_fn(), instance.def().render.as_ref()) {
                if !RenderFunction::ptr_eq(&current, own) {
                    return Err(RenderError::TypeError("render function was replaced".into()));
                }
            }
            self.0.render(instance)
        }
    }

    #[tokio::test]
    async fn failed_validation_keeps_original_render() {
        let greet = ComponentDef::builder("greet")
            .render(r#"return _c("div", [_c("h1", [_v("Title")]), _c("p", [_v(_s(name))])])"#)
            .build()
            .unwrap();
        let baseline = Maquette::new();
        let engine = StrictEngine(Maquette::new());
        let (tree, html, expected) = optimize_and_render(
            &engine,
            &baseline,
            &greet,
            json!({"name": "ada"}),
            OptimizeOptions::default(),
        )
        .await;

        assert!(!tree.is_static);
        assert_eq!(Some(&tree.render), greet.render.as_ref());
        assert_eq!(html, expected);

        let lenient = OptimizeOptions {
            validate: false,
            ..OptimizeOptions::default()
        };
        let tree = optimize_component(&engine, &greet, json!({}), lenient)
            .await
            .unwrap();
        assert_ne!(Some(&tree.render), greet.render.as_ref());
    }
}
