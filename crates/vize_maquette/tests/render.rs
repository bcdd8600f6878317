//! End-to-end rendering tests for the reference engine.

use std::sync::Arc;

use futures::FutureExt;
use serde_json::json;
use vize_maquette::{
    AsyncFactory, AsyncResolution, ComponentDef, Maquette, Registry, RenderError, VNode,
    VNodeData,
};

fn root(def: Arc<ComponentDef>) -> vize_maquette::VNodeRef {
    VNode::component(def, VNodeData::default())
}

// =============================================================================
// Components
// =============================================================================

mod components {
    use super::*;

    #[tokio::test]
    async fn props_and_lists() {
        let item = ComponentDef::builder("item")
            .render(r#"return _c("li", [_v(_s(label))])"#)
            .build()
            .unwrap();
        let list = ComponentDef::builder("list")
            .render(
                r#"
                function render() {
                  return _c("ul", _l(items, (x) => _c("item", {props: {label: x}})));
                }
                "#,
            )
            .data(json!({"items": ["a", "<b>"]}))
            .component("item", item)
            .build()
            .unwrap();
        let html = Maquette::new().render_to_string(root(list)).await.unwrap();
        insta::assert_snapshot!(html, @"<ul><li>a</li><li>&lt;b&gt;</li></ul>");
    }

    #[tokio::test]
    async fn global_components_and_scope_ids() {
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
        let html = engine.render_to_string(root(card)).await.unwrap();
        assert_eq!(
            html,
            r#"<div data-v-card><span class="badge" data-v-card data-v-badge>new</span></div>"#
        );
    }

    #[tokio::test]
    async fn show_on_component_hides_its_root() {
        let inner = ComponentDef::builder("inner")
            .render(r#"return _c("p", {staticStyle: "color:red"}, [_v("x")])"#)
            .build()
            .unwrap();
        let outer = ComponentDef::builder("outer")
            .render(r#"return _c("div", [_c("inner", {directives: [{name: "show", value: visible}]})])"#)
            .data(json!({"visible": false}))
            .component("inner", inner)
            .build()
            .unwrap();
        let html = Maquette::new().render_to_string(root(outer)).await.unwrap();
        assert_eq!(html, r#"<div><p style="color:red;display:none">x</p></div>"#);
    }

    #[tokio::test]
    async fn template_components() {
        let def = ComponentDef::builder("tpl")
            .template("hello")
            .build()
            .unwrap();
        let engine = Maquette::new()
            .template_compiler(|t| Ok(format!(r#"return _c("p", [_v("{}")])"#, t)));
        let html = engine.render_to_string(root(def)).await.unwrap();
        assert_eq!(html, "<p>hello</p>");
    }

    #[tokio::test]
    async fn missing_render_is_an_error() {
        let def = ComponentDef::builder("bare").build().unwrap();
        let err = Maquette::new().render_to_string(root(def)).await.unwrap_err();
        assert!(matches!(err, RenderError::MissingRender { name } if name == "bare"));
    }
}

// =============================================================================
// Async components
// =============================================================================

mod async_components {
    use super::*;

    #[tokio::test]
    async fn callback_factory() {
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
        let html = Maquette::new().render_to_string(root(host)).await.unwrap();
        assert_eq!(html, "<div><em>late</em></div>");
    }

    #[tokio::test]
    async fn factory_resolving_to_nodes() {
        let factory = AsyncFactory::future(|| {
            async {
                Ok(AsyncResolution::Nodes(vec![
                    VNode::text("a"),
                    VNode::comment("b"),
                ]))
            }
            .boxed()
        });
        let tree = VNode::element(
            "div",
            VNodeData::default(),
            vec![VNode::async_component(factory, VNodeData::default())],
        );
        let html = Maquette::new().render_to_string(tree).await.unwrap();
        assert_eq!(html, "<div>a<!--b--></div>");
    }

    #[tokio::test]
    async fn rejected_factory() {
        let factory = AsyncFactory::future(|| async { Err("offline".to_string()) }.boxed());
        let err = Maquette::new()
            .render_to_string(VNode::async_component(factory, VNodeData::default()))
            .await
            .unwrap_err();
        assert_eq!(err, RenderError::AsyncRejected("offline".into()));
    }
}

// =============================================================================
// Prefetch and registry
// =============================================================================

mod hooks {
    use super::*;

    #[tokio::test]
    async fn prefetch_runs_before_render() {
        let def = ComponentDef::builder("user")
            .render(r#"return _c("b", [_v(name)])"#)
            .prefetch(|_| async { Ok(json!({"name": "ada"})) }.boxed())
            .build()
            .unwrap();
        let html = Maquette::new().render_to_string(root(def)).await.unwrap();
        assert_eq!(html, "<b>ada</b>");
    }

    #[tokio::test]
    async fn custom_module() {
        let mut registry = Registry::default();
        registry.module("role", |data| {
            data.attrs
                .get("id")
                .map(|_| r#" role="region""#.to_string())
        });
        let def = ComponentDef::builder("m")
            .render(r#"return _c("section", {attrs: {id: "s"}})"#)
            .build()
            .unwrap();
        let html = Maquette::new()
            .with_registry(registry)
            .render_to_string(root(def))
            .await
            .unwrap();
        assert_eq!(html, r#"<section id="s" role="region"></section>"#);
    }
}

// =============================================================================
// Depth
// =============================================================================

#[tokio::test]
async fn deep_component_chain() {
    let mut def = ComponentDef::builder("leaf")
        .render(r#"return _c("i", [_v("end")])"#)
        .build()
        .unwrap();
    for depth in 0..1000 {
        def = ComponentDef::builder(&format!("level{}", depth))
            .render(r#"return _c("child")"#)
            .component("child", def)
            .build()
            .unwrap();
    }
    let html = Maquette::new().render_to_string(root(def)).await.unwrap();
    assert_eq!(html, "<i>end</i>");
}
