//! Rendering through the assembled pipeline.

use anyhow::Result;
use hxview::test_utils::{TemplateTree, init_test_logging};
use hxview::{RequestContext, ViewError};
use serde_json::{Map, Value, json};

fn hello_tree() -> Result<TemplateTree> {
    let tree = TemplateTree::new()?;
    tree.write("layouts/main", "<html>{{ content | safe }}</html>")?;
    tree.write("pages/hello", "Hello {{ name }}")?;
    Ok(tree)
}

#[tokio::test]
async fn test_full_page_and_fragment() -> Result<()> {
    init_test_logging(None);
    let tree = hello_tree()?;
    let engine = tree.builder().add_layout("main").default_layout("main").build()?;
    let model = json!({ "name": "World" });

    let page = engine.render("pages/hello", &model, &RequestContext::new("/")).await?;
    assert_eq!(page, "<html>Hello World</html>");

    let request = RequestContext::from_headers("/", [("HX-Request", "true")]);
    let fragment = engine.render("pages/hello", &model, &request).await?;
    assert_eq!(fragment, "Hello World");
    Ok(())
}

#[tokio::test]
async fn test_layout_sees_model_and_side_data() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write(
        "layouts/app",
        "<title>{{ site }} - {{ model.title }}</title><nav>{{ _request_path | safe }}</nav>{{ content | safe }}",
    )?;
    tree.write("pages/about", "<h1>{{ title }}</h1>")?;

    let engine = tree
        .builder()
        .add_layout_with_provider("app", |_request: &RequestContext| -> anyhow::Result<Map<String, Value>> {
            let mut data = Map::new();
            data.insert("site".to_string(), json!("Acme"));
            Ok(data)
        })
        .default_layout("app")
        .build()?;

    let html = engine
        .render("pages/about", &json!({ "title": "About" }), &RequestContext::new("/about"))
        .await?;
    assert_eq!(html, "<title>Acme - About</title><nav>/about</nav><h1>About</h1>");
    Ok(())
}

#[tokio::test]
async fn test_model_values_are_escaped() -> Result<()> {
    let tree = hello_tree()?;
    let engine = tree.builder().add_layout("main").build()?;

    let html = engine
        .render_fragment("pages/hello", &json!({ "name": "<b>x</b>" }), &RequestContext::new("/"))
        .await?;
    assert_eq!(html, "Hello &lt;b&gt;x&lt;&#x2F;b&gt;");
    Ok(())
}

#[tokio::test]
async fn test_missing_template_is_not_found() -> Result<()> {
    let tree = hello_tree()?;
    let engine = tree.builder().add_layout("main").default_layout("main").build()?;

    let err = engine
        .render("pages/missing", &Value::Null, &RequestContext::new("/"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.template().map(|key| key.as_str()), Some("pages/missing"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_layout() -> Result<()> {
    let tree = hello_tree()?;
    let engine = tree.builder().add_layout("main").build()?;

    let err = engine
        .render_page("admin", "pages/hello", &json!({ "name": "x" }), &RequestContext::new("/"))
        .await
        .unwrap_err();
    assert!(matches!(err, ViewError::UnknownLayout(id) if id == "admin"));
    Ok(())
}

#[tokio::test]
async fn test_parse_error_until_fixed() -> Result<()> {
    let tree = hello_tree()?;
    tree.write("pages/broken", "before\n{% unknown_tag %}\nafter")?;
    let engine = tree.builder().add_layout("main").build()?;
    let request = RequestContext::new("/");

    let err = engine.render_fragment("pages/broken", &Value::Null, &request).await.unwrap_err();
    assert!(err.is_parse_error());
    assert!(!engine.cache().contains(&tree.key("pages/broken")));

    // A failed compile is not cached, so the fix is picked up right away
    tree.write("pages/broken", "fixed")?;
    let html = engine.render_fragment("pages/broken", &Value::Null, &request).await?;
    assert_eq!(html, "fixed");
    Ok(())
}

#[tokio::test]
async fn test_includes_resolve_across_providers() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("pages/notice", r#"{% include "components/alert" %}"#)?;
    let engine = tree.builder().add_layout("base").build()?;

    let html = engine
        .render_fragment("pages/notice", &json!({ "message": "Saved" }), &RequestContext::new("/"))
        .await?;
    assert!(html.contains(r#"class="alert alert-info""#));
    assert!(html.contains("<span>Saved</span>"));
    Ok(())
}
