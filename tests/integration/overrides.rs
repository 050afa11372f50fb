//! Project templates take precedence over bundled defaults.

use anyhow::Result;
use hxview::RequestContext;
use hxview::test_utils::TemplateTree;
use serde_json::json;

#[tokio::test]
async fn test_project_component_shadows_bundled() -> Result<()> {
    let tree = TemplateTree::new()?;
    let engine = tree.builder().add_layout("base").build()?;
    let model = json!({ "message": "Hi" });
    let request = RequestContext::new("/");

    let bundled = engine.render_fragment("components/alert", &model, &request).await?;
    assert!(bundled.contains(r#"role="alert""#));

    tree.write("components/alert", "<p>{{ message }}</p>")?;
    engine.cache().invalidate(&tree.key("components/alert"));
    let project = engine.render_fragment("components/alert", &model, &request).await?;
    assert_eq!(project, "<p>Hi</p>");

    // Removing the override falls back to the bundled copy
    tree.remove("components/alert")?;
    engine.cache().invalidate(&tree.key("components/alert"));
    let restored = engine.render_fragment("components/alert", &model, &request).await?;
    assert_eq!(restored, bundled);
    Ok(())
}

#[tokio::test]
async fn test_project_layout_shadows_bundled_base() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("layouts/base", "[{{ content | safe }}]")?;
    tree.write("pages/home", "home")?;
    let engine = tree.builder().add_layout("base").default_layout("base").build()?;

    let html = engine.render("pages/home", &(), &RequestContext::new("/")).await?;
    assert_eq!(html, "[home]");
    Ok(())
}

#[tokio::test]
async fn test_listing_reports_winning_provider() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("components/badge", "mine")?;
    tree.write("pages/index", "index")?;

    let listing = tree.locator().list()?;
    assert_eq!(listing.get(&tree.key("components/badge")).map(String::as_str), Some("project"));
    assert_eq!(listing.get(&tree.key("components/alert")).map(String::as_str), Some("bundled"));
    assert_eq!(listing.get(&tree.key("pages/index")).map(String::as_str), Some("project"));
    Ok(())
}
