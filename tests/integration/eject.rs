//! Ejecting bundled components into a project.

use anyhow::Result;
use hxview::RequestContext;
use hxview::config::EjectOutcome;
use hxview::test_utils::TemplateTree;
use hxview::templating::embedded::BUNDLED_TEMPLATES;
use serde_json::json;

#[tokio::test]
async fn test_eject_writes_bundled_source() -> Result<()> {
    let tree = TemplateTree::new()?;
    let builder = tree.builder().add_layout("base");

    let outcome = builder.eject_component("badge").await?;
    assert_eq!(outcome, EjectOutcome::Written(tree.path("components/badge")));

    let bundled = BUNDLED_TEMPLATES
        .iter()
        .find(|(key, _)| *key == "components/badge")
        .map(|(_, source)| *source)
        .unwrap();
    assert_eq!(std::fs::read_to_string(outcome.path())?, bundled);
    Ok(())
}

#[tokio::test]
async fn test_eject_never_overwrites() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("components/alert", "customized")?;
    let builder = tree.builder().add_layout("base");

    let outcome = builder.eject_component("alert").await?;
    assert!(matches!(outcome, EjectOutcome::Skipped(_)));
    assert_eq!(std::fs::read_to_string(tree.path("components/alert"))?, "customized");
    Ok(())
}

#[tokio::test]
async fn test_eject_unknown_component_lists_available() -> Result<()> {
    let tree = TemplateTree::new()?;
    let err = tree.builder().eject_component("carousel").await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("carousel"));
    assert!(message.contains("alert"));
    Ok(())
}

#[tokio::test]
async fn test_ejected_component_is_served_from_project() -> Result<()> {
    let tree = TemplateTree::new()?;
    let builder = tree.builder().add_layout("base");
    let outcomes = builder.eject_all_components().await?;
    assert!(outcomes.iter().all(|o| matches!(o, EjectOutcome::Written(_))));

    tree.write("components/toast", "<div class=\"my-toast\">{{ message }}</div>")?;
    let engine = builder.build()?;
    let html = engine
        .render_fragment("components/toast", &json!({ "message": "Done" }), &RequestContext::new("/"))
        .await?;
    assert_eq!(html, "<div class=\"my-toast\">Done</div>");

    let listing = tree.locator().list()?;
    assert_eq!(listing.get(&tree.key("components/alert")).map(String::as_str), Some("project"));
    Ok(())
}
