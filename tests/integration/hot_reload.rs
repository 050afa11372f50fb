//! File watcher driving invalidation against a real directory.
//!
//! Filesystem notifications are delivered asynchronously and at different
//! speeds per platform, so these tests poll until the new output appears.

use anyhow::{Result, bail};
use hxview::test_utils::{TemplateTree, init_test_logging};
use hxview::{RequestContext, ViewEngine};
use serial_test::serial;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const POLL_ATTEMPTS: usize = 100;

async fn wait_for_output(engine: &ViewEngine, name: &str, expected: &str) -> Result<()> {
    let request = RequestContext::new("/");
    let mut last = String::new();
    for _ in 0..POLL_ATTEMPTS {
        match engine.render_fragment(name, &(), &request).await {
            Ok(html) if html == expected => return Ok(()),
            Ok(html) => last = html,
            Err(e) => last = e.to_string(),
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    bail!("'{name}' never rendered '{expected}', last output: '{last}'")
}

fn watched_tree() -> Result<TemplateTree> {
    let tree = TemplateTree::new()?;
    tree.write("layouts/main", "{{ content | safe }}")?;
    Ok(tree)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_edit_is_picked_up() -> Result<()> {
    init_test_logging(None);
    let tree = watched_tree()?;
    tree.write("pages/live", "v1")?;

    let mut engine = tree
        .builder()
        .add_layout("main")
        .hot_reload(true)
        .debounce(Duration::from_millis(20))
        .build()?;
    assert!(engine.watcher().is_active());

    wait_for_output(&engine, "pages/live", "v1").await?;
    tree.write("pages/live", "v2")?;
    wait_for_output(&engine, "pages/live", "v2").await?;

    engine.shutdown().await;
    assert!(!engine.watcher().is_active());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_included_change_invalidates_page() -> Result<()> {
    let tree = watched_tree()?;
    tree.write("partials/greeting", "hello")?;
    tree.write("pages/wrapper", r#"<{% include "partials/greeting" %}>"#)?;

    let mut engine = tree
        .builder()
        .add_layout("main")
        .hot_reload(true)
        .debounce(Duration::from_millis(20))
        .build()?;

    wait_for_output(&engine, "pages/wrapper", "<hello>").await?;
    tree.write("partials/greeting", "bonjour")?;
    wait_for_output(&engine, "pages/wrapper", "<bonjour>").await?;

    engine.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_broken_template_recovers_after_fix() -> Result<()> {
    let tree = watched_tree()?;
    tree.write("pages/fragile", "{% unknown_tag %}")?;

    let mut engine = tree
        .builder()
        .add_layout("main")
        .hot_reload(true)
        .debounce(Duration::from_millis(20))
        .build()?;

    let err = engine
        .render_fragment("pages/fragile", &(), &RequestContext::new("/"))
        .await
        .unwrap_err();
    assert!(err.is_parse_error());

    tree.write("pages/fragile", "ok")?;
    wait_for_output(&engine, "pages/fragile", "ok").await?;

    engine.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_disabled_watcher_keeps_cached_output() -> Result<()> {
    let tree = watched_tree()?;
    tree.write("pages/still", "v1")?;
    let engine = tree.builder().add_layout("main").build()?;
    assert!(!engine.watcher().is_active());

    let request = RequestContext::new("/");
    assert_eq!(engine.render_fragment("pages/still", &(), &request).await?, "v1");

    tree.write("pages/still", "v2")?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.render_fragment("pages/still", &(), &request).await?, "v1");
    Ok(())
}

#[tokio::test]
async fn test_missing_template_root_is_inert() -> Result<()> {
    let tree = TemplateTree::new()?;
    let engine = tree
        .builder()
        .templates_path(tree.root().join("does-not-exist"))
        .add_layout("base")
        .hot_reload(true)
        .build()?;

    assert!(!engine.watcher().is_active());
    Ok(())
}
