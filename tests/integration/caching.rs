//! Compile-once behavior of the shared cache.

use anyhow::Result;
use hxview::RequestContext;
use hxview::test_utils::TemplateTree;
use serde_json::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_renders_compile_once() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("layouts/main", "{{ content | safe }}")?;
    tree.write("pages/item", "item {{ n }}")?;
    let engine = tree.builder().add_layout("main").build()?;

    let handles: Vec<_> = (0..16)
        .map(|n| {
            let renderer = engine.renderer().clone();
            tokio::spawn(async move {
                renderer
                    .render_fragment("pages/item", &json!({ "n": n }), &RequestContext::new("/"))
                    .await
            })
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await??, format!("item {n}"));
    }

    let stats = engine.cache().stats();
    assert_eq!(stats.compiles, 1);
    assert_eq!(stats.hits + stats.misses, 16);
    Ok(())
}

#[tokio::test]
async fn test_invalidate_picks_up_new_source() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("layouts/main", "{{ content | safe }}")?;
    tree.write("pages/version", "v1")?;
    let engine = tree.builder().add_layout("main").build()?;
    let request = RequestContext::new("/");
    let key = tree.key("pages/version");

    assert_eq!(engine.render_fragment("pages/version", &(), &request).await?, "v1");

    tree.write("pages/version", "v2")?;
    assert_eq!(engine.render_fragment("pages/version", &(), &request).await?, "v1");

    engine.cache().invalidate(&key);
    assert_eq!(engine.render_fragment("pages/version", &(), &request).await?, "v2");
    Ok(())
}

#[tokio::test]
async fn test_clear_drops_everything() -> Result<()> {
    let tree = TemplateTree::new()?;
    tree.write("layouts/main", "<main>{{ content | safe }}</main>")?;
    tree.write("pages/a", "a")?;
    let engine = tree.builder().add_layout("main").default_layout("main").build()?;

    engine.render("pages/a", &(), &RequestContext::new("/")).await?;
    assert_eq!(engine.cache().len(), 2);

    engine.cache().clear();
    assert!(engine.cache().is_empty());
    Ok(())
}
