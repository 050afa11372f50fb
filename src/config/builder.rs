//! Programmatic setup of the rendering pipeline.
//!
//! ```rust,no_run
//! use hxview::config::ViewEngineBuilder;
//! use hxview::templating::RequestContext;
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = ViewEngineBuilder::new()
//!     .templates_path("Templates")
//!     .hot_reload(cfg!(debug_assertions))
//!     .add_layout("main")
//!     .default_layout("main")
//!     .build()?;
//!
//! let html = engine
//!     .render("pages/hello", &json!({"name": "World"}), &RequestContext::new("/"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::eject::{self, EjectOutcome};
use crate::constants::{DEFAULT_DEBOUNCE, DEFAULT_TEMPLATE_EXTENSION, DEFAULT_TEMPLATES_DIR};
use crate::templating::{
    AssetResolver, IdentityAssets, Invalidate, LayoutDataProvider, LayoutDefinition,
    LayoutRegistry, RequestContext, TemplateCache, TemplateEngine, TemplateLocator,
    TemplateWatcher, ViewError, ViewRenderer,
};

/// Collects settings, layouts and helpers, then assembles a [`ViewEngine`].
pub struct ViewEngineBuilder {
    templates_path: PathBuf,
    extension: String,
    hot_reload: bool,
    debounce: Duration,
    autoescape: bool,
    default_layout: Option<String>,
    layouts: Vec<LayoutDefinition>,
    assets: Arc<dyn AssetResolver>,
}

impl Default for ViewEngineBuilder {
    fn default() -> Self {
        Self {
            templates_path: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            extension: DEFAULT_TEMPLATE_EXTENSION.to_string(),
            hot_reload: false,
            debounce: DEFAULT_DEBOUNCE,
            autoescape: true,
            default_layout: None,
            layouts: Vec::new(),
            assets: Arc::new(IdentityAssets),
        }
    }
}

impl std::fmt::Debug for ViewEngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewEngineBuilder")
            .field("templates_path", &self.templates_path)
            .field("extension", &self.extension)
            .field("hot_reload", &self.hot_reload)
            .field("debounce", &self.debounce)
            .field("autoescape", &self.autoescape)
            .field("default_layout", &self.default_layout)
            .field("layouts", &self.layouts)
            .finish_non_exhaustive()
    }
}

impl ViewEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project template root (default `Templates`).
    pub fn templates_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.templates_path = path.into();
        self
    }

    /// Template file extension, with or without the leading dot.
    pub fn extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload = enabled;
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn autoescape(mut self, enabled: bool) -> Self {
        self.autoescape = enabled;
        self
    }

    /// Layout used by [`ViewEngine::render`]. Must also be added.
    pub fn default_layout(mut self, id: impl Into<String>) -> Self {
        self.default_layout = Some(id.into());
        self
    }

    /// Register a layout without side data.
    pub fn add_layout(mut self, id: impl Into<String>) -> Self {
        self.layouts.push(LayoutDefinition::new(id));
        self
    }

    /// Register a layout whose provider is invoked on every full-page render.
    pub fn add_layout_with_provider<P>(mut self, id: impl Into<String>, provider: P) -> Self
    where
        P: LayoutDataProvider + 'static,
    {
        self.layouts
            .push(LayoutDefinition::new(id).with_provider(Arc::new(provider)));
        self
    }

    /// Resolver behind the `asset()` template function.
    pub fn asset_resolver<A>(mut self, assets: A) -> Self
    where
        A: AssetResolver + 'static,
    {
        self.assets = Arc::new(assets);
        self
    }

    pub fn get_templates_path(&self) -> &Path {
        &self.templates_path
    }

    /// Check the configuration without building anything.
    ///
    /// # Errors
    ///
    /// [`ViewError::Config`] when no layout is registered, a layout id is
    /// empty or duplicated, the default layout is not registered, or the
    /// extension is empty.
    pub fn validate(&self) -> Result<(), ViewError> {
        self.layout_registry().map(|_| ())
    }

    fn layout_registry(&self) -> Result<LayoutRegistry, ViewError> {
        if self.extension.is_empty() {
            return Err(ViewError::Config("template extension must not be empty".to_string()));
        }
        if self.layouts.is_empty() {
            return Err(ViewError::Config(
                "at least one layout must be registered".to_string(),
            ));
        }

        let mut registry = LayoutRegistry::new();
        for layout in &self.layouts {
            registry.register(layout.clone().for_extension(&self.extension))?;
        }

        if let Some(default) = &self.default_layout {
            if !registry.contains(default) {
                return Err(ViewError::Config(format!(
                    "default layout '{}' is not registered (registered: {})",
                    default,
                    registry.ids().join(", ")
                )));
            }
        }

        Ok(registry)
    }

    fn locator(&self) -> TemplateLocator {
        TemplateLocator::with_defaults(&self.templates_path, &self.extension)
    }

    /// Copy the bundled component `name` into the templates path.
    pub async fn eject_component(&self, name: &str) -> Result<EjectOutcome, ViewError> {
        eject::eject_component(&self.locator(), &self.templates_path, name).await
    }

    /// Copy every bundled component into the templates path.
    pub async fn eject_all_components(&self) -> Result<Vec<EjectOutcome>, ViewError> {
        eject::eject_all_components(&self.locator(), &self.templates_path).await
    }

    /// Validate and assemble the pipeline.
    ///
    /// With hot reload enabled the watcher starts here; it needs a running
    /// Tokio runtime and stays inert without one.
    pub fn build(self) -> Result<ViewEngine, ViewError> {
        let layouts = self.layout_registry()?;

        let locator = Arc::new(self.locator());
        let cache: Arc<TemplateCache> = Arc::new(TemplateCache::new());
        let engine = TemplateEngine::new()
            .with_autoescape(self.autoescape)
            .with_asset_resolver(Arc::clone(&self.assets));

        let mut renderer = ViewRenderer::new(Arc::clone(&locator), Arc::clone(&cache), engine, layouts);
        if let Some(default) = &self.default_layout {
            renderer = renderer.with_default_layout(default);
        }

        let invalidate: Arc<dyn Invalidate> = cache;
        let watcher = TemplateWatcher::start(
            &self.templates_path,
            &self.extension,
            self.debounce,
            self.hot_reload,
            invalidate,
        );

        tracing::debug!(
            templates = %self.templates_path.display(),
            layouts = self.layouts.len(),
            hot_reload = watcher.is_active(),
            "Built view engine"
        );

        Ok(ViewEngine { renderer, watcher })
    }
}

/// The assembled pipeline: renderer, shared cache, locator and watcher.
#[derive(Debug)]
pub struct ViewEngine {
    renderer: ViewRenderer,
    watcher: TemplateWatcher,
}

impl ViewEngine {
    pub fn builder() -> ViewEngineBuilder {
        ViewEngineBuilder::new()
    }

    /// A cloneable renderer sharing this engine's cache.
    pub fn renderer(&self) -> &ViewRenderer {
        &self.renderer
    }

    pub fn cache(&self) -> &Arc<TemplateCache> {
        self.renderer.cache()
    }

    pub fn locator(&self) -> &Arc<TemplateLocator> {
        self.renderer.locator()
    }

    pub fn watcher(&self) -> &TemplateWatcher {
        &self.watcher
    }

    pub async fn render<M>(&self, name: &str, model: &M, request: &RequestContext) -> Result<String, ViewError>
    where
        M: Serialize + ?Sized,
    {
        self.renderer.render(name, model, request).await
    }

    pub async fn render_page<M>(
        &self,
        layout: &str,
        name: &str,
        model: &M,
        request: &RequestContext,
    ) -> Result<String, ViewError>
    where
        M: Serialize + ?Sized,
    {
        self.renderer.render_page(layout, name, model, request).await
    }

    pub async fn render_fragment<M>(
        &self,
        name: &str,
        model: &M,
        request: &RequestContext,
    ) -> Result<String, ViewError>
    where
        M: Serialize + ?Sized,
    {
        self.renderer.render_fragment(name, model, request).await
    }

    /// Stop the watcher. Rendering keeps working; changes are no longer seen.
    pub async fn shutdown(&mut self) {
        self.watcher.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templating::TemplateKey;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_validate_requires_a_layout() {
        let err = ViewEngineBuilder::new().validate().unwrap_err();
        assert!(err.to_string().contains("at least one layout"));
    }

    #[test]
    fn test_validate_default_must_be_registered() {
        let builder = ViewEngineBuilder::new().add_layout("main").default_layout("admin");
        let err = builder.validate().unwrap_err();
        assert!(matches!(err, ViewError::Config(msg) if msg.contains("'admin'")));
    }

    #[test]
    fn test_validate_rejects_duplicate_layouts() {
        let builder = ViewEngineBuilder::new().add_layout("main").add_layout("main");
        assert!(builder.validate().is_err());
    }

    #[test]
    fn test_extension_dot_is_trimmed() {
        let builder = ViewEngineBuilder::new().extension(".tera");
        assert_eq!(builder.extension, "tera");
    }

    #[tokio::test]
    async fn test_build_and_render_with_bundled_layout() {
        let temp = TempDir::new().unwrap();
        let pages = temp.path().join("pages");
        std::fs::create_dir_all(&pages).unwrap();
        std::fs::write(pages.join("hello.html"), "<p>Hello {{ name }}</p>").unwrap();

        let engine = ViewEngineBuilder::new()
            .templates_path(temp.path())
            .add_layout("base")
            .default_layout("base")
            .asset_resolver(|path: &str| format!("/static{path}"))
            .build()
            .unwrap();
        assert!(!engine.watcher().is_active());

        let html = engine
            .render("pages/hello", &json!({"name": "World"}), &RequestContext::new("/"))
            .await
            .unwrap();
        assert!(html.contains("<p>Hello World</p>"));
        assert!(html.contains(r#"src="/static/js/htmx.min.js""#));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn test_layout_uses_configured_extension() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("layouts")).unwrap();
        std::fs::create_dir_all(temp.path().join("pages")).unwrap();
        std::fs::write(
            temp.path().join("layouts").join("site.tera"),
            "<body>{{ content | safe }}</body>",
        )
        .unwrap();
        std::fs::write(temp.path().join("pages").join("home.tera"), "home").unwrap();

        let engine = ViewEngineBuilder::new()
            .templates_path(temp.path())
            .extension("tera")
            .add_layout("site.tera")
            .default_layout("site.tera")
            .hot_reload(false)
            .build()
            .unwrap();

        let html = engine.render("pages/home", &json!({}), &RequestContext::new("/")).await.unwrap();
        assert_eq!(html, "<body>home</body>");
        // Same key the watcher derives from layouts/site.tera
        let watched = TemplateKey::from_relative_path(Path::new("layouts/site.tera"), "tera").unwrap();
        assert!(engine.cache().contains(&watched));
    }
}
