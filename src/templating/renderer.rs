//! View rendering: fragment versus full page.
//!
//! The [`ViewRenderer`] ties the cache, the locator and the engine together.
//! A page render executes the requested template, then wraps the output in a
//! layout:
//!
//! ```text
//! render_page("main", "pages/hello", model, request)
//!   ├─ HX-Request?  ── yes ──> render_fragment("pages/hello")
//!   └─ no
//!       ├─ content = execute(pages/hello, ambient + model)
//!       ├─ data    = layouts["main"].provider.supply(request)
//!       └─ execute(layouts/main, ambient + content + model + data)
//! ```
//!
//! Compilation goes through the shared [`TemplateCache`], so each template is
//! compiled once until the watcher (or a caller) invalidates it.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::cache::TemplateCache;
use super::context::{RenderContext, RequestContext};
use super::engine::{CompiledTemplate, TemplateEngine};
use super::error::ViewError;
use super::key::TemplateKey;
use super::layout::{LayoutDefinition, LayoutRegistry};
use super::locator::TemplateLocator;
use crate::constants::{CONTENT_KEY, MODEL_KEY, is_reserved_key};

/// Renders views against a shared template cache.
///
/// Cheap to clone; clones share the cache.
#[derive(Debug, Clone)]
pub struct ViewRenderer {
    locator: Arc<TemplateLocator>,
    cache: Arc<TemplateCache>,
    engine: TemplateEngine,
    layouts: Arc<LayoutRegistry>,
    default_layout: Option<String>,
}

impl ViewRenderer {
    /// Create a renderer.
    ///
    /// # Arguments
    ///
    /// * `locator` - Source resolution for every template, layouts included
    /// * `cache` - Compiled template cache, usually shared with the watcher
    /// * `engine` - Tera configuration (autoescape, asset resolver)
    /// * `layouts` - Layouts available to [`render_page`](Self::render_page)
    pub fn new(
        locator: Arc<TemplateLocator>,
        cache: Arc<TemplateCache>,
        engine: TemplateEngine,
        layouts: LayoutRegistry,
    ) -> Self {
        Self {
            locator,
            cache,
            engine,
            layouts: Arc::new(layouts),
            default_layout: None,
        }
    }

    /// Bind the layout used by [`render`](Self::render).
    pub fn with_default_layout(mut self, layout: impl Into<String>) -> Self {
        self.default_layout = Some(layout.into());
        self
    }

    pub fn locator(&self) -> &Arc<TemplateLocator> {
        &self.locator
    }

    pub fn cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }

    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    pub fn default_layout(&self) -> Option<&str> {
        self.default_layout.as_deref()
    }

    /// Compiled template for `name`, from the cache or freshly compiled.
    pub async fn compiled(&self, name: &str) -> Result<Arc<CompiledTemplate>, ViewError> {
        self.compiled_key(&self.locator.key(name)).await
    }

    async fn compiled_key(&self, key: &TemplateKey) -> Result<Arc<CompiledTemplate>, ViewError> {
        self.cache
            .get_or_compile(key, || self.engine.load(&self.locator, key))
            .await
    }

    /// Render `name` on its own, without a layout.
    ///
    /// # Errors
    ///
    /// - [`ViewError::TemplateNotFound`] if no provider has the template
    /// - [`ViewError::TemplateParse`] if it does not compile
    /// - [`ViewError::TemplateRender`] if execution fails
    /// - [`ViewError::InvalidModel`] if the model does not serialize
    pub async fn render_fragment<M>(
        &self,
        name: &str,
        model: &M,
        request: &RequestContext,
    ) -> Result<String, ViewError>
    where
        M: Serialize + ?Sized,
    {
        let model = serde_json::to_value(model)?;
        self.render_content(name, &model, request).await
    }

    /// Render `name` wrapped in the layout `layout`.
    ///
    /// Fragment requests (`HX-Request`) get the bare fragment and skip all
    /// layout work, including the side-data provider.
    ///
    /// # Arguments
    ///
    /// * `layout` - Id of a registered layout
    /// * `name` - Template name, with or without extension
    /// * `model` - Values for the template; objects are spread at top level
    /// * `request` - Ambient values of the current request
    ///
    /// # Errors
    ///
    /// Everything [`render_fragment`](Self::render_fragment) returns, plus:
    /// - [`ViewError::UnknownLayout`] if `layout` was never registered
    /// - [`ViewError::LayoutSideData`] if the layout's provider fails
    /// - [`ViewError::ReservedKey`] if the provider returns a renderer-owned key
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
        let model = serde_json::to_value(model)?;

        if request.is_fragment_request() {
            tracing::debug!(template = name, "Fragment request, skipping layout");
            return self.render_content(name, &model, request).await;
        }

        let definition = self
            .layouts
            .get(layout)
            .ok_or_else(|| ViewError::UnknownLayout(layout.to_string()))?;

        let content = self.render_content(name, &model, request).await?;

        let mut ctx = RenderContext::for_request(request);
        ctx.insert(CONTENT_KEY, Value::String(content));
        if !model.is_null() {
            ctx.insert(MODEL_KEY, model);
        }
        self.merge_side_data(definition, request, &mut ctx).await?;

        tracing::debug!(template = name, layout = layout, "Rendering full page");
        let compiled = self.compiled_key(definition.template()).await?;
        self.engine.execute(&compiled, &ctx)
    }

    /// [`render_page`](Self::render_page) with the default layout.
    ///
    /// # Errors
    ///
    /// [`ViewError::Config`] when no default layout was configured.
    pub async fn render<M>(
        &self,
        name: &str,
        model: &M,
        request: &RequestContext,
    ) -> Result<String, ViewError>
    where
        M: Serialize + ?Sized,
    {
        let layout = self
            .default_layout
            .as_deref()
            .ok_or_else(|| ViewError::Config("no default layout is configured".to_string()))?;
        self.render_page(layout, name, model, request).await
    }

    async fn render_content(
        &self,
        name: &str,
        model: &Value,
        request: &RequestContext,
    ) -> Result<String, ViewError> {
        let compiled = self.compiled(name).await?;

        let mut ctx = RenderContext::for_request(request);
        ctx.merge_model(model)?;
        self.engine.execute(&compiled, &ctx)
    }

    async fn merge_side_data(
        &self,
        layout: &LayoutDefinition,
        request: &RequestContext,
        ctx: &mut RenderContext,
    ) -> Result<(), ViewError> {
        let Some(provider) = layout.provider() else {
            return Ok(());
        };

        let data = provider
            .supply(request)
            .await
            .map_err(|source| ViewError::LayoutSideData {
                layout: layout.id().to_string(),
                source,
            })?;

        if let Some(key) = data.keys().find(|key| is_reserved_key(key)) {
            return Err(ViewError::ReservedKey {
                layout: layout.id().to_string(),
                key: key.clone(),
            });
        }

        ctx.extend(data);
        Ok(())
    }
}
