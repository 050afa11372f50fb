//! Layout registry.
//!
//! Layouts are registered once, at configuration time, under a string id.
//! Layout `main` renders the template `layouts/main` and may carry one
//! side-data provider that is invoked on every full-page render.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::context::RequestContext;
use super::error::ViewError;
use super::key::TemplateKey;
use crate::constants::{DEFAULT_TEMPLATE_EXTENSION, LAYOUTS_PREFIX};

/// Supplies extra values to a layout (navigation, current user, flash
/// messages, ...).
#[async_trait]
pub trait LayoutDataProvider: Send + Sync {
    async fn supply(&self, request: &RequestContext) -> anyhow::Result<Map<String, Value>>;
}

#[async_trait]
impl<F> LayoutDataProvider for F
where
    F: Fn(&RequestContext) -> anyhow::Result<Map<String, Value>> + Send + Sync,
{
    async fn supply(&self, request: &RequestContext) -> anyhow::Result<Map<String, Value>> {
        self(request)
    }
}

/// A registered layout.
#[derive(Clone)]
pub struct LayoutDefinition {
    id: String,
    template: TemplateKey,
    provider: Option<Arc<dyn LayoutDataProvider>>,
}

impl LayoutDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let template = layout_key(&id, DEFAULT_TEMPLATE_EXTENSION);
        Self {
            id,
            template,
            provider: None,
        }
    }

    /// Re-derive the template key for the configured template extension.
    pub fn for_extension(mut self, extension: &str) -> Self {
        self.template = layout_key(&self.id, extension);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn LayoutDataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn template(&self) -> &TemplateKey {
        &self.template
    }

    pub fn provider(&self) -> Option<&Arc<dyn LayoutDataProvider>> {
        self.provider.as_ref()
    }
}

fn layout_key(id: &str, extension: &str) -> TemplateKey {
    TemplateKey::new(&format!("{LAYOUTS_PREFIX}/{id}"), extension)
}

impl fmt::Debug for LayoutDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutDefinition")
            .field("id", &self.id)
            .field("template", &self.template)
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

/// Layouts by id.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    layouts: HashMap<String, LayoutDefinition>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layout. Ids must be unique and non-empty.
    pub fn register(&mut self, layout: LayoutDefinition) -> Result<(), ViewError> {
        if layout.id.trim().is_empty() {
            return Err(ViewError::Config("layout id must not be empty".to_string()));
        }
        if self.layouts.contains_key(&layout.id) {
            return Err(ViewError::Config(format!(
                "layout '{}' is registered more than once",
                layout.id
            )));
        }

        self.layouts.insert(layout.id.clone(), layout);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&LayoutDefinition> {
        self.layouts.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.layouts.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.layouts.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
