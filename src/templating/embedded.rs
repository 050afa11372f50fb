//! Templates bundled into the binary.
//!
//! The bundled set acts as the lowest-priority source provider: any template
//! here can be overridden by placing a file with the same key in the project
//! template directory. Sources are baked in at build time with
//! `include_str!`, so they live for the whole process.

use std::borrow::Cow;
use std::collections::BTreeMap;

use async_trait::async_trait;

use super::error::ViewError;
use super::key::TemplateKey;
use super::locator::SourceProvider;
use crate::constants::{BUNDLED_PROVIDER, DEFAULT_TEMPLATE_EXTENSION};

/// Keys and sources of the bundled default templates.
pub const BUNDLED_TEMPLATES: &[(&str, &str)] = &[
    ("components/alert", include_str!("../../templates/components/alert.html")),
    ("components/badge", include_str!("../../templates/components/badge.html")),
    ("components/button", include_str!("../../templates/components/button.html")),
    ("components/empty_state", include_str!("../../templates/components/empty_state.html")),
    ("components/toast", include_str!("../../templates/components/toast.html")),
    ("layouts/base", include_str!("../../templates/layouts/base.html")),
];

/// Read-only, in-memory source provider.
#[derive(Debug, Clone)]
pub struct EmbeddedProvider {
    name: String,
    templates: BTreeMap<TemplateKey, Cow<'static, str>>,
}

impl EmbeddedProvider {
    /// Provider over the templates compiled into this crate.
    pub fn bundled() -> Self {
        let templates = BUNDLED_TEMPLATES
            .iter()
            .map(|(key, source)| {
                (TemplateKey::new(key, DEFAULT_TEMPLATE_EXTENSION), Cow::Borrowed(*source))
            })
            .collect();

        Self {
            name: BUNDLED_PROVIDER.to_string(),
            templates,
        }
    }

    /// Provider over arbitrary in-memory sources.
    ///
    /// Names are normalized the same way as every other key, so
    /// `"pages/hello.html"` and `"pages/hello"` address the same entry.
    pub fn from_sources<I, K, S>(name: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: AsRef<str>,
        S: Into<String>,
    {
        let templates = sources
            .into_iter()
            .map(|(key, source)| {
                (
                    TemplateKey::new(key.as_ref(), DEFAULT_TEMPLATE_EXTENSION),
                    Cow::Owned(source.into()),
                )
            })
            .collect();

        Self {
            name: name.into(),
            templates,
        }
    }

    /// Source text of `key`, if bundled.
    pub fn get(&self, key: &TemplateKey) -> Option<&str> {
        self.templates.get(key).map(|source| source.as_ref())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[async_trait]
impl SourceProvider for EmbeddedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, key: &TemplateKey) -> Result<Option<String>, ViewError> {
        Ok(self.get(key).map(str::to_string))
    }

    fn list(&self) -> Result<Vec<TemplateKey>, ViewError> {
        Ok(self.templates.keys().cloned().collect())
    }
}
