//! Layered template source resolution.
//!
//! The [`TemplateLocator`] asks an ordered list of [`SourceProvider`]s for a
//! template and returns the first hit. The standard stack puts the project
//! template directory in front of the bundled defaults, so a project overrides
//! a bundled component or layout by adding a file with the same key:
//!
//! ```text
//! Templates/components/alert.html   <- project override (wins)
//! bundled:components/alert          <- default
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use strsim::levenshtein;
use walkdir::WalkDir;

use super::embedded::EmbeddedProvider;
use super::error::ViewError;
use super::key::TemplateKey;
use crate::constants::PROJECT_PROVIDER;

/// Maximum Levenshtein distance, as a percentage of the requested name's
/// length, for a template to be suggested on a miss.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// A read-only store of template sources.
#[async_trait]
pub trait SourceProvider: Send + Sync + fmt::Debug {
    /// Short label used in logs and listings (`project`, `bundled`, ...).
    fn name(&self) -> &str;

    /// Source text for `key`, or `None` when this provider does not have it.
    async fn read(&self, key: &TemplateKey) -> Result<Option<String>, ViewError>;

    /// Every key this provider can serve.
    fn list(&self) -> Result<Vec<TemplateKey>, ViewError>;
}

/// Provider over a directory on disk.
///
/// A missing root is not an error: the provider simply has no templates.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    name: String,
    root: PathBuf,
    extension: String,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            name: PROJECT_PROVIDER.to_string(),
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// Override the provider label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute file path for `key` under this provider's root.
    pub fn path_for(&self, key: &TemplateKey) -> PathBuf {
        self.root.join(key.to_relative_path(&self.extension))
    }
}

#[async_trait]
impl SourceProvider for DirectoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, key: &TemplateKey) -> Result<Option<String>, ViewError> {
        if !key.is_contained() {
            return Ok(None);
        }

        let path = self.path_for(key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ViewError::io(path, e)),
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(source) => Ok(Some(source)),
            // Deleted between the metadata call and the read
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ViewError::io(path, e)),
        }
    }

    fn list(&self) -> Result<Vec<TemplateKey>, ViewError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                ViewError::io(path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if let Some(key) = TemplateKey::from_relative_path(relative, &self.extension) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Source text of a resolved template and where it came from.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    pub key: TemplateKey,
    pub text: String,
    /// Name of the provider that supplied the text
    pub provider: String,
}

/// Resolves template keys against an ordered list of providers.
#[derive(Debug, Clone)]
pub struct TemplateLocator {
    providers: Vec<Arc<dyn SourceProvider>>,
    extension: String,
}

impl TemplateLocator {
    /// Locator over `providers`, queried in the given order.
    pub fn new(providers: Vec<Arc<dyn SourceProvider>>, extension: impl Into<String>) -> Self {
        Self {
            providers,
            extension: extension.into(),
        }
    }

    /// The standard stack: `templates_root` on disk, then the bundled defaults.
    pub fn with_defaults(templates_root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let project = DirectoryProvider::new(templates_root, extension.clone());

        Self::new(
            vec![Arc::new(project), Arc::new(EmbeddedProvider::bundled())],
            extension,
        )
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Normalize a template name (with or without extension) into a key.
    pub fn key(&self, name: &str) -> TemplateKey {
        TemplateKey::new(name, &self.extension)
    }

    pub fn providers(&self) -> &[Arc<dyn SourceProvider>] {
        &self.providers
    }

    /// Look up a provider by name for enumeration.
    pub fn provider(&self, name: &str) -> Option<&Arc<dyn SourceProvider>> {
        self.providers.iter().find(|provider| provider.name() == name)
    }

    /// Read the source for `key` from the first provider that has it.
    ///
    /// # Errors
    ///
    /// - [`ViewError::TemplateNotFound`] when no provider has the key
    /// - [`ViewError::Io`] when a provider fails for another reason
    pub async fn resolve(&self, key: &TemplateKey) -> Result<TemplateSource, ViewError> {
        match self.find(key).await? {
            Some(source) => Ok(source),
            None => {
                tracing::debug!(template = %key, "Template not found in any provider");
                Err(ViewError::TemplateNotFound {
                    name: key.clone(),
                    suggestions: self.suggest(key).await,
                })
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but reports absence as `None` and
    /// skips building suggestions.
    pub async fn find(&self, key: &TemplateKey) -> Result<Option<TemplateSource>, ViewError> {
        for provider in &self.providers {
            if let Some(text) = provider.read(key).await? {
                tracing::debug!(template = %key, provider = provider.name(), "Resolved template source");
                return Ok(Some(TemplateSource {
                    key: key.clone(),
                    text,
                    provider: provider.name().to_string(),
                }));
            }
        }
        Ok(None)
    }

    /// Whether any provider has `key`.
    pub async fn exists(&self, key: &TemplateKey) -> Result<bool, ViewError> {
        for provider in &self.providers {
            if provider.read(key).await?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Merged listing of every available key and the provider that wins for it.
    pub fn list(&self) -> Result<BTreeMap<TemplateKey, String>, ViewError> {
        let mut merged = BTreeMap::new();
        for provider in &self.providers {
            for key in provider.list()? {
                merged.entry(key).or_insert_with(|| provider.name().to_string());
            }
        }
        Ok(merged)
    }

    /// Up to three available keys similar to `target`.
    ///
    /// Listing walks the project directory, so it runs on the blocking pool.
    async fn suggest(&self, target: &TemplateKey) -> Vec<String> {
        let locator = self.clone();
        let target = target.clone();
        match tokio::task::spawn_blocking(move || locator.similar_keys(&target)).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                tracing::debug!(error = %e, "Suggestion lookup did not complete");
                Vec::new()
            }
        }
    }

    fn similar_keys(&self, target: &TemplateKey) -> Vec<String> {
        let available = match self.list() {
            Ok(list) => list,
            Err(e) => {
                tracing::debug!(error = %e, "Could not enumerate templates for suggestions");
                return Vec::new();
            }
        };

        let target = target.as_str();
        let max_distance = target.len() * SIMILARITY_THRESHOLD_PERCENT / 100;

        let mut scored: Vec<_> = available
            .keys()
            .map(|key| (key.as_str().to_string(), levenshtein(target, key.as_str())))
            .filter(|(_, distance)| *distance <= max_distance)
            .collect();
        scored.sort_by_key(|(_, distance)| *distance);

        scored.into_iter().take(3).map(|(key, _)| key).collect()
    }
}
