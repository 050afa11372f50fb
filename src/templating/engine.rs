//! Tera adapter implementing the compile/execute boundary of the pipeline.
//!
//! Each [`CompiledTemplate`] owns a private Tera instance holding the template
//! and every template it pulls in through `include`, `extends` or `import`.
//! Referenced names are discovered from the source, resolved through the
//! [`TemplateLocator`] and recorded as dependencies, so editing a component
//! can invalidate the pages that include it.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use sha2::{Digest, Sha256};
use tera::Tera;

use super::context::RenderContext;
use super::error::ViewError;
use super::filters::{self, AssetResolver, IdentityAssets};
use super::key::TemplateKey;
use super::locator::TemplateLocator;

/// Matches `{% include "x" %}`, `{% include ["a", "b"] ignore missing %}`,
/// `{% extends 'x' %}` and `{% import "x" as m %}`.
static REFERENCE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"\{%-?\s*(?:include|extends|import)\s+(\[[^\]]*\]|"[^"]*"|'[^']*')(\s+ignore\s+missing)?"#,
    )
    .ok()
});

/// A quoted template name inside a reference tag.
static NAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).ok());

/// Comments and `raw` blocks, whose contents are never parsed as tags.
static INERT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?s)\{#.*?#\}|\{%-?\s*raw\s*-?%\}.*?\{%-?\s*endraw\s*-?%\}").ok()
});

/// Matches the `--> line:col` marker in Tera parse errors.
static LINE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"-->\s*(\d+):(\d+)").ok());

/// An executable template.
///
/// Immutable once built and shared between all readers through `Arc`.
pub struct CompiledTemplate {
    key: TemplateKey,
    tera: Tera,
    source_len: usize,
    source_hash: String,
    dependencies: BTreeSet<TemplateKey>,
}

impl CompiledTemplate {
    pub fn key(&self) -> &TemplateKey {
        &self.key
    }

    /// Length in bytes of the template's own source.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// SHA-256 of the template's own source, hex encoded.
    pub fn source_hash(&self) -> &str {
        &self.source_hash
    }

    /// Keys of the templates pulled in by `include`, `extends` or `import`,
    /// transitively.
    pub fn dependencies(&self) -> &BTreeSet<TemplateKey> {
        &self.dependencies
    }

    pub fn depends_on(&self, key: &TemplateKey) -> bool {
        self.dependencies.contains(key)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("key", &self.key)
            .field("source_len", &self.source_len)
            .field("source_hash", &self.source_hash)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Compiles and executes templates with the pipeline's Tera configuration.
#[derive(Clone)]
pub struct TemplateEngine {
    autoescape: bool,
    assets: Arc<dyn AssetResolver>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self {
            autoescape: true,
            assets: Arc::new(IdentityAssets),
        }
    }
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine").field("autoescape", &self.autoescape).finish()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable HTML escaping of expression output (default: on).
    ///
    /// With escaping on, layouts must emit the rendered page with
    /// `{{ content | safe }}`.
    pub fn with_autoescape(mut self, autoescape: bool) -> Self {
        self.autoescape = autoescape;
        self
    }

    pub fn with_asset_resolver(mut self, assets: Arc<dyn AssetResolver>) -> Self {
        self.assets = assets;
        self
    }

    /// Resolve `key` and everything it references, then compile.
    ///
    /// References marked `ignore missing` and the alternatives of a list
    /// include are optional: absent ones are skipped, but still recorded as
    /// dependencies so that creating them invalidates this template.
    ///
    /// # Errors
    ///
    /// - [`ViewError::TemplateNotFound`] if `key` or a required referenced
    ///   template is missing
    /// - [`ViewError::TemplateParse`] if any of the sources fails to parse
    pub async fn load(
        &self,
        locator: &TemplateLocator,
        key: &TemplateKey,
    ) -> Result<CompiledTemplate, ViewError> {
        let root = locator.resolve(key).await?;

        let mut includes = Vec::new();
        let mut missing = BTreeSet::new();
        // Referenced name -> whether it resolved
        let mut seen: HashMap<String, bool> = HashMap::from([(key.as_str().to_string(), true)]);
        let mut queue: VecDeque<Reference> = references(&root.text).into();

        while let Some(reference) = queue.pop_front() {
            let mut resolved = false;
            for name in &reference.names {
                if let Some(found) = seen.get(name) {
                    resolved |= *found;
                    continue;
                }

                let name_key = locator.key(name);
                match locator.find(&name_key).await? {
                    Some(source) => {
                        seen.insert(name.clone(), true);
                        queue.extend(references(&source.text));
                        includes.push((name.clone(), source.key, source.text));
                        resolved = true;
                    }
                    None => {
                        seen.insert(name.clone(), false);
                        missing.insert(name_key);
                    }
                }
            }

            if !resolved && !reference.ignore_missing {
                if let Some(first) = reference.names.first() {
                    // Report with suggestions
                    locator.resolve(&locator.key(first)).await?;
                }
            }
        }

        let mut compiled = self.compile(key, &root.text, &includes)?;
        if !missing.is_empty() {
            tracing::debug!(template = %key, missing = missing.len(), "Skipped optional references");
        }
        compiled.dependencies.extend(missing.into_iter().filter(|dep| dep != key));
        Ok(compiled)
    }

    /// Compile `source` as `key`, together with already-resolved referenced
    /// templates given as `(referenced name, key, source)`.
    pub fn compile(
        &self,
        key: &TemplateKey,
        source: &str,
        includes: &[(String, TemplateKey, String)],
    ) -> Result<CompiledTemplate, ViewError> {
        let mut tera = Tera::default();
        if self.autoescape {
            // An empty suffix matches every template name
            tera.autoescape_on(vec![""]);
        } else {
            tera.autoescape_on(vec![]);
        }
        filters::register(&mut tera, Arc::clone(&self.assets));

        let mut templates = Vec::with_capacity(includes.len() + 1);
        templates.push((key.as_str(), source));
        for (name, _, text) in includes {
            templates.push((name.as_str(), text.as_str()));
        }

        tera.add_raw_templates(templates).map_err(|e| {
            let message = format_tera_error(&e);
            ViewError::TemplateParse {
                name: key.clone(),
                line: extract_line(&message),
                message,
            }
        })?;

        let dependencies: BTreeSet<TemplateKey> =
            includes.iter().map(|(_, dep, _)| dep.clone()).filter(|dep| dep != key).collect();

        let source_hash = hex::encode(Sha256::digest(source.as_bytes()));
        tracing::debug!(
            template = %key,
            bytes = source.len(),
            dependencies = dependencies.len(),
            "Compiled template"
        );

        Ok(CompiledTemplate {
            key: key.clone(),
            tera,
            source_len: source.len(),
            source_hash,
            dependencies,
        })
    }

    /// Execute `compiled` against `context`.
    ///
    /// # Errors
    ///
    /// [`ViewError::TemplateRender`] when Tera fails, e.g. on an undefined
    /// variable or a filter error.
    pub fn execute(
        &self,
        compiled: &CompiledTemplate,
        context: &RenderContext,
    ) -> Result<String, ViewError> {
        compiled
            .tera
            .render(compiled.key.as_str(), &context.to_tera())
            .map_err(|e| ViewError::TemplateRender {
                name: compiled.key.clone(),
                message: format_tera_error(&e),
            })
    }
}

/// One `include`, `extends` or `import` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Candidate names in order; a list include uses the first that exists
    pub names: Vec<String>,
    /// Tagged `ignore missing`
    pub ignore_missing: bool,
}

/// References made by `include`, `extends` and `import` tags, skipping
/// comments and `raw` blocks.
pub fn references(source: &str) -> Vec<Reference> {
    let (Some(tag_re), Some(name_re), Some(inert_re)) =
        (REFERENCE_RE.as_ref(), NAME_RE.as_ref(), INERT_RE.as_ref())
    else {
        return Vec::new();
    };

    let source = inert_re.replace_all(source, "");
    tag_re
        .captures_iter(&source)
        .filter_map(|caps| {
            let target = caps.get(1)?.as_str();
            let names: Vec<String> = name_re
                .captures_iter(target)
                .filter_map(|name| name.get(1).or_else(|| name.get(2)))
                .map(|m| m.as_str().to_string())
                .collect();
            if names.is_empty() {
                return None;
            }
            Some(Reference {
                names,
                ignore_missing: caps.get(2).is_some(),
            })
        })
        .collect()
}

/// Flatten a Tera error chain into one readable message.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(err) = current {
        let msg = err.to_string();
        if !msg.trim().is_empty() {
            messages.push(msg.trim().to_string());
        }
        current = err.source();
    }

    messages.dedup();
    messages.join("\n  -> ")
}

fn extract_line(message: &str) -> Option<usize> {
    LINE_RE
        .as_ref()?
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
