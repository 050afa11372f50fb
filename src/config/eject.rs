//! Copy bundled components into the project template tree.
//!
//! An ejected component becomes a project file with the same key, so it
//! shadows the bundled version from then on and can be edited freely.
//! Existing files are never overwritten.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::constants::{BUNDLED_PROVIDER, COMPONENTS_PREFIX};
use crate::templating::{TemplateKey, TemplateLocator, ViewError};

/// Result of ejecting one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EjectOutcome {
    /// The component was written to this path
    Written(PathBuf),
    /// A file already existed at this path and was left untouched
    Skipped(PathBuf),
}

impl EjectOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written(path) | Self::Skipped(path) => path,
        }
    }
}

/// Eject the bundled component `name` into `templates_root`.
///
/// `name` may be given as `alert`, `alert.html` or `components/alert`.
///
/// # Errors
///
/// - [`ViewError::Config`] if the locator has no bundled provider or the
///   component does not exist
/// - [`ViewError::Io`] if the file cannot be written
pub async fn eject_component(
    locator: &TemplateLocator,
    templates_root: &Path,
    name: &str,
) -> Result<EjectOutcome, ViewError> {
    let key = component_key(locator, name);
    let bundled = locator.provider(BUNDLED_PROVIDER).ok_or_else(|| {
        ViewError::Config(format!("no '{BUNDLED_PROVIDER}' template provider is configured"))
    })?;

    let Some(source) = bundled.read(&key).await? else {
        let available = bundled_components(locator)?;
        return Err(ViewError::Config(format!(
            "unknown component '{}'; available components: {}",
            key.base_name(),
            available.iter().map(TemplateKey::base_name).collect::<Vec<_>>().join(", ")
        )));
    };

    let destination = templates_root.join(key.to_relative_path(locator.extension()));
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ViewError::io(parent, e))?;
    }

    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&destination)
        .await;
    let mut file = match file {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            tracing::info!(path = %destination.display(), "Component already exists, skipping");
            return Ok(EjectOutcome::Skipped(destination));
        }
        Err(e) => return Err(ViewError::io(destination, e)),
    };

    file.write_all(source.as_bytes())
        .await
        .map_err(|e| ViewError::io(&destination, e))?;
    file.flush().await.map_err(|e| ViewError::io(&destination, e))?;

    tracing::info!(component = %key, path = %destination.display(), "Ejected component");
    Ok(EjectOutcome::Written(destination))
}

/// Eject every bundled component, skipping those already present.
pub async fn eject_all_components(
    locator: &TemplateLocator,
    templates_root: &Path,
) -> Result<Vec<EjectOutcome>, ViewError> {
    let components = bundled_components(locator)?;
    futures::future::try_join_all(
        components
            .iter()
            .map(|key| eject_component(locator, templates_root, key.as_str())),
    )
    .await
}

/// Keys of the bundled components, sorted.
pub(crate) fn bundled_components(locator: &TemplateLocator) -> Result<Vec<TemplateKey>, ViewError> {
    let Some(bundled) = locator.provider(BUNDLED_PROVIDER) else {
        return Ok(Vec::new());
    };

    let mut keys: Vec<TemplateKey> = bundled
        .list()?
        .into_iter()
        .filter(|key| key.is_under(COMPONENTS_PREFIX))
        .collect();
    keys.sort();
    Ok(keys)
}

fn component_key(locator: &TemplateLocator, name: &str) -> TemplateKey {
    let key = locator.key(name);
    if key.is_under(COMPONENTS_PREFIX) {
        key
    } else {
        locator.key(&format!("{COMPONENTS_PREFIX}/{key}"))
    }
}
