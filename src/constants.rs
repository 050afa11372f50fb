//! Constants shared across the rendering pipeline.
//!
//! Default paths, file extensions and timing values live here so the
//! builder, the watcher and the CLI agree on them.

use std::time::Duration;

/// Default project-local template root, relative to the project directory.
pub const DEFAULT_TEMPLATES_DIR: &str = "Templates";

/// Default template file extension (without the leading dot).
pub const DEFAULT_TEMPLATE_EXTENSION: &str = "html";

/// Default configuration file name looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "hxview.toml";

/// Name of the source provider over the project template directory.
pub const PROJECT_PROVIDER: &str = "project";

/// Name of the source provider over the templates compiled into the crate.
pub const BUNDLED_PROVIDER: &str = "bundled";

/// Key prefix under which layout templates live (`layouts/<id>`).
pub const LAYOUTS_PREFIX: &str = "layouts";

/// Key prefix under which bundled components live (`components/<name>`).
pub const COMPONENTS_PREFIX: &str = "components";

/// Debounce window for template file changes (50ms).
///
/// Editors commonly write a file several times per save; events arriving
/// within this window are coalesced into a single invalidation per key.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Context key holding the rendered inner template inside a layout.
pub const CONTENT_KEY: &str = "content";

/// Context key holding the caller's model inside a layout.
pub const MODEL_KEY: &str = "model";

/// Context key holding the current request path.
pub const REQUEST_PATH_KEY: &str = "_request_path";

/// Context key holding the parsed HTMX request headers.
pub const HTMX_KEY: &str = "_htmx";

/// Context key holding the anti-forgery token, when the caller supplies one.
pub const CSRF_TOKEN_KEY: &str = "_csrf_token";

/// Returns true if `key` is owned by the renderer and may not be supplied by a
/// layout data provider.
pub fn is_reserved_key(key: &str) -> bool {
    key == CONTENT_KEY || key == MODEL_KEY || key.starts_with('_')
}
