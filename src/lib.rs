//! hxview - server-side template rendering for HTMX applications
//!
//! hxview turns a template name, a model and a request into HTML. It looks
//! templates up across layered sources, compiles each one once, wraps pages
//! in layouts fed by side-data suppliers, and answers HTMX requests with bare
//! fragments. In development a file watcher drops stale compiled templates
//! as files change.
//!
//! # Architecture Overview
//!
//! ```text
//!   render(name, model, request)
//!          │
//!          ▼
//!   ┌──────────────┐  miss   ┌────────────────┐  resolve  ┌───────────────────┐
//!   │ ViewRenderer │───────► │ TemplateCache  │─────────► │ TemplateLocator   │
//!   └──────────────┘         └────────────────┘           │  project dir      │
//!          │ HX-Request?            ▲                     │  bundled defaults │
//!          ├─ yes: fragment         │ invalidate          └───────────────────┘
//!          └─ no: layout + suppliers│
//!                           ┌────────────────┐
//!                           │ TemplateWatcher│ ◄── filesystem events (debounced)
//!                           └────────────────┘
//! ```
//!
//! # Core Modules
//!
//! - [`templating`] - Locator, cache, engine, renderer, layouts and watcher
//! - [`htmx`] - HTMX request headers and fragment detection
//! - [`config`] - `hxview.toml`, the [`ViewEngineBuilder`] and component ejection
//! - [`core`] - User-facing error reporting
//! - [`cli`] - The `hxview` developer tool
//!
//! # Example
//!
//! ```rust,no_run
//! use hxview::{RequestContext, ViewEngine};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), hxview::ViewError> {
//! let engine = ViewEngine::builder()
//!     .templates_path("Templates")
//!     .add_layout("base")
//!     .default_layout("base")
//!     .hot_reload(true)
//!     .build()?;
//!
//! let request = RequestContext::from_headers("/users", [("HX-Request", "true")]);
//! let html = engine.render("pages/users", &json!({ "users": [] }), &request).await?;
//! # let _ = html;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod htmx;
pub mod templating;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ViewConfig, ViewEngine, ViewEngineBuilder};
pub use htmx::HtmxRequest;
pub use templating::{
    LayoutDataProvider, RenderContext, RequestContext, TemplateCache, TemplateKey,
    TemplateLocator, ViewError, ViewRenderer,
};
