//! Template resolution, caching, hot reload and view rendering.
//!
//! # Overview
//!
//! A render turns a logical template name plus a data model into an HTML
//! string:
//!
//! ```text
//! ViewRenderer ──> TemplateCache ──(miss)──> TemplateEngine::load ──> TemplateLocator
//!      │                ^                                                 │
//!      │                │ invalidate                                      ├─ project dir
//!      │          TemplateWatcher <── filesystem events                   └─ bundled
//!      └──> TemplateEngine::execute ──> String
//! ```
//!
//! - [`TemplateLocator`] resolves a [`TemplateKey`] against an ordered list of
//!   [`SourceProvider`]s. The project template directory shadows the bundled
//!   defaults.
//! - [`TemplateCache`] compiles each key at most once at a time and shares the
//!   result; warm reads never wait on a lock held across a compile.
//! - [`TemplateWatcher`] debounces filesystem events and invalidates the
//!   affected keys, plus every template that includes them.
//! - [`ViewRenderer`] renders a template either as a bare fragment (HTMX
//!   requests) or wrapped in a registered layout with optional side data.
//!
//! # Template Context
//!
//! Every execution sees:
//! - `_request_path`: the request path (`/` when unknown)
//! - `_htmx`: the parsed HTMX headers (`request`, `boosted`, `target`, ...)
//! - `_csrf_token`: the anti-forgery token, when the request has one
//! - the model's fields (or `model`, for non-object models)
//!
//! Layouts additionally see `content` (the rendered page, emit it with
//! `{{ content | safe }}`), `model` and the side data of their provider.
//!
//! # Helpers
//!
//! See [`filters`] for `hx_vals`, `active_class`, `append_query` and
//! `asset()`.

pub mod cache;
pub mod context;
pub mod embedded;
pub mod engine;
pub mod error;
pub mod filters;
pub mod key;
pub mod layout;
pub mod locator;
pub mod renderer;
pub mod watcher;

pub use cache::{CacheStats, Dependent, TemplateCache};
pub use context::{RenderContext, RequestContext};
pub use embedded::EmbeddedProvider;
pub use engine::{CompiledTemplate, TemplateEngine};
pub use error::ViewError;
pub use filters::{AssetResolver, IdentityAssets};
pub use key::TemplateKey;
pub use layout::{LayoutDataProvider, LayoutDefinition, LayoutRegistry};
pub use locator::{DirectoryProvider, SourceProvider, TemplateLocator, TemplateSource};
pub use renderer::ViewRenderer;
pub use watcher::{ChangeSink, Invalidate, TemplateWatcher};
