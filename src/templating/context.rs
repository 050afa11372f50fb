//! Per-request values and the context handed to a template execution.
//!
//! A [`RequestContext`] carries what the renderer knows about the current
//! request (path, HTMX headers, anti-forgery token, extra values) and is passed
//! explicitly to every render call. A [`RenderContext`] is the merged map of
//! values one template execution sees; it is built fresh for every render.
//!
//! Merge order for a page or fragment:
//!
//! 1. ambient values (`_request_path`, `_htmx`, `_csrf_token`)
//! 2. caller-supplied extra values
//! 3. model values (an object model is spread at top level; any other model is
//!    exposed as `model`)
//!
//! Later entries win on key collision.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::{CSRF_TOKEN_KEY, HTMX_KEY, MODEL_KEY, REQUEST_PATH_KEY};
use crate::htmx::HtmxRequest;

use super::error::ViewError;

/// Ambient values of the request being rendered.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request path, used for active-link highlighting (`/` when unknown)
    pub path: String,
    pub htmx: HtmxRequest,
    pub csrf_token: Option<String>,
    /// Additional values exposed to every template of this request
    pub values: Map<String, Value>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Build a context from the request path and its headers.
    pub fn from_headers<'a, I>(path: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            htmx: HtmxRequest::from_headers(headers),
            ..Self::new(path)
        }
    }

    pub fn with_htmx(mut self, htmx: HtmxRequest) -> Self {
        self.htmx = htmx;
        self
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// The RequestSignal: `true` when only the fragment should be rendered.
    pub fn is_fragment_request(&self) -> bool {
        self.htmx.is_fragment_request()
    }

    /// Request path with the `/` fallback applied.
    pub fn request_path(&self) -> &str {
        if self.path.is_empty() {
            "/"
        } else {
            &self.path
        }
    }
}

/// Values visible to one template execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    values: Map<String, Value>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context seeded with the ambient values of `request`.
    pub fn for_request(request: &RequestContext) -> Self {
        let mut ctx = Self::new();
        ctx.insert(REQUEST_PATH_KEY, Value::String(request.request_path().to_string()));
        // HtmxRequest holds only strings and bools
        ctx.insert(HTMX_KEY, serde_json::to_value(&request.htmx).unwrap_or(Value::Null));
        if let Some(token) = &request.csrf_token {
            ctx.insert(CSRF_TOKEN_KEY, Value::String(token.clone()));
        }
        ctx.extend(request.values.clone());
        ctx
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Merge `values`, overwriting existing keys.
    pub fn extend(&mut self, values: Map<String, Value>) {
        self.values.extend(values);
    }

    /// Merge a model.
    ///
    /// Objects are spread at top level; `null` adds nothing; any other value
    /// is exposed under `model`.
    pub fn merge_model<M: Serialize + ?Sized>(&mut self, model: &M) -> Result<(), ViewError> {
        match serde_json::to_value(model)? {
            Value::Object(map) => self.extend(map),
            Value::Null => {}
            other => self.insert(MODEL_KEY, other),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Convert into a Tera context.
    pub fn to_tera(&self) -> tera::Context {
        let mut ctx = tera::Context::new();
        for (key, value) in &self.values {
            ctx.insert(key.as_str(), value);
        }
        ctx
    }
}
