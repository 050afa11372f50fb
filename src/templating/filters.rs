//! HTMX helper filters and functions registered on every compiled template.
//!
//! # Filters
//!
//! - `hx_vals`: serialize a value to JSON for an `hx-vals` attribute
//! - `active_class(class, current)`: emit `class` when the input path equals
//!   `current` (ASCII case-insensitive), otherwise an empty string
//! - `append_query(key, value)`: append a URL-encoded `key=value` pair
//!
//! # Functions
//!
//! - `asset(path)`: resolve a static asset path through the configured
//!   [`AssetResolver`]
//!
//! ```html
//! <a href="/docs" class="{{ "/docs" | active_class(class="active", current=_request_path) }}">Docs</a>
//! <button hx-post="{{ "/items" | append_query(key="page", value=page) }}"
//!         hx-vals='{{ filters | hx_vals }}'>Load</button>
//! <script src="{{ asset(path="/js/app.js") }}"></script>
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tera::{Tera, Value};

/// Maps a public asset path to the URL emitted into HTML.
///
/// The default implementation returns the path unchanged; applications that
/// fingerprint assets plug in their own manifest lookup.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, path: &str) -> String;
}

/// Resolver that returns asset paths unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAssets;

impl AssetResolver for IdentityAssets {
    fn resolve(&self, path: &str) -> String {
        path.to_string()
    }
}

impl<F> AssetResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn resolve(&self, path: &str) -> String {
        self(path)
    }
}

/// Register the helper filters and the `asset` function on `tera`.
pub fn register(tera: &mut Tera, assets: Arc<dyn AssetResolver>) {
    tera.register_filter("hx_vals", hx_vals);
    tera.register_filter("active_class", active_class);
    tera.register_filter("append_query", append_query);
    tera.register_function("asset", AssetFunction(assets));
}

fn hx_vals(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let json = serde_json::to_string(value)
        .map_err(|e| tera::Error::msg(format!("hx_vals: cannot serialize value: {}", e)))?;
    Ok(Value::String(json))
}

fn active_class(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let path = value_to_string(value);
    let class = required_arg(args, "active_class", "class")?;
    let current = args.get("current").map(value_to_string).unwrap_or_default();

    let active = path.eq_ignore_ascii_case(&current);
    Ok(Value::String(if active {
        class
    } else {
        String::new()
    }))
}

fn append_query(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let url = value_to_string(value);
    let key = required_arg(args, "append_query", "key")?;
    let val = required_arg(args, "append_query", "value")?;

    let separator = if url.contains('?') {
        '&'
    } else {
        '?'
    };
    let key: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
    let val: String = url::form_urlencoded::byte_serialize(val.as_bytes()).collect();

    Ok(Value::String(format!("{url}{separator}{key}={val}")))
}

struct AssetFunction(Arc<dyn AssetResolver>);

impl tera::Function for AssetFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let path = required_arg(args, "asset", "path")?;
        Ok(Value::String(self.0.resolve(&path)))
    }

    // Asset URLs are emitted into attributes verbatim
    fn is_safe(&self) -> bool {
        true
    }
}

fn required_arg(args: &HashMap<String, Value>, helper: &str, name: &str) -> tera::Result<String> {
    args.get(name)
        .map(value_to_string)
        .ok_or_else(|| tera::Error::msg(format!("{helper}: missing required argument `{name}`")))
}

/// Strings render without quotes; everything else uses its JSON form.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_hx_vals_serializes_objects() {
        let out = hx_vals(&json!({"page": 2}), &HashMap::new()).unwrap();
        assert_eq!(out, json!(r#"{"page":2}"#));
    }

    #[test]
    fn test_active_class_matches_case_insensitively() {
        let a = args(&[("class", json!("active")), ("current", json!("/Docs"))]);
        assert_eq!(active_class(&json!("/docs"), &a).unwrap(), json!("active"));

        let b = args(&[("class", json!("active")), ("current", json!("/about"))]);
        assert_eq!(active_class(&json!("/docs"), &b).unwrap(), json!(""));
    }

    #[test]
    fn test_active_class_requires_class() {
        let err = active_class(&json!("/"), &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("class"));
    }

    #[test]
    fn test_append_query_picks_separator_and_encodes() {
        let a = args(&[("key", json!("q")), ("value", json!("a&b"))]);
        assert_eq!(append_query(&json!("/search"), &a).unwrap(), json!("/search?q=a%26b"));

        let b = args(&[("key", json!("page")), ("value", json!(3))]);
        assert_eq!(append_query(&json!("/users?sort=name"), &b).unwrap(), json!("/users?sort=name&page=3"));
    }

    #[test]
    fn test_asset_function_uses_resolver() {
        let mut tera = Tera::default();
        register(&mut tera, Arc::new(|path: &str| format!("{path}?v=abc")));
        tera.add_raw_template("t", r#"{{ asset(path="/app.css") }}"#).unwrap();

        let out = tera.render("t", &tera::Context::new()).unwrap();
        assert_eq!(out, "/app.css?v=abc");
    }
}
