//! HTMX request and response header handling.
//!
//! HTMX marks its AJAX requests with `HX-*` headers. The renderer uses
//! `HX-Request` to decide between a fragment and a full page; the rest is
//! exposed to templates under `_htmx` so views can adapt to the target
//! element or the triggering control.
//!
//! The crate is HTTP-framework agnostic: headers come in as plain name/value
//! pairs.

use serde::Serialize;

/// `HX-Request`: always `true` on requests issued by HTMX.
pub const HX_REQUEST: &str = "HX-Request";
/// `HX-Boosted`: the request comes from an element using `hx-boost`.
pub const HX_BOOSTED: &str = "HX-Boosted";
/// `HX-Current-URL`: the browser's current URL.
pub const HX_CURRENT_URL: &str = "HX-Current-URL";
/// `HX-History-Restore-Request`: history restoration after a cache miss.
pub const HX_HISTORY_RESTORE_REQUEST: &str = "HX-History-Restore-Request";
/// `HX-Prompt`: the user's response to an `hx-prompt`.
pub const HX_PROMPT: &str = "HX-Prompt";
/// `HX-Target`: id of the target element, if it has one.
pub const HX_TARGET: &str = "HX-Target";
/// `HX-Trigger`: id of the triggering element, if it has one.
pub const HX_TRIGGER: &str = "HX-Trigger";
/// `HX-Trigger-Name`: name of the triggering element, if it has one.
pub const HX_TRIGGER_NAME: &str = "HX-Trigger-Name";

/// Response headers understood by the HTMX client.
pub mod response {
    pub const HX_LOCATION: &str = "HX-Location";
    pub const HX_PUSH_URL: &str = "HX-Push-Url";
    pub const HX_REDIRECT: &str = "HX-Redirect";
    pub const HX_REFRESH: &str = "HX-Refresh";
    pub const HX_REPLACE_URL: &str = "HX-Replace-Url";
    pub const HX_RESWAP: &str = "HX-Reswap";
    pub const HX_RETARGET: &str = "HX-Retarget";
    pub const HX_RESELECT: &str = "HX-Reselect";
    pub const HX_TRIGGER: &str = "HX-Trigger";
    pub const HX_TRIGGER_AFTER_SETTLE: &str = "HX-Trigger-After-Settle";
    pub const HX_TRIGGER_AFTER_SWAP: &str = "HX-Trigger-After-Swap";
}

/// The HTMX view of an incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HtmxRequest {
    /// `HX-Request` was present
    pub request: bool,
    pub boosted: bool,
    pub history_restore: bool,
    pub current_url: Option<String>,
    pub prompt: Option<String>,
    pub target: Option<String>,
    pub trigger: Option<String>,
    pub trigger_name: Option<String>,
}

impl HtmxRequest {
    /// Parse HTMX headers from name/value pairs.
    ///
    /// Header names are matched case-insensitively. Boolean headers are set by
    /// presence alone; their value is not inspected.
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut htmx = Self::default();

        for (name, value) in headers {
            let value = value.trim();

            if name.eq_ignore_ascii_case(HX_REQUEST) {
                htmx.request = true;
            } else if name.eq_ignore_ascii_case(HX_BOOSTED) {
                htmx.boosted = true;
            } else if name.eq_ignore_ascii_case(HX_HISTORY_RESTORE_REQUEST) {
                htmx.history_restore = true;
            } else if name.eq_ignore_ascii_case(HX_CURRENT_URL) {
                htmx.current_url = non_empty(value);
            } else if name.eq_ignore_ascii_case(HX_PROMPT) {
                htmx.prompt = non_empty(value);
            } else if name.eq_ignore_ascii_case(HX_TARGET) {
                htmx.target = non_empty(value);
            } else if name.eq_ignore_ascii_case(HX_TRIGGER) {
                htmx.trigger = non_empty(value);
            } else if name.eq_ignore_ascii_case(HX_TRIGGER_NAME) {
                htmx.trigger_name = non_empty(value);
            }
        }

        htmx
    }

    /// A request flagged by `HX-Request` only.
    pub fn fragment() -> Self {
        Self {
            request: true,
            ..Self::default()
        }
    }

    /// Whether the response should be the bare fragment.
    pub fn is_fragment_request(&self) -> bool {
        self.request
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_request_is_not_htmx() {
        let htmx = HtmxRequest::from_headers([("Accept", "text/html")]);
        assert_eq!(htmx, HtmxRequest::default());
        assert!(!htmx.is_fragment_request());
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let htmx = HtmxRequest::from_headers([
            ("hx-request", "true"),
            ("HX-TARGET", "results"),
            ("Hx-Trigger-Name", "search"),
            ("hx-current-url", "http://localhost/users"),
        ]);

        assert!(htmx.is_fragment_request());
        assert_eq!(htmx.target.as_deref(), Some("results"));
        assert_eq!(htmx.trigger_name.as_deref(), Some("search"));
        assert_eq!(htmx.current_url.as_deref(), Some("http://localhost/users"));
    }

    #[test]
    fn test_boolean_flags() {
        let htmx = HtmxRequest::from_headers([
            (HX_REQUEST, "true"),
            (HX_BOOSTED, "true"),
            (HX_HISTORY_RESTORE_REQUEST, "true"),
        ]);
        assert!(htmx.is_fragment_request());
        assert!(htmx.boosted);
        assert!(htmx.history_restore);
        assert_eq!(htmx.prompt, None);
    }

    #[test]
    fn test_boolean_headers_are_set_by_presence() {
        for value in ["false", "", "0"] {
            let htmx = HtmxRequest::from_headers([
                (HX_REQUEST, value),
                (HX_BOOSTED, value),
                (HX_HISTORY_RESTORE_REQUEST, value),
            ]);
            assert!(htmx.request, "HX-Request: {value:?}");
            assert!(htmx.boosted);
            assert!(htmx.history_restore);
            assert!(htmx.is_fragment_request());
        }
    }
}
