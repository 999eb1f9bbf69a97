//! Canonical URL handling for published page renditions.
//!
//! The CMS serves the published rendition of a page at
//! `http://<host+path>@published.json`. Rows are attributed to the logical
//! URI, which drops the scheme and the `.json` extension but keeps the
//! `@published` marker so republished and draft renditions stay
//! distinguishable downstream.
//!
//! Both functions are pure string transforms; no I/O, no allocation beyond
//! the returned `String`.

const PROTOCOL: &str = "http://";
const PUBLISHED_VERSION: &str = "@published";
const JSON_EXTENSION: &str = ".json";
const PUBLISHED_JSON: &str = "@published.json";

/// Canonicalize a page identifier into a fetchable published-rendition URL.
///
/// Prepends `http://` unless the identifier already starts with the scheme
/// (case-insensitive), then appends `@published.json` unless the identifier
/// already carries the marker. Applying this twice yields the same string
/// as applying it once.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     to_fetch_url("nymag.com/selectall/pages/an-instance"),
///     "http://nymag.com/selectall/pages/an-instance@published.json"
/// );
/// ```
pub fn to_fetch_url(identifier: &str) -> String {
    let scheme = if has_protocol(identifier) { "" } else { PROTOCOL };

    let suffix = if identifier.ends_with(PUBLISHED_JSON) {
        ""
    } else if identifier.ends_with(PUBLISHED_VERSION) {
        JSON_EXTENSION
    } else {
        // both marker and extension are missing
        return format!("{scheme}{identifier}{PUBLISHED_VERSION}{JSON_EXTENSION}");
    };

    format!("{scheme}{identifier}{suffix}")
}

/// Recover the logical URI used for row attribution from a fetch URL.
///
/// Strips a leading scheme and truncates at the first `.json`. The
/// `@published` marker is deliberately retained.
pub fn to_logical_uri(fetch_url: &str) -> String {
    let without_scheme = if has_protocol(fetch_url) {
        &fetch_url[PROTOCOL.len()..]
    } else {
        fetch_url
    };

    without_scheme
        .split(JSON_EXTENSION)
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}

/// Case-insensitive check for a leading `http://` (first seven characters).
fn has_protocol(s: &str) -> bool {
    s.get(..PROTOCOL.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(PROTOCOL))
}
