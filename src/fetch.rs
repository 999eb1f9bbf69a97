//! Rate-limited retrieval of published page instances.
//!
//! Two operations, both running every GET through one shared
//! [`RateLimiter`]:
//!
//! - [`fetch_instance`]: fetch one page's published rendition, validate it,
//!   and apply a transform. Failures are logged and swallowed — a bad page
//!   can never abort a batch.
//! - [`fetch_list_instances`]: fetch a list endpoint (a JSON array of page
//!   identifiers), fan out one `fetch_instance` per identifier, and collect
//!   the rows that survived. A failure to fetch or parse the list itself is
//!   not isolated; it propagates to the caller.
//!
//! # Failure isolation
//!
//! Internally each per-page fetch produces a [`FetchFailure`] naming what
//! went wrong (transport, malformed body, embedded error code, transform),
//! which keeps failures inspectable in tests. The public boundary collapses
//! that to exactly one `error!` record plus omission from the output.

use futures::stream::{self, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::limiter::{AdmitError, FetchRequest, RateLimiter};
use crate::urls::{to_fetch_url, to_logical_uri};
use crate::utils::truncate_for_log;

/// Cap on simultaneously buffered per-page fetches. The limiter already
/// bounds requests in flight; this additionally bounds queued futures so a
/// huge list cannot spike memory.
const FAN_OUT_WIDTH: usize = 12;

/// Outcome of a transform: a row, nothing (the document legitimately
/// produces no row), or a per-item failure.
pub type TransformResult<T> = Result<Option<T>, Box<dyn std::error::Error + Send + Sync>>;

/// Everything that can go wrong fetching a single page instance.
///
/// All variants are terminal for that page on that attempt; no retries.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// Connection failure or timeout from the transport layer.
    #[error(transparent)]
    Transport(#[from] AdmitError),
    /// The response body was not valid JSON.
    #[error("malformed body: {0}")]
    MalformedBody(#[from] serde_json::Error),
    /// HTTP 200, but the payload carried an application error code. The CMS
    /// puts its 404s inside the JSON.
    #[error("remote signalled error code {0}")]
    RemoteCode(i64),
    /// The transform rejected the document.
    #[error("transform failed: {0}")]
    Transform(String),
}

/// Reject documents that carry an embedded application error.
///
/// A top-level numeric `code` greater than 200 means the fetch failed even
/// though the HTTP status said otherwise.
fn ensure_no_embedded_error(document: &Value) -> Result<(), FetchFailure> {
    match document.get("code").and_then(Value::as_i64) {
        Some(code) if code > 200 => Err(FetchFailure::RemoteCode(code)),
        _ => Ok(()),
    }
}

async fn fetch_instance_inner<T, F>(
    limiter: &RateLimiter,
    identifier: &str,
    transform: &F,
) -> Result<Option<T>, FetchFailure>
where
    F: Fn(&str, &Value) -> TransformResult<T>,
{
    let fetch_url = to_fetch_url(identifier);
    let logical_uri = to_logical_uri(&fetch_url);

    let body = limiter.admit(FetchRequest::lenient(&fetch_url)).await?;
    let document: Value = serde_json::from_str(&body).map_err(|e| {
        debug!(
            %fetch_url,
            body_preview = %truncate_for_log(&body, 300),
            "Body is not JSON"
        );
        e
    })?;
    ensure_no_embedded_error(&document)?;

    transform(&logical_uri, &document).map_err(|e| FetchFailure::Transform(e.to_string()))
}

/// Fetch one page instance and transform it into a row.
///
/// Canonicalizes `identifier` (see [`crate::urls`]), submits a lenient
/// request through the limiter, parses the body, checks for an embedded
/// error code, and hands the document to `transform` along with the page's
/// logical URI.
///
/// Never fails from the caller's point of view: any failure is logged once
/// and converted to `None`, so batch fan-outs survive bad pages.
#[instrument(level = "debug", skip_all, fields(identifier = %identifier))]
pub async fn fetch_instance<T, F>(
    limiter: &RateLimiter,
    identifier: &str,
    transform: &F,
) -> Option<T>
where
    F: Fn(&str, &Value) -> TransformResult<T>,
{
    match fetch_instance_inner(limiter, identifier, transform).await {
        Ok(row) => row,
        Err(e) => {
            error!(identifier, error = %e, "Instance fetch failed; skipping");
            None
        }
    }
}

/// Fetch every instance named by a list endpoint.
///
/// The list endpoint must return a JSON array of page identifiers. Each
/// identifier is fetched concurrently (bounded, input order preserved) and
/// transformed; pages that fail have already been logged by
/// [`fetch_instance`] and are simply absent from the result.
///
/// # Errors
///
/// Fails if the list itself cannot be fetched or is not a JSON string
/// array. There is no per-item fallback above the list level.
#[instrument(level = "info", skip_all, fields(list_url = %list_url))]
pub async fn fetch_list_instances<T, F>(
    limiter: &RateLimiter,
    list_url: &str,
    transform: &F,
) -> Result<Vec<T>, FetchFailure>
where
    F: Fn(&str, &Value) -> TransformResult<T>,
{
    let body = limiter.admit(FetchRequest::lenient(list_url)).await?;
    let identifiers: Vec<String> = serde_json::from_str(&body)?;
    info!(count = identifiers.len(), "Fetched instance list");

    let rows: Vec<Option<T>> = stream::iter(identifiers)
        .map(|identifier| async move { fetch_instance(limiter, &identifier, transform).await })
        .buffered(FAN_OUT_WIDTH)
        .collect()
        .await;

    Ok(rows.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::RateLimitConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_limiter() -> RateLimiter {
        RateLimiter::new(RateLimitConfig::default())
    }

    /// Transform that wraps the document and records the attributed URI.
    fn uri_tagging_transform(uri: &str, doc: &Value) -> TransformResult<Value> {
        Ok(Some(json!({ "uri": uri, "doc": doc })))
    }

    async fn mount_page(server: &MockServer, page_path: &str, body: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(page_path.to_string()))
            .respond_with(body)
            .mount(server)
            .await;
    }

    fn identifier(server: &MockServer, page_path: &str) -> String {
        // Bare host+path, no scheme: the canonicalizer adds it back.
        format!(
            "{}{}",
            server.uri().trim_start_matches("http://"),
            page_path
        )
    }

    #[tokio::test]
    async fn test_fetch_instance_transforms_a_valid_page() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/pages/a@published.json",
            ResponseTemplate::new(200).set_body_json(json!({"title": "hello"})),
        )
        .await;

        let limiter = test_limiter();
        let row = fetch_instance(&limiter, &identifier(&server, "/pages/a"), &uri_tagging_transform)
            .await
            .unwrap();

        assert_eq!(row["doc"]["title"], "hello");
        let uri = row["uri"].as_str().unwrap();
        assert!(uri.ends_with("/pages/a@published"));
        assert!(!uri.starts_with("http://"));
    }

    #[tokio::test]
    async fn test_fetch_instance_embedded_code_skips_transform() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/pages/gone@published.json",
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 404, "message": "not found"})),
        )
        .await;

        let calls = AtomicUsize::new(0);
        let transform = |uri: &str, doc: &Value| -> TransformResult<Value> {
            calls.fetch_add(1, Ordering::SeqCst);
            uri_tagging_transform(uri, doc)
        };

        let limiter = test_limiter();
        let row = fetch_instance(&limiter, &identifier(&server, "/pages/gone"), &transform).await;

        assert!(row.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0, "transform must not run");
    }

    #[tokio::test]
    async fn test_fetch_instance_code_200_is_not_an_error() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/pages/ok@published.json",
            ResponseTemplate::new(200).set_body_json(json!({"code": 200, "title": "fine"})),
        )
        .await;

        let limiter = test_limiter();
        let row =
            fetch_instance(&limiter, &identifier(&server, "/pages/ok"), &uri_tagging_transform)
                .await;
        assert!(row.is_some());
    }

    #[tokio::test]
    async fn test_fetch_instance_invalid_json_resolves_to_none() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/pages/junk@published.json",
            ResponseTemplate::new(200).set_body_string("<html>not json</html>"),
        )
        .await;

        let limiter = test_limiter();
        let row =
            fetch_instance(&limiter, &identifier(&server, "/pages/junk"), &uri_tagging_transform)
                .await;
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_fetch_instance_transform_error_is_swallowed() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/pages/a@published.json",
            ResponseTemplate::new(200).set_body_json(json!({})),
        )
        .await;

        let transform =
            |_: &str, _: &Value| -> TransformResult<Value> { Err("no main component".into()) };

        let limiter = test_limiter();
        let row = fetch_instance(&limiter, &identifier(&server, "/pages/a"), &transform).await;
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_fetch_instance_transform_may_decline_a_document() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/pages/a@published.json",
            ResponseTemplate::new(200).set_body_json(json!({})),
        )
        .await;

        let transform = |_: &str, _: &Value| -> TransformResult<Value> { Ok(None) };

        let limiter = test_limiter();
        let row = fetch_instance(&limiter, &identifier(&server, "/pages/a"), &transform).await;
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_fetch_list_instances_drops_failures_and_keeps_order() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/pages/a@published.json",
            ResponseTemplate::new(200).set_body_json(json!({"title": "a"})),
        )
        .await;
        // "b" dies at the transport level: its identifier points at a port
        // with nothing listening.
        mount_page(
            &server,
            "/pages/c@published.json",
            ResponseTemplate::new(200).set_body_json(json!({"title": "c"})),
        )
        .await;

        let list = json!([
            identifier(&server, "/pages/a"),
            "127.0.0.1:1/pages/b",
            identifier(&server, "/pages/c"),
        ]);
        mount_page(
            &server,
            "/pages",
            ResponseTemplate::new(200).set_body_json(list),
        )
        .await;

        let limiter = test_limiter();
        let rows = fetch_list_instances(
            &limiter,
            &format!("{}/pages", server.uri()),
            &uri_tagging_transform,
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["doc"]["title"], "a");
        assert_eq!(rows[1]["doc"]["title"], "c");
    }

    #[tokio::test]
    async fn test_fetch_list_instances_empty_list() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/pages",
            ResponseTemplate::new(200).set_body_json(json!([])),
        )
        .await;

        let limiter = test_limiter();
        let rows = fetch_list_instances(
            &limiter,
            &format!("{}/pages", server.uri()),
            &uri_tagging_transform,
        )
        .await
        .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_list_instances_malformed_list_propagates() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/pages",
            ResponseTemplate::new(200).set_body_string("not a json array"),
        )
        .await;

        let limiter = test_limiter();
        let result = fetch_list_instances(
            &limiter,
            &format!("{}/pages", server.uri()),
            &uri_tagging_transform,
        )
        .await;
        assert!(matches!(result, Err(FetchFailure::MalformedBody(_))));
    }

    #[tokio::test]
    async fn test_fetch_list_instances_unreachable_list_propagates() {
        let limiter = test_limiter();
        let result =
            fetch_list_instances(&limiter, "http://127.0.0.1:1/pages", &uri_tagging_transform)
                .await;
        assert!(matches!(result, Err(FetchFailure::Transport(_))));
    }

    #[test]
    fn test_ensure_no_embedded_error() {
        assert!(ensure_no_embedded_error(&json!({"title": "x"})).is_ok());
        assert!(ensure_no_embedded_error(&json!({"code": 200})).is_ok());
        assert!(ensure_no_embedded_error(&json!({"code": "404"})).is_ok());
        assert!(matches!(
            ensure_no_embedded_error(&json!({"code": 404})),
            Err(FetchFailure::RemoteCode(404))
        ));
    }
}
