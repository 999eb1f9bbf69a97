//! Page metrics transform.
//!
//! Maps one composed page document to a flat [`PageRow`]. Article fields
//! come from `main[0]`, falling back to `splashHeader[0]` — video articles
//! keep their article data in the splash header. Social titles come from
//! `head`, site metadata from `headLayout`.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::fetch::TransformResult;
use crate::models::PageRow;
use crate::utils::{strip_tags, upcase, word_count};

/// Component ref marker for product components embedded in body copy.
const PRODUCT_COMPONENT: &str = "/components/product";

/// Map a published page document to an analytics row.
///
/// `host_rewrites` replaces internal host prefixes in the page URI with
/// their public equivalents before the URI is stored or used for domain
/// attribution.
pub fn to_row(
    uri: &str,
    doc: &Value,
    host_rewrites: &HashMap<String, String>,
) -> TransformResult<PageRow> {
    let head = first_component(doc, "head");
    let head_layout = first_component(doc, "headLayout");

    let primary_headline = article_field(doc, "primaryHeadline");
    let short_headline = article_field(doc, "shortHeadline");
    // head carries the social titles; syndicatedUrl may be overridden by
    // the article component
    let twitter_title = str_field(head, "twitterTitle");
    let og_title = str_field(head, "ogTitle");
    let syndicated_url = article_field(doc, "syndicatedUrl").or_else(|| str_field(head, "syndicatedUrl"));

    let content = article_value(doc, "content");
    let content_texts: Vec<String> = content
        .map(resolve_texts)
        .unwrap_or_default()
        .into_iter()
        .map(|text| strip_tags(&text))
        .collect();

    // Word count spans body copy plus the page-level title fields.
    let word_count_total = content_texts
        .iter()
        .map(|text| word_count(text))
        .sum::<usize>()
        + [&og_title, &primary_headline, &short_headline]
            .into_iter()
            .flatten()
            .map(|text| word_count(text))
            .sum::<usize>();

    let refs = content.map(|c| resolve_property(c, "_ref")).unwrap_or_default();
    let product_ids: Vec<String> = refs
        .into_iter()
        .filter(|r| r.contains(PRODUCT_COMPONENT))
        .collect();
    let product_buy_urls = content
        .map(|c| resolve_property(c, "buyUrlHistory"))
        .unwrap_or_default();

    let authors = article_value(doc, "authors").map(resolve_texts).unwrap_or_default();
    let tags = article_value(doc, "tags")
        .and_then(|t| t.get("items"))
        .map(resolve_texts)
        .unwrap_or_default();

    // Legacy batch imports spell the channel in lowercase
    let content_channel = article_field(doc, "contentChannel").map(|channel| {
        if channel == "other" { upcase(&channel) } else { channel }
    });

    let feature_types = article_value(doc, "featureTypes")
        .and_then(Value::as_object)
        .map(|flags| {
            flags
                .iter()
                .filter(|(_, enabled)| truthy(enabled))
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default();

    let page_uri = rewrite_host(uri, host_rewrites);
    let domain = host_of(&page_uri);
    if domain.is_none() {
        debug!(%page_uri, "Could not derive a domain for page row");
    }

    Ok(Some(PageRow {
        date: article_field(doc, "date"),
        canonical_url: article_field(doc, "canonicalUrl"),
        primary_headline: primary_headline.as_deref().map(strip_tags),
        seo_headline: article_field(doc, "seoHeadline"),
        // social and override headlines are normalized to the stripped
        // short headline
        override_headline: short_headline.as_deref().map(strip_tags),
        og_title: short_headline.as_deref().map(strip_tags),
        short_headline: short_headline.as_deref().map(strip_tags),
        syndicated_url,
        feature_types,
        tags,
        content_channel,
        authors,
        rubric: article_field(doc, "rubric"),
        magazine_issue_date: article_field(doc, "magazineIssueDate"),
        twitter_title,
        site_name: str_field(head_layout, "siteName"),
        page_type: str_field(head_layout, "pageType"),
        vertical: str_field(head_layout, "vertical"),
        word_count: word_count_total,
        product_ids,
        product_buy_urls,
        page_uri,
        cms_source: "clay".to_string(),
        domain,
        timestamp: Utc::now(),
    }))
}

/// First element of a top-level component area.
fn first_component<'a>(doc: &'a Value, area: &str) -> Option<&'a Value> {
    doc.get(area)?.get(0)
}

fn str_field(component: Option<&Value>, field: &str) -> Option<String> {
    component?.get(field)?.as_str().map(str::to_string)
}

/// Article field with `main[0]` winning over `splashHeader[0]`.
fn article_field(doc: &Value, field: &str) -> Option<String> {
    str_field(first_component(doc, "main"), field)
        .or_else(|| str_field(first_component(doc, "splashHeader"), field))
}

/// Like [`article_field`] for non-string values.
fn article_value<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    first_component(doc, "main")
        .and_then(|c| c.get(field))
        .or_else(|| first_component(doc, "splashHeader").and_then(|c| c.get(field)))
}

/// Flatten `[{text}, {text}]` object lists to their text values. Product
/// components contribute their first description text too.
fn resolve_texts(items: &Value) -> Vec<String> {
    let Some(items) = items.as_array() else {
        return Vec::new();
    };
    let mut texts = Vec::new();
    for item in items {
        if let Some(text) = item.get("text").and_then(Value::as_str) {
            texts.push(text.to_string());
        }
        if let Some(description) = item
            .get("description")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("text"))
            .and_then(Value::as_str)
        {
            texts.push(description.to_string());
        }
    }
    texts
}

/// Collect a property across a component list, flattening list-valued
/// properties (`buyUrlHistory` is a list per component).
fn resolve_property(items: &Value, property: &str) -> Vec<String> {
    let Some(items) = items.as_array() else {
        return Vec::new();
    };
    let mut values = Vec::new();
    for item in items {
        match item.get(property) {
            Some(Value::String(s)) => values.push(s.clone()),
            Some(Value::Array(list)) => {
                values.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
            }
            _ => {}
        }
    }
    values
}

/// JS-style truthiness for feature-type flags.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Replace internal host prefixes with their public equivalents.
fn rewrite_host(uri: &str, host_rewrites: &HashMap<String, String>) -> String {
    for (internal, public) in host_rewrites {
        if uri.starts_with(internal.as_str()) {
            return format!("{public}{}", &uri[internal.len()..]);
        }
    }
    uri.to_string()
}

/// Host portion of a scheme-less page URI.
fn host_of(page_uri: &str) -> Option<String> {
    Url::parse(&format!("http://{page_uri}"))
        .ok()?
        .host_str()
        .map(str::to_string)
}
