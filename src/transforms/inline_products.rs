//! Inline-product transform.
//!
//! Mines the paragraphs of a page for Amazon product links. Pages without
//! any inline link produce no row at all, so this transform declines most
//! documents.

use itertools::Itertools;
use scraper::Html;
use serde_json::Value;
use url::Url;

use crate::fetch::TransformResult;
use crate::models::ProductRow;
use crate::utils::{ANCHOR_SELECTOR, strip_tags};

const PARAGRAPH_COMPONENT: &str = "components/clay-paragraph";

/// One inline link: href target plus anchor text.
#[derive(Debug, Clone)]
struct InlineLink {
    url: String,
    text: String,
}

/// Map a page document to an inline-product row, or decline it when the
/// body copy has no Amazon links.
///
/// Link URLs, texts, and product ids come from the first paragraph that
/// carries Amazon links; the description column collects the stripped text
/// of every such paragraph.
pub fn to_row(uri: &str, doc: &Value, site_label: &str) -> TransformResult<ProductRow> {
    let content = doc
        .get("main")
        .and_then(|main| main.get(0))
        .and_then(|component| component.get("content"))
        .and_then(Value::as_array);
    let Some(content) = content else {
        return Ok(None);
    };

    let mut link_groups: Vec<Vec<InlineLink>> = Vec::new();
    let mut descriptions: Vec<String> = Vec::new();

    for item in content {
        let component_ref = item.get("_ref").and_then(Value::as_str).unwrap_or("");
        if !component_ref.contains(PARAGRAPH_COMPONENT) {
            continue;
        }
        let Some(text) = item.get("text").and_then(Value::as_str) else {
            continue;
        };

        let links = amazon_links(text);
        if links.is_empty() {
            continue;
        }
        descriptions.push(strip_tags(text));
        link_groups.push(links);
    }

    let Some(first_group) = link_groups.into_iter().next() else {
        return Ok(None);
    };

    let product_url: Vec<String> =
        first_group.iter().map(|l| l.url.clone()).unique().collect();
    let product_name: Vec<String> =
        first_group.iter().map(|l| l.text.clone()).unique().collect();
    let product_id: Vec<String> = first_group
        .iter()
        .filter_map(|l| product_id_from_url(&l.url))
        .unique()
        .collect();

    Ok(Some(ProductRow {
        product_name,
        product_url,
        product_id,
        product_description: descriptions,
        product_vendor: "Amazon".to_string(),
        site: site_label.to_string(),
        timestamp: chrono::Utc::now(),
        product_page_uri: uri.to_string(),
    }))
}

/// Extract the Amazon links out of a paragraph's HTML.
fn amazon_links(text: &str) -> Vec<InlineLink> {
    let fragment = Html::parse_fragment(text);
    fragment
        .select(&ANCHOR_SELECTOR)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            if !is_amazon_url(href) {
                return None;
            }
            Some(InlineLink {
                url: href.to_string(),
                text: anchor.text().collect::<String>(),
            })
        })
        .collect()
}

/// True when the link points at amazon.com, any subdomain included.
fn is_amazon_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    host == "amazon.com" || host.ends_with(".amazon.com")
}

/// The product id sits in the six characters before the URL's final
/// character (store URLs end with a trailing slash).
fn product_id_from_url(url: &str) -> Option<String> {
    if url.len() < 7 {
        return None;
    }
    url.get(url.len() - 7..url.len() - 1).map(str::to_string)
}
