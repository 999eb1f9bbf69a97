//! Data models for the rows streamed to the analytics store.
//!
//! This module defines the two row shapes the importer produces:
//! - [`PageRow`]: one row per published page, carrying headline, author,
//!   channel and word-count metrics
//! - [`ProductRow`]: one row per page that embeds inline Amazon product
//!   links in its body copy
//!
//! Rows serialize with camelCase field names to match the analytics table
//! schemas, hence the `rename_all` attributes.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Analytics row for a single published page.
///
/// Most fields are optional: composed pages vary a lot, and an absent
/// component simply leaves its columns null. The transform owns the
/// normalization rules (HTML stripping, channel casing, host rewriting);
/// this struct is just the shape on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRow {
    pub date: Option<String>,
    pub canonical_url: Option<String>,
    pub primary_headline: Option<String>,
    pub seo_headline: Option<String>,
    pub override_headline: Option<String>,
    pub short_headline: Option<String>,
    pub syndicated_url: Option<String>,
    /// Feature-type flags that are switched on for this page.
    pub feature_types: Vec<String>,
    pub tags: Vec<String>,
    pub content_channel: Option<String>,
    pub authors: Vec<String>,
    pub rubric: Option<String>,
    pub magazine_issue_date: Option<String>,
    pub twitter_title: Option<String>,
    pub og_title: Option<String>,
    pub site_name: Option<String>,
    pub page_type: Option<String>,
    pub vertical: Option<String>,
    /// Total words across body copy, OG title, primary and short headlines.
    pub word_count: usize,
    /// Refs of product components embedded in the page body.
    pub product_ids: Vec<String>,
    /// Historical buy URLs collected from product components.
    pub product_buy_urls: Vec<String>,
    /// Logical URI of the page, after host rewriting.
    pub page_uri: String,
    /// Always `"clay"`; the warehouse mixes rows from several CMSes.
    pub cms_source: String,
    pub domain: Option<String>,
    /// Row creation time.
    pub timestamp: DateTime<Utc>,
}

/// Analytics row for the inline products of a single page.
///
/// Produced only for pages whose paragraphs link to Amazon; the vectors are
/// parallel per-link collections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRow {
    /// Link texts of the inline product anchors.
    pub product_name: Vec<String>,
    /// Href targets of the inline product anchors.
    pub product_url: Vec<String>,
    /// Product ids recovered from the tail of each link URL.
    pub product_id: Vec<String>,
    /// Stripped text of every paragraph that carries an inline product link.
    pub product_description: Vec<String>,
    pub product_vendor: String,
    pub site: String,
    pub timestamp: DateTime<Utc>,
    pub product_page_uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_row_serializes_camel_case() {
        let row = PageRow {
            date: Some("2017-06-01".to_string()),
            canonical_url: None,
            primary_headline: Some("A headline".to_string()),
            seo_headline: None,
            override_headline: None,
            short_headline: None,
            syndicated_url: None,
            feature_types: vec![],
            tags: vec!["politics".to_string()],
            content_channel: Some("Other".to_string()),
            authors: vec!["A. Writer".to_string()],
            rubric: None,
            magazine_issue_date: None,
            twitter_title: None,
            og_title: None,
            site_name: Some("New York Magazine".to_string()),
            page_type: None,
            vertical: None,
            word_count: 412,
            product_ids: vec![],
            product_buy_urls: vec![],
            page_uri: "nymag.com/pages/a@published".to_string(),
            cms_source: "clay".to_string(),
            domain: Some("nymag.com".to_string()),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["primaryHeadline"], "A headline");
        assert_eq!(json["contentChannel"], "Other");
        assert_eq!(json["wordCount"], 412);
        assert_eq!(json["cmsSource"], "clay");
        assert_eq!(json["pageUri"], "nymag.com/pages/a@published");
    }

    #[test]
    fn test_product_row_serializes_camel_case() {
        let row = ProductRow {
            product_name: vec!["this lamp".to_string()],
            product_url: vec!["https://www.amazon.com/dp/B01LYCLS24/".to_string()],
            product_id: vec!["LYCLS2".to_string()],
            product_description: vec!["Buy this lamp now".to_string()],
            product_vendor: "Amazon".to_string(),
            site: "The Strategist".to_string(),
            timestamp: Utc::now(),
            product_page_uri: "nymag.com/strategist/pages/a@published".to_string(),
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["productVendor"], "Amazon");
        assert_eq!(json["productPageUri"], "nymag.com/strategist/pages/a@published");
        assert_eq!(json["productName"][0], "this lamp");
    }
}
