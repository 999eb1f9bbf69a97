//! Transforms mapping composed page documents to analytics rows.
//!
//! Each transform is a pure function from `(logical_uri, document)` to at
//! most one row; all I/O stays in the fetch pipeline. A transform may also
//! decline a document (`Ok(None)`) when the page simply has nothing to
//! report.
//!
//! # Available Transforms
//!
//! | Transform | Module | Row | Notes |
//! |-----------|--------|-----|-------|
//! | Page metrics | [`page`] | `PageRow` | One row per published page |
//! | Inline products | [`inline_products`] | `ProductRow` | Only pages with Amazon links in body copy |
//!
//! # Common Patterns
//!
//! Composed documents are component trees: top-level areas (`main`,
//! `splashHeader`, `head`, `headLayout`) hold lists of component objects,
//! each tagged with a `_ref` naming its component type. Transforms pick the
//! fields they need, strip HTML, and leave absent components as null
//! columns.

pub mod inline_products;
pub mod page;
