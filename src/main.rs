//! # Clay Metrics Import
//!
//! A batch importer that fetches the published rendition of every page
//! behind a Clay CMS list endpoint, maps each page to an analytics row,
//! and appends the rows to NDJSON table files for warehouse loading.
//!
//! ## Features
//!
//! - Rate-limited fetching: one shared quota covers the list fetch and the
//!   whole per-page fan-out (1000 requests / 60 s by default)
//! - Per-page failure isolation: a bad page is logged and skipped, never
//!   aborting the batch
//! - Two transforms: page metrics and inline Amazon product extraction
//!
//! ## Usage
//!
//! ```sh
//! clay_metrics_import -l http://nymag.com/selectall/pages -o ./rows
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Listing**: Fetch the list endpoint (a JSON array of page identifiers)
//! 2. **Fetching**: Download each page's `@published.json` rendition
//!    through the shared rate limiter (bounded fan-out, 12 at a time)
//! 3. **Transforming**: Map each document to a row; failures are skipped
//! 4. **Sinking**: Append the surviving rows to the destination table file

use clap::Parser;
use serde_json::Value;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod fetch;
mod limiter;
mod models;
mod sink;
mod transforms;
mod urls;
mod utils;

use cli::{Cli, Module};
use config::load_config;
use fetch::fetch_list_instances;
use limiter::RateLimiter;
use sink::{NdjsonSink, RowSink};
use transforms::{inline_products, page};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("clay_metrics_import starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.list_url, ?args.module, ?args.output_dir, "Parsed CLI arguments");

    let config = load_config(args.config.as_deref())?;
    info!(
        requests_per_window = config.rate_limit.requests_per_window,
        window_secs = config.rate_limit.window_secs,
        max_in_flight = config.rate_limit.max_in_flight,
        "Loaded configuration"
    );

    // Early check: ensure the output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // One limiter for the whole process; every fetch below shares its quota.
    let limiter = RateLimiter::new((&config.rate_limit).into());
    let sink = NdjsonSink::new(&args.output_dir);

    let dataset = args
        .dataset
        .unwrap_or_else(|| args.module.default_dataset().to_string());
    let table = args
        .table
        .unwrap_or_else(|| args.module.default_table().to_string());
    info!(%dataset, %table, "Import destination");

    let inserted = match args.module {
        Module::Page => {
            let host_rewrites = config.host_rewrites.clone();
            let transform =
                move |uri: &str, doc: &Value| page::to_row(uri, doc, &host_rewrites);
            let rows = fetch_list_instances(&limiter, &args.list_url, &transform).await?;
            info!(count = rows.len(), "Transformed page rows");
            sink.insert_rows(&dataset, &table, &rows).await?;
            rows.len()
        }
        Module::InlineProducts => {
            let site_label = config.site_label.clone();
            let transform =
                move |uri: &str, doc: &Value| inline_products::to_row(uri, doc, &site_label);
            let rows = fetch_list_instances(&limiter, &args.list_url, &transform).await?;
            info!(count = rows.len(), "Transformed inline-product rows");
            sink.insert_rows(&dataset, &table, &rows).await?;
            rows.len()
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        rows = inserted,
        "Execution complete"
    );

    Ok(())
}
