//! Analytics sinks for the rows the transforms produce.
//!
//! The warehouse interface is an append-only streaming insert: rows are
//! handed over in batches addressed by dataset and table, and a sink never
//! rewrites what it already accepted.
//!
//! # Output Structure
//!
//! The production [`NdjsonSink`] lands batches as newline-delimited JSON:
//!
//! ```text
//! output_dir/
//! └── clay/
//!     └── page_data.ndjson
//! ```
//!
//! A downstream loader tails these files into the warehouse proper.

use serde::Serialize;
use std::error::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

/// Append-only streaming insert into an analytics dataset/table.
pub trait RowSink {
    /// Append `rows` to `dataset.table`. An empty batch is a no-op.
    async fn insert_rows<T: Serialize + Sync>(
        &self,
        dataset: &str,
        table: &str,
        rows: &[T],
    ) -> Result<(), Box<dyn Error>>;
}

/// Sink writing one JSON object per line under `{output_dir}/{dataset}/{table}.ndjson`.
pub struct NdjsonSink {
    output_dir: String,
}

impl NdjsonSink {
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl RowSink for NdjsonSink {
    #[instrument(level = "info", skip_all, fields(%dataset, %table, rows = rows.len()))]
    async fn insert_rows<T: Serialize + Sync>(
        &self,
        dataset: &str,
        table: &str,
        rows: &[T],
    ) -> Result<(), Box<dyn Error>> {
        if rows.is_empty() {
            info!("No rows to insert");
            return Ok(());
        }

        let dataset_dir = format!("{}/{}", self.output_dir.trim_end_matches('/'), dataset);
        fs::create_dir_all(&dataset_dir).await?;

        let mut batch = String::new();
        for row in rows {
            batch.push_str(&serde_json::to_string(row)?);
            batch.push('\n');
        }

        let path = format!("{dataset_dir}/{table}.ndjson");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(batch.as_bytes()).await?;

        info!(path = %path, "Appended rows to table file");
        Ok(())
    }
}
