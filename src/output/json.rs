//! JSON encoding

use super::Report;
use anyhow::{Context, Result};

/// Pretty-printed array of objects, keys in header order
pub fn to_json(report: &Report) -> Result<String> {
    let records: Vec<_> = report.records().collect();
    serde_json::to_string_pretty(&records).context("Failed to encode report as JSON")
}
