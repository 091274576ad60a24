//! YAML encoding

use super::Report;
use anyhow::{Context, Result};

/// Sequence of mappings, keys in header order
pub fn to_yaml(report: &Report) -> Result<String> {
    let records: Vec<_> = report.records().collect();
    let text = serde_yaml::to_string(&records).context("Failed to encode report as YAML")?;
    Ok(text.trim_end_matches('\n').to_string())
}
