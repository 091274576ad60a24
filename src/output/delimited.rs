//! CSV encoding

use super::Report;
use anyhow::{Context, Result, anyhow};
use csv::{Terminator, WriterBuilder};

/// Header line followed by one line per row; cells holding commas or quotes are quoted
pub fn to_csv(report: &Report) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(report.headers())
        .context("Failed to write CSV header")?;

    for row in report.rows() {
        writer
            .write_record(row.iter().map(|cell| cell.to_string()))
            .context("Failed to write CSV row")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV output: {}", e.error()))?;
    let text = String::from_utf8(bytes).context("CSV output is not valid UTF-8")?;

    Ok(text.trim_end_matches('\n').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn test_plain_rows() {
        let mut report = Report::new("role,node,ram_gb,cpu");
        report.push_row(row!["Worker", "w1", "31Gi", 8i64]).unwrap();
        report.push_row(row!["Somma Worker", "", "31Gi", 8i64]).unwrap();

        assert_eq!(
            to_csv(&report).unwrap(),
            "role,node,ram_gb,cpu\nWorker,w1,31Gi,8\nSomma Worker,,31Gi,8"
        );
    }

    #[test]
    fn test_quoting() {
        let mut report = Report::new("pvc,access_modes");
        report
            .push_row(row!["data", "ReadWriteOnce,ReadOnlyMany"])
            .unwrap();
        report.push_row(row!["say \"hi\"", "x"]).unwrap();

        let out = to_csv(&report).unwrap();
        assert!(out.contains("data,\"ReadWriteOnce,ReadOnlyMany\""));
        assert!(out.contains("\"say \"\"hi\"\"\",x"));
    }

    #[test]
    fn test_header_only() {
        let report = Report::new("a,b");
        assert_eq!(to_csv(&report).unwrap(), "a,b");
    }
}
