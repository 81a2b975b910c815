//! Persisted run report.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::types::RunReport;

/// Write `report` as pretty-printed JSON with a trailing newline, creating
/// parent directories as needed.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut payload = serde_json::to_string_pretty(report).context("serialize run report")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
