use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::report::ReportRow;

/// Paths written for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrittenReports {
    pub opportunities: Option<PathBuf>,
    pub temporal: Option<PathBuf>,
}

fn write_rows(path: &Path, rows: &[ReportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// `opportunities_{run_id}.csv` with one row per ranked keyword and, when
/// there are windowed rows, `temporal_{run_id}.csv` with keyword × period.
/// Nothing is written for an empty run.
pub fn write_reports(
    dir: impl AsRef<Path>,
    run_id: &str,
    overall: &[ReportRow],
    temporal: &[ReportRow],
) -> Result<WrittenReports> {
    let mut written = WrittenReports::default();
    if overall.is_empty() {
        return Ok(written);
    }
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let path = dir.join(format!("opportunities_{run_id}.csv"));
    write_rows(&path, overall)?;
    info!(path = %path.display(), rows = overall.len(), "wrote opportunity report");
    written.opportunities = Some(path);

    if temporal.iter().any(|r| r.period != "overall") {
        let path = dir.join(format!("temporal_{run_id}.csv"));
        write_rows(&path, temporal)?;
        info!(path = %path.display(), rows = temporal.len(), "wrote temporal report");
        written.temporal = Some(path);
    }
    Ok(written)
}
