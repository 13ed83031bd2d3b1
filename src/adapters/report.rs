use crate::domain::model::RunReport;
use crate::domain::ports::ReportSink;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;

/// Writes run reports as pretty JSON under a base directory, one file per
/// execution id.
#[derive(Debug, Clone)]
pub struct LocalReportSink {
    base_path: PathBuf,
}

impl LocalReportSink {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl ReportSink for LocalReportSink {
    async fn write_report(&self, report: &RunReport) -> Result<String> {
        let full_path = self.base_path.join(format!("{}.json", report.execution_id));

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(report)?;
        fs::write(&full_path, data)?;

        Ok(full_path.display().to_string())
    }
}
