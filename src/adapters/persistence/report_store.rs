//! Implements ReportStorePort. One pretty-printed JSON file per run under the
//! reports directory, named after the bot handle and the run's start time.

use crate::domain::{DomainError, Report};
use crate::ports::ReportStorePort;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

pub struct FsReportStore {
    reports_dir: PathBuf,
}

impl FsReportStore {
    pub fn new(reports_dir: impl AsRef<Path>) -> Self {
        Self {
            reports_dir: reports_dir.as_ref().to_path_buf(),
        }
    }

    fn file_name(report: &Report) -> String {
        format!(
            "{}_{}.json",
            report.bot_handle.trim_start_matches('@'),
            report.started_at.format("%Y%m%d_%H%M%S")
        )
    }
}

#[async_trait]
impl ReportStorePort for FsReportStore {
    async fn save(&self, report: &Report) -> Result<PathBuf, DomainError> {
        fs::create_dir_all(&self.reports_dir)
            .await
            .map_err(|e| DomainError::ReportStore(e.to_string()))?;
        let path = self.reports_dir.join(Self::file_name(report));
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| DomainError::ReportStore(e.to_string()))?;
        fs::write(&path, json)
            .await
            .map_err(|e| DomainError::ReportStore(e.to_string()))?;
        info!(path = %path.display(), "report saved");
        Ok(path)
    }
}
