//! Monitoring data export.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lookout_types::{Alert, Component, Metric};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::EngineResult;
use crate::status::{MonitoringStats, SystemStatus};

/// Serializable snapshot of the engine's observable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringExport {
    pub exported_at: DateTime<Utc>,
    pub status: SystemStatus,
    pub stats: MonitoringStats,
    pub components: Vec<Component>,

    /// The metrics window at export time, oldest first.
    pub metrics: Vec<Metric>,

    pub active_alerts: Vec<Alert>,

    /// Every persisted alert record, oldest first.
    #[serde(default)]
    pub alert_history: Vec<Alert>,
}

/// Destination for exports.
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn write(&self, export: &MonitoringExport) -> EngineResult<()>;
}

/// Writes an export as pretty-printed JSON to a file, replacing it.
#[derive(Debug, Clone)]
pub struct FileExportSink {
    path: PathBuf,
}

impl FileExportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl ExportSink for FileExportSink {
    async fn write(&self, export: &MonitoringExport) -> EngineResult<()> {
        let body = serde_json::to_vec_pretty(export)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&self.path).await?;
        file.write_all(&body).await?;
        file.flush().await?;
        Ok(())
    }
}
