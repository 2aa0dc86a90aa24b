use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use lookout_types::Alert;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::{NotificationChannel, FILE};
use crate::error::Result;

/// Appends alerts as JSON lines to one log file per day
/// (`alerts-YYYY-MM-DD.log`, keyed on the alert's timestamp).
#[derive(Debug, Clone)]
pub struct FileChannel {
    dir: PathBuf,
}

impl FileChannel {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log file for a given day.
    pub fn log_path(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("alerts-{}.log", day.format("%Y-%m-%d")))
    }
}

#[async_trait]
impl NotificationChannel for FileChannel {
    fn name(&self) -> &str {
        FILE
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let mut line = serde_json::to_vec(alert)?;
        line.push(b'\n');

        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(alert.timestamp.date_naive()))
            .await?;

        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
