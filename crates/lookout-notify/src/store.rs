//! Durable alert records.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use lookout_types::Alert;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::Result;

/// Bytes kept verbatim in record file names. `%` is always escaped, so
/// distinct ids never share a file.
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// One JSON file per alert (`alert-<id>.json`) under a directory.
///
/// Files are created exclusively, so an alert is recorded exactly once no
/// matter how often it is persisted.
#[derive(Debug, Clone)]
pub struct AlertStore {
    dir: PathBuf,
}

impl AlertStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File an alert is recorded in. Distinct ids map to distinct files.
    pub fn path_for(&self, alert_id: &str) -> PathBuf {
        self.dir
            .join(format!("alert-{}.json", utf8_percent_encode(alert_id, FILE_NAME_SET)))
    }

    /// Record an alert. Returns `false` when it was already recorded.
    pub async fn persist(&self, alert: &Alert) -> Result<bool> {
        let body = serde_json::to_vec_pretty(alert)?;
        let path = self.path_for(&alert.id);

        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(alert_id = %alert.id, "Alert already persisted");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(&body).await?;
        file.flush().await?;
        Ok(true)
    }

    /// Every recorded alert, oldest first. Unreadable files are skipped.
    pub async fn load_all(&self) -> Result<Vec<Alert>> {
        let mut alerts = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(alerts),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with("alert-") && name.ends_with(".json")) {
                continue;
            }

            let content = tokio::fs::read(entry.path()).await?;
            match serde_json::from_slice::<Alert>(&content) {
                Ok(alert) => alerts.push(alert),
                Err(e) => debug!(file = %name, error = %e, "Skipping unreadable alert record"),
            }
        }

        alerts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use lookout_types::Severity;

    #[tokio::test]
    async fn test_persist_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = AlertStore::new(dir.path().join("alerts"));
        let alert = Alert::new("high-error-rate", "High Error Rate", Severity::Warning, Utc::now());

        assert!(store.persist(&alert).await.unwrap());
        assert!(!store.persist(&alert).await.unwrap());

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded, vec![alert]);
    }

    #[tokio::test]
    async fn test_load_all_ordered_and_tolerant() {
        let dir = tempfile::tempdir().unwrap();
        let store = AlertStore::new(dir.path());
        let now = Utc::now();

        let later = Alert::new("b", "B", Severity::Info, now);
        let earlier = Alert::new("a", "A", Severity::Info, now - Duration::minutes(5));
        store.persist(&later).await.unwrap();
        store.persist(&earlier).await.unwrap();
        std::fs::write(dir.path().join("alert-garbage.json"), b"not json").unwrap();
        std::fs::write(dir.path().join("alerts-2024-01-01.log"), b"{}").unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded, vec![earlier, later]);
    }

    #[tokio::test]
    async fn test_missing_directory_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AlertStore::new(dir.path().join("nothing-here"));
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_path_is_escaped() {
        let store = AlertStore::new("/data/alerts");
        assert_eq!(
            store.path_for("../etc/passwd-1"),
            PathBuf::from("/data/alerts/alert-..%2Fetc%2Fpasswd-1.json")
        );
    }

    #[test]
    fn test_lookalike_ids_get_distinct_files() {
        let store = AlertStore::new("/data/alerts");
        let ids = ["db/ping-1", "db_ping-1", "db%2Fping-1"];
        let paths: std::collections::HashSet<_> = ids.iter().map(|id| store.path_for(id)).collect();
        assert_eq!(paths.len(), ids.len());
    }
}
