//! Filesystem write/read round-trip probe.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use lookout_types::HealthResult;
use tracing::debug;

use super::HealthProbe;

const PROBE_FILE: &str = ".lookout-probe";

/// Writes a marker file under `dir`, reads it back and removes it.
#[derive(Debug, Clone)]
pub struct FilesystemProbe {
    dir: PathBuf,
}

impl FilesystemProbe {
    /// Probe the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory being probed.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait]
impl HealthProbe for FilesystemProbe {
    async fn check(&self) -> Result<HealthResult, String> {
        let path = self.dir.join(PROBE_FILE);
        let payload = Utc::now().to_rfc3339();

        debug!(path = %path.display(), "Running filesystem probe");

        if let Err(e) = tokio::fs::write(&path, payload.as_bytes()).await {
            return Ok(HealthResult::unhealthy(format!("write failed: {}", e))
                .with_detail("path", path.display().to_string()));
        }

        let read_back = tokio::fs::read_to_string(&path).await;
        let _ = tokio::fs::remove_file(&path).await;

        match read_back {
            Ok(content) if content == payload => Ok(HealthResult::healthy()
                .with_detail("path", self.dir.display().to_string())),
            Ok(_) => Ok(HealthResult::unhealthy("read back content did not match")
                .with_detail("path", path.display().to_string())),
            Err(e) => Ok(HealthResult::unhealthy(format!("read failed: {}", e))
                .with_detail("path", path.display().to_string())),
        }
    }

    fn description(&self) -> &str {
        "filesystem round-trip"
    }
}
