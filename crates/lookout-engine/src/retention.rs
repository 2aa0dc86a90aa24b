//! Age-based removal of persisted artifacts.

use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;

use tracing::{debug, warn};

/// Remove regular files in `dir` whose modification time is before `cutoff`.
///
/// Subdirectories are left alone. A missing directory removes nothing. Files
/// that vanish or cannot be removed mid-sweep are logged and skipped.
pub async fn prune_directory(dir: &Path, cutoff: SystemTime) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => continue,
        };

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(_) => continue,
        };

        if modified >= cutoff {
            continue;
        }

        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed expired artifact");
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove expired artifact"),
        }
    }

    Ok(removed)
}
