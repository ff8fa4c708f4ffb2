use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;

/// Delete regular files in `dir` whose last modification is at least `max_age` ago.
///
/// Temporary images are normally removed right after upload; this only catches
/// files orphaned by a crash or a kill mid-upload.
pub async fn remove_stale_files(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), "Stopped reading cache directory: {}", e);
                break;
            }
        };

        // One bad entry must not end the sweep for the rest.
        match remove_if_stale(&entry.path(), now, max_age).await {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => tracing::warn!(path = %entry.path().display(), "Failed to sweep file: {}", e),
        }
    }

    Ok(removed)
}

/// Returns whether the file was removed. A file that vanished in the meantime
/// (the relay cleans up its own temp files) counts as nothing to do.
async fn remove_if_stale(path: &Path, now: SystemTime, max_age: Duration) -> std::io::Result<bool> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if !metadata.is_file() {
        return Ok(false);
    }

    let age = metadata
        .modified()
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .unwrap_or_default();
    if age < max_age {
        return Ok(false);
    }

    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Sweep `dir` every `interval` for the lifetime of the process.
pub fn spawn_cache_janitor(dir: PathBuf, interval: Duration, max_age: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            match remove_stale_files(&dir, max_age).await {
                Ok(0) => tracing::debug!("Cache sweep found nothing to remove"),
                Ok(n) => tracing::info!("Periodic cache cleanup removed {} old file(s)", n),
                Err(e) => tracing::error!("Error during periodic cache cleanup: {}", e),
            }
        }
    })
}
