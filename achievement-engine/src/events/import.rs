//! Directory import
//!
//! Feeds a directory of archived webhook bodies (`*.json`, one body per file)
//! through the ingest worker, oldest modification time first (file name breaks
//! ties). A file's modification time stands in for the time the webhook was
//! received.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;

use crate::core::{CoreError, CoreResult, IngestHandle};

/// Summary of a directory import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub files: usize,
    pub accepted: usize,
    pub duplicates: usize,
    /// Files that are not valid JSON, lack `object_kind`, or were refused
    pub rejected: usize,
    pub unlocked: usize,
}

/// Import every `*.json` file of `dir`
///
/// Storage failures abort the import; everything committed so far stays.
pub async fn import_directory(handle: &IngestHandle, dir: &Path) -> CoreResult<ImportReport> {
    let files = list_json_files(dir).await?;
    let mut report = ImportReport {
        files: files.len(),
        ..Default::default()
    };
    tracing::info!(dir = %dir.display(), files = files.len(), "Importing webhook archive");

    for (received_at, path) in files {
        let bytes = tokio::fs::read(&path).await?;
        let body: Value = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Not a JSON file, skipped");
                report.rejected += 1;
                continue;
            }
        };
        let Some(kind) = body.get("object_kind").and_then(Value::as_str).map(str::to_string)
        else {
            tracing::warn!(file = %path.display(), "No object_kind, skipped");
            report.rejected += 1;
            continue;
        };

        match handle.ingest(kind, body, received_at).await {
            Ok(outcome) if outcome.accepted => {
                report.accepted += 1;
                report.unlocked += outcome.unlocks.len();
            }
            Ok(_) => report.duplicates += 1,
            Err(e @ (CoreError::MalformedEvent(_) | CoreError::UnknownEventKind(_))) => {
                tracing::warn!(file = %path.display(), error = %e, "Event refused");
                report.rejected += 1;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        accepted = report.accepted,
        duplicates = report.duplicates,
        rejected = report.rejected,
        unlocked = report.unlocked,
        "Import complete"
    );
    Ok(report)
}

/// `*.json` files with their modification time, in ingest order
async fn list_json_files(dir: &Path) -> CoreResult<Vec<(Option<i64>, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file() {
            let modified = modified_millis(&entry).await;
            files.push((modified, path));
        }
    }
    files.sort();
    Ok(files)
}

async fn modified_millis(entry: &tokio::fs::DirEntry) -> Option<i64> {
    let modified = entry.metadata().await.ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(since_epoch.as_millis()).ok()
}
