//! Purge strategy contract and shared version enumeration.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

use crate::error::Result;
use crate::maven::version;
use crate::services::purge_executor::PurgeReport;

/// A retention policy deciding which versions of a snapshot artifact are
/// eligible for deletion.
///
/// `process` takes one artifact's repository-relative path. Unrecoverable
/// conditions (a path that does not map to an artifact under the layout)
/// return an error that aborts only this file's processing; recoverable ones
/// are logged and reflected in the report.
#[async_trait]
pub trait RepositoryPurge: Send + Sync {
    async fn process(&self, path: &str) -> Result<PurgeReport>;
}

/// List the snapshot version directories under an artifact directory,
/// sorted ascending by the version comparator. The sort is stable, so
/// directory enumeration order breaks ties.
pub(crate) async fn list_snapshot_versions(
    repo_root: &Path,
    project_rel_path: &str,
) -> Result<Vec<String>> {
    let mut versions = list_versions(repo_root, project_rel_path).await?;
    versions.retain(|v| version::is_snapshot(v));
    Ok(versions)
}

/// List all version directories under an artifact directory, sorted
/// ascending by the version comparator.
pub(crate) async fn list_versions(
    repo_root: &Path,
    project_rel_path: &str,
) -> Result<Vec<String>> {
    let dir = repo_root.join(project_rel_path);
    let mut versions = Vec::new();

    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(versions),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            versions.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    versions.sort_by(|a, b| version::compare_versions(a, b));
    Ok(versions)
}
