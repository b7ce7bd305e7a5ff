//! Days-old purge: age-based snapshot purge with a retention-count floor.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

use crate::error::Result;
use crate::maven::{artifact, version, ArtifactReference};
use crate::services::purge_executor::{collect_version_artifacts, PurgeExecutor, PurgeReport};
use crate::services::repository_purge::{list_snapshot_versions, RepositoryPurge};

/// Purges snapshot versions older than a cutoff, but never inside the
/// most-recent-N retention window.
///
/// A version's effective timestamp is the embedded `yyyyMMdd.HHmmss`
/// deployment stamp for unique snapshots, or the newest file mtime in the
/// version directory for generic ones. A version whose timestamp cannot be
/// determined is skipped rather than mis-purged.
pub struct DaysOldRepositoryPurge {
    executor: Arc<PurgeExecutor>,
    days_older: i64,
    retention_count: u16,
}

impl DaysOldRepositoryPurge {
    pub fn new(executor: Arc<PurgeExecutor>, days_older: i64, retention_count: u16) -> Self {
        Self {
            executor,
            days_older,
            retention_count,
        }
    }

    /// Effective timestamp of a version directory, or `None` when unknown.
    async fn version_timestamp(
        &self,
        repo_root: &Path,
        version_path: &str,
        version_name: &str,
    ) -> Option<DateTime<Utc>> {
        if version::is_unique_snapshot(version_name) {
            return version::unique_snapshot_timestamp(version_name).map(|naive| naive.and_utc());
        }

        // Generic snapshot: newest file mtime in the version directory. A
        // unique snapshot lives in its base -SNAPSHOT directory, so prefer
        // the newest embedded timestamp among its files when present.
        let dir = repo_root.join(version_path);
        let mut newest: Option<DateTime<Utc>> = None;
        let mut entries = fs::read_dir(&dir).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            // Checksums and descriptors accompany an artifact; only the
            // artifact files themselves date the version.
            if artifact::is_support_file(&file_name) || artifact::is_metadata_file(&file_name) {
                continue;
            }
            let rel = format!("{}/{}", version_path, file_name);
            let file_time = match ArtifactReference::from_path(&rel) {
                Ok(reference) if version::is_unique_snapshot(&reference.version) => {
                    version::unique_snapshot_timestamp(&reference.version)
                        .map(|naive| naive.and_utc())
                }
                _ => entry
                    .metadata()
                    .await
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from),
            };
            if let Some(ts) = file_time {
                newest = Some(newest.map_or(ts, |n| n.max(ts)));
            }
        }
        newest
    }
}

#[async_trait]
impl RepositoryPurge for DaysOldRepositoryPurge {
    async fn process(&self, path: &str) -> Result<PurgeReport> {
        let reference = ArtifactReference::from_path(path)?;
        if !version::is_snapshot(&reference.version) {
            return Ok(PurgeReport::default());
        }

        let versioned = reference.to_versioned();
        let project_path = versioned.project_path();
        let repo_root = self.executor.repository().root.clone();

        let versions = list_snapshot_versions(&repo_root, &project_path).await?;
        let eligible = versions.len().saturating_sub(self.retention_count as usize);
        if eligible == 0 {
            return Ok(PurgeReport::default());
        }

        let cutoff = Utc::now() - Duration::days(self.days_older);
        let mut report = PurgeReport::default();

        for candidate in &versions[..eligible] {
            let version_path = format!("{}/{}", project_path, candidate);
            let timestamp = match self
                .version_timestamp(&repo_root, &version_path, candidate)
                .await
            {
                Some(ts) => ts,
                None => {
                    tracing::debug!(version = %candidate,
                        "skipping version with unknown timestamp");
                    continue;
                }
            };
            if timestamp >= cutoff {
                continue;
            }

            let references = collect_version_artifacts(&repo_root, &version_path).await?;
            if references.is_empty() {
                continue;
            }
            report.merge(self.executor.purge(&references).await?);
        }

        Ok(report)
    }
}
