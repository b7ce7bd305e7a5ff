//! Retention-count purge: keep only the newest N snapshot versions.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::maven::{version, ArtifactReference};
use crate::services::purge_executor::{collect_version_artifacts, PurgeExecutor, PurgeReport};
use crate::services::repository_purge::{list_snapshot_versions, RepositoryPurge};

/// Purges the oldest snapshot versions of an artifact beyond the configured
/// retention count. Applies only to snapshot-versioned artifacts; a
/// retention count covering all known versions is a no-op.
pub struct RetentionCountRepositoryPurge {
    executor: Arc<PurgeExecutor>,
    retention_count: u16,
}

impl RetentionCountRepositoryPurge {
    pub fn new(executor: Arc<PurgeExecutor>, retention_count: u16) -> Self {
        Self {
            executor,
            retention_count,
        }
    }
}

#[async_trait]
impl RepositoryPurge for RetentionCountRepositoryPurge {
    async fn process(&self, path: &str) -> Result<PurgeReport> {
        let reference = ArtifactReference::from_path(path)?;
        if !version::is_snapshot(&reference.version) {
            return Ok(PurgeReport::default());
        }

        let versioned = reference.to_versioned();
        let project_path = versioned.project_path();
        let repo_root = self.executor.repository().root.clone();

        let versions = list_snapshot_versions(&repo_root, &project_path).await?;
        if versions.len() <= self.retention_count as usize {
            return Ok(PurgeReport::default());
        }

        let purge_count = versions.len() - self.retention_count as usize;
        let mut report = PurgeReport::default();
        for doomed in &versions[..purge_count] {
            let version_path = format!("{}/{}", project_path, doomed);
            let references = collect_version_artifacts(&repo_root, &version_path).await?;
            if references.is_empty() {
                continue;
            }
            report.merge(self.executor.purge(&references).await?);
        }

        Ok(report)
    }
}
