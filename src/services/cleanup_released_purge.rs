//! Cleanup-released-snapshots purge: drop snapshots superseded by a release.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

use crate::config::ManagedRepositoryConfig;
use crate::error::Result;
use crate::maven::{metadata_xml, version, ArtifactReference};
use crate::services::audit_log::{self, PurgeAction};
use crate::services::purge_executor::{PurgeExecutor, PurgeReport, SkippedArtifact};
use crate::services::repository_purge::{list_versions, RepositoryPurge};

/// Removes a snapshot's entire version directory once a released version of
/// the same artifact, equal or newer than the snapshot's base, exists in any
/// release-enabled managed repository. The project-version metadata record
/// goes with it, and `maven-metadata.xml` descriptors are regenerated
/// best-effort for what remains.
pub struct CleanupReleasedSnapshotsRepositoryPurge {
    executor: Arc<PurgeExecutor>,
    release_repos: Vec<ManagedRepositoryConfig>,
}

impl CleanupReleasedSnapshotsRepositoryPurge {
    pub fn new(
        executor: Arc<PurgeExecutor>,
        release_repos: Vec<ManagedRepositoryConfig>,
    ) -> Self {
        Self {
            executor,
            release_repos,
        }
    }

    /// Whether any release repository holds a non-snapshot version of the
    /// artifact that is version-equal-or-newer than `base_release`.
    async fn released_version_exists(
        &self,
        project_path: &str,
        base_release: &str,
    ) -> Result<bool> {
        let own_repo = self.executor.repository().clone();
        let own = std::iter::once(&own_repo);
        for repo in own.chain(self.release_repos.iter()) {
            if !repo.releases {
                continue;
            }
            let versions = list_versions(&repo.root, project_path).await?;
            for candidate in versions {
                if version::is_snapshot(&candidate) {
                    continue;
                }
                if version::compare_versions(&candidate, base_release) != Ordering::Less {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Regenerate `maven-metadata.xml` for the artifact directory and each
    /// remaining snapshot version directory. Failures here only mean there
    /// is no snapshot version left to reference, so they are logged and
    /// swallowed.
    async fn regenerate_metadata(
        &self,
        repo_root: &Path,
        project_path: &str,
        group_id: &str,
        artifact_id: &str,
    ) {
        let versions = match list_versions(repo_root, project_path).await {
            Ok(versions) => versions,
            Err(e) => {
                tracing::debug!(path = %project_path, error = %e,
                    "skipping metadata regeneration");
                return;
            }
        };

        let project_xml = metadata_xml::project_metadata_xml(group_id, artifact_id, &versions);
        let project_metadata_path = repo_root.join(project_path).join("maven-metadata.xml");
        if let Err(e) = fs::write(&project_metadata_path, project_xml).await {
            tracing::debug!(path = %project_metadata_path.display(), error = %e,
                "failed to regenerate project metadata");
        }

        for v in versions.iter().filter(|v| version::is_snapshot(v)) {
            let xml = metadata_xml::snapshot_metadata_xml(group_id, artifact_id, v, None);
            let path = repo_root
                .join(project_path)
                .join(v)
                .join("maven-metadata.xml");
            if let Err(e) = fs::write(&path, xml).await {
                tracing::debug!(path = %path.display(), error = %e,
                    "failed to regenerate version metadata");
            }
        }
    }
}

#[async_trait]
impl RepositoryPurge for CleanupReleasedSnapshotsRepositoryPurge {
    async fn process(&self, path: &str) -> Result<PurgeReport> {
        let reference = ArtifactReference::from_path(path)?;
        if !version::is_snapshot(&reference.version) {
            return Ok(PurgeReport::default());
        }

        let versioned = reference.to_versioned();
        let project_path = versioned.project_path();
        let base_version = reference.base_version();
        let base_release = version::release_version(&reference.version);

        if !self
            .released_version_exists(&project_path, &base_release)
            .await?
        {
            return Ok(PurgeReport::default());
        }

        let repo = self.executor.repository().clone();
        let version_rel_path = versioned.to_path();
        let version_dir = repo.root.join(&version_rel_path);

        let mut report = PurgeReport {
            dry_run: self.executor.dry_run(),
            ..Default::default()
        };

        if self.executor.dry_run() {
            report.removed.push(version_rel_path);
            return Ok(report);
        }

        match fs::remove_dir_all(&version_dir).await {
            Ok(()) => {
                audit_log::record(&repo.id, &version_rel_path, PurgeAction::PurgedDirectory);
                report.removed.push(version_rel_path.clone());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(report);
            }
            Err(e) => {
                tracing::error!(path = %version_rel_path, error = %e,
                    "failed to delete snapshot version directory");
                report.skipped.push(SkippedArtifact {
                    path: version_rel_path,
                    reason: format!("directory deletion failed: {e}"),
                });
                return Ok(report);
            }
        }

        let metadata = self.executor.metadata();
        metadata
            .remove_project_version(&reference.group_id, &reference.artifact_id, &base_version)
            .await?;
        metadata.save().await?;
        audit_log::record(
            &repo.id,
            &format!(
                "{}/{}/{}",
                reference.group_id, reference.artifact_id, base_version
            ),
            PurgeAction::RemovedMetadata,
        );

        self.regenerate_metadata(
            &repo.root,
            &project_path,
            &reference.group_id,
            &reference.artifact_id,
        )
        .await;

        Ok(report)
    }
}
