//! Scan consumer: the entry point an external scheduler drives.
//!
//! `begin_scan` / `process_file` / `complete_scan` mirror the repository
//! scanning contract; `scan_repository` walks the tree itself for callers
//! without their own scheduler, such as the CLI. Per-file failures are
//! counted and logged, never aborting the scan.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::fs;

use crate::config::ManagedRepositoryConfig;
use crate::error::{Result, SweeperError};
use crate::maven::artifact;
use crate::metadata::MetadataRepository;
use crate::services::cleanup_released_purge::CleanupReleasedSnapshotsRepositoryPurge;
use crate::services::days_old_purge::DaysOldRepositoryPurge;
use crate::services::listener::RepositoryListener;
use crate::services::purge_executor::{PurgeExecutor, SkippedArtifact};
use crate::services::repository_purge::RepositoryPurge;
use crate::services::retention_count_purge::RetentionCountRepositoryPurge;

/// Summary of one repository scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub repository_id: String,
    pub started: DateTime<Utc>,
    pub completed: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub files_processed: u64,
    pub errors: u64,
    pub removed: Vec<String>,
    pub skipped: Vec<SkippedArtifact>,
}

/// Drives the configured purge strategies over one managed repository.
pub struct RepositoryPurgeConsumer {
    repo: ManagedRepositoryConfig,
    purge: Arc<dyn RepositoryPurge>,
    cleanup: Option<Arc<dyn RepositoryPurge>>,
    current: Option<ScanReport>,
}

impl RepositoryPurgeConsumer {
    /// Build a consumer for a repository, selecting strategies from its
    /// cleanup configuration: a positive `days_older` selects the days-old
    /// policy, otherwise retention-count; `delete_released_snapshots`
    /// additionally runs the released-snapshot cleanup first.
    pub fn new(
        repo: ManagedRepositoryConfig,
        metadata: Arc<dyn MetadataRepository>,
        release_repos: Vec<ManagedRepositoryConfig>,
        listeners: Vec<Arc<dyn RepositoryListener>>,
        dry_run: bool,
    ) -> Self {
        let executor = Arc::new(
            PurgeExecutor::new(repo.clone(), metadata, listeners).with_dry_run(dry_run),
        );

        let purge: Arc<dyn RepositoryPurge> = if repo.days_older > 0 {
            Arc::new(DaysOldRepositoryPurge::new(
                executor.clone(),
                repo.days_older,
                repo.retention_count,
            ))
        } else {
            Arc::new(RetentionCountRepositoryPurge::new(
                executor.clone(),
                repo.retention_count,
            ))
        };

        let cleanup: Option<Arc<dyn RepositoryPurge>> = repo
            .delete_released_snapshots
            .then(|| {
                Arc::new(CleanupReleasedSnapshotsRepositoryPurge::new(
                    executor.clone(),
                    release_repos,
                )) as Arc<dyn RepositoryPurge>
            });

        Self {
            repo,
            purge,
            cleanup,
            current: None,
        }
    }

    /// Start a scan of the repository.
    pub fn begin_scan(&mut self, when: DateTime<Utc>) -> Result<()> {
        if self.current.is_some() {
            return Err(SweeperError::Internal(
                "scan already in progress".to_string(),
            ));
        }
        tracing::info!(repository = %self.repo.id, "beginning purge scan");
        self.current = Some(ScanReport {
            repository_id: self.repo.id.clone(),
            started: when,
            completed: None,
            dry_run: false,
            files_processed: 0,
            errors: 0,
            removed: Vec::new(),
            skipped: Vec::new(),
        });
        Ok(())
    }

    /// Process one repository-relative file path.
    ///
    /// Layout mismatches mean "not applicable", not errors; strategy
    /// failures are counted and the scan continues.
    pub async fn process_file(&mut self, path: &str) -> Result<()> {
        if self.current.is_none() {
            return Err(SweeperError::Internal(
                "process_file called outside a scan".to_string(),
            ));
        }

        let mut strategies: Vec<Arc<dyn RepositoryPurge>> = Vec::new();
        if let Some(cleanup) = &self.cleanup {
            strategies.push(cleanup.clone());
        }
        strategies.push(self.purge.clone());

        for strategy in strategies {
            let report = self.current.as_mut().expect("scan in progress");
            match strategy.process(path).await {
                Ok(outcome) => {
                    report.dry_run |= outcome.dry_run;
                    report.removed.extend(outcome.removed);
                    report.skipped.extend(outcome.skipped);
                }
                Err(SweeperError::Layout(reason)) => {
                    tracing::debug!(path, reason, "file not applicable for purge");
                }
                Err(e) => {
                    tracing::error!(path, error = %e, "purge strategy failed for file");
                    report.errors += 1;
                }
            }
        }

        self.current.as_mut().expect("scan in progress").files_processed += 1;
        Ok(())
    }

    /// Finish the scan and return its summary.
    pub fn complete_scan(&mut self) -> Result<ScanReport> {
        let mut report = self
            .current
            .take()
            .ok_or_else(|| SweeperError::Internal("no scan in progress".to_string()))?;
        report.completed = Some(Utc::now());
        tracing::info!(
            repository = %report.repository_id,
            files = report.files_processed,
            removed = report.removed.len(),
            skipped = report.skipped.len(),
            errors = report.errors,
            "purge scan complete"
        );
        Ok(report)
    }

    /// Walk the repository tree and process every artifact file, standing in
    /// for an external scheduler.
    pub async fn scan_repository(&mut self, when: DateTime<Utc>) -> Result<ScanReport> {
        self.begin_scan(when)?;

        let root = self.repo.root.clone();
        let mut paths = Vec::new();
        let mut pending = VecDeque::from([root.clone()]);
        while let Some(dir) = pending.pop_front() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    // The metadata store and other dot-directories are not content
                    if !name.starts_with('.') {
                        pending.push_back(path);
                    }
                    continue;
                }
                if artifact::is_support_file(&name) || artifact::is_metadata_file(&name) {
                    continue;
                }
                if let Ok(rel) = path.strip_prefix(&root) {
                    paths.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        paths.sort();

        for path in paths {
            self.process_file(&path).await?;
        }

        self.complete_scan()
    }
}
