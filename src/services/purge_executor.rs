//! Shared purge execution: physical deletion plus metadata reconciliation.
//!
//! Strategies compute candidate sets; this executor deletes the files,
//! sweeps up support files, and brings the metadata store back in line.
//! Metadata removals are batched per distinct artifact identity and flushed
//! in two phases: once after artifact-level removal, once after now-empty
//! project versions are dropped.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

use crate::config::ManagedRepositoryConfig;
use crate::error::Result;
use crate::maven::{artifact, version, ArtifactReference};
use crate::metadata::model::ArtifactMetadata;
use crate::metadata::MetadataRepository;
use crate::services::audit_log::{self, PurgeAction};
use crate::services::listener::RepositoryListener;

/// Maximum directory depth searched for support files below an artifact's
/// own directory.
const SUPPORT_FILE_MAX_DEPTH: u32 = 3;

/// Outcome of one purge batch: what was removed and what was skipped, with
/// reasons, so schedulers can assert on per-artifact results instead of
/// scraping logs.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PurgeReport {
    pub dry_run: bool,
    /// Repository-relative paths of removed files and directories
    pub removed: Vec<String>,
    pub skipped: Vec<SkippedArtifact>,
}

/// One artifact left untouched, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedArtifact {
    pub path: String,
    pub reason: String,
}

impl PurgeReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.skipped.is_empty()
    }

    pub fn merge(&mut self, other: PurgeReport) {
        self.dry_run |= other.dry_run;
        self.removed.extend(other.removed);
        self.skipped.extend(other.skipped);
    }
}

/// Batch key identifying one distinct artifact identity queued for metadata
/// removal. Equality spans all five fields; the project-version projection
/// drops version and classifier to detect now-empty version buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ArtifactInfo {
    namespace: String,
    name: String,
    project_version: String,
    version: String,
    classifier: Option<String>,
}

impl ArtifactInfo {
    fn from_metadata(record: &ArtifactMetadata) -> Self {
        Self {
            namespace: record.namespace.clone(),
            name: record.project.clone(),
            project_version: record.project_version.clone(),
            version: record.version.clone(),
            classifier: record.classifier().map(str::to_string),
        }
    }

    fn project_version_level(&self) -> (String, String, String) {
        (
            self.namespace.clone(),
            self.name.clone(),
            self.project_version.clone(),
        )
    }
}

/// Executes purge batches for one managed repository.
pub struct PurgeExecutor {
    repo: ManagedRepositoryConfig,
    metadata: Arc<dyn MetadataRepository>,
    listeners: Vec<Arc<dyn RepositoryListener>>,
    dry_run: bool,
}

impl PurgeExecutor {
    pub fn new(
        repo: ManagedRepositoryConfig,
        metadata: Arc<dyn MetadataRepository>,
        listeners: Vec<Arc<dyn RepositoryListener>>,
    ) -> Self {
        Self {
            repo,
            metadata,
            listeners,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn repository(&self) -> &ManagedRepositoryConfig {
        &self.repo
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataRepository> {
        &self.metadata
    }

    /// Purge a set of artifact references from the repository.
    ///
    /// Per-reference failures are recorded in the report and never abort the
    /// batch. An artifact whose physical deletion fails keeps its metadata
    /// record so the store never points at state the filesystem still has.
    pub async fn purge(&self, references: &BTreeSet<ArtifactReference>) -> Result<PurgeReport> {
        let mut report = PurgeReport {
            dry_run: self.dry_run,
            ..Default::default()
        };

        // Metadata lookups memoized per distinct base-version bucket: the
        // same bucket is never queried twice in one purge call.
        let mut bucket_cache: HashMap<(String, String, String), Vec<ArtifactMetadata>> =
            HashMap::new();
        let mut removals: HashMap<ArtifactInfo, ArtifactMetadata> = HashMap::new();

        for reference in references {
            let namespace = reference.group_id.clone();
            let name = reference.artifact_id.clone();
            let base_version = reference.base_version();
            let rel_path = reference.to_path();

            let bucket_key = (namespace.clone(), name.clone(), base_version.clone());
            if !bucket_cache.contains_key(&bucket_key) {
                let records = match self
                    .metadata
                    .get_artifacts(&namespace, &name, &base_version)
                    .await
                {
                    Ok(records) => records,
                    Err(e) => {
                        // File deletion is not gated on metadata availability
                        tracing::error!(path = %rel_path, error = %e,
                            "metadata lookup failed, purging file without metadata reconciliation");
                        Vec::new()
                    }
                };
                bucket_cache.insert(bucket_key.clone(), records);
            }

            if self.dry_run {
                report.removed.push(rel_path);
                continue;
            }

            let file_name = reference.file_name();
            for listener in &self.listeners {
                listener.deleting_artifact(
                    &self.repo.id,
                    &namespace,
                    &name,
                    &reference.version,
                    &file_name,
                );
            }

            let abs_path = self.repo.root.join(&rel_path);
            match fs::remove_file(&abs_path).await {
                Ok(()) => {
                    audit_log::record(&self.repo.id, &rel_path, PurgeAction::PurgedArtifact);
                    report.removed.push(rel_path.clone());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // Already gone; metadata reconciliation still applies
                    tracing::debug!(path = %rel_path, "artifact file already absent");
                }
                Err(e) => {
                    // Leave this artifact's metadata untouched so the store
                    // and the filesystem cannot diverge.
                    tracing::error!(path = %rel_path, error = %e, "failed to delete artifact file");
                    report.skipped.push(SkippedArtifact {
                        path: rel_path,
                        reason: format!("file deletion failed: {e}"),
                    });
                    continue;
                }
            }

            if let Some(parent) = abs_path.parent() {
                self.purge_support_files(parent, &file_name, &mut report)
                    .await;
            }

            // Queue metadata removals for this reference
            let records = bucket_cache.get(&bucket_key).expect("bucket cached above");
            if version::is_snapshot(&reference.version) {
                for record in records {
                    if record.version != reference.version {
                        continue;
                    }
                    match &reference.classifier {
                        Some(classifier) => {
                            if record.classifier() == Some(classifier.as_str()) {
                                removals.insert(ArtifactInfo::from_metadata(record), record.clone());
                            }
                        }
                        None => {
                            removals.insert(ArtifactInfo::from_metadata(record), record.clone());
                        }
                    }
                }
            } else {
                for record in records {
                    if record.version == reference.version {
                        removals.insert(ArtifactInfo::from_metadata(record), record.clone());
                    }
                }
            }
        }

        if self.dry_run {
            return Ok(report);
        }

        // Phase one: batched artifact-level metadata removal
        for (info, record) in &removals {
            let removal = if info.classifier.is_some() {
                self.metadata
                    .remove_artifact_matching_facets(
                        &info.namespace,
                        &info.name,
                        &info.project_version,
                        record,
                    )
                    .await
            } else {
                self.metadata
                    .remove_artifacts_with_version(
                        &info.namespace,
                        &info.name,
                        &info.project_version,
                        &info.version,
                    )
                    .await
            };
            if let Err(e) = removal {
                tracing::error!(
                    namespace = %info.namespace, project = %info.name,
                    version = %info.version, error = %e,
                    "failed to remove artifact metadata"
                );
                report.skipped.push(SkippedArtifact {
                    path: format!(
                        "{}/{}/{}/{}",
                        info.namespace, info.name, info.project_version, info.version
                    ),
                    reason: format!("metadata removal failed: {e}"),
                });
            }
        }
        self.metadata.save().await?;

        // Phase two: drop project-version records emptied by phase one
        let touched: HashSet<(String, String, String)> = removals
            .keys()
            .map(ArtifactInfo::project_version_level)
            .collect();
        for (namespace, name, project_version) in touched {
            let remaining = self
                .metadata
                .get_artifacts(&namespace, &name, &project_version)
                .await?;
            if remaining.is_empty() {
                self.metadata
                    .remove_project_version(&namespace, &name, &project_version)
                    .await?;
                audit_log::record(
                    &self.repo.id,
                    &format!("{}/{}/{}", namespace, name, project_version),
                    PurgeAction::RemovedMetadata,
                );
            }
        }
        self.metadata.save().await?;

        Ok(report)
    }

    /// Delete checksum/signature files sharing the artifact's filename
    /// prefix, searching at most [`SUPPORT_FILE_MAX_DEPTH`] levels down.
    async fn purge_support_files(
        &self,
        dir: &Path,
        artifact_file_name: &str,
        report: &mut PurgeReport,
    ) {
        let prefix = format!("{artifact_file_name}.");
        let mut pending = vec![(dir.to_path_buf(), 1u32)];

        while let Some((current, depth)) = pending.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!(dir = %current.display(), error = %e,
                        "skipping support-file sweep for unreadable directory");
                    continue;
                }
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(error = %e, "support-file sweep read error");
                        break;
                    }
                };
                let file_name = entry.file_name().to_string_lossy().into_owned();
                let path = entry.path();
                let is_dir = entry
                    .file_type()
                    .await
                    .map(|t| t.is_dir())
                    .unwrap_or(false);
                if is_dir {
                    if depth < SUPPORT_FILE_MAX_DEPTH {
                        pending.push((path, depth + 1));
                    }
                    continue;
                }
                if !file_name.starts_with(&prefix) {
                    continue;
                }
                match fs::remove_file(&path).await {
                    Ok(()) => {
                        let rel = self.relative_path(&path);
                        audit_log::record(&self.repo.id, &rel, PurgeAction::PurgedFile);
                        report.removed.push(rel);
                    }
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e,
                            "failed to delete support file");
                    }
                }
            }
        }
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.repo.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Enumerate the artifact references present in one version directory.
///
/// Files that do not map to artifacts under the layout (support files,
/// descriptors, stray content) are skipped with a debug log.
pub async fn collect_version_artifacts(
    repo_root: &Path,
    version_rel_path: &str,
) -> Result<BTreeSet<ArtifactReference>> {
    let dir = repo_root.join(version_rel_path);
    let mut references = BTreeSet::new();

    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(references),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if artifact::is_support_file(&file_name) || artifact::is_metadata_file(&file_name) {
            continue;
        }
        let rel = format!("{}/{}", version_rel_path, file_name);
        match ArtifactReference::from_path(&rel) {
            Ok(reference) => {
                references.insert(reference);
            }
            Err(e) => {
                tracing::debug!(path = %rel, error = %e, "not a purgeable artifact");
            }
        }
    }

    Ok(references)
}
