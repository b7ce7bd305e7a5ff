//! Common test utilities: temp-repository fixtures with deployed artifacts
//! and matching metadata records.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use artifact_sweeper::config::ManagedRepositoryConfig;
use artifact_sweeper::metadata::model::{
    ArtifactMetadata, MetadataFacet, ProjectMetadata, ProjectVersionMetadata, MAVEN_ARTIFACT_FACET,
};
use artifact_sweeper::metadata::{FacetRegistry, FileMetadataRepository, MetadataRepository};

/// A temp managed repository with its metadata store.
pub struct TestRepo {
    pub dir: TempDir,
    pub config: ManagedRepositoryConfig,
    pub store: Arc<FileMetadataRepository>,
}

impl TestRepo {
    pub fn root(&self) -> &Path {
        self.config.root.as_path()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.config.root.join(rel).exists()
    }
}

pub fn test_repo(id: &str) -> TestRepo {
    let dir = TempDir::new().expect("failed to create temp repository");
    let config = ManagedRepositoryConfig::new(id, dir.path());
    let store = Arc::new(FileMetadataRepository::new(
        id,
        dir.path(),
        Arc::new(FacetRegistry::new()),
    ));
    TestRepo { dir, config, store }
}

/// Write one artifact file plus `.sha1`/`.md5` support files and record it
/// in the metadata store (flushed immediately).
pub async fn deploy(
    repo: &TestRepo,
    group: &str,
    artifact: &str,
    dir_version: &str,
    file_version: &str,
    classifier: Option<&str>,
    extension: &str,
) -> String {
    let file_name = match classifier {
        Some(c) => format!("{artifact}-{file_version}-{c}.{extension}"),
        None => format!("{artifact}-{file_version}.{extension}"),
    };
    let rel = format!(
        "{}/{}/{}/{}",
        group.replace('.', "/"),
        artifact,
        dir_version,
        file_name
    );

    let abs = repo.config.root.join(&rel);
    std::fs::create_dir_all(abs.parent().unwrap()).unwrap();
    std::fs::write(&abs, b"artifact-bytes").unwrap();
    std::fs::write(format!("{}.sha1", abs.display()), b"da39a3ee").unwrap();
    std::fs::write(format!("{}.md5", abs.display()), b"d41d8cd9").unwrap();

    record_metadata(
        repo,
        group,
        artifact,
        dir_version,
        file_version,
        classifier,
        extension,
        &file_name,
    )
    .await;

    rel
}

/// Record an artifact in the metadata store without touching the filesystem.
pub async fn record_metadata(
    repo: &TestRepo,
    group: &str,
    artifact: &str,
    dir_version: &str,
    file_version: &str,
    classifier: Option<&str>,
    extension: &str,
    file_name: &str,
) {
    repo.store
        .update_project(&ProjectMetadata {
            namespace: group.to_string(),
            id: artifact.to_string(),
        })
        .await
        .unwrap();
    repo.store
        .update_project_version(
            group,
            artifact,
            &ProjectVersionMetadata {
                id: dir_version.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut facet = MetadataFacet::new(MAVEN_ARTIFACT_FACET).with_property("type", extension);
    if let Some(c) = classifier {
        facet = facet.with_property("classifier", c);
    }
    let mut facets = std::collections::BTreeMap::new();
    facets.insert(MAVEN_ARTIFACT_FACET.to_string(), facet);

    repo.store
        .update_artifact(
            group,
            artifact,
            dir_version,
            &ArtifactMetadata {
                repository_id: repo.config.id.clone(),
                namespace: group.to_string(),
                project: artifact.to_string(),
                project_version: dir_version.to_string(),
                version: file_version.to_string(),
                id: file_name.to_string(),
                when_gathered: Utc::now(),
                size: 14,
                md5: Some("d41d8cd9".to_string()),
                sha1: Some("da39a3ee".to_string()),
                facets,
            },
        )
        .await
        .unwrap();
    repo.store.save().await.unwrap();
}
