//! Metadata repository store.
//!
//! A key-value-like store addressed by `(namespace, project, projectVersion,
//! artifactId)` tuples. The file-backed implementation keeps one property
//! file per logical record under the repository's `.archiva/content` tree.

pub mod facet;
pub mod file_store;
pub mod model;
pub mod properties;

use async_trait::async_trait;

use crate::error::Result;
use model::{ArtifactMetadata, ProjectMetadata, ProjectVersionMetadata};

pub use facet::{FacetRegistry, MetadataFacetFactory};
pub use file_store::FileMetadataRepository;

/// Metadata repository contract.
///
/// Updates are buffered; nothing is persisted until [`save`](Self::save).
/// All operations are idempotent upserts or best-effort removals.
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Identifier of the managed repository this store belongs to.
    fn repository_id(&self) -> &str;

    async fn update_namespace(&self, namespace: &str) -> Result<()>;

    async fn update_project(&self, project: &ProjectMetadata) -> Result<()>;

    async fn update_project_version(
        &self,
        namespace: &str,
        project: &str,
        version: &ProjectVersionMetadata,
    ) -> Result<()>;

    async fn update_artifact(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact: &ArtifactMetadata,
    ) -> Result<()>;

    async fn get_namespaces(&self) -> Result<Vec<String>>;

    async fn get_projects(&self, namespace: &str) -> Result<Vec<String>>;

    async fn get_project_versions(&self, namespace: &str, project: &str) -> Result<Vec<String>>;

    async fn get_project_version(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> Result<Option<ProjectVersionMetadata>>;

    async fn get_artifacts(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> Result<Vec<ArtifactMetadata>>;

    /// Strip all record keys for one artifact id from a version bucket.
    async fn remove_artifact(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact_id: &str,
    ) -> Result<()>;

    /// Remove every artifact record carrying the given exact version.
    async fn remove_artifacts_with_version(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact_version: &str,
    ) -> Result<()>;

    /// Remove artifact records whose exact version and maven-artifact facet
    /// (classifier) both match the given record.
    async fn remove_artifact_matching_facets(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact: &ArtifactMetadata,
    ) -> Result<()>;

    /// Remove one project-version record and everything under it.
    async fn remove_project_version(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> Result<()>;

    /// Flush all buffered changes to the backing store.
    async fn save(&self) -> Result<()>;
}
