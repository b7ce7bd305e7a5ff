//! Metadata record model.
//!
//! One `ArtifactMetadata` record exists per physical artifact file known to
//! the store; `ProjectVersionMetadata` aggregates everything shared by one
//! `{namespace, project, version}`. Facets are an open extension map keyed
//! by facet id.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Default facet carrying Maven classifier/type information.
pub const MAVEN_ARTIFACT_FACET: &str = "maven-artifact";

/// A pluggable, named property bag attached to metadata records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataFacet {
    pub facet_id: String,
    pub properties: BTreeMap<String, String>,
}

impl MetadataFacet {
    pub fn new(facet_id: impl Into<String>) -> Self {
        Self {
            facet_id: facet_id.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// One record per physical artifact known to the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMetadata {
    pub repository_id: String,
    pub namespace: String,
    pub project: String,
    /// Base version bucket this artifact lives under
    pub project_version: String,
    /// Exact version of the file, timestamped for unique snapshots
    pub version: String,
    /// Artifact id within its version bucket, conventionally the filename
    pub id: String,
    pub when_gathered: DateTime<Utc>,
    pub size: u64,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub facets: BTreeMap<String, MetadataFacet>,
}

impl ArtifactMetadata {
    /// Classifier recorded in the maven-artifact facet, if any.
    pub fn classifier(&self) -> Option<&str> {
        self.facets
            .get(MAVEN_ARTIFACT_FACET)
            .and_then(|f| f.properties.get("classifier"))
            .map(String::as_str)
    }
}

/// Project-level metadata (one per `{namespace, project}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectMetadata {
    pub namespace: String,
    pub id: String,
}

/// Aggregate metadata for one `{namespace, project, version}`.
///
/// Exists only while at least one artifact exists under it; the purge
/// executor removes it after the last artifact is gone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectVersionMetadata {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub scm: Option<Scm>,
    pub ci: Option<CiManagement>,
    pub issue_management: Option<IssueManagement>,
    pub licenses: Vec<License>,
    pub mailing_lists: Vec<MailingList>,
    pub dependencies: Vec<Dependency>,
    pub facets: BTreeMap<String, MetadataFacet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scm {
    pub connection: Option<String>,
    pub developer_connection: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CiManagement {
    pub system: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueManagement {
    pub system: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct License {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MailingList {
    pub name: Option<String>,
    pub post_address: Option<String>,
    pub archive_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub dependency_type: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
}
