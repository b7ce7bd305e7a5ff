//! Artifact reference model and Maven 2 repository layout parsing.
//!
//! Path format: `groupId/as/dirs/artifactId/version/artifactId-version[-classifier].extension`.
//! For snapshot versions the filename may carry the timestamp-resolved form,
//! `artifact-1.0.0-20260211.124623-1.jar` inside a `1.0.0-SNAPSHOT`
//! directory; the parsed reference keeps the resolved (timestamped) version.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::error::{Result, SweeperError};
use crate::maven::version;

/// Support-file suffixes deleted alongside their artifact.
pub const SUPPORT_SUFFIXES: &[&str] = [".md5", ".sha1", ".sha256", ".asc"].as_slice();

/// Repository-level metadata descriptor filename.
pub const METADATA_FILENAME: &str = "maven-metadata.xml";

// Regex for the leading timestamp-build portion of a resolved snapshot filename
fn timestamp_build_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{8}\.\d{6}-\d+)(.*)$").unwrap())
}

/// Identifies one physical artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArtifactReference {
    pub group_id: String,
    pub artifact_id: String,
    /// Exact version of the file, timestamped for resolved snapshots
    pub version: String,
    pub classifier: Option<String>,
    pub artifact_type: String,
}

/// Identifies all artifacts sharing a `{groupId, artifactId, version}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VersionedReference {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ArtifactReference {
    /// Parse an artifact reference from a path relative to the repository root.
    ///
    /// Support files and `maven-metadata.xml` are not artifacts; they yield a
    /// layout error, as do paths too short for the Maven 2 layout.
    pub fn from_path(path: &str) -> Result<Self> {
        let parts: Vec<&str> = path
            .trim_start_matches('/')
            .split('/')
            .filter(|p| !p.is_empty())
            .collect();

        if parts.len() < 4 {
            return Err(SweeperError::Layout(format!(
                "invalid artifact path '{}': expected groupId/artifactId/version/filename",
                path
            )));
        }

        let filename = parts[parts.len() - 1];
        let dir_version = parts[parts.len() - 2];
        let artifact_id = parts[parts.len() - 3];
        let group_id = parts[..parts.len() - 3].join(".");

        if is_metadata_file(filename) || is_support_file(filename) {
            return Err(SweeperError::Layout(format!(
                "'{}' is not an artifact file",
                filename
            )));
        }

        let (file_version, remainder) = split_version(filename, artifact_id, dir_version)
            .ok_or_else(|| {
                SweeperError::Layout(format!(
                    "invalid artifact filename '{}': expected to start with {}-{}",
                    filename, artifact_id, dir_version
                ))
            })?;

        let (classifier, artifact_type) = split_classifier_extension(remainder).ok_or_else(
            || SweeperError::Layout(format!("invalid artifact filename '{}'", filename)),
        )?;

        Ok(Self {
            group_id,
            artifact_id: artifact_id.to_string(),
            version: file_version,
            classifier,
            artifact_type,
        })
    }

    /// Base (non-timestamped) form of this reference's version.
    pub fn base_version(&self) -> String {
        version::base_version(&self.version)
    }

    /// The standard filename for this reference.
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, c, self.artifact_type
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.artifact_type),
        }
    }

    /// Repository-relative path of this artifact's file.
    pub fn to_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.base_version(),
            self.file_name()
        )
    }

    /// Coarsen to the version grain, keeping the base version.
    pub fn to_versioned(&self) -> VersionedReference {
        VersionedReference {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.base_version(),
        }
    }
}

impl VersionedReference {
    /// Repository-relative path of the version directory.
    pub fn to_path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version
        )
    }

    /// Repository-relative path of the artifact directory (version dirs live here).
    pub fn project_path(&self) -> String {
        format!(
            "{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id
        )
    }
}

/// Check for a checksum/signature support file.
pub fn is_support_file(filename: &str) -> bool {
    SUPPORT_SUFFIXES.iter().any(|s| filename.ends_with(s))
}

/// Check for a repository metadata descriptor.
pub fn is_metadata_file(filename: &str) -> bool {
    filename == METADATA_FILENAME
}

/// Split `filename` into its version and the trailing
/// `[-classifier].extension` remainder.
///
/// Accepts the directory version verbatim or, for `-SNAPSHOT` directories,
/// the timestamp-resolved form.
fn split_version<'a>(
    filename: &'a str,
    artifact_id: &str,
    dir_version: &str,
) -> Option<(String, &'a str)> {
    let exact_prefix = format!("{}-{}", artifact_id, dir_version);
    if let Some(remainder) = filename.strip_prefix(exact_prefix.as_str()) {
        return Some((dir_version.to_string(), remainder));
    }

    let base = dir_version.strip_suffix(version::SNAPSHOT_SUFFIX)?;
    let snapshot_prefix = format!("{}-{}-", artifact_id, base);
    let rest = filename.strip_prefix(snapshot_prefix.as_str())?;
    let caps = timestamp_build_regex().captures(rest)?;
    let resolved = format!("{}-{}", base, &caps[1]);
    let remainder_len = caps[2].len();
    Some((resolved, &rest[rest.len() - remainder_len..]))
}

/// Split the post-version remainder into `(classifier, extension)`.
fn split_classifier_extension(remainder: &str) -> Option<(Option<String>, String)> {
    if remainder.is_empty() {
        return None;
    }

    // -classifier.ext
    if let Some(rest) = remainder.strip_prefix('-') {
        let dot_pos = rest.rfind('.')?;
        if dot_pos == 0 || dot_pos == rest.len() - 1 {
            return None;
        }
        return Some((
            Some(rest[..dot_pos].to_string()),
            rest[dot_pos + 1..].to_string(),
        ));
    }

    // .ext
    let ext = remainder.strip_prefix('.')?;
    if ext.is_empty() {
        return None;
    }
    Some((None, ext.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        let r = ArtifactReference::from_path(
            "org/apache/maven/maven-core/3.8.1/maven-core-3.8.1.jar",
        )
        .unwrap();
        assert_eq!(r.group_id, "org.apache.maven");
        assert_eq!(r.artifact_id, "maven-core");
        assert_eq!(r.version, "3.8.1");
        assert_eq!(r.classifier, None);
        assert_eq!(r.artifact_type, "jar");
    }

    #[test]
    fn test_parse_reference_with_classifier() {
        let r = ArtifactReference::from_path(
            "org/apache/maven/maven-core/3.8.1/maven-core-3.8.1-sources.jar",
        )
        .unwrap();
        assert_eq!(r.classifier, Some("sources".to_string()));
        assert_eq!(r.artifact_type, "jar");
    }

    #[test]
    fn test_parse_snapshot_reference() {
        let r = ArtifactReference::from_path(
            "com/example/test/1.0.0-SNAPSHOT/test-1.0.0-SNAPSHOT.jar",
        )
        .unwrap();
        assert_eq!(r.version, "1.0.0-SNAPSHOT");
        assert_eq!(r.base_version(), "1.0.0-SNAPSHOT");
    }

    #[test]
    fn test_parse_timestamped_snapshot_reference() {
        let r = ArtifactReference::from_path(
            "com/example/test/1.0.0-SNAPSHOT/test-1.0.0-20260211.124623-1.jar",
        )
        .unwrap();
        assert_eq!(r.version, "1.0.0-20260211.124623-1");
        assert_eq!(r.base_version(), "1.0.0-SNAPSHOT");
        assert_eq!(r.artifact_type, "jar");
    }

    #[test]
    fn test_parse_timestamped_snapshot_with_classifier() {
        let r = ArtifactReference::from_path(
            "com/example/test/1.2.3-SNAPSHOT/test-1.2.3-20260211.124623-1-sources.jar",
        )
        .unwrap();
        assert_eq!(r.version, "1.2.3-20260211.124623-1");
        assert_eq!(r.classifier, Some("sources".to_string()));
    }

    #[test]
    fn test_support_and_metadata_files_rejected() {
        assert!(ArtifactReference::from_path(
            "com/example/test/1.0/test-1.0.jar.sha1"
        )
        .is_err());
        assert!(ArtifactReference::from_path(
            "com/example/test/1.0-SNAPSHOT/maven-metadata.xml"
        )
        .is_err());
    }

    #[test]
    fn test_short_path_rejected() {
        assert!(ArtifactReference::from_path("test/1.0/test-1.0.jar").is_err());
    }

    #[test]
    fn test_round_trip_path() {
        let r = ArtifactReference::from_path(
            "com/example/test/1.0.0-SNAPSHOT/test-1.0.0-20260211.124623-1.pom",
        )
        .unwrap();
        assert_eq!(
            r.to_path(),
            "com/example/test/1.0.0-SNAPSHOT/test-1.0.0-20260211.124623-1.pom"
        );
    }
}
