//! `maven-metadata.xml` generation.
//!
//! Descriptors are regenerated from directory state after a purge rather
//! than incrementally edited, so stale version entries can never survive.

use chrono::Utc;

use crate::maven::version;

/// Generate project-level metadata listing the given versions.
///
/// `versions` must already be sorted ascending by the version comparator;
/// `latest` is the last entry and `release` the last non-snapshot entry.
pub fn project_metadata_xml(group_id: &str, artifact_id: &str, versions: &[String]) -> String {
    let mut versions_xml = String::new();
    for v in versions {
        versions_xml.push_str(&format!("      <version>{}</version>\n", v));
    }

    let latest = versions.last().map(String::as_str).unwrap_or_default();
    let release_line = versions
        .iter()
        .rev()
        .find(|v| !version::is_snapshot(v))
        .map(|r| format!("    <release>{}</release>\n", r))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>{}</groupId>
  <artifactId>{}</artifactId>
  <versioning>
    <latest>{}</latest>
{}    <versions>
{}    </versions>
    <lastUpdated>{}</lastUpdated>
  </versioning>
</metadata>
"#,
        group_id,
        artifact_id,
        latest,
        release_line,
        versions_xml,
        Utc::now().format("%Y%m%d%H%M%S")
    )
}

/// Generate version-level metadata for a snapshot version directory.
///
/// `timestamp` and `build_number` come from the newest deployed unique
/// snapshot; generic (non-timestamped) snapshots pass `None`.
pub fn snapshot_metadata_xml(
    group_id: &str,
    artifact_id: &str,
    base_version: &str,
    snapshot: Option<(&str, u32)>,
) -> String {
    let snapshot_block = match snapshot {
        Some((timestamp, build_number)) => format!(
            "    <snapshot>\n      <timestamp>{}</timestamp>\n      <buildNumber>{}</buildNumber>\n    </snapshot>\n",
            timestamp, build_number
        ),
        None => String::new(),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>{}</groupId>
  <artifactId>{}</artifactId>
  <version>{}</version>
  <versioning>
{}    <lastUpdated>{}</lastUpdated>
  </versioning>
</metadata>
"#,
        group_id,
        artifact_id,
        base_version,
        snapshot_block,
        Utc::now().format("%Y%m%d%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_metadata() {
        let xml = project_metadata_xml(
            "com.example",
            "mylib",
            &[
                "1.0.0".to_string(),
                "1.1.0".to_string(),
                "1.2.0-SNAPSHOT".to_string(),
            ],
        );
        assert!(xml.contains("<groupId>com.example</groupId>"));
        assert!(xml.contains("<latest>1.2.0-SNAPSHOT</latest>"));
        assert!(xml.contains("<release>1.1.0</release>"));
        assert!(xml.contains("<version>1.0.0</version>"));
    }

    #[test]
    fn test_project_metadata_no_release() {
        let xml = project_metadata_xml("com.example", "mylib", &["1.0-SNAPSHOT".to_string()]);
        assert!(!xml.contains("<release>"));
        assert!(xml.contains("<latest>1.0-SNAPSHOT</latest>"));
    }

    #[test]
    fn test_snapshot_metadata() {
        let xml = snapshot_metadata_xml(
            "com.example",
            "mylib",
            "1.0-SNAPSHOT",
            Some(("20260211.124623", 4)),
        );
        assert!(xml.contains("<timestamp>20260211.124623</timestamp>"));
        assert!(xml.contains("<buildNumber>4</buildNumber>"));
        assert!(xml.contains("<version>1.0-SNAPSHOT</version>"));
    }
}
