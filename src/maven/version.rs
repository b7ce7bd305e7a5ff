//! Version classification and ordering helpers.
//!
//! Snapshot detection covers both the generic `-SNAPSHOT` suffix and the
//! unique (timestamped) snapshot form `base-YYYYMMDD.HHMMSS-build`. All
//! parsing is stateless; timestamp extraction returns `None` on malformed
//! input so callers skip the candidate instead of mis-purging it.

use chrono::NaiveDateTime;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Timestamp pattern embedded in unique snapshot versions.
const TIMESTAMP_FORMAT: &str = "%Y%m%d.%H%M%S";

// Regex for unique (timestamped) snapshot versions
fn unique_snapshot_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+)-(\d{8}\.\d{6})-(\d+)$").unwrap())
}

/// Check whether a version string denotes a snapshot (generic or unique).
pub fn is_snapshot(version: &str) -> bool {
    version.ends_with(SNAPSHOT_SUFFIX) || unique_snapshot_regex().is_match(version)
}

/// Check whether a version string is a unique (timestamped) snapshot.
pub fn is_unique_snapshot(version: &str) -> bool {
    unique_snapshot_regex().is_match(version)
}

/// Resolve the base version of a snapshot: `1.0-20060101.120000-3`
/// becomes `1.0-SNAPSHOT`; anything else is returned unchanged.
pub fn base_version(version: &str) -> String {
    match unique_snapshot_regex().captures(version) {
        Some(caps) => format!("{}{}", &caps[1], SNAPSHOT_SUFFIX),
        None => version.to_string(),
    }
}

/// Strip the `-SNAPSHOT` suffix, yielding the release form of the version.
pub fn release_version(version: &str) -> String {
    let base = base_version(version);
    base.strip_suffix(SNAPSHOT_SUFFIX)
        .map(str::to_string)
        .unwrap_or(base)
}

/// Extract the deployment timestamp embedded in a unique snapshot version.
///
/// Returns `None` when the version is not a unique snapshot or the embedded
/// timestamp does not parse as `yyyyMMdd.HHmmss`.
pub fn unique_snapshot_timestamp(version: &str) -> Option<NaiveDateTime> {
    let caps = unique_snapshot_regex().captures(version)?;
    NaiveDateTime::parse_from_str(&caps[2], TIMESTAMP_FORMAT).ok()
}

/// Numeric-aware version comparison: `1.0.9` sorts before `1.0.10`.
///
/// Versions are split on `.` and `-`; segments where both sides are numeric
/// compare numerically, otherwise lexically. A version that is a strict
/// segment-prefix of another sorts first. Equal inputs compare equal, so a
/// stable sort preserves enumeration order for ties.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let sa = segments(a);
    let sb = segments(b);

    for (x, y) in sa.iter().zip(sb.iter()) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(nx), Ok(ny)) => nx.cmp(&ny),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    sa.len().cmp(&sb.len())
}

fn segments(version: &str) -> Vec<&str> {
    version
        .split(['.', '-'])
        .filter(|s| !s.is_empty())
        .collect()
}
