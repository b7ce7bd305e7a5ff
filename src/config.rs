//! Repository cleanup configuration.
//!
//! The CLI fills these from flags and environment variables (clap `env`
//! bridging); embedders construct them directly.

use serde::Serialize;
use std::path::PathBuf;

/// Per-repository artifact cleanup configuration.
///
/// Mirrors the cleanup knobs a managed repository carries: how many snapshot
/// versions to always retain, the age threshold for the days-old policy
/// (0 disables it, selecting retention-count purge instead), and whether
/// snapshots superseded by a release should be removed entirely.
#[derive(Debug, Clone, Serialize)]
pub struct ManagedRepositoryConfig {
    /// Repository identifier used in metadata records and audit lines
    pub id: String,

    /// Physical root of the managed repository
    pub root: PathBuf,

    /// Whether this repository holds release artifacts
    pub releases: bool,

    /// Whether this repository holds snapshot artifacts
    pub snapshots: bool,

    /// Minimum number of most-recent snapshot versions guaranteed to survive
    pub retention_count: u16,

    /// Purge snapshot versions older than this many days (0 = disabled)
    pub days_older: i64,

    /// Remove snapshots that have a released counterpart
    pub delete_released_snapshots: bool,
}

impl ManagedRepositoryConfig {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            releases: true,
            snapshots: true,
            retention_count: 2,
            days_older: 100,
            delete_released_snapshots: false,
        }
    }
}
