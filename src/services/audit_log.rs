//! Audit logging for purge actions.
//!
//! One line per action, fixed format
//! `repoId <system-purge> <system> "<resource>" "<action>"`, emitted on the
//! `artifact_sweeper::audit` tracing target so it can be routed separately
//! from the application log.

/// Tracing target carrying audit lines.
pub const AUDIT_TARGET: &str = "artifact_sweeper::audit";

const SYSTEM_USER: &str = "<system-purge>";
const SYSTEM_REMOTE: &str = "<system>";

/// Purge action types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeAction {
    PurgedArtifact,
    PurgedFile,
    PurgedDirectory,
    RemovedMetadata,
}

impl PurgeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurgeAction::PurgedArtifact => "Purged Artifact",
            PurgeAction::PurgedFile => "Purged Support File",
            PurgeAction::PurgedDirectory => "Purged Version Directory",
            PurgeAction::RemovedMetadata => "Removed Metadata",
        }
    }
}

/// Record one audit line for a purge action on a resource.
pub fn record(repository_id: &str, resource: &str, action: PurgeAction) {
    tracing::info!(
        target: "artifact_sweeper::audit",
        "{} {} {} \"{}\" \"{}\"",
        repository_id,
        SYSTEM_USER,
        SYSTEM_REMOTE,
        resource,
        action.as_str()
    );
}
