//! Repository event listeners.

/// Observes destructive repository operations.
///
/// Listeners are notified before the physical file is deleted; they must not
/// fail the purge, so the callback is infallible.
pub trait RepositoryListener: Send + Sync {
    /// An artifact file is about to be deleted from a managed repository.
    fn deleting_artifact(
        &self,
        repository_id: &str,
        namespace: &str,
        project: &str,
        version: &str,
        file_name: &str,
    );
}
