//! Integration tests for the purge strategies and the shared executor,
//! running against temp-directory repositories.

mod common;

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use artifact_sweeper::maven::ArtifactReference;
use artifact_sweeper::metadata::model::{
    ArtifactMetadata, ProjectMetadata, ProjectVersionMetadata,
};
use artifact_sweeper::metadata::{FileMetadataRepository, MetadataRepository};
use artifact_sweeper::services::listener::RepositoryListener;
use artifact_sweeper::services::purge_consumer::RepositoryPurgeConsumer;
use artifact_sweeper::services::purge_executor::PurgeExecutor;
use artifact_sweeper::services::repository_purge::RepositoryPurge;
use artifact_sweeper::services::retention_count_purge::RetentionCountRepositoryPurge;

use common::{deploy, record_metadata, test_repo, TestRepo};

fn executor(repo: &TestRepo) -> Arc<PurgeExecutor> {
    Arc::new(PurgeExecutor::new(
        repo.config.clone(),
        repo.store.clone() as Arc<dyn MetadataRepository>,
        Vec::new(),
    ))
}

// =============================================================================
// Retention-count purge
// =============================================================================

#[tokio::test]
async fn retention_purges_oldest_beyond_count() {
    let repo = test_repo("internal");
    for v in ["1.0-SNAPSHOT", "1.1-SNAPSHOT", "1.2-SNAPSHOT"] {
        deploy(&repo, "com.example", "mylib", v, v, None, "jar").await;
        deploy(&repo, "com.example", "mylib", v, v, None, "pom").await;
    }

    let purge = RetentionCountRepositoryPurge::new(executor(&repo), 2);
    let report = purge
        .process("com/example/mylib/1.2-SNAPSHOT/mylib-1.2-SNAPSHOT.jar")
        .await
        .unwrap();

    // Exactly the oldest version goes, jar and pom and their checksums
    assert!(!repo.exists("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-SNAPSHOT.jar"));
    assert!(!repo.exists("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-SNAPSHOT.jar.sha1"));
    assert!(!repo.exists("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-SNAPSHOT.pom"));
    assert!(repo.exists("com/example/mylib/1.1-SNAPSHOT/mylib-1.1-SNAPSHOT.jar"));
    assert!(repo.exists("com/example/mylib/1.2-SNAPSHOT/mylib-1.2-SNAPSHOT.jar"));
    assert!(report.skipped.is_empty());

    // Metadata of the purged version is gone, the survivors' remains
    assert!(repo
        .store
        .get_artifacts("com.example", "mylib", "1.0-SNAPSHOT")
        .await
        .unwrap()
        .is_empty());
    assert!(repo
        .store
        .get_project_version("com.example", "mylib", "1.0-SNAPSHOT")
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        repo.store
            .get_artifacts("com.example", "mylib", "1.1-SNAPSHOT")
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn retention_covering_all_versions_is_noop() {
    let repo = test_repo("internal");
    deploy(
        &repo,
        "com.example",
        "mylib",
        "1.0-SNAPSHOT",
        "1.0-SNAPSHOT",
        None,
        "jar",
    )
    .await;

    let purge = RetentionCountRepositoryPurge::new(executor(&repo), 2);
    let path = "com/example/mylib/1.0-SNAPSHOT/mylib-1.0-SNAPSHOT.jar";

    // Running twice in a row changes nothing and reports nothing
    for _ in 0..2 {
        let report = purge.process(path).await.unwrap();
        assert!(report.removed.is_empty());
        assert!(report.skipped.is_empty());
        assert!(repo.exists(path));
    }
}

#[tokio::test]
async fn retention_ignores_release_artifacts() {
    let repo = test_repo("internal");
    deploy(&repo, "com.example", "mylib", "1.0", "1.0", None, "jar").await;
    deploy(&repo, "com.example", "mylib", "1.1", "1.1", None, "jar").await;
    deploy(&repo, "com.example", "mylib", "1.2", "1.2", None, "jar").await;

    let purge = RetentionCountRepositoryPurge::new(executor(&repo), 1);
    let report = purge
        .process("com/example/mylib/1.2/mylib-1.2.jar")
        .await
        .unwrap();

    assert!(report.is_empty());
    assert!(repo.exists("com/example/mylib/1.0/mylib-1.0.jar"));
}

#[tokio::test]
async fn support_file_sweep_is_depth_bounded() {
    let repo = test_repo("internal");
    for v in ["1.0-SNAPSHOT", "1.1-SNAPSHOT"] {
        deploy(&repo, "com.example", "mylib", v, v, None, "jar").await;
    }
    let version_dir = repo.root().join("com/example/mylib/1.0-SNAPSHOT");
    std::fs::write(version_dir.join("mylib-1.0-SNAPSHOT.jar.asc"), b"sig").unwrap();
    // Depth 3 from the artifact's directory: swept
    std::fs::create_dir_all(version_dir.join("a/b")).unwrap();
    std::fs::write(version_dir.join("a/b/mylib-1.0-SNAPSHOT.jar.sha1"), b"x").unwrap();
    // Depth 4: out of range
    std::fs::create_dir_all(version_dir.join("a/b/c")).unwrap();
    std::fs::write(version_dir.join("a/b/c/mylib-1.0-SNAPSHOT.jar.sha1"), b"x").unwrap();

    let purge = RetentionCountRepositoryPurge::new(executor(&repo), 1);
    purge
        .process("com/example/mylib/1.1-SNAPSHOT/mylib-1.1-SNAPSHOT.jar")
        .await
        .unwrap();

    assert!(!version_dir.join("mylib-1.0-SNAPSHOT.jar").exists());
    assert!(!version_dir.join("mylib-1.0-SNAPSHOT.jar.asc").exists());
    assert!(!version_dir.join("mylib-1.0-SNAPSHOT.jar.md5").exists());
    assert!(!version_dir.join("a/b/mylib-1.0-SNAPSHOT.jar.sha1").exists());
    assert!(version_dir.join("a/b/c/mylib-1.0-SNAPSHOT.jar.sha1").exists());
}

#[tokio::test]
async fn cascading_delete_spares_sibling_projects() {
    let repo = test_repo("internal");
    deploy(
        &repo,
        "com.example",
        "app",
        "1.0-SNAPSHOT",
        "1.0-SNAPSHOT",
        None,
        "jar",
    )
    .await;
    deploy(
        &repo,
        "com.example",
        "lib",
        "1.0-SNAPSHOT",
        "1.0-SNAPSHOT",
        None,
        "jar",
    )
    .await;

    let purge = RetentionCountRepositoryPurge::new(executor(&repo), 0);
    purge
        .process("com/example/app/1.0-SNAPSHOT/app-1.0-SNAPSHOT.jar")
        .await
        .unwrap();

    assert!(repo
        .store
        .get_project_version("com.example", "app", "1.0-SNAPSHOT")
        .await
        .unwrap()
        .is_none());
    assert!(repo
        .store
        .get_project_version("com.example", "lib", "1.0-SNAPSHOT")
        .await
        .unwrap()
        .is_some());
    assert!(repo.exists("com/example/lib/1.0-SNAPSHOT/lib-1.0-SNAPSHOT.jar"));
}

// =============================================================================
// Days-old purge
// =============================================================================

#[tokio::test]
async fn days_old_purges_stale_versions_outside_retention_window() {
    use artifact_sweeper::services::days_old_purge::DaysOldRepositoryPurge;

    let repo = test_repo("internal");
    // Unique snapshot deployed in 2006: far past any cutoff
    deploy(
        &repo,
        "com.example",
        "mylib",
        "1.0-SNAPSHOT",
        "1.0-20060101.120000-1",
        None,
        "jar",
    )
    .await;
    // Fresh generic snapshot: mtime is now
    deploy(
        &repo,
        "com.example",
        "mylib",
        "2.0-SNAPSHOT",
        "2.0-SNAPSHOT",
        None,
        "jar",
    )
    .await;

    let purge = DaysOldRepositoryPurge::new(executor(&repo), 30, 1);
    purge
        .process("com/example/mylib/2.0-SNAPSHOT/mylib-2.0-SNAPSHOT.jar")
        .await
        .unwrap();

    assert!(!repo.exists("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-20060101.120000-1.jar"));
    assert!(repo.exists("com/example/mylib/2.0-SNAPSHOT/mylib-2.0-SNAPSHOT.jar"));
}

#[tokio::test]
async fn days_old_never_purges_inside_retention_window() {
    use artifact_sweeper::services::days_old_purge::DaysOldRepositoryPurge;

    let repo = test_repo("internal");
    deploy(
        &repo,
        "com.example",
        "mylib",
        "1.0-SNAPSHOT",
        "1.0-20060101.120000-1",
        None,
        "jar",
    )
    .await;

    // Ancient, but it is the only version and the window keeps one
    let purge = DaysOldRepositoryPurge::new(executor(&repo), 30, 1);
    let report = purge
        .process("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-20060101.120000-1.jar")
        .await
        .unwrap();

    assert!(report.is_empty());
    assert!(repo.exists("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-20060101.120000-1.jar"));
}

#[tokio::test]
async fn days_old_skips_versions_with_malformed_timestamps() {
    use artifact_sweeper::services::days_old_purge::DaysOldRepositoryPurge;

    let repo = test_repo("internal");
    // Matches the unique-snapshot shape but is not a real date
    deploy(
        &repo,
        "com.example",
        "mylib",
        "1.0-SNAPSHOT",
        "1.0-20069999.999999-1",
        None,
        "jar",
    )
    .await;

    let purge = DaysOldRepositoryPurge::new(executor(&repo), 30, 0);
    let report = purge
        .process("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-20069999.999999-1.jar")
        .await
        .unwrap();

    assert!(report.is_empty());
    assert!(repo.exists("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-20069999.999999-1.jar"));
}

// =============================================================================
// Cleanup-released-snapshots purge
// =============================================================================

#[tokio::test]
async fn cleanup_released_removes_superseded_snapshots() {
    let repo = test_repo("internal");
    let versions = [
        "1.0-SNAPSHOT",
        "1.1-SNAPSHOT",
        "1.2.1-SNAPSHOT",
        "1.2.1",
        "2.0-SNAPSHOT",
        "2.0",
        "2.1-SNAPSHOT",
    ];
    for v in versions {
        deploy(&repo, "com.example", "mylib", v, v, None, "jar").await;
    }

    let mut config = repo.config.clone();
    config.delete_released_snapshots = true;
    config.days_older = 0;
    config.retention_count = 10;

    let mut consumer = RepositoryPurgeConsumer::new(
        config,
        repo.store.clone() as Arc<dyn MetadataRepository>,
        Vec::new(),
        Vec::new(),
        false,
    );
    let report = consumer.scan_repository(Utc::now()).await.unwrap();
    assert_eq!(report.errors, 0);

    for purged in ["1.0-SNAPSHOT", "1.1-SNAPSHOT", "1.2.1-SNAPSHOT", "2.0-SNAPSHOT"] {
        assert!(
            !repo.exists(&format!("com/example/mylib/{purged}")),
            "{purged} should have been removed"
        );
        assert!(repo
            .store
            .get_project_version("com.example", "mylib", purged)
            .await
            .unwrap()
            .is_none());
    }
    for retained in ["1.2.1", "2.0", "2.1-SNAPSHOT"] {
        assert!(
            repo.exists(&format!("com/example/mylib/{retained}")),
            "{retained} should have been retained"
        );
    }

    // Project metadata descriptor regenerated from what is left
    let xml =
        std::fs::read_to_string(repo.root().join("com/example/mylib/maven-metadata.xml")).unwrap();
    assert!(xml.contains("<version>2.1-SNAPSHOT</version>"));
    assert!(xml.contains("<release>2.0</release>"));
    assert!(!xml.contains("<version>1.0-SNAPSHOT</version>"));
}

// =============================================================================
// Purge executor
// =============================================================================

#[tokio::test]
async fn failed_file_deletion_leaves_metadata_untouched() {
    let repo = test_repo("internal");
    record_metadata(
        &repo,
        "com.example",
        "app",
        "1.0-SNAPSHOT",
        "1.0-SNAPSHOT",
        None,
        "jar",
        "app-1.0-SNAPSHOT.jar",
    )
    .await;
    // A directory where the artifact file should be: remove_file will fail
    std::fs::create_dir_all(
        repo.root()
            .join("com/example/app/1.0-SNAPSHOT/app-1.0-SNAPSHOT.jar"),
    )
    .unwrap();

    let mut references = BTreeSet::new();
    references.insert(
        ArtifactReference::from_path("com/example/app/1.0-SNAPSHOT/app-1.0-SNAPSHOT.jar").unwrap(),
    );
    let report = executor(&repo).purge(&references).await.unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert!(report.removed.is_empty());
    assert_eq!(
        repo.store
            .get_artifacts("com.example", "app", "1.0-SNAPSHOT")
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn dry_run_reports_candidates_without_deleting() {
    let repo = test_repo("internal");
    for v in ["1.0-SNAPSHOT", "1.1-SNAPSHOT", "1.2-SNAPSHOT"] {
        deploy(&repo, "com.example", "mylib", v, v, None, "jar").await;
    }

    let exec = Arc::new(
        PurgeExecutor::new(
            repo.config.clone(),
            repo.store.clone() as Arc<dyn MetadataRepository>,
            Vec::new(),
        )
        .with_dry_run(true),
    );
    let purge = RetentionCountRepositoryPurge::new(exec, 2);
    let report = purge
        .process("com/example/mylib/1.2-SNAPSHOT/mylib-1.2-SNAPSHOT.jar")
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(
        report.removed,
        vec!["com/example/mylib/1.0-SNAPSHOT/mylib-1.0-SNAPSHOT.jar".to_string()]
    );
    assert!(repo.exists("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-SNAPSHOT.jar"));
    assert_eq!(
        repo.store
            .get_artifacts("com.example", "mylib", "1.0-SNAPSHOT")
            .await
            .unwrap()
            .len(),
        1
    );
}

struct RecordingListener {
    deleted: Mutex<Vec<String>>,
}

impl RepositoryListener for RecordingListener {
    fn deleting_artifact(
        &self,
        _repository_id: &str,
        _namespace: &str,
        _project: &str,
        _version: &str,
        file_name: &str,
    ) {
        self.deleted.lock().unwrap().push(file_name.to_string());
    }
}

#[tokio::test]
async fn listeners_are_notified_before_deletion() {
    let repo = test_repo("internal");
    deploy(
        &repo,
        "com.example",
        "mylib",
        "1.0-SNAPSHOT",
        "1.0-SNAPSHOT",
        None,
        "jar",
    )
    .await;

    let listener = Arc::new(RecordingListener {
        deleted: Mutex::new(Vec::new()),
    });
    let exec = PurgeExecutor::new(
        repo.config.clone(),
        repo.store.clone() as Arc<dyn MetadataRepository>,
        vec![listener.clone() as Arc<dyn RepositoryListener>],
    );

    let mut references = BTreeSet::new();
    references.insert(
        ArtifactReference::from_path("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-SNAPSHOT.jar")
            .unwrap(),
    );
    exec.purge(&references).await.unwrap();

    assert_eq!(
        listener.deleted.lock().unwrap().as_slice(),
        ["mylib-1.0-SNAPSHOT.jar"]
    );
}

/// Delegating store that counts bucket queries and flushes.
struct CountingStore {
    inner: Arc<FileMetadataRepository>,
    gets: Mutex<HashMap<String, usize>>,
    saves: AtomicUsize,
}

#[async_trait::async_trait]
impl MetadataRepository for CountingStore {
    fn repository_id(&self) -> &str {
        self.inner.repository_id()
    }

    async fn update_namespace(&self, namespace: &str) -> artifact_sweeper::Result<()> {
        self.inner.update_namespace(namespace).await
    }

    async fn update_project(&self, project: &ProjectMetadata) -> artifact_sweeper::Result<()> {
        self.inner.update_project(project).await
    }

    async fn update_project_version(
        &self,
        namespace: &str,
        project: &str,
        version: &ProjectVersionMetadata,
    ) -> artifact_sweeper::Result<()> {
        self.inner
            .update_project_version(namespace, project, version)
            .await
    }

    async fn update_artifact(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact: &ArtifactMetadata,
    ) -> artifact_sweeper::Result<()> {
        self.inner
            .update_artifact(namespace, project, project_version, artifact)
            .await
    }

    async fn get_namespaces(&self) -> artifact_sweeper::Result<Vec<String>> {
        self.inner.get_namespaces().await
    }

    async fn get_projects(&self, namespace: &str) -> artifact_sweeper::Result<Vec<String>> {
        self.inner.get_projects(namespace).await
    }

    async fn get_project_versions(
        &self,
        namespace: &str,
        project: &str,
    ) -> artifact_sweeper::Result<Vec<String>> {
        self.inner.get_project_versions(namespace, project).await
    }

    async fn get_project_version(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> artifact_sweeper::Result<Option<ProjectVersionMetadata>> {
        self.inner
            .get_project_version(namespace, project, project_version)
            .await
    }

    async fn get_artifacts(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> artifact_sweeper::Result<Vec<ArtifactMetadata>> {
        *self
            .gets
            .lock()
            .unwrap()
            .entry(format!("{namespace}/{project}/{project_version}"))
            .or_insert(0) += 1;
        self.inner
            .get_artifacts(namespace, project, project_version)
            .await
    }

    async fn remove_artifact(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact_id: &str,
    ) -> artifact_sweeper::Result<()> {
        self.inner
            .remove_artifact(namespace, project, project_version, artifact_id)
            .await
    }

    async fn remove_artifacts_with_version(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact_version: &str,
    ) -> artifact_sweeper::Result<()> {
        self.inner
            .remove_artifacts_with_version(namespace, project, project_version, artifact_version)
            .await
    }

    async fn remove_artifact_matching_facets(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact: &ArtifactMetadata,
    ) -> artifact_sweeper::Result<()> {
        self.inner
            .remove_artifact_matching_facets(namespace, project, project_version, artifact)
            .await
    }

    async fn remove_project_version(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> artifact_sweeper::Result<()> {
        self.inner
            .remove_project_version(namespace, project, project_version)
            .await
    }

    async fn save(&self) -> artifact_sweeper::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save().await
    }
}

#[tokio::test]
async fn purge_memoizes_bucket_queries_and_flushes_twice() {
    let repo = test_repo("internal");
    deploy(
        &repo,
        "com.example",
        "mylib",
        "1.0-SNAPSHOT",
        "1.0-SNAPSHOT",
        None,
        "jar",
    )
    .await;
    deploy(
        &repo,
        "com.example",
        "mylib",
        "1.0-SNAPSHOT",
        "1.0-SNAPSHOT",
        None,
        "pom",
    )
    .await;

    let counting = Arc::new(CountingStore {
        inner: repo.store.clone(),
        gets: Mutex::new(HashMap::new()),
        saves: AtomicUsize::new(0),
    });
    let exec = PurgeExecutor::new(
        repo.config.clone(),
        counting.clone() as Arc<dyn MetadataRepository>,
        Vec::new(),
    );

    let mut references = BTreeSet::new();
    for file in ["mylib-1.0-SNAPSHOT.jar", "mylib-1.0-SNAPSHOT.pom"] {
        references.insert(
            ArtifactReference::from_path(&format!("com/example/mylib/1.0-SNAPSHOT/{file}"))
                .unwrap(),
        );
    }
    exec.purge(&references).await.unwrap();

    // One memoized lookup in the removal phase plus one emptiness re-check
    let gets = counting.gets.lock().unwrap();
    assert_eq!(gets.get("com.example/mylib/1.0-SNAPSHOT"), Some(&2));
    assert_eq!(counting.saves.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Consumer
// =============================================================================

#[tokio::test]
async fn consumer_skips_non_artifact_paths() {
    let repo = test_repo("internal");
    let mut consumer = RepositoryPurgeConsumer::new(
        repo.config.clone(),
        repo.store.clone() as Arc<dyn MetadataRepository>,
        Vec::new(),
        Vec::new(),
        false,
    );

    consumer.begin_scan(Utc::now()).unwrap();
    consumer.process_file("README.txt").await.unwrap();
    let report = consumer.complete_scan().unwrap();

    assert_eq!(report.files_processed, 1);
    assert_eq!(report.errors, 0);
    assert!(report.removed.is_empty());
}

#[tokio::test]
async fn full_scan_applies_retention_policy() {
    let repo = test_repo("internal");
    for v in ["1.0-SNAPSHOT", "1.1-SNAPSHOT", "1.2-SNAPSHOT"] {
        deploy(&repo, "com.example", "mylib", v, v, None, "jar").await;
    }

    let mut config = repo.config.clone();
    config.retention_count = 2;
    config.days_older = 0;

    let mut consumer = RepositoryPurgeConsumer::new(
        config,
        repo.store.clone() as Arc<dyn MetadataRepository>,
        Vec::new(),
        Vec::new(),
        false,
    );
    let report = consumer.scan_repository(Utc::now()).await.unwrap();

    assert_eq!(report.errors, 0);
    assert!(!repo.exists("com/example/mylib/1.0-SNAPSHOT/mylib-1.0-SNAPSHOT.jar"));
    assert!(repo.exists("com/example/mylib/1.1-SNAPSHOT/mylib-1.1-SNAPSHOT.jar"));
    assert!(repo.exists("com/example/mylib/1.2-SNAPSHOT/mylib-1.2-SNAPSHOT.jar"));
}
