//! File-backed metadata repository.
//!
//! Records live under `<repo-root>/.archiva/content` in a directory tree
//! mirroring the namespace/project/version hierarchy:
//!
//! ```text
//! <ns>/namespace-metadata.properties
//! <ns>/<project>/project-metadata.properties
//! <ns>/<project>/<version>/version-metadata.properties   core fields + artifact:* keys
//! <ns>/<project>/<version>/metadata.properties           project-version facets
//! ```
//!
//! Artifact records use the `artifact:<field>:<id>` key convention, with
//! facets under `artifact:facet:<id>:<facetId>:<key>`. All mutations land in
//! an in-memory overlay; `save()` is the only point that touches disk, so a
//! purge run's two flushes bracket its persistence.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::metadata::facet::FacetRegistry;
use crate::metadata::model::{
    ArtifactMetadata, CiManagement, Dependency, IssueManagement, License, MailingList,
    MetadataFacet, ProjectMetadata, ProjectVersionMetadata, Scm,
};
use crate::metadata::{properties, MetadataRepository};

const CONTENT_DIR: &str = ".archiva/content";
const NAMESPACE_FILE: &str = "namespace-metadata.properties";
const PROJECT_FILE: &str = "project-metadata.properties";
const VERSION_FILE: &str = "version-metadata.properties";
const FACETS_FILE: &str = "metadata.properties";

/// Buffered, not-yet-persisted store state.
#[derive(Default)]
struct Overlay {
    /// Pending property-file contents keyed by absolute path
    files: HashMap<PathBuf, BTreeMap<String, String>>,
    /// Directories queued for recursive removal at the next save
    removed_dirs: BTreeSet<PathBuf>,
}

impl Overlay {
    fn is_removed(&self, path: &Path) -> bool {
        self.removed_dirs.iter().any(|dir| path.starts_with(dir))
    }
}

/// Property-file-backed [`MetadataRepository`] for one managed repository.
pub struct FileMetadataRepository {
    repository_id: String,
    base: PathBuf,
    registry: Arc<FacetRegistry>,
    overlay: Mutex<Overlay>,
}

impl FileMetadataRepository {
    pub fn new(
        repository_id: impl Into<String>,
        repository_root: impl Into<PathBuf>,
        registry: Arc<FacetRegistry>,
    ) -> Self {
        Self {
            repository_id: repository_id.into(),
            base: repository_root.into().join(CONTENT_DIR),
            registry,
            overlay: Mutex::new(Overlay::default()),
        }
    }

    fn version_dir(&self, namespace: &str, project: &str, version: &str) -> PathBuf {
        self.base.join(namespace).join(project).join(version)
    }

    /// Read a property file through the overlay.
    async fn load_file(&self, path: &Path) -> Result<BTreeMap<String, String>> {
        {
            let overlay = self.overlay.lock().await;
            if overlay.is_removed(path) {
                return Ok(BTreeMap::new());
            }
            if let Some(pending) = overlay.files.get(path) {
                return Ok(pending.clone());
            }
        }
        properties::load(path).await
    }

    /// Stage a property file for the next save.
    async fn put_file(&self, path: PathBuf, props: BTreeMap<String, String>) {
        let mut overlay = self.overlay.lock().await;
        overlay.removed_dirs.retain(|dir| !path.starts_with(dir));
        overlay.files.insert(path, props);
    }

    /// Whether the record file exists on disk or in the overlay.
    async fn file_exists(&self, path: &Path) -> bool {
        {
            let overlay = self.overlay.lock().await;
            if overlay.is_removed(path) {
                return false;
            }
            if overlay.files.contains_key(path) {
                return true;
            }
        }
        fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// List subdirectories of `parent` containing `marker`, overlay-aware.
    async fn list_marked_dirs(&self, parent: &Path, marker: &str) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();

        match fs::read_dir(parent).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    if !entry.file_type().await?.is_dir() {
                        continue;
                    }
                    let marked = fs::metadata(entry.path().join(marker))
                        .await
                        .map(|meta| meta.is_file())
                        .unwrap_or(false);
                    if marked {
                        names.insert(entry.file_name().to_string_lossy().into_owned());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let overlay = self.overlay.lock().await;
        for path in overlay.files.keys() {
            if path.file_name().and_then(|n| n.to_str()) != Some(marker) {
                continue;
            }
            if let Some(dir) = path.parent() {
                if dir.parent() == Some(parent) {
                    if let Some(name) = dir.file_name() {
                        names.insert(name.to_string_lossy().into_owned());
                    }
                }
            }
        }
        names.retain(|name| !overlay.is_removed(&parent.join(name).join(marker)));

        Ok(names.into_iter().collect())
    }
}

#[async_trait]
impl MetadataRepository for FileMetadataRepository {
    fn repository_id(&self) -> &str {
        &self.repository_id
    }

    async fn update_namespace(&self, namespace: &str) -> Result<()> {
        let path = self.base.join(namespace).join(NAMESPACE_FILE);
        let mut props = self.load_file(&path).await?;
        props.insert("namespace".to_string(), namespace.to_string());
        self.put_file(path, props).await;
        Ok(())
    }

    async fn update_project(&self, project: &ProjectMetadata) -> Result<()> {
        self.update_namespace(&project.namespace).await?;

        let path = self
            .base
            .join(&project.namespace)
            .join(&project.id)
            .join(PROJECT_FILE);
        let mut props = self.load_file(&path).await?;
        props.insert("namespace".to_string(), project.namespace.clone());
        props.insert("id".to_string(), project.id.clone());
        self.put_file(path, props).await;
        Ok(())
    }

    async fn update_project_version(
        &self,
        namespace: &str,
        project: &str,
        version: &ProjectVersionMetadata,
    ) -> Result<()> {
        let dir = self.version_dir(namespace, project, &version.id);
        let path = dir.join(VERSION_FILE);
        let mut props = self.load_file(&path).await?;

        // Clear the structured key ranges before rewriting so entries removed
        // from the record don't survive as stale keys.
        props.retain(|key, _| {
            key.starts_with("artifact:")
                || !(key.starts_with("dependency.")
                    || key.starts_with("license.")
                    || key.starts_with("mailingList.")
                    || key.starts_with("scm.")
                    || key.starts_with("ci.")
                    || key.starts_with("issue."))
        });
        props.retain(|key, _| {
            key.starts_with("artifact:")
                || !matches!(key.as_str(), "id" | "name" | "description" | "url")
        });

        props.insert("id".to_string(), version.id.clone());
        write_opt(&mut props, "name", version.name.as_deref());
        write_opt(&mut props, "description", version.description.as_deref());
        write_opt(&mut props, "url", version.url.as_deref());

        if let Some(scm) = &version.scm {
            write_opt(&mut props, "scm.connection", scm.connection.as_deref());
            write_opt(
                &mut props,
                "scm.developerConnection",
                scm.developer_connection.as_deref(),
            );
            write_opt(&mut props, "scm.url", scm.url.as_deref());
        }
        if let Some(ci) = &version.ci {
            write_opt(&mut props, "ci.system", ci.system.as_deref());
            write_opt(&mut props, "ci.url", ci.url.as_deref());
        }
        if let Some(issue) = &version.issue_management {
            write_opt(&mut props, "issue.system", issue.system.as_deref());
            write_opt(&mut props, "issue.url", issue.url.as_deref());
        }
        for (i, license) in version.licenses.iter().enumerate() {
            write_opt(&mut props, &format!("license.{i}.name"), license.name.as_deref());
            write_opt(&mut props, &format!("license.{i}.url"), license.url.as_deref());
        }
        for (i, list) in version.mailing_lists.iter().enumerate() {
            write_opt(&mut props, &format!("mailingList.{i}.name"), list.name.as_deref());
            write_opt(
                &mut props,
                &format!("mailingList.{i}.post"),
                list.post_address.as_deref(),
            );
            write_opt(
                &mut props,
                &format!("mailingList.{i}.archive"),
                list.archive_url.as_deref(),
            );
        }
        for (i, dep) in version.dependencies.iter().enumerate() {
            props.insert(format!("dependency.{i}.groupId"), dep.group_id.clone());
            props.insert(format!("dependency.{i}.artifactId"), dep.artifact_id.clone());
            write_opt(&mut props, &format!("dependency.{i}.version"), dep.version.as_deref());
            write_opt(
                &mut props,
                &format!("dependency.{i}.classifier"),
                dep.classifier.as_deref(),
            );
            write_opt(
                &mut props,
                &format!("dependency.{i}.type"),
                dep.dependency_type.as_deref(),
            );
            write_opt(&mut props, &format!("dependency.{i}.scope"), dep.scope.as_deref());
            if dep.optional {
                props.insert(format!("dependency.{i}.optional"), "true".to_string());
            }
        }
        self.put_file(path, props).await;

        // Facets are cleared and rewritten wholesale on every update.
        let facets_path = dir.join(FACETS_FILE);
        let mut facet_props = BTreeMap::new();
        for facet in version.facets.values() {
            for (key, value) in &facet.properties {
                facet_props.insert(format!("{}:{}", facet.facet_id, key), value.clone());
            }
        }
        self.put_file(facets_path, facet_props).await;

        Ok(())
    }

    async fn update_artifact(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact: &ArtifactMetadata,
    ) -> Result<()> {
        let path = self
            .version_dir(namespace, project, project_version)
            .join(VERSION_FILE);
        let mut props = self.load_file(&path).await?;

        let id = &artifact.id;
        // Clear this artifact's facet range before rewriting
        let facet_prefix = format!("artifact:facet:{id}:");
        props.retain(|key, _| !key.starts_with(&facet_prefix));

        props.insert(format!("artifact:version:{id}"), artifact.version.clone());
        props.insert(
            format!("artifact:whenGathered:{id}"),
            artifact.when_gathered.to_rfc3339(),
        );
        props.insert(format!("artifact:size:{id}"), artifact.size.to_string());
        match &artifact.md5 {
            Some(md5) => props.insert(format!("artifact:md5:{id}"), md5.clone()),
            None => props.remove(&format!("artifact:md5:{id}")),
        };
        match &artifact.sha1 {
            Some(sha1) => props.insert(format!("artifact:sha1:{id}"), sha1.clone()),
            None => props.remove(&format!("artifact:sha1:{id}")),
        };
        for facet in artifact.facets.values() {
            for (key, value) in &facet.properties {
                props.insert(
                    format!("artifact:facet:{id}:{}:{}", facet.facet_id, key),
                    value.clone(),
                );
            }
        }

        self.put_file(path, props).await;
        Ok(())
    }

    async fn get_namespaces(&self) -> Result<Vec<String>> {
        self.list_marked_dirs(&self.base, NAMESPACE_FILE).await
    }

    async fn get_projects(&self, namespace: &str) -> Result<Vec<String>> {
        self.list_marked_dirs(&self.base.join(namespace), PROJECT_FILE)
            .await
    }

    async fn get_project_versions(&self, namespace: &str, project: &str) -> Result<Vec<String>> {
        self.list_marked_dirs(&self.base.join(namespace).join(project), VERSION_FILE)
            .await
    }

    async fn get_project_version(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> Result<Option<ProjectVersionMetadata>> {
        let dir = self.version_dir(namespace, project, project_version);
        let path = dir.join(VERSION_FILE);
        if !self.file_exists(&path).await {
            return Ok(None);
        }
        let props = self.load_file(&path).await?;
        let facet_props = self.load_file(&dir.join(FACETS_FILE)).await?;

        let mut meta = ProjectVersionMetadata {
            id: props
                .get("id")
                .cloned()
                .unwrap_or_else(|| project_version.to_string()),
            name: props.get("name").cloned(),
            description: props.get("description").cloned(),
            url: props.get("url").cloned(),
            ..Default::default()
        };

        if props.keys().any(|k| k.starts_with("scm.")) {
            meta.scm = Some(Scm {
                connection: props.get("scm.connection").cloned(),
                developer_connection: props.get("scm.developerConnection").cloned(),
                url: props.get("scm.url").cloned(),
            });
        }
        if props.keys().any(|k| k.starts_with("ci.")) {
            meta.ci = Some(CiManagement {
                system: props.get("ci.system").cloned(),
                url: props.get("ci.url").cloned(),
            });
        }
        if props.keys().any(|k| k.starts_with("issue.")) {
            meta.issue_management = Some(IssueManagement {
                system: props.get("issue.system").cloned(),
                url: props.get("issue.url").cloned(),
            });
        }

        let mut i = 0;
        while props.contains_key(&format!("license.{i}.name"))
            || props.contains_key(&format!("license.{i}.url"))
        {
            meta.licenses.push(License {
                name: props.get(&format!("license.{i}.name")).cloned(),
                url: props.get(&format!("license.{i}.url")).cloned(),
            });
            i += 1;
        }
        let mut i = 0;
        while props.keys().any(|k| k.starts_with(&format!("mailingList.{i}."))) {
            meta.mailing_lists.push(MailingList {
                name: props.get(&format!("mailingList.{i}.name")).cloned(),
                post_address: props.get(&format!("mailingList.{i}.post")).cloned(),
                archive_url: props.get(&format!("mailingList.{i}.archive")).cloned(),
            });
            i += 1;
        }
        let mut i = 0;
        while let Some(artifact_id) = props.get(&format!("dependency.{i}.artifactId")) {
            meta.dependencies.push(Dependency {
                group_id: props
                    .get(&format!("dependency.{i}.groupId"))
                    .cloned()
                    .unwrap_or_default(),
                artifact_id: artifact_id.clone(),
                version: props.get(&format!("dependency.{i}.version")).cloned(),
                classifier: props.get(&format!("dependency.{i}.classifier")).cloned(),
                dependency_type: props.get(&format!("dependency.{i}.type")).cloned(),
                scope: props.get(&format!("dependency.{i}.scope")).cloned(),
                optional: props
                    .get(&format!("dependency.{i}.optional"))
                    .map(|v| v == "true")
                    .unwrap_or(false),
            });
            i += 1;
        }

        // Facets, grouped by facet id; unknown ids are skipped with a warning
        let mut grouped: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (key, value) in facet_props {
            if let Some((facet_id, prop_key)) = key.split_once(':') {
                grouped
                    .entry(facet_id.to_string())
                    .or_default()
                    .insert(prop_key.to_string(), value);
            }
        }
        for (facet_id, props) in grouped {
            if let Some(facet) = self.registry.create(&facet_id, props) {
                meta.facets.insert(facet_id, facet);
            }
        }

        Ok(Some(meta))
    }

    async fn get_artifacts(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> Result<Vec<ArtifactMetadata>> {
        let path = self
            .version_dir(namespace, project, project_version)
            .join(VERSION_FILE);
        let props = self.load_file(&path).await?;

        let mut artifacts = Vec::new();
        for id in artifact_ids(&props) {
            let field = |name: &str| props.get(&format!("artifact:{name}:{id}")).cloned();

            let when_gathered = field("whenGathered")
                .and_then(|raw| {
                    DateTime::parse_from_rfc3339(&raw)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| {
                            tracing::warn!(artifact_id = %id, error = %e,
                                "malformed whenGathered timestamp, defaulting to epoch");
                            e
                        })
                        .ok()
                })
                .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH);

            let mut facets: BTreeMap<String, MetadataFacet> = BTreeMap::new();
            let facet_prefix = format!("artifact:facet:{id}:");
            let mut grouped: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
            for (key, value) in &props {
                if let Some(rest) = key.strip_prefix(&facet_prefix) {
                    if let Some((facet_id, prop_key)) = rest.split_once(':') {
                        grouped
                            .entry(facet_id.to_string())
                            .or_default()
                            .insert(prop_key.to_string(), value.clone());
                    }
                }
            }
            for (facet_id, facet_properties) in grouped {
                if let Some(facet) = self.registry.create(&facet_id, facet_properties) {
                    facets.insert(facet_id, facet);
                }
            }

            let version = field("version").unwrap_or_else(|| project_version.to_string());
            let size = field("size").and_then(|s| s.parse().ok()).unwrap_or(0);
            let md5 = field("md5");
            let sha1 = field("sha1");

            artifacts.push(ArtifactMetadata {
                repository_id: self.repository_id.clone(),
                namespace: namespace.to_string(),
                project: project.to_string(),
                project_version: project_version.to_string(),
                version,
                id,
                when_gathered,
                size,
                md5,
                sha1,
                facets,
            });
        }

        Ok(artifacts)
    }

    async fn remove_artifact(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact_id: &str,
    ) -> Result<()> {
        let path = self
            .version_dir(namespace, project, project_version)
            .join(VERSION_FILE);
        let mut props = self.load_file(&path).await?;
        strip_artifact_keys(&mut props, artifact_id);
        self.put_file(path, props).await;
        Ok(())
    }

    async fn remove_artifacts_with_version(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact_version: &str,
    ) -> Result<()> {
        let path = self
            .version_dir(namespace, project, project_version)
            .join(VERSION_FILE);
        let mut props = self.load_file(&path).await?;

        let doomed: Vec<String> = artifact_ids(&props)
            .into_iter()
            .filter(|id| {
                props.get(&format!("artifact:version:{id}")).map(String::as_str)
                    == Some(artifact_version)
            })
            .collect();
        for id in doomed {
            strip_artifact_keys(&mut props, &id);
        }

        self.put_file(path, props).await;
        Ok(())
    }

    async fn remove_artifact_matching_facets(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
        artifact: &ArtifactMetadata,
    ) -> Result<()> {
        let candidates = self
            .get_artifacts(namespace, project, project_version)
            .await?;

        let path = self
            .version_dir(namespace, project, project_version)
            .join(VERSION_FILE);
        let mut props = self.load_file(&path).await?;
        for candidate in candidates {
            if candidate.version == artifact.version
                && candidate.classifier() == artifact.classifier()
            {
                strip_artifact_keys(&mut props, &candidate.id);
            }
        }
        self.put_file(path, props).await;
        Ok(())
    }

    async fn remove_project_version(
        &self,
        namespace: &str,
        project: &str,
        project_version: &str,
    ) -> Result<()> {
        let dir = self.version_dir(namespace, project, project_version);
        let mut overlay = self.overlay.lock().await;
        overlay.files.retain(|path, _| !path.starts_with(&dir));
        overlay.removed_dirs.insert(dir);
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        let (files, removed_dirs) = {
            let mut overlay = self.overlay.lock().await;
            (
                std::mem::take(&mut overlay.files),
                std::mem::take(&mut overlay.removed_dirs),
            )
        };

        for dir in &removed_dirs {
            match fs::remove_dir_all(dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        for (path, props) in files {
            properties::store(&path, &props).await?;
        }

        Ok(())
    }
}

fn write_opt(props: &mut BTreeMap<String, String>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        props.insert(key.to_string(), value.to_string());
    }
}

/// Distinct artifact ids present in a version bucket's properties.
fn artifact_ids(props: &BTreeMap<String, String>) -> Vec<String> {
    props
        .keys()
        .filter_map(|key| key.strip_prefix("artifact:version:"))
        .map(str::to_string)
        .collect()
}

/// Strip all `artifact:*:<id>` keys for one artifact id.
fn strip_artifact_keys(props: &mut BTreeMap<String, String>, artifact_id: &str) {
    let facet_prefix = format!("artifact:facet:{artifact_id}:");
    props.retain(|key, _| {
        if key.starts_with(&facet_prefix) {
            return false;
        }
        match key.strip_prefix("artifact:") {
            Some(rest) => rest
                .split_once(':')
                .map(|(_, id)| id != artifact_id)
                .unwrap_or(true),
            None => true,
        }
    });
}
