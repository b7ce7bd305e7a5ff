//! Facet factory registry.
//!
//! Facets are reconstructed from stored properties through a registered
//! factory; property keys under an unregistered facet id are skipped with a
//! warning and never fail a load.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::metadata::model::{MetadataFacet, MAVEN_ARTIFACT_FACET};

/// Creates facet instances from stored property maps.
pub trait MetadataFacetFactory: Send + Sync {
    fn facet_id(&self) -> &str;

    fn create(&self, properties: BTreeMap<String, String>) -> MetadataFacet {
        MetadataFacet {
            facet_id: self.facet_id().to_string(),
            properties,
        }
    }
}

/// Facet carrying Maven classifier/type information for an artifact.
pub struct MavenArtifactFacetFactory;

impl MetadataFacetFactory for MavenArtifactFacetFactory {
    fn facet_id(&self) -> &str {
        MAVEN_ARTIFACT_FACET
    }
}

/// Registry of known facet factories.
pub struct FacetRegistry {
    factories: HashMap<String, Arc<dyn MetadataFacetFactory>>,
}

impl FacetRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(Arc::new(MavenArtifactFacetFactory));
        registry
    }

    pub fn register(&mut self, factory: Arc<dyn MetadataFacetFactory>) {
        self.factories
            .insert(factory.facet_id().to_string(), factory);
    }

    /// Reconstruct a facet; unknown ids yield `None` with a warning.
    pub fn create(
        &self,
        facet_id: &str,
        properties: BTreeMap<String, String>,
    ) -> Option<MetadataFacet> {
        match self.factories.get(facet_id) {
            Some(factory) => Some(factory.create(properties)),
            None => {
                tracing::warn!(facet_id, "skipping properties for unregistered facet");
                None
            }
        }
    }
}

impl Default for FacetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
