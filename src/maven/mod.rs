//! Maven repository layout and version model.

pub mod artifact;
pub mod metadata_xml;
pub mod version;

pub use artifact::{ArtifactReference, VersionedReference};
