//! Artifact Sweeper - Library
//!
//! Snapshot purge and metadata maintenance for managed Maven repositories.

pub mod config;
pub mod error;
pub mod maven;
pub mod metadata;
pub mod services;
pub mod telemetry;

pub use config::ManagedRepositoryConfig;
pub use error::{Result, SweeperError};
