//! Business logic services.

pub mod audit_log;
pub mod cleanup_released_purge;
pub mod days_old_purge;
pub mod listener;
pub mod purge_consumer;
pub mod purge_executor;
pub mod repository_purge;
pub mod retention_count_purge;
