//! Artifact Sweeper - Main Entry Point

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};

use artifact_sweeper::config::ManagedRepositoryConfig;
use artifact_sweeper::error::Result;
use artifact_sweeper::metadata::{FacetRegistry, FileMetadataRepository};
use artifact_sweeper::services::purge_consumer::RepositoryPurgeConsumer;
use artifact_sweeper::telemetry;

/// Snapshot purge for managed Maven repositories
#[derive(Parser, Debug)]
#[command(name = "artifact-sweeper")]
#[command(about = "Purge old snapshot artifacts and keep repository metadata consistent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format (json, text)
    #[arg(long, default_value = "text", global = true)]
    format: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a purge scan over a managed repository
    Purge {
        /// Managed repository root directory
        #[arg(long, env = "REPOSITORY_ROOT")]
        repository_root: PathBuf,

        /// Managed repository identifier
        #[arg(long, env = "REPOSITORY_ID", default_value = "internal")]
        repository_id: String,

        /// Minimum number of most-recent snapshot versions to retain
        #[arg(long, default_value_t = 2)]
        retention_count: u16,

        /// Purge snapshots older than this many days (0 selects
        /// retention-count purge instead)
        #[arg(long, default_value_t = 0)]
        days_older: i64,

        /// Remove snapshots that have a released counterpart
        #[arg(long)]
        delete_released_snapshots: bool,

        /// Additional release repository roots scanned for released versions
        #[arg(long)]
        release_root: Vec<PathBuf>,

        /// Report what would be purged without deleting anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    telemetry::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Purge {
            repository_root,
            repository_id,
            retention_count,
            days_older,
            delete_released_snapshots,
            release_root,
            dry_run,
        } => {
            let mut repo = ManagedRepositoryConfig::new(&repository_id, &repository_root);
            repo.retention_count = retention_count;
            repo.days_older = days_older;
            repo.delete_released_snapshots = delete_released_snapshots;

            let release_repos: Vec<ManagedRepositoryConfig> = release_root
                .iter()
                .enumerate()
                .map(|(i, root)| ManagedRepositoryConfig::new(format!("release-{i}"), root))
                .collect();

            let registry = Arc::new(FacetRegistry::new());
            let metadata = Arc::new(FileMetadataRepository::new(
                &repository_id,
                &repository_root,
                registry,
            ));

            tracing::info!(repository = %repository_id, root = %repository_root.display(),
                dry_run, "starting artifact sweeper");

            let mut consumer =
                RepositoryPurgeConsumer::new(repo, metadata, release_repos, Vec::new(), dry_run);
            let report = consumer.scan_repository(Utc::now()).await?;

            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&report)?),
                _ => {
                    println!(
                        "repository {}: {} files processed, {} removed, {} skipped, {} errors{}",
                        report.repository_id,
                        report.files_processed,
                        report.removed.len(),
                        report.skipped.len(),
                        report.errors,
                        if report.dry_run { " (dry run)" } else { "" }
                    );
                    for path in &report.removed {
                        println!("  removed {path}");
                    }
                    for skipped in &report.skipped {
                        println!("  skipped {} ({})", skipped.path, skipped.reason);
                    }
                }
            }
        }
    }

    Ok(())
}
