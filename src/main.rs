//! s3sync - Synchronize a local directory with an S3 prefix
//!
//! ```text
//! s3sync ./site s3://bucket/www --delete
//! s3sync s3://bucket/backups/db.dump ./restore/
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use humansize::{format_size, DECIMAL};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use s3sync::config::DEFAULT_PARALLEL;
use s3sync::{S3Provider, S3Store, SyncConfig, SyncError, SyncManager, SyncStatistics};

#[derive(Debug, Parser)]
#[command(name = "s3sync", version, about = "Synchronize a local directory with an S3 prefix")]
struct Cli {
    /// Source: local path or s3://bucket/prefix
    source: String,

    /// Destination: local path or s3://bucket/prefix
    dest: String,

    /// Number of files transferred in parallel
    #[arg(short, long, env = "S3SYNC_PARALLEL", default_value_t = DEFAULT_PARALLEL)]
    parallel: usize,

    /// Delete destination files that don't exist in the source
    #[arg(long)]
    delete: bool,

    /// Print what would be done without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Canned ACL for uploaded objects (e.g. public-read); the S3 backend refuses it
    #[arg(long)]
    acl: Option<String>,

    /// Content type for every uploaded object
    #[arg(long)]
    content_type: Option<String>,

    /// Don't guess the content type of uploaded files
    #[arg(long)]
    no_guess_mime: bool,

    /// Bucket region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    /// S3-compatible endpoint URL (MinIO, R2, ...)
    #[arg(long, env = "S3SYNC_ENDPOINT")]
    endpoint: Option<String>,

    /// Print statistics as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> SyncConfig {
        let mut config = SyncConfig::default()
            .with_parallel(self.parallel)
            .with_delete(self.delete)
            .with_dry_run(self.dry_run)
            .with_guess_mime(!self.no_guess_mime);
        if let Some(acl) = &self.acl {
            config = config.with_acl(acl);
        }
        if let Some(content_type) = &self.content_type {
            config = config.with_content_type(content_type);
        }
        config
    }

    fn store(&self) -> S3Store {
        let provider = match &self.endpoint {
            Some(endpoint) => S3Provider::Custom {
                name: "custom".to_string(),
                endpoint: endpoint.clone(),
            },
            None => S3Provider::Aws,
        };
        S3Store::with_default_credentials(&self.region, provider)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let manager = SyncManager::new(Arc::new(cli.store()), cli.config());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping sync");
            on_signal.cancel();
        }
    });

    let result = manager.sync_with_cancel(&cli.source, &cli.dest, cancel).await;

    print_statistics(&manager.statistics(), cli.json)?;

    match result {
        Ok(()) => Ok(()),
        Err(SyncError::Aggregate(errors)) => {
            for err in errors.errors() {
                eprintln!("error: {}", err);
            }
            anyhow::bail!("{} operation(s) failed", errors.errors().len())
        }
        Err(err) => Err(err).with_context(|| format!("failed to sync {} to {}", cli.source, cli.dest)),
    }
}

fn print_statistics(stats: &SyncStatistics, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!(
        "{} file(s) transferred ({}), {} deleted in {:.1}s ({})",
        stats.files,
        format_size(stats.bytes, DECIMAL),
        stats.deleted_files,
        stats.elapsed.as_secs_f64(),
        stats.rate_display(),
    );
    Ok(())
}
