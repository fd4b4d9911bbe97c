//! Command-line interface for the archiver.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use archivista_core::archiver::{Archiver, RunSummary};
use archivista_core::cache::{default_base_dir, CatalogStore, FsCatalogStore};
use archivista_core::config::{load_config, load_config_from_env, validate_config, Config};
use archivista_core::scanner::ScanOutcome;
use archivista_core::source::{CatalogSource, SocrataSource};
use archivista_core::transfer::{S3Store, S3StoreOptions, TransferPipeline};

#[derive(Parser)]
#[command(name = "archivista", version, about = "Archive datasets from a Socrata catalog into S3")]
struct Cli {
    /// Path to the config file. Falls back to environment-only
    /// configuration when the file does not exist.
    #[arg(long, global = true, default_value = "archivista.toml")]
    config: PathBuf,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override values from the config file and environment.
#[derive(Args)]
struct Overrides {
    /// Catalog domain, e.g. data.cityofchicago.org.
    #[arg(long, global = true)]
    catalog: Option<String>,

    /// Destination bucket.
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Content format to archive (csv, json, ...).
    #[arg(long, global = true)]
    format: Option<String>,

    /// Key prefix under which archives are stored.
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// AWS credential profile name.
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Maximum items processed in parallel.
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Per-item deadline in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Store content uncompressed.
    #[arg(long, global = true)]
    no_compress: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Discover the remote catalog and merge it into the local snapshot.
    Update,
    /// Probe every item's metadata and flag changed ones.
    ScanHeaders,
    /// Transfer content for every flagged item.
    ScanData,
    /// Update the catalog, scan headers, then transfer changed content.
    Run,
    /// Print the catalog's sync state as JSON.
    Status,
    /// Remove the cached catalog.
    ClearCache,
}

fn apply_overrides(config: &mut Config, overrides: &Overrides) {
    if let Some(catalog) = &overrides.catalog {
        config.source.catalog_id = catalog.clone();
    }
    if let Some(format) = &overrides.format {
        config.source.format = format.clone();
    }
    if let Some(bucket) = &overrides.bucket {
        config.storage.bucket = bucket.clone();
    }
    if let Some(prefix) = &overrides.prefix {
        config.storage.key_prefix = prefix.clone();
    }
    if let Some(profile) = &overrides.profile {
        config.storage.credential_profile = Some(profile.clone());
    }
    if let Some(concurrency) = overrides.concurrency {
        config.archiver.concurrency_limit = concurrency;
    }
    if let Some(timeout_ms) = overrides.timeout_ms {
        config.archiver.timeout_ms = timeout_ms;
    }
    if overrides.no_compress {
        config.archiver.compress = false;
    }
}

fn report(label: &str, outcome: &ScanOutcome) -> bool {
    info!(
        succeeded = outcome.succeeded,
        failed = outcome.failures.len(),
        "{label} finished"
    );
    for failure in &outcome.failures {
        error!(item = %failure.item_id, error = %failure.error, "{label} item failed");
    }
    outcome.all_succeeded()
}

fn report_run(summary: &RunSummary) -> bool {
    info!(items = summary.discovered, "catalog updated");
    let headers_ok = report("header scan", &summary.header_scan);
    let data_ok = report("data scan", &summary.data_scan);
    headers_ok && data_ok
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        load_config_from_env()?
    };
    apply_overrides(&mut config, &cli.overrides);
    validate_config(&config)?;

    let base_dir = config.cache.path.clone().unwrap_or_else(default_base_dir);
    let cache = Arc::new(FsCatalogStore::open(base_dir, &config.source.catalog_id));
    let source = Arc::new(SocrataSource::new(
        &config.source.catalog_id,
        &config.source.format,
        config.source.page_size,
    ));
    let store = S3Store::new(S3StoreOptions {
        bucket: config.storage.bucket.clone(),
        region: config.storage.region.clone(),
        credential_profile: config.storage.credential_profile.clone(),
        access_policy: config.storage.access_policy,
        create_bucket: config.storage.create_bucket_on_start,
    })
    .await;
    let pipeline = TransferPipeline::new(
        store,
        &config.source.catalog_id,
        &config.storage.key_prefix,
    );

    let archiver = Archiver::open(
        config.archiver.clone(),
        &config.source.format,
        source as Arc<dyn CatalogSource>,
        cache as Arc<dyn CatalogStore>,
        pipeline,
    )
    .await?;

    match cli.command {
        Command::Update => {
            let items = archiver.update_catalog().await?;
            info!(items, "catalog updated");
            Ok(ExitCode::SUCCESS)
        }
        Command::ScanHeaders => {
            let outcome = archiver.scan_headers().await?;
            Ok(exit_code(report("header scan", &outcome)))
        }
        Command::ScanData => {
            let outcome = archiver.scan_data().await?;
            Ok(exit_code(report("data scan", &outcome)))
        }
        Command::Run => {
            let summary = archiver.run().await?;
            Ok(exit_code(report_run(&summary)))
        }
        Command::Status => {
            let status = archiver.status().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("serializing status")?
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::ClearCache => {
            archiver.clear_cache().await?;
            info!("cache cleared");
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
