use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use runlift_api::{FetchOutcome, HttpTestService, TestService};
use runlift_client::{Client, mask_token};
use runlift_config::Config;
use runlift_mapping::{CaseMapping, MapMode};
use runlift_pipeline::{Coordinator, MigrationReport, PipelineOptions, group_by_run};

/// runlift - migrate historical test runs between workspaces
#[derive(Parser)]
#[command(name = "runlift")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the migration pipeline (configuration comes from RUNLIFT_* env vars)
  Migrate {
    /// Perform writes even when RUNLIFT_DRY_RUN says otherwise
    #[arg(long)]
    execute: bool,

    /// Where to write the case-mapping artifact
    #[arg(long, default_value = "case_map.out.csv")]
    mapping_out: PathBuf,

    /// Where to write the migration report
    #[arg(long, default_value = "migration_report.json")]
    report_out: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Migrate {
      execute,
      mapping_out,
      report_out,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { migrate(execute, mapping_out, report_out).await })
    }
    None => {
      println!("runlift - use --help to see available commands");
      Ok(())
    }
  }
}

async fn migrate(execute: bool, mapping_out: PathBuf, report_out: PathBuf) -> Result<()> {
  let mut config = Config::from_env().context("failed to load configuration")?;
  if execute {
    config.dry_run = false;
  }

  eprintln!(
    "Migrating {} -> {} (results after {}, mode {:?}, dry run: {})",
    config.source.project,
    config.target.project,
    config.after.format("%Y-%m-%d %H:%M:%S"),
    config.map_mode,
    config.dry_run,
  );
  eprintln!(
    "Source token: {}, target token: {}",
    mask_token(&config.source.token),
    mask_token(&config.target.token)
  );

  let source = HttpTestService::new(
    Client::new(&config.source.base_url, &config.source.token)
      .context("failed to create source client")?,
  );
  let target = HttpTestService::new(
    Client::new(&config.target.base_url, &config.target.token)
      .context("failed to create target client")?,
  );

  let cancel = CancellationToken::new();
  let signal_cancel = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      eprintln!("Interrupt received, cancelling in-flight work");
      signal_cancel.cancel();
    }
  });

  // Build the case mapping before touching any results
  let (mapping, cases_truncated) =
    build_mapping(&config, &source, &target, &cancel).await?;
  eprintln!("Built case mapping with {} entries", mapping.len());

  if let Err(err) = mapping.write_artifact(&mapping_out) {
    eprintln!(
      "Warning: failed to write mapping artifact to {}: {}",
      mapping_out.display(),
      err
    );
  } else {
    eprintln!("Mapping artifact written to {}", mapping_out.display());
  }

  let results = source
    .results_completed_after(&config.source.project, config.after, &cancel)
    .await
    .context("failed to fetch source results")?;
  eprintln!(
    "Fetched {} results in {} pages{}",
    results.items.len(),
    results.pages,
    if results.truncated {
      " (TRUNCATED at the page ceiling)"
    } else {
      ""
    }
  );

  let source_truncated = results.truncated || cases_truncated;
  let groups = group_by_run(results.items);
  eprintln!("Grouped results into {} runs", groups.len());

  let options = PipelineOptions {
    concurrency: config.concurrency,
    timeout: config.timeout,
    dry_run: config.dry_run,
    idempotent: config.idempotent,
    fast_mode_threshold: config.fast_mode_threshold,
    chunk_size: config.chunk_size,
    status_map: config.status_map.clone(),
  };
  let coordinator = Coordinator::new(Arc::new(target), config.target.project.as_str(), options);

  let mut report = coordinator.migrate(groups, Arc::new(mapping), cancel).await;
  report.source_truncated = source_truncated;

  let json = serde_json::to_string_pretty(&report)?;
  tokio::fs::write(&report_out, &json)
    .await
    .with_context(|| format!("failed to write report to {}", report_out.display()))?;

  print_summary(&report, &report_out);
  Ok(())
}

/// Fetch whichever case sets the selected mode needs and build the
/// mapping. Table mode reads its CSV without any case fetch.
async fn build_mapping(
  config: &Config,
  source: &HttpTestService,
  target: &HttpTestService,
  cancel: &CancellationToken,
) -> Result<(CaseMapping, bool)> {
  let (source_cases, target_cases): (FetchOutcome<_>, FetchOutcome<_>) = match &config.map_mode {
    MapMode::Identity => {
      eprintln!("Fetching source cases...");
      let cases = source
        .cases(&config.source.project, cancel)
        .await
        .context("failed to fetch source cases")?;
      (cases, empty_outcome())
    }
    MapMode::Annotation { .. } => {
      eprintln!("Fetching target cases...");
      let cases = target
        .cases(&config.target.project, cancel)
        .await
        .context("failed to fetch target cases")?;
      (empty_outcome(), cases)
    }
    MapMode::Table { .. } => (empty_outcome(), empty_outcome()),
  };

  let truncated = source_cases.truncated || target_cases.truncated;
  let mapping = runlift_mapping::build(&config.map_mode, &source_cases.items, &target_cases.items)
    .context("failed to build case mapping")?;
  Ok((mapping, truncated))
}

fn empty_outcome<T>() -> FetchOutcome<T> {
  FetchOutcome {
    items: Vec::new(),
    truncated: false,
    pages: 0,
  }
}

fn print_summary(report: &MigrationReport, report_out: &std::path::Path) {
  println!("\n=== Migration Summary ===");
  println!("Total runs with results: {}", report.total_runs);
  println!("Successful migrations:   {}", report.successful_runs);
  println!("Failed migrations:       {}", report.failed_runs);
  if report.lost_runs > 0 {
    println!("Lost to timeout:         {}", report.lost_runs);
  }
  println!("Results posted:          {}", report.total_posted);
  println!("Results skipped:         {}", report.total_skipped);
  println!("Total execution time:    {:.1}s", report.duration.as_secs_f64());
  if report.source_truncated {
    println!("WARNING: source fetch hit the page ceiling; the result set may be incomplete");
  }
  if report.dry_run {
    println!("\nDRY RUN MODE - no changes were made");
  } else {
    println!("\nMigration completed. Report written to {}", report_out.display());
  }
}
