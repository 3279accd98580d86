//! pagesweep main entry point
//!
//! This is the command-line interface for the pagesweep listing crawler.

use anyhow::{bail, Context};
use clap::Parser;
use pagesweep::config::{load_config_with_hash, Config, TargetConfig};
use pagesweep::crawler::{plan, Engine, ListingExtractor};
use pagesweep::output::{export_url_list, format_statistics, print_statistics, write_url_list};
use pagesweep::{PaginationMode, RunHealth};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// pagesweep: paginated listing crawler
///
/// pagesweep walks the listing pages of each configured target, collects
/// the item URLs they link to, and prints the deduplicated list in the
/// order the items were discovered. Results are cached per target.
#[derive(Parser, Debug)]
#[command(name = "pagesweep")]
#[command(version)]
#[command(about = "Collects item URLs from paginated listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Only run the named target (repeatable); all targets by default
    #[arg(short, long = "target", value_name = "NAME")]
    targets: Vec<String>,

    /// Ignore cached results and crawl again
    #[arg(long)]
    fresh: bool,

    /// Validate config and show the listing pages that would be crawled
    #[arg(long, conflicts_with_all = ["fresh", "clear_cache"])]
    dry_run: bool,

    /// Remove every cached result and exit
    #[arg(long, conflicts_with = "fresh")]
    clear_cache: bool,

    /// Write the URLs to this file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", &hash[..12]);

    let targets = select_targets(&config, &cli.targets)?;

    if cli.dry_run {
        handle_dry_run(&config, &targets)
    } else if cli.clear_cache {
        handle_clear_cache(&config)
    } else {
        handle_sweep(&config, &targets, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagesweep=info,warn"),
            1 => EnvFilter::new("pagesweep=debug,info"),
            2 => EnvFilter::new("pagesweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout carries only the URL list
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Resolves `--target` names, keeping configuration order
fn select_targets<'a>(config: &'a Config, names: &[String]) -> anyhow::Result<Vec<&'a TargetConfig>> {
    if names.is_empty() {
        return Ok(config.targets.iter().collect());
    }

    for name in names {
        if config.target(name).is_none() {
            bail!("Unknown target '{}'", name);
        }
    }

    Ok(config
        .targets
        .iter()
        .filter(|t| names.contains(&t.name))
        .collect())
}

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &Config, targets: &[&TargetConfig]) -> anyhow::Result<()> {
    println!("=== pagesweep Dry Run ===\n");

    println!("Scheduler:");
    println!("  Batch size: {}", config.scheduler.batch_size);
    println!("  Batch delay: {}ms", config.scheduler.batch_delay_ms);
    println!("  Max attempts: {}", config.scheduler.max_attempts);
    println!("  Drain in-flight on cancel: {}", config.scheduler.drain_in_flight);

    println!("\nCache:");
    println!("  TTL: {}s", config.cache.ttl_secs);
    match &config.cache.database_path {
        Some(path) => println!("  Database: {}", path),
        None => println!("  Database: (in memory)"),
    }

    println!("\nTargets ({}):", targets.len());
    for target_config in targets {
        let target = target_config.to_target(&config.probe);
        println!("  - {} ({})", target.name, target.mode);

        if target.mode == PaginationMode::AutoDetect {
            println!(
                "    * {} (probing from page {}, at most {} pages)",
                target.template.as_deref().unwrap_or_default(),
                target.start_page,
                target.max_check_pages
            );
            continue;
        }

        for url in plan(&target, None)? {
            println!("    * {}", url);
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --clear-cache mode
fn handle_clear_cache(config: &Config) -> anyhow::Result<()> {
    let engine = Engine::from_config(config)?;
    let removed = engine.cache().clear()?;
    println!("✓ Removed {} cached results", removed);
    Ok(())
}

/// Runs every selected target and writes the URL lists
async fn handle_sweep(config: &Config, targets: &[&TargetConfig], cli: &Cli) -> anyhow::Result<()> {
    let engine = Engine::from_config(config)?;

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            ctrl_c.cancel();
        }
    });

    let mut results = Vec::new();
    let mut failed_targets = Vec::new();

    for target_config in targets {
        if token.is_cancelled() {
            tracing::warn!("Skipping '{}': run cancelled", target_config.name);
            continue;
        }

        let target = target_config.to_target(&config.probe);
        let extractor: Arc<dyn ListingExtractor> = Arc::new(target_config.extractor.build()?);

        let outcome = engine
            .sweep(&target, extractor, cli.fresh, &token)
            .await
            .with_context(|| format!("Target '{}' was rejected", target.name))?;

        if cli.output.is_some() {
            print_statistics(&target.name, &outcome.result, outcome.from_cache);
        } else if !cli.quiet {
            eprint!("{}", format_statistics(&target.name, &outcome.result, outcome.from_cache));
        }

        if matches!(outcome.result.health(), RunHealth::Failed { .. }) {
            failed_targets.push(target.name.clone());
        }
        results.push(outcome.result);
    }

    match &cli.output {
        Some(path) => {
            export_url_list(&results, path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ URLs written to: {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            for result in &results {
                write_url_list(result, &mut handle)?;
            }
        }
    }

    if !failed_targets.is_empty() {
        bail!("Every listing page failed for: {}", failed_targets.join(", "));
    }

    Ok(())
}
