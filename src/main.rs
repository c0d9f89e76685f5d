use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info};

use catalog_sync::config::PipelineConfig;
use catalog_sync::pipeline::{convert_prices_in_file, Pipeline, PipelineResult};
use catalog_sync::{infra, interrupt, logging, CatalogError};

#[derive(Parser)]
#[command(name = "catalog-sync")]
#[command(about = "Merge, price and translate regional marketplace catalog exports")]
#[command(version)]
struct Cli {
    /// Pipeline configuration file
    #[arg(long, short, global = true, default_value = "catalog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge, convert prices, translate and write the output table
    Run {
        /// Attempt again values whose translation failed in an earlier run
        #[arg(long)]
        retry_failed: bool,
    },
    /// Merge the sources by key without prices or translations
    Merge {
        /// Defaults to the configured output path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Convert the price column of an existing table
    Price {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Run the translation jobs over an existing table
    Translate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        retry_failed: bool,
    },
}

fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handle = flag.clone();
    tokio::spawn(async move {
        if interrupt::watch_interrupts(tokio::signal::ctrl_c, handle).await {
            eprintln!("Aborted; progress since the last checkpoint is lost");
            std::process::exit(130);
        }
    });
    flag
}

fn print_summary(result: &PipelineResult) {
    println!("\n📊 Run {}", result.run_id);
    for (source, rows) in &result.rows_read {
        println!("   Rows read from {}: {}", source, rows);
    }
    if result.rows_removed_for_codes() > 0 {
        println!("   Rows removed for missing/duplicate codes: {}", result.rows_removed_for_codes());
    }
    if let Some(reconcile) = &result.reconcile {
        println!("   Unique keys: {}", reconcile.rows_out);
        println!("   Empty keys dropped: {}", reconcile.empty_keys_dropped);
        println!("   Duplicates collapsed: {}", reconcile.total_duplicates());
        println!("   Shadowed by precedence: {}", reconcile.shadowed_by_precedence);
    }
    if !result.prices.is_empty() {
        println!(
            "   Prices converted: {} ({} unrecognized or unparseable)",
            result.prices_converted(),
            result.prices_unconverted()
        );
    }
    for job in &result.translation {
        let reused: usize = job.namespaces.values().map(|r| r.already_cached).sum();
        println!(
            "   Translations for '{}': {} ok, {} failed, {} reused from cache, {} unrouted rows",
            job.field,
            job.translated(),
            job.failed(),
            reused,
            job.unrouted_rows
        );
    }
    if result.output.incomplete_removed > 0 {
        println!("   Incomplete rows removed: {}", result.output.incomplete_removed);
    }
    println!("   Rows written: {}", result.rows_written);
    println!("   Output file: {}", result.output_file.display());
}

async fn execute(cli: Cli, config: PipelineConfig) -> catalog_sync::Result<()> {
    match cli.command {
        Commands::Run { retry_failed } => {
            println!("🚀 Running full pipeline...");
            let pipeline = Pipeline::new(config)
                .with_retry_failed(retry_failed)
                .with_interrupt(interrupt_flag());
            let result = pipeline.run().await?;
            print_summary(&result);
        }
        Commands::Merge { output } => {
            println!("🔀 Merging sources...");
            let output = output.unwrap_or_else(|| config.output.path.clone());
            let result = Pipeline::new(config).run_merge(&output)?;
            print_summary(&result);
        }
        Commands::Price { input, output } => {
            println!("💱 Converting prices...");
            let report = convert_prices_in_file(&config, &input, &output)?;
            println!("   Prices converted: {}/{}", report.converted, report.rows);
            println!("   Empty: {}", report.empty);
            println!("   Unknown currency marker: {}", report.unknown_marker);
            println!("   Unparseable amount: {}", report.unparseable);
            println!("   Output file: {}", output.display());
        }
        Commands::Translate {
            input,
            output,
            retry_failed,
        } => {
            println!("🌐 Translating...");
            let translator = infra::build_translator(&config.translation.backend)?;
            let store = infra::build_cache_store(&config.translation.cache)?;
            let pipeline = Pipeline::new(config)
                .with_retry_failed(retry_failed)
                .with_interrupt(interrupt_flag());
            let result = pipeline.run_translate(translator, store, &input, &output).await?;
            print_summary(&result);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PipelineConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let _log_guard = logging::init_logging(&config.log_dir);
    catalog_sync::metrics::describe_metrics();
    info!(config = %cli.config.display(), "catalog-sync starting");

    match execute(cli, config).await {
        Ok(()) => {
            println!("✅ Done");
            Ok(())
        }
        Err(CatalogError::Interrupted) => {
            println!("⏸️  Interrupted; translation progress is saved, rerun to resume");
            drop(_log_guard);
            std::process::exit(130);
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Err(e).context("catalog-sync failed")
        }
    }
}
