use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;

use catalog_sync::config::{CacheKind, PipelineConfig};
use catalog_sync::infra::{self, SqliteCacheStore};
use catalog_sync::pipeline::processing::translate::CacheNamespace;

#[derive(Parser)]
#[command(name = "cache-stats")]
#[command(about = "Show success/failure counts of the persisted translation caches")]
struct Args {
    /// Pipeline configuration file
    #[arg(long, short, default_value = "catalog.toml")]
    config: PathBuf,

    /// Drop failed entries so the next run attempts them again
    #[arg(long)]
    discard_failures: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = PipelineConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let t = &config.translation;
    let store = infra::build_cache_store(&t.cache)?;

    let languages: BTreeSet<&str> = match (config.columns.provenance_column(), &t.default_source_lang) {
        (None, Some(lang)) => [lang.as_str()].into_iter().collect(),
        _ => t.locales.values().map(String::as_str).collect(),
    };

    println!("📦 Translation cache at {}", t.cache.path.display());
    let mut total_ok = 0;
    let mut total_failed = 0;
    for job in &t.jobs {
        for lang in &languages {
            let namespace = CacheNamespace::new(&job.field, *lang, &t.target_lang);
            let mut cache = store
                .load(&namespace)
                .with_context(|| format!("loading cache for {namespace}"))?;
            let (ok, failed) = (cache.succeeded(), cache.failed());
            total_ok += ok;
            total_failed += failed;
            println!("   {:<40} {:>7} ok {:>7} failed", namespace.to_string(), ok, failed);

            if args.discard_failures && failed > 0 {
                cache.discard_failures();
                store.save(&namespace, &cache)?;
                println!("   {:<40} discarded {} failed entries", "", failed);
            }
        }
    }
    println!("   {:<40} {:>7} ok {:>7} failed", "total", total_ok, total_failed);

    // The database may hold namespaces from languages no longer configured
    if t.cache.kind == CacheKind::Sqlite {
        let db = SqliteCacheStore::open(&t.cache.path)?;
        println!("\n🗄️  All namespaces stored in the database");
        for (key, ok, failed) in db.namespace_counts()? {
            println!("   {:<40} {:>7} ok {:>7} failed", key, ok, failed);
        }
    }
    Ok(())
}
