mod cli;
mod config;
mod output;

use anyhow::{Context, Result};
use catsync::{AttributeDiff, MemoryCatalog, ResourceDraft, SyncEngine, SyncOptions};
use clap::Parser;
use cli::Cli;
use colored::Colorize;
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use output::SyncEvent;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    let config = Config::load()?;

    if cli.list_profiles {
        let profiles = config.list_profiles();
        if profiles.is_empty() {
            println!("No profiles configured");
            println!("\nCreate profiles in: {}", Config::config_path()?.display());
        } else {
            println!("Available profiles:");
            for name in profiles {
                println!("  {}", name);
            }
        }
        return Ok(());
    }

    if let Some(ref profile_name) = cli.show_profile {
        match config.show_profile(profile_name) {
            Some(output) => {
                println!("{}", output);
                return Ok(());
            }
            None => anyhow::bail!("Profile '{}' not found", profile_name),
        }
    }

    // Profile settings fill in whatever the command line left unset
    let profile = match cli.profile {
        Some(ref name) => config
            .get_profile(name)
            .ok_or_else(|| anyhow::anyhow!("Profile '{}' not found", name))?,
        None => config.defaults.clone(),
    };
    merge_profile(&mut cli, profile);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().as_str()));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    cli.validate()?;

    let (Some(drafts_path), Some(catalog_path)) = (cli.drafts.clone(), cli.catalog.clone()) else {
        anyhow::bail!("Drafts and catalog are required (or use --profile)");
    };

    let drafts = read_drafts(&drafts_path).await?;
    let total = drafts.len();

    if cli.json {
        SyncEvent::Start {
            drafts: drafts_path.clone(),
            catalog: catalog_path.clone(),
            total_drafts: total,
        }
        .emit();
    } else if !cli.quiet {
        println!("catsync v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "Syncing {} draft(s) from {} → {}\n",
            total,
            drafts_path.display(),
            catalog_path.display()
        );
    }

    let mut catalog = MemoryCatalog::open(&catalog_path).await?;
    for field in &cli.unique_fields {
        catalog = catalog.with_unique_field(field.clone());
    }
    if cli.check_references {
        catalog = catalog.with_reference_checks();
    }
    let catalog = Arc::new(catalog);

    let pb = if cli.quiet || cli.json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb
    };

    let options = build_options(&cli, &pb);
    let engine = SyncEngine::new(catalog.clone(), Arc::new(AttributeDiff), options);

    let chunk = chunk_size(cli.chunk, total);
    let mut remaining = drafts.into_iter().peekable();
    let mut stats = engine.statistics().clone();
    while remaining.peek().is_some() {
        let batch: Vec<Option<ResourceDraft>> = remaining.by_ref().take(chunk).collect();
        let size = batch.len() as u64;
        pb.set_message(format!("{} draft(s)", size));
        stats = engine.sync(batch).await;
        pb.inc(size);
    }
    pb.finish_and_clear();

    catalog
        .save(&catalog_path)
        .await
        .with_context(|| format!("Failed to save catalog {}", catalog_path.display()))?;

    if cli.json {
        SyncEvent::summary(&stats).emit();
    } else if !cli.quiet {
        if stats.failed() == 0 {
            println!("{}\n", "✓ Sync complete".green().bold());
        } else {
            println!("{}\n", "✗ Sync finished with failures".red().bold());
        }

        println!("  Processed:   {}", stats.processed().to_string().blue());
        print_count("Created:", stats.created(), |s| s.green());
        print_count("Updated:", stats.updated(), |s| s.yellow());
        println!("  Unchanged:   {}", stats.unchanged().to_string().bright_black());
        print_count("Failed:", stats.failed(), |s| s.red());

        let cache = engine.resolver().cache().stats();
        println!(
            "  Cache:       {} entries, {} hits, {} misses",
            cache.entry_count, cache.hits, cache.misses
        );
        println!(
            "  Duration:    {}",
            format_duration(stats.processing_time()).cyan()
        );
        println!("\n{}", stats.report());
    }

    if stats.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn merge_profile(cli: &mut Cli, profile: config::Profile) {
    if cli.drafts.is_none() {
        cli.drafts = profile.drafts;
    }
    if cli.catalog.is_none() {
        cli.catalog = profile.catalog;
    }
    if cli.batch_size.is_none() {
        cli.batch_size = profile.batch_size;
    }
    if cli.cache_size.is_none() {
        cli.cache_size = profile.cache_size;
    }
    if cli.max_conflict_retries.is_none() {
        cli.max_conflict_retries = profile.max_conflict_retries;
    }
    if cli.chunk.is_none() {
        cli.chunk = profile.chunk;
    }
    if cli.unique_fields.is_empty() {
        cli.unique_fields = profile.unique_fields.unwrap_or_default();
    }
    if !cli.check_references {
        cli.check_references = profile.check_references.unwrap_or(false);
    }
    if cli.resource_label.is_none() {
        cli.resource_label = profile.resource_label;
    }
    if cli.verbose == 0 {
        cli.verbose = profile.verbose.unwrap_or(0);
    }
    if !cli.quiet {
        cli.quiet = profile.quiet.unwrap_or(false);
    }
}

/// Drafts per sync call; unset or zero means the whole input in one call
fn chunk_size(chunk: Option<usize>, total: usize) -> usize {
    match chunk {
        Some(chunk) if chunk > 0 => chunk,
        _ => total.max(1),
    }
}

fn build_options(cli: &Cli, pb: &ProgressBar) -> SyncOptions {
    let mut builder = SyncOptions::builder();
    if let Some(batch_size) = cli.batch_size {
        builder = builder.batch_size(batch_size);
    }
    if let Some(cache_size) = cli.cache_size {
        builder = builder.cache_size(cache_size);
    }
    if let Some(retries) = cli.max_conflict_retries {
        builder = builder.max_conflict_retries(retries);
    }
    if let Some(ref label) = cli.resource_label {
        builder = builder.resource_label(label.clone());
    }

    if cli.json {
        builder
            .error_callback(|message, _| {
                SyncEvent::Error {
                    message: message.to_string(),
                }
                .emit()
            })
            .warning_callback(|message| {
                SyncEvent::Warning {
                    message: message.to_string(),
                }
                .emit()
            })
            .build()
    } else {
        let errors = pb.clone();
        let warnings = pb.clone();
        builder
            .error_callback(move |message, _| {
                errors.suspend(|| eprintln!("{} {}", "error:".red().bold(), message))
            })
            .warning_callback(move |message| {
                warnings.suspend(|| eprintln!("{} {}", "warning:".yellow().bold(), message))
            })
            .build()
    }
}

async fn read_drafts(path: &Path) -> Result<Vec<Option<ResourceDraft>>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read drafts {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse drafts {}", path.display()))
}

fn print_count(label: &str, count: usize, paint: fn(String) -> colored::ColoredString) {
    let value = if count > 0 {
        paint(count.to_string())
    } else {
        count.to_string().bright_black()
    };
    println!("  {:<12} {}", label, value);
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("catsync").chain(args.iter().copied())).unwrap()
    }

    fn chunked_profile() -> config::Profile {
        config::Profile {
            chunk: Some(500),
            batch_size: Some(20),
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_zero_chunk_overrides_profile() {
        let mut cli = parse(&["a", "b", "--chunk", "0"]);
        merge_profile(&mut cli, chunked_profile());
        assert_eq!(cli.chunk, Some(0));
        assert_eq!(chunk_size(cli.chunk, 1_200), 1_200);
    }

    #[test]
    fn test_profile_fills_unset_flags() {
        let mut cli = parse(&["a", "b", "--batch-size", "5"]);
        merge_profile(&mut cli, chunked_profile());
        assert_eq!(cli.chunk, Some(500));
        assert_eq!(cli.batch_size, Some(5));
        assert_eq!(chunk_size(cli.chunk, 1_200), 500);
    }

    #[test]
    fn test_chunk_size_of_empty_input() {
        assert_eq!(chunk_size(None, 0), 1);
        assert_eq!(chunk_size(Some(0), 0), 1);
        assert_eq!(chunk_size(Some(3), 0), 3);
    }
}
