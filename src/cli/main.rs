use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use scorpion::config::Config;
use scorpion::metadata::Metadata;
use scorpion::pipeline::{self, Mode, ProcessResult};

#[derive(Parser, Debug)]
#[command(
    name = "scorpion",
    version,
    about = "Show or strip metadata (EXIF, XMP, IPTC, text chunks, comments) in JPEG, PNG, GIF and BMP files"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Write a cleaned copy of each image instead of showing its metadata
    #[arg(short = 'x', long)]
    clear: bool,

    /// Path to config file (default: scorpion.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default scorpion.json and exit
    #[arg(long)]
    init: bool,

    /// Report what would be cleaned without writing files
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }

    let mut images = pipeline::collect_images(&cli.paths);
    if cli.clear {
        images = pipeline::skip_clear_outputs(images);
    }
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }
    log::info!("Found {} image(s) to process", images.len());

    let mode = if cli.clear { Mode::Clear } else { Mode::Inspect };
    let results = pipeline::process_batch(&images, mode, &config);

    if cli.json {
        let json: Vec<serde_json::Value> = results.iter().map(to_json).collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for result in &results {
            print_result(result, &config);
        }
    }

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    log::info!(
        "Done: {} succeeded, {failed} failed out of {} images",
        results.len() - failed,
        results.len()
    );
    Ok(())
}

fn print_result(result: &ProcessResult, config: &Config) {
    println!();
    println!("File: {}", result.path.display());
    if let Some(err) = &result.error {
        println!("  error: {err}");
        return;
    }
    if let Some(meta) = &result.metadata {
        print_metadata(meta, config);
    }
    if let Some(c) = &result.cleared {
        let verb = if c.written { "written" } else { "would be written" };
        println!("  {} cleaned copy {verb}: {}", c.format, c.output_path.display());
        println!(
            "  size: {} -> {} bytes, {} bytes of metadata removed",
            c.original_size, c.cleaned_size, c.removed
        );
    }
}

fn print_metadata(meta: &Metadata, config: &Config) {
    println!("  {}", meta.summary());
    if meta.tags.is_empty() {
        println!("  (no metadata found)");
    }
    for (name, value) in meta.tags.iter() {
        println!("  [{name}]: {}", truncate(&value.to_string(), config.display.max_value_len));
    }
    if let Some(gps) = meta.gps() {
        println!("  [GPS]: {gps}");
        if config.display.show_map_link {
            println!("  [Map]: {}", gps.map_link());
        }
    }
}

/// Cut `s` to at most `max` characters, marking the cut with "...".
fn truncate(s: &str, max: usize) -> String {
    if max == 0 || s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn to_json(r: &ProcessResult) -> serde_json::Value {
    let metadata = r.metadata.as_ref().map(|m| {
        let tags: serde_json::Map<String, serde_json::Value> = m
            .tags
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        serde_json::json!({
            "format": m.format.name(),
            "dimensions": m.dimensions.map(|d| d.to_string()),
            "truncated": m.truncated,
            "tags": tags,
            "gps": m.gps().map(|g| serde_json::json!({
                "latitude": g.latitude,
                "longitude": g.longitude,
                "map_link": g.map_link(),
            })),
        })
    });
    let cleared = r.cleared.as_ref().map(|c| {
        serde_json::json!({
            "output_path": c.output_path.display().to_string(),
            "original_size": c.original_size,
            "cleaned_size": c.cleaned_size,
            "removed": c.removed,
            "written": c.written,
        })
    });
    serde_json::json!({
        "path": r.path.display().to_string(),
        "metadata": metadata,
        "cleared": cleared,
        "error": r.error,
    })
}
