use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::{path::PathBuf, sync::Arc};

use tagdeck::{
    Extractor, album_art_mime_type,
    config::Config,
    scan::{self, ScanResult},
};

#[derive(Parser)]
#[command(name = "tagdeck")]
#[command(version = "0.1")]
#[command(about = "Audio metadata and album art extractor")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the metadata of one audio file as JSON
    Extract {
        path: PathBuf,
        /// Catalog ID to put in the record
        #[arg(long, default_value_t = 0)]
        id: i64,
    },
    /// Extract every audio file under a directory, one JSON line per track
    Scan { root: PathBuf },
    /// Save the embedded album art of an audio file
    Art {
        path: PathBuf,
        /// Where to write the image
        #[arg(short, long)]
        out: PathBuf,
    },
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let extractor = Extractor::new(Arc::new(cfg.art_cache.build()));

    match cli.command {
        Commands::Extract { path, id } => {
            let track = extractor.extract_from_file(&path, id)?;
            println!("{}", serde_json::to_string_pretty(&track)?);
        }

        Commands::Scan { root } => {
            let paths = scan::discover(&cfg.scan, &root);
            let workers = cfg.scan.worker_count();
            info!(
                "Found {} audio files under {}, extracting with {workers} workers",
                paths.len(),
                root.display()
            );

            let results = scan::extract_all(&extractor, &paths, workers);
            let mut failed = 0;
            for ScanResult { path, result } in results {
                match result {
                    Ok(track) => println!("{}", serde_json::to_string(&track)?),
                    Err(e) => {
                        failed += 1;
                        warn!("skipping {}: {e}", path.display());
                    }
                }
            }

            let cache = extractor.cache();
            info!(
                "Extracted {} of {} files, {} distinct album art images ({} bytes)",
                paths.len() - failed,
                paths.len(),
                cache.len(),
                cache.total_bytes()
            );
        }

        Commands::Art { path, out } => {
            let track = extractor.extract_from_file(&path, 0)?;
            if !track.has_album_art {
                return Err(anyhow!("{} has no embedded album art", path.display()));
            }
            let art = extractor
                .get_album_art(&track.album_art_id)
                .ok_or_else(|| anyhow!("album art {} missing from cache", track.album_art_id))?;

            std::fs::write(&out, &art)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("{} ({})", out.display(), album_art_mime_type(&art));
        }
    }

    Ok(())
}
