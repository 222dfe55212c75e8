use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use songloader::{HeadlessHost, Item, LoftyProbe, Settings, SongLoader};

#[derive(Parser)]
#[command(name = "songloader")]
#[command(about = "Scan, cache and publish a custom song library", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to settings file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan both content roots and print a summary
    Scan {
        /// Drop previously loaded songs before scanning
        #[arg(long)]
        full: bool,
    },
    /// Scan and list songs per pack
    List,
    /// Delete a song folder
    Delete {
        /// Song folder to delete
        path: String,
    },
    /// Print the effective settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings_path = if let Some(config) = &cli.config {
        PathBuf::from(shellexpand::tilde(config).to_string())
    } else {
        Settings::default_path()
    };
    let settings = Settings::load(&settings_path).context("Failed to load settings")?;

    match cli.command {
        Commands::Scan { full } => {
            let loader = start(settings)?;
            let started = Instant::now();
            let songs = refresh(&loader, full).await?;
            let progress = loader.progress();

            println!("Scan complete!");
            println!("  Folders: {}", progress.total_folders);
            println!("  Songs: {}", songs.len());
            println!("  WIP songs: {}", songs.iter().filter(|song| song.is_wip).count());
            println!(
                "  Total length: {}",
                format_duration(songs.iter().map(|song| song.song_duration).sum())
            );
            println!("  Elapsed: {:.2?}", started.elapsed());
            loader.shutdown();
        }
        Commands::List => {
            let loader = start(settings)?;
            refresh(&loader, true).await?;
            let packs = loader.packs();
            for pack in packs.packs() {
                println!("{} ({} songs)", pack.name, pack.items().len());
                if pack.items().is_empty() {
                    continue;
                }
                println!("  {:<32} {:<8} {:<50}", "Song", "Length", "Path");
                println!("  {}", "-".repeat(92));
                for song in pack.items() {
                    println!(
                        "  {:<32} {:<8} {:<50}",
                        truncate(&song.song_name, 32),
                        format_duration(song.song_duration),
                        smart_truncate_path(&song.path.to_string_lossy(), 50)
                    );
                }
            }
            loader.shutdown();
        }
        Commands::Delete { path } => {
            let path = PathBuf::from(shellexpand::tilde(&path).to_string());
            if !path.is_dir() {
                anyhow::bail!("{} is not a song folder", path.display());
            }
            let loader = start(settings)?;
            let (tx, rx) = oneshot::channel();
            loader.delete_item(&path, move || {
                let _ = tx.send(());
            });
            rx.await.context("Song loader stopped before deletion finished")?;
            loader.shutdown();
            println!("Deleted {}", path.display());
        }
        Commands::Config => {
            println!("# {}", settings_path.display());
            print!("{}", settings.to_toml()?);
        }
    }

    Ok(())
}

fn start(settings: Settings) -> Result<SongLoader> {
    SongLoader::new(settings, Arc::new(HeadlessHost), Arc::new(LoftyProbe))
        .context("Failed to start song loader")
}

async fn refresh(loader: &SongLoader, full: bool) -> Result<Vec<Arc<Item>>> {
    let (tx, rx) = oneshot::channel();
    loader.refresh(full, move |songs| {
        let _ = tx.send(songs.to_vec());
    });
    rx.await.context("Song loader stopped before the scan finished")
}

fn format_duration(seconds: f32) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (hours, minutes, secs) = (total / 3600, total / 60 % 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Truncate a path by keeping its first and last two components
fn smart_truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let parts: Vec<&str> = path.split(std::path::MAIN_SEPARATOR).collect();
    if parts.len() > 4 {
        let sep = std::path::MAIN_SEPARATOR.to_string();
        let shortened = format!(
            "{}{sep}...{sep}{}",
            parts[..2].join(&sep),
            parts[parts.len() - 2..].join(&sep)
        );
        if shortened.chars().count() <= max_len {
            return shortened;
        }
    }

    let tail: String = {
        let chars: Vec<char> = path.chars().collect();
        chars[chars.len().saturating_sub(max_len.saturating_sub(3))..]
            .iter()
            .collect()
    };
    format!("...{tail}")
}
