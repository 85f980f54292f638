//! coso-replayer: inspect and render Hippel COSO/TFMX/MMME modules

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use hippel_coso::export::{export_to_wav, ExportConfig};
use hippel_coso::{load_file, Module, PlayerConfig, Song};

#[derive(Parser)]
#[command(name = "coso-replayer", version, about = "Hippel COSO/TFMX/MMME replayer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the module layout and its songs
    Info {
        /// Module file
        file: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render a song to an 8-bit mono WAV file
    Render {
        /// Module file
        file: PathBuf,
        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,
        /// Song index
        #[arg(short, long, default_value_t = 0)]
        song: usize,
        /// Render a fixed number of seconds instead of one pass
        #[arg(long)]
        seconds: Option<f64>,
        /// Player configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Info { file, json } => info(&file, json),
        Command::Render {
            file,
            output,
            song,
            seconds,
            config,
        } => render(&file, &output, song, seconds, config.as_deref()),
    }
}

fn load(file: &std::path::Path) -> Result<Module> {
    load_file(file).with_context(|| format!("failed to load {}", file.display()))
}

fn info(file: &std::path::Path, json: bool) -> Result<()> {
    let summary = load(file)?.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("File:        {}", file.display());
    println!("Format:      {}", summary.variant);
    println!("Voices:      {}", summary.voices);
    println!("Instruments: {}", summary.instruments);
    println!("Timbres:     {}", summary.timbres);
    println!(
        "Patterns:    {} ({} bytes each)",
        summary.patterns, summary.bytes_per_monopattern
    );
    println!("Divisions:   {}", summary.divisions);
    println!("Samples:     {}", summary.samples);
    println!("Songs:       {}", summary.songs.len());
    for (index, song) in summary.songs.iter().enumerate() {
        println!(
            "  #{index}: divisions {}..{}, speed {}",
            song.start_division, song.end_division, song.initial_speed
        );
    }
    Ok(())
}

fn render(
    file: &std::path::Path,
    output: &std::path::Path,
    song_index: usize,
    seconds: Option<f64>,
    config: Option<&std::path::Path>,
) -> Result<()> {
    let config = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            PlayerConfig::from_json_str(&text)?
        }
        None => PlayerConfig::default(),
    };

    let module = Arc::new(load(file)?);
    let mut song = Song::new(module, song_index, config)?;

    let export = match seconds {
        Some(seconds) => ExportConfig::duration(seconds),
        None => ExportConfig::default(),
    };
    let summary = export_to_wav(&mut song, output, export)?;

    let seconds = summary.samples as f64 / song.config().sample_rate as f64;
    println!("Wrote {} ({:.1}s)", output.display(), seconds);
    if !summary.reached_end && export.duration_secs.is_none() {
        tracing::warn!("song did not end within {:.0}s, output truncated", export.max_secs);
    }
    Ok(())
}
