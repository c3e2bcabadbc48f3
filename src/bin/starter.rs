//! Command-line front end: render the starter patch to WAV, or analyse a
//! WAV file for crackle artifacts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use starter_synth::config::RenderConfig;
use starter_synth::diagnostics::{self, AnalysisOptions};
use starter_synth::dsp::renderer::StarterSynth;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Procedural engine starter-motor synthesizer
#[derive(Parser)]
#[command(name = "starter", version)]
#[command(about = "Render and analyse starter-motor cranking sounds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the starter sound to a 16-bit mono WAV file
    Render {
        /// JSON render configuration (defaults for any missing field)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed for the noise source; entropy-seeded when omitted
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output WAV path
        #[arg(short, long, default_value = "starter.wav")]
        output: PathBuf,

        /// Override the sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Override the duration in seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Print the effective configuration as JSON and exit
        #[arg(long)]
        dump_config: bool,
    },

    /// Analyse a WAV file for discontinuities, gaps, and energy dropouts
    Analyze {
        /// WAV file to analyse
        file: PathBuf,

        /// Seconds to ignore at the start
        #[arg(long, default_value_t = 0.0)]
        skip: f64,

        /// Seconds to ignore at the end
        #[arg(long, default_value_t = 0.0)]
        trim: f64,
    },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            config,
            seed,
            output,
            sample_rate,
            duration,
            dump_config,
        } => {
            let mut config = load_config(config)?;
            if let Some(rate) = sample_rate {
                config.sample_rate = rate;
            }
            if let Some(secs) = duration {
                config.duration = secs;
            }
            if dump_config {
                println!("{}", config.to_json_pretty()?);
                return Ok(ExitCode::SUCCESS);
            }
            render(config, seed, output)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Analyze { file, skip, trim } => {
            let options = AnalysisOptions {
                skip_seconds: skip,
                trim_seconds: trim,
            };
            let report = diagnostics::analyze_wav_file(&file, &options)
                .with_context(|| format!("Failed to analyse {}", file.display()))?;
            print!("{report}");

            if report.is_clean() {
                tracing::info!("{}: clean", file.display());
                Ok(ExitCode::SUCCESS)
            } else {
                tracing::info!("{}: {} issue(s)", file.display(), report.issues.len());
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<RenderConfig> {
    let Some(path) = path else {
        return Ok(RenderConfig::default());
    };
    let json = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    RenderConfig::from_json(&json)
        .with_context(|| format!("Failed to parse config {}", path.display()))
}

fn render(config: RenderConfig, seed: Option<u64>, output: PathBuf) -> Result<()> {
    let synth = StarterSynth::new(config).context("Invalid render configuration")?;
    tracing::info!(
        "Rendering {} samples at {} Hz",
        synth.total_samples(),
        synth.config().sample_rate
    );

    let audio = match seed {
        Some(seed) => synth.render_seeded(seed),
        None => synth.render(),
    };
    audio
        .write_wav(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(
        "Wrote {} ({:.2}s, raw peak {:.4})",
        output.display(),
        audio.duration_secs(),
        audio.raw_peak
    );
    Ok(())
}
