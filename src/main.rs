use clap::{Parser, Subcommand};
use eeg2midi::{validate_input, Config, EegToMidi};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// EEG-to-MIDI Conversion Tool
#[derive(Parser)]
#[command(name = "eeg2midi")]
#[command(about = "Convert EEG recordings to short musical scores")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process an EEG file and generate MIDI plus diagnostics
    Convert {
        /// Input EEG file (.edf or .bdf)
        input: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the analysis interval length in seconds
        #[arg(long)]
        interval: Option<f64>,

        /// Skip plot generation
        #[arg(long)]
        no_plots: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            interval,
            no_plots,
            quiet,
        } => {
            // Load configuration
            let mut config = if let Some(config_path) = config {
                eeg2midi::config::load_config(config_path)?
            } else {
                Config::default()
            };

            if let Some(interval) = interval {
                config.spectral.interval_length_secs = interval;
            }
            if no_plots {
                config.viz.enabled = false;
            }
            eeg2midi::config::validate_config(&config)?;

            // Validate input
            validate_input(&input, &config)?;

            // Create processor
            let processor = EegToMidi::new(config);

            if !quiet {
                println!("Processing {}...", input.display());
            }

            let outputs = processor.process(&input, &output)?;

            if !quiet {
                println!("Generated files:");
                for (name, path) in &outputs {
                    println!("  {} -> {}", name, path.display());
                }
            }
        }
        Commands::ValidateConfig { config } => {
            let config = eeg2midi::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}
