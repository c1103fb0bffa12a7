//! Configuration system for the EEG-to-MIDI processor

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub spectral: SpectralConfig,
    pub validation: ValidationConfig,
    pub midi: MidiConfig,
    pub jobs: JobsConfig,
    pub paths: PathsConfig,
    pub viz: VizConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            spectral: SpectralConfig::default(),
            validation: ValidationConfig::default(),
            midi: MidiConfig::default(),
            jobs: JobsConfig::default(),
            paths: PathsConfig::default(),
            viz: VizConfig::default(),
        }
    }
}

/// Spectral feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// Length of each analysis interval in seconds
    pub interval_length_secs: f64,
    /// Welch segment length cap in samples
    pub max_segment_len: usize,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            interval_length_secs: 5.0,
            max_segment_len: 256,
        }
    }
}

/// Input file validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Accepted EEG container extensions (lowercase, without dot)
    pub allowed_extensions: Vec<String>,
    /// Minimum plausible file size in bytes
    pub min_file_bytes: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec!["set".to_string(), "edf".to_string(), "bdf".to_string()],
            min_file_bytes: 100,
        }
    }
}

/// MIDI assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Ticks per quarter note
    pub ticks_per_beat: u16,
    /// General MIDI program number (0 = Acoustic Grand Piano)
    pub program: u8,
    /// Base note velocity before the dynamic factor is applied
    pub base_velocity: u8,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            ticks_per_beat: 480,
            program: 0,
            base_velocity: 64,
        }
    }
}

/// Job store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Number of finished jobs kept in memory before eviction
    pub retain_jobs: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self { retain_jobs: 64 }
    }
}

/// Output path layout, relative to the run's output directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub json_dir: String,
    pub midi_dir: String,
    pub plots_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            json_dir: "json".to_string(),
            midi_dir: "midi".to_string(),
            plots_dir: "plots".to_string(),
        }
    }
}

/// Visualization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    /// Generate diagnostic plots after MIDI export
    pub enabled: bool,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Validate configuration parameters
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.spectral.interval_length_secs <= 0.0 {
        anyhow::bail!("spectral.interval_length_secs must be positive");
    }

    if config.spectral.max_segment_len == 0 {
        anyhow::bail!("spectral.max_segment_len must be at least 1");
    }

    if config.midi.ticks_per_beat == 0 {
        anyhow::bail!("midi.ticks_per_beat must be at least 1");
    }

    if config.midi.program > 127 {
        anyhow::bail!("midi.program must be in 0..=127");
    }

    if config.midi.base_velocity > 127 {
        anyhow::bail!("midi.base_velocity must be in 0..=127");
    }

    if config.jobs.retain_jobs == 0 {
        anyhow::bail!("jobs.retain_jobs must be at least 1");
    }

    if config.validation.allowed_extensions.is_empty() {
        anyhow::bail!("validation.allowed_extensions must not be empty");
    }

    Ok(())
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
