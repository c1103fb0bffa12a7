//! EEG-to-MIDI Conversion System
//!
//! A deterministic signal processing system that converts EEG recordings
//! into short musical scores: per-interval band-power features are mapped
//! to note-level and global musical parameters through fixed arithmetic
//! formulas, rendered to a standard MIDI file, and accompanied by
//! diagnostic visualizations. Each stage persists its output as a JSON
//! artifact consumed by the next stage.

pub mod artifacts;
pub mod config;
pub mod eeg;
pub mod error;
pub mod job;
pub mod mapper;
pub mod midi;
pub mod orchestrator;
pub mod spectral;
pub mod viz;

pub use config::Config;
pub use eeg::{EdfReader, EegReader, Recording};
pub use error::{EegError, Result};
pub use job::{JobSnapshot, JobStatus};
pub use orchestrator::Orchestrator;

use artifacts::{GlobalParametersArtifact, MusicParametersArtifact, WaveAnalysisArtifact};
use mapper::{GlobalParameters, NoteParameters};
use spectral::BandPowerTable;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Output of the musical parameter mapping stage
pub struct MappingOutput {
    pub notes: Vec<NoteParameters>,
    pub globals: GlobalParameters,
    pub music_path: PathBuf,
    pub global_path: PathBuf,
}

/// Main processing pipeline for EEG-to-MIDI conversion
pub struct EegToMidi {
    config: Config,
    reader: Arc<dyn EegReader>,
}

impl EegToMidi {
    /// Create a new processor with the given configuration and the
    /// built-in EDF/BDF reader
    pub fn new(config: Config) -> Self {
        Self::with_reader(config, Arc::new(EdfReader))
    }

    /// Create a processor with a custom EEG reader collaborator
    pub fn with_reader(config: Config, reader: Arc<dyn EegReader>) -> Self {
        Self { config, reader }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process an EEG file and generate all outputs under `output_dir`
    pub fn process<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_dir: P,
    ) -> Result<BTreeMap<String, PathBuf>> {
        let input = input_path.as_ref();
        let output_dir = output_dir.as_ref();
        let mut outputs = BTreeMap::new();

        let (table, wave_path) = self.extract_stage(input, output_dir)?;
        outputs.insert("preprocessed_eeg".to_string(), wave_path);

        let mapping = self.mapping_stage(&table, output_dir)?;
        outputs.insert("music_parameters".to_string(), mapping.music_path.clone());
        outputs.insert("global_parameters".to_string(), mapping.global_path.clone());

        let (midi_bytes, midi_path) =
            self.midi_stage(&mapping.notes, &mapping.globals, output_dir)?;
        outputs.insert("midi_file".to_string(), midi_path);

        let csv_path = self.csv_stage(&midi_bytes, output_dir)?;
        outputs.insert("midi_visualization".to_string(), csv_path);

        if self.config.viz.enabled {
            let plots_path = self.plot_stage(&table, &mapping.notes, output_dir)?;
            outputs.insert("visualizations".to_string(), plots_path);
        }

        Ok(outputs)
    }

    /// Stage 1: read the recording and extract per-interval band powers
    pub fn extract_stage(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<(BandPowerTable, PathBuf)> {
        let recording = self.reader.read(input)?;
        info!(
            channels = recording.n_channels(),
            samples = recording.n_samples(),
            sfreq = recording.sfreq,
            "recording loaded"
        );

        let table = spectral::extract_band_powers(
            &recording,
            self.config.spectral.interval_length_secs,
            self.config.spectral.max_segment_len,
        )?;

        let path = self.json_dir(output_dir).join("wave_analysis.json");
        artifacts::write_artifact(&path, &WaveAnalysisArtifact::from_table(&table))?;
        info!(intervals = table.intervals.len(), path = %path.display(), "band powers extracted");

        Ok((table, path))
    }

    /// Stage 2: map band powers to note-level and global musical parameters
    pub fn mapping_stage(&self, table: &BandPowerTable, output_dir: &Path) -> Result<MappingOutput> {
        let notes: Vec<NoteParameters> = table
            .intervals
            .iter()
            .map(mapper::map_note_parameters)
            .collect();
        let globals = mapper::map_global_parameters(table)?;

        let interval_length = artifacts::format_interval_length(table.interval_length_secs);
        let music_path = self.json_dir(output_dir).join("music_parameters.json");
        artifacts::write_artifact(
            &music_path,
            &MusicParametersArtifact::from_notes(&notes, &interval_length),
        )?;

        let global_path = self.json_dir(output_dir).join("global_parameters.json");
        artifacts::write_artifact(&global_path, &GlobalParametersArtifact::from_params(&globals))?;
        info!(
            tempo = globals.tempo,
            key = %globals.key,
            notes = notes.len(),
            "musical parameters mapped"
        );

        Ok(MappingOutput {
            notes,
            globals,
            music_path,
            global_path,
        })
    }

    /// Stage 3: assemble the score and write the MIDI file
    pub fn midi_stage(
        &self,
        notes: &[NoteParameters],
        globals: &GlobalParameters,
        output_dir: &Path,
    ) -> Result<(Vec<u8>, PathBuf)> {
        let score = midi::assemble(notes, globals, &self.config.midi)?;
        let path = output_dir
            .join(&self.config.paths.midi_dir)
            .join("midi_out.mid");
        let bytes = midi::write_midi(&score, &path)?;
        info!(notes = score.notes.len(), path = %path.display(), "MIDI file written");
        Ok((bytes, path))
    }

    /// Stage 4: dump the encoded MIDI events as CSV
    pub fn csv_stage(&self, midi_bytes: &[u8], output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir
            .join(&self.config.paths.midi_dir)
            .join("midi_visualization.csv");
        viz::write_midi_csv(midi_bytes, &path)?;
        Ok(path)
    }

    /// Stage 5: render diagnostic plots
    pub fn plot_stage(
        &self,
        table: &BandPowerTable,
        notes: &[NoteParameters],
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let plots_dir = output_dir.join(&self.config.paths.plots_dir);
        viz::create_all_plots(table, notes, &plots_dir)?;
        info!(path = %plots_dir.display(), "plots rendered");
        Ok(plots_dir)
    }

    fn json_dir(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.config.paths.json_dir)
    }
}

/// Validate a submitted EEG file against the extension allow-list and
/// minimum size before any processing begins
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> Result<()> {
    let path = input_path.as_ref();

    if !path.exists() {
        return Err(EegError::ValidationError(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !config
        .validation
        .allowed_extensions
        .iter()
        .any(|allowed| *allowed == ext)
    {
        return Err(EegError::ValidationError(format!(
            "invalid file type '.{}'; supported formats: {}",
            ext,
            config
                .validation
                .allowed_extensions
                .iter()
                .map(|e| format!(".{}", e))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let size = std::fs::metadata(path)
        .map_err(|e| EegError::ValidationError(format!("cannot stat file: {}", e)))?
        .len();
    if size < config.validation.min_file_bytes {
        return Err(EegError::ValidationError(format!(
            "file of {} bytes is too small to be an EEG recording",
            size
        )));
    }

    Ok(())
}
