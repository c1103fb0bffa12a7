//! Intermediate JSON artifacts
//!
//! These files are a contract with downstream tooling, so the shapes and
//! number formatting are pinned: band strengths are decimal strings with
//! three fractional digits, interval keys are 1-based and serialized in
//! ascending numeric order, and re-serializing unchanged data yields
//! byte-identical files.

use crate::error::{EegError, Result};
use crate::mapper::{GlobalParameters, Key, NoteParameters};
use crate::spectral::{BandPowerTable, BandPowers};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;

/// Wire names: `wave_analysis.json`
#[derive(Debug, Clone, PartialEq)]
pub struct WaveAnalysisArtifact {
    pub interval_length: String,
    /// Row `i` holds interval `i + 1`: [delta, theta, alpha, beta, gamma]
    pub rows: Vec<[String; 5]>,
}

/// Wire names: `music_parameters.json`
#[derive(Debug, Clone, PartialEq)]
pub struct MusicParametersArtifact {
    pub interval_length: String,
    /// Row `i` holds interval `i + 1`: [pitch, step, duration]
    pub rows: Vec<[String; 3]>,
}

/// Wire names: `global_parameters.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalParametersArtifact {
    pub average_wave_strengths: AverageWaveStrengths,
    pub musical_parameters: GlobalMusicalParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageWaveStrengths {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMusicalParameters {
    pub tempo: u32,
    pub key: String,
}

/// Format an interval length the way the artifact contract expects:
/// whole-second lengths print without a fractional part ("5", not "5.0")
pub fn format_interval_length(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as i64)
    } else {
        format!("{}", secs)
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Decimal text for step/duration values: trailing zeros are trimmed but a
/// whole number keeps one fractional digit ("2.0", not "2")
fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

impl WaveAnalysisArtifact {
    pub fn from_table(table: &BandPowerTable) -> Self {
        let rows = table
            .intervals
            .iter()
            .map(|bp| {
                let v = bp.as_array();
                [
                    format!("{:.3}", v[0]),
                    format!("{:.3}", v[1]),
                    format!("{:.3}", v[2]),
                    format!("{:.3}", v[3]),
                    format!("{:.3}", v[4]),
                ]
            })
            .collect();
        Self {
            interval_length: format_interval_length(table.interval_length_secs),
            rows,
        }
    }

    pub fn to_table(&self) -> Result<BandPowerTable> {
        let interval_length_secs = self.interval_length.parse::<f64>().map_err(|_| {
            EegError::InputError(format!(
                "malformed interval_length '{}'",
                self.interval_length
            ))
        })?;
        let mut intervals = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut values = [0.0f64; 5];
            for (slot, text) in values.iter_mut().zip(row) {
                *slot = text.parse::<f64>().map_err(|_| {
                    EegError::InputError(format!("malformed wave strength '{}'", text))
                })?;
            }
            intervals.push(BandPowers::from_array(values));
        }
        Ok(BandPowerTable {
            interval_length_secs,
            intervals,
        })
    }
}

impl MusicParametersArtifact {
    pub fn from_notes(notes: &[NoteParameters], interval_length: &str) -> Self {
        let rows = notes
            .iter()
            .map(|n| {
                [
                    n.pitch.to_string(),
                    format_decimal(n.step),
                    format_decimal(n.duration),
                ]
            })
            .collect();
        Self {
            interval_length: interval_length.to_string(),
            rows,
        }
    }

    pub fn to_notes(&self) -> Result<Vec<NoteParameters>> {
        let mut notes = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let pitch = row[0]
                .parse::<u8>()
                .map_err(|_| EegError::InputError(format!("malformed pitch '{}'", row[0])))?;
            let step = row[1]
                .parse::<f64>()
                .map_err(|_| EegError::InputError(format!("malformed step '{}'", row[1])))?;
            let duration = row[2]
                .parse::<f64>()
                .map_err(|_| EegError::InputError(format!("malformed duration '{}'", row[2])))?;
            notes.push(NoteParameters {
                pitch,
                step,
                duration,
            });
        }
        Ok(notes)
    }
}

impl GlobalParametersArtifact {
    pub fn from_params(params: &GlobalParameters) -> Self {
        Self {
            average_wave_strengths: AverageWaveStrengths {
                delta: round3(params.averages.delta),
                theta: round3(params.averages.theta),
                alpha: round3(params.averages.alpha),
                beta: round3(params.averages.beta),
                gamma: round3(params.averages.gamma),
            },
            musical_parameters: GlobalMusicalParameters {
                tempo: params.tempo,
                key: params.key.label().to_string(),
            },
        }
    }

    pub fn to_params(&self) -> Result<GlobalParameters> {
        Ok(GlobalParameters {
            averages: BandPowers {
                delta: self.average_wave_strengths.delta,
                theta: self.average_wave_strengths.theta,
                alpha: self.average_wave_strengths.alpha,
                beta: self.average_wave_strengths.beta,
                gamma: self.average_wave_strengths.gamma,
            },
            tempo: self.musical_parameters.tempo,
            key: Key::from_label(&self.musical_parameters.key)?,
        })
    }
}

/// Serializes rows as a JSON object keyed by 1-based interval index, in
/// insertion (numeric) order
struct IndexedRows<'a, const N: usize>(&'a [[String; N]]);

impl<const N: usize> Serialize for IndexedRows<'_, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (idx, row) in self.0.iter().enumerate() {
            map.serialize_entry(&(idx + 1).to_string(), &row[..])?;
        }
        map.end()
    }
}

impl Serialize for WaveAnalysisArtifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("interval_length", &self.interval_length)?;
        map.serialize_entry("wave_strengths", &IndexedRows(&self.rows))?;
        map.end()
    }
}

impl Serialize for MusicParametersArtifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("interval_length", &self.interval_length)?;
        map.serialize_entry("musical_parameters", &IndexedRows(&self.rows))?;
        map.end()
    }
}

fn rows_from_map<const N: usize>(
    map: BTreeMap<String, [String; N]>,
) -> std::result::Result<Vec<[String; N]>, String> {
    let mut keyed: Vec<(usize, [String; N])> = Vec::with_capacity(map.len());
    for (key, row) in map {
        let idx = key
            .parse::<usize>()
            .map_err(|_| format!("non-numeric interval key '{}'", key))?;
        keyed.push((idx, row));
    }
    keyed.sort_by_key(|(idx, _)| *idx);
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

#[derive(Deserialize)]
struct WaveAnalysisWire {
    interval_length: String,
    wave_strengths: BTreeMap<String, [String; 5]>,
}

impl<'de> Deserialize<'de> for WaveAnalysisArtifact {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let wire = WaveAnalysisWire::deserialize(deserializer)?;
        let rows = rows_from_map(wire.wave_strengths).map_err(serde::de::Error::custom)?;
        Ok(Self {
            interval_length: wire.interval_length,
            rows,
        })
    }
}

#[derive(Deserialize)]
struct MusicParametersWire {
    interval_length: String,
    musical_parameters: BTreeMap<String, [String; 3]>,
}

impl<'de> Deserialize<'de> for MusicParametersArtifact {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let wire = MusicParametersWire::deserialize(deserializer)?;
        let rows = rows_from_map(wire.musical_parameters).map_err(serde::de::Error::custom)?;
        Ok(Self {
            interval_length: wire.interval_length,
            rows,
        })
    }
}

/// Write an artifact as pretty-printed JSON
pub fn write_artifact<T: Serialize>(path: &Path, artifact: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(artifact)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Read an artifact back from disk
pub fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
