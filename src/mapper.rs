//! Band powers to musical parameters
//!
//! Fixed linear formulas, not a learned model: low-frequency dominance
//! (delta) pulls pitch down and stretches duration, high-frequency
//! dominance (beta/gamma) raises pitch, shortens notes and widens melodic
//! steps. Rounding is half-away-from-zero (`f64::round`) throughout.

use crate::error::{EegError, Result};
use crate::spectral::{BandPowerTable, BandPowers};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-note musical parameters, one entry per analysis interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteParameters {
    /// MIDI pitch in 0..=127
    pub pitch: u8,
    /// Melodic step interval, one decimal
    pub step: f64,
    /// Note duration in beats, two decimals, at least 0.1
    pub duration: f64,
}

/// Musical key of the whole piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    AMinor,
    CMajor,
    GMajor,
}

impl Key {
    pub fn label(&self) -> &'static str {
        match self {
            Key::AMinor => "A minor",
            Key::CMajor => "C major",
            Key::GMajor => "G major",
        }
    }

    pub fn from_label(label: &str) -> Result<Self> {
        match label {
            "A minor" => Ok(Key::AMinor),
            "C major" => Ok(Key::CMajor),
            "G major" => Ok(Key::GMajor),
            other => Err(EegError::InputError(format!("unknown key '{}'", other))),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Run-level musical parameters derived from averaged band powers
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalParameters {
    pub averages: BandPowers,
    /// Beats per minute, clamped to 60..=80
    pub tempo: u32,
    pub key: Key,
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Map one interval's band powers to note-level parameters
pub fn map_note_parameters(powers: &BandPowers) -> NoteParameters {
    let pitch = (60.0 + powers.delta * -10.0 + powers.gamma * 10.0)
        .round()
        .clamp(0.0, 127.0) as u8;

    let step = round_to(2.0 + powers.beta * 5.0, 1);

    let duration = round_to(0.5 + powers.delta * 0.1 - powers.beta * 0.3, 2).max(0.1);

    NoteParameters {
        pitch,
        step,
        duration,
    }
}

/// Average a table's band powers and derive tempo and key
pub fn map_global_parameters(table: &BandPowerTable) -> Result<GlobalParameters> {
    let n = table.intervals.len();
    if n == 0 {
        return Err(EegError::InputError(
            "cannot average band powers over zero intervals".to_string(),
        ));
    }

    let mut sums = [0.0f64; 5];
    for interval in &table.intervals {
        for (sum, value) in sums.iter_mut().zip(interval.as_array()) {
            *sum += value;
        }
    }
    let averages = BandPowers::from_array([
        sums[0] / n as f64,
        sums[1] / n as f64,
        sums[2] / n as f64,
        sums[3] / n as f64,
        sums[4] / n as f64,
    ]);

    // The +0.01 guard keeps the denominator away from zero when
    // low-frequency power vanishes
    let tempo = (80.0
        - 20.0 * (averages.beta + averages.gamma)
            / (averages.alpha + averages.theta + averages.delta + 0.01))
        .round()
        .clamp(60.0, 80.0) as u32;

    let key = select_key(&averages);

    Ok(GlobalParameters {
        averages,
        tempo,
        key,
    })
}

/// Key selection by dominance ranking over the five averages.
///
/// The check order is fixed: delta, then theta, then alpha, with beta or
/// gamma dominance falling through to A minor. Ties are not broken
/// specially; a tied band simply fails its strict comparison and the next
/// rule applies.
fn select_key(avg: &BandPowers) -> Key {
    if avg.delta > avg.theta && avg.delta > avg.alpha && avg.delta > avg.beta && avg.delta > avg.gamma
    {
        Key::AMinor
    } else if avg.theta > avg.alpha && avg.theta > avg.beta && avg.theta > avg.gamma {
        Key::CMajor
    } else if avg.alpha > avg.beta && avg.alpha > avg.gamma {
        Key::GMajor
    } else {
        Key::AMinor
    }
}
