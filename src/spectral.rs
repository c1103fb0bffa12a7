//! Spectral feature extraction (Welch PSD, band powers)

use crate::eeg::Recording;
use crate::error::{EegError, Result};
use rustfft::{num_complex::Complex, FftPlanner};

/// Band-power distribution for one analysis interval.
///
/// Values are fractions of total spectral power and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl BandPowers {
    pub const NAMES: [&'static str; 5] = ["delta", "theta", "alpha", "beta", "gamma"];

    pub fn as_array(&self) -> [f64; 5] {
        [self.delta, self.theta, self.alpha, self.beta, self.gamma]
    }

    pub fn from_array(values: [f64; 5]) -> Self {
        Self {
            delta: values[0],
            theta: values[1],
            alpha: values[2],
            beta: values[3],
            gamma: values[4],
        }
    }
}

/// Ordered per-interval band powers for one recording
#[derive(Debug, Clone, PartialEq)]
pub struct BandPowerTable {
    pub interval_length_secs: f64,
    pub intervals: Vec<BandPowers>,
}

/// Frequency band edges in Hz, half-open `[lo, hi)`.
///
/// The gamma upper edge is capped at the Nyquist frequency so we never ask
/// for power the sampling rate cannot represent.
pub fn band_edges(sfreq: f64) -> [(f64, f64); 5] {
    [
        (0.5, 4.0),
        (4.0, 8.0),
        (8.0, 13.0),
        (13.0, 30.0),
        (30.0, (sfreq / 2.0).min(100.0)),
    ]
}

/// Generate a Hann window of the given size
fn hann_window(size: usize) -> Vec<f64> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

/// Welch power spectral density estimate of a single channel.
///
/// Hann-windowed segments with 50% overlap, per-segment mean removal,
/// one-sided density scaling. Returns `(freqs, psd)` with
/// `nperseg / 2 + 1` bins.
pub fn welch_psd(signal: &[f64], sfreq: f64, nperseg: usize) -> (Vec<f64>, Vec<f64>) {
    let nperseg = nperseg.min(signal.len()).max(1);
    let noverlap = nperseg / 2;
    let step = nperseg - noverlap;
    let n_segments = if signal.len() >= nperseg {
        (signal.len() - noverlap) / step
    } else {
        0
    }
    .max(1);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(nperseg);

    let window = hann_window(nperseg);
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (sfreq * window_power);

    let n_bins = nperseg / 2 + 1;
    let mut psd = vec![0.0f64; n_bins];

    for seg_idx in 0..n_segments {
        let start = seg_idx * step;
        let segment = &signal[start..start + nperseg];
        let mean = segment.iter().sum::<f64>() / nperseg as f64;

        let mut buffer: Vec<Complex<f64>> = segment
            .iter()
            .zip(&window)
            .map(|(&sample, &win)| Complex::new((sample - mean) * win, 0.0))
            .collect();

        fft.process(&mut buffer);

        for (bin, value) in buffer[..n_bins].iter().enumerate() {
            let mut power = value.norm_sqr() * scale;
            // One-sided spectrum: double everything except DC and Nyquist
            if bin != 0 && !(nperseg % 2 == 0 && bin == n_bins - 1) {
                power *= 2.0;
            }
            psd[bin] += power;
        }
    }

    for value in &mut psd {
        *value /= n_segments as f64;
    }

    let freqs: Vec<f64> = (0..n_bins)
        .map(|i| i as f64 * sfreq / nperseg as f64)
        .collect();

    (freqs, psd)
}

/// Extract per-interval band-power percentages from a recording.
///
/// The recording is cut into non-overlapping windows of
/// `interval_length_secs`; trailing samples that do not fill a complete
/// window are discarded. Each window's PSD is averaged across channels
/// before band integration.
pub fn extract_band_powers(
    recording: &Recording,
    interval_length_secs: f64,
    max_segment_len: usize,
) -> Result<BandPowerTable> {
    if recording.n_channels() == 0 || recording.n_samples() == 0 {
        return Err(EegError::InputError("empty EEG time series".to_string()));
    }
    if recording.sfreq <= 0.0 {
        return Err(EegError::InputError(format!(
            "non-positive sampling rate {}",
            recording.sfreq
        )));
    }

    let samples_per_interval = (interval_length_secs * recording.sfreq) as usize;
    if samples_per_interval == 0 {
        return Err(EegError::InputError(format!(
            "interval of {} s yields a zero-sample window at {} Hz",
            interval_length_secs, recording.sfreq
        )));
    }

    let num_intervals = recording.n_samples() / samples_per_interval;
    if num_intervals == 0 {
        return Err(EegError::InputError(format!(
            "recording of {} samples is shorter than one {}-sample interval",
            recording.n_samples(),
            samples_per_interval
        )));
    }

    let nperseg = samples_per_interval.min(max_segment_len);
    let bands = band_edges(recording.sfreq);
    let mut intervals = Vec::with_capacity(num_intervals);

    for interval in 0..num_intervals {
        let start = interval * samples_per_interval;
        let end = start + samples_per_interval;

        // Average the PSD across channels to obtain one spectrum per window
        let mut freqs = Vec::new();
        let mut mean_psd = Vec::new();
        for ch in 0..recording.n_channels() {
            let row = recording.data.row(ch);
            let slice = row.slice(ndarray::s![start..end]);
            let channel: Vec<f64> = slice.iter().copied().collect();
            let (f, psd) = welch_psd(&channel, recording.sfreq, nperseg);
            if mean_psd.is_empty() {
                freqs = f;
                mean_psd = psd;
            } else {
                for (acc, value) in mean_psd.iter_mut().zip(psd) {
                    *acc += value;
                }
            }
        }
        for value in &mut mean_psd {
            *value /= recording.n_channels() as f64;
        }

        let band_sums: Vec<f64> = bands
            .iter()
            .map(|&(lo, hi)| {
                freqs
                    .iter()
                    .zip(&mean_psd)
                    .filter(|(&f, _)| f >= lo && f < hi)
                    .map(|(_, &p)| p)
                    .sum()
            })
            .collect();

        let total: f64 = band_sums.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(EegError::InputError(format!(
                "interval {} has no spectral power in the EEG bands",
                interval + 1
            )));
        }

        intervals.push(BandPowers::from_array([
            band_sums[0] / total,
            band_sums[1] / total,
            band_sums[2] / total,
            band_sums[3] / total,
            band_sums[4] / total,
        ]));
    }

    Ok(BandPowerTable {
        interval_length_secs,
        intervals,
    })
}
