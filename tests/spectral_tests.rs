//! Validation tests for spectral feature extraction

use eeg2midi::eeg::Recording;
use eeg2midi::spectral::{band_edges, extract_band_powers, welch_psd};
use eeg2midi::EegError;
use ndarray::Array2;
use std::f64::consts::PI;

/// Generate a multi-channel recording from a set of sine components
fn sine_recording(components: &[(f64, f64)], sfreq: f64, secs: f64, channels: usize) -> Recording {
    let n_samples = (secs * sfreq) as usize;
    let data = Array2::from_shape_fn((channels, n_samples), |(_, t)| {
        components
            .iter()
            .map(|&(freq, amp)| amp * (2.0 * PI * freq * t as f64 / sfreq).sin())
            .sum()
    });
    Recording { data, sfreq }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_band_rows_are_distributions() {
        let rec = sine_recording(
            &[(2.0, 1.0), (6.0, 0.8), (10.0, 0.6), (20.0, 0.4), (40.0, 0.2)],
            256.0,
            10.0,
            3,
        );
        let table = extract_band_powers(&rec, 5.0, 256).unwrap();
        assert_eq!(table.intervals.len(), 2);

        for interval in &table.intervals {
            let values = interval.as_array();
            for v in values {
                assert!(v >= 0.0, "band power must be non-negative, got {}", v);
            }
            let total: f64 = values.iter().sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_alpha_sine_is_alpha_dominant() {
        let rec = sine_recording(&[(10.0, 1.0)], 128.0, 8.0, 1);
        let table = extract_band_powers(&rec, 4.0, 256).unwrap();

        for interval in &table.intervals {
            assert!(
                interval.alpha > 0.8,
                "10 Hz sine should concentrate power in alpha, got {:?}",
                interval
            );
        }
    }

    #[test]
    fn test_trailing_partial_window_is_discarded() {
        // 11 seconds at 5-second intervals leaves one incomplete window
        let rec = sine_recording(&[(10.0, 1.0)], 100.0, 11.0, 1);
        let table = extract_band_powers(&rec, 5.0, 256).unwrap();
        assert_eq!(table.intervals.len(), 2);
    }

    #[test]
    fn test_recording_shorter_than_one_window_fails() {
        let rec = sine_recording(&[(10.0, 1.0)], 100.0, 3.0, 1);
        let result = extract_band_powers(&rec, 5.0, 256);
        assert!(matches!(result, Err(EegError::InputError(_))));
    }

    #[test]
    fn test_empty_recording_fails() {
        let rec = Recording {
            data: Array2::zeros((0, 0)),
            sfreq: 100.0,
        };
        assert!(matches!(
            extract_band_powers(&rec, 5.0, 256),
            Err(EegError::InputError(_))
        ));
    }

    #[test]
    fn test_zero_sample_window_fails() {
        let rec = sine_recording(&[(10.0, 1.0)], 100.0, 2.0, 1);
        // 1 ms interval at 100 Hz truncates to a zero-sample window
        assert!(matches!(
            extract_band_powers(&rec, 0.001, 256),
            Err(EegError::InputError(_))
        ));
    }

    #[test]
    fn test_non_positive_sampling_rate_fails() {
        let mut rec = sine_recording(&[(10.0, 1.0)], 100.0, 2.0, 1);
        rec.sfreq = 0.0;
        assert!(matches!(
            extract_band_powers(&rec, 1.0, 256),
            Err(EegError::InputError(_))
        ));
    }

    #[test]
    fn test_identical_channels_match_single_channel() {
        let one = sine_recording(&[(6.0, 1.0), (25.0, 0.5)], 200.0, 6.0, 1);
        let three = sine_recording(&[(6.0, 1.0), (25.0, 0.5)], 200.0, 6.0, 3);

        let table_one = extract_band_powers(&one, 3.0, 256).unwrap();
        let table_three = extract_band_powers(&three, 3.0, 256).unwrap();

        for (a, b) in table_one.intervals.iter().zip(&table_three.intervals) {
            for (x, y) in a.as_array().iter().zip(b.as_array()) {
                assert_abs_diff_eq!(*x, y, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_welch_peak_at_signal_frequency() {
        let sfreq = 256.0;
        let signal: Vec<f64> = (0..2048)
            .map(|t| (2.0 * PI * 10.0 * t as f64 / sfreq).sin())
            .collect();
        let (freqs, psd) = welch_psd(&signal, sfreq, 256);

        let peak_bin = psd
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_abs_diff_eq!(freqs[peak_bin], 10.0, epsilon = 1.1);
    }

    #[test]
    fn test_gamma_band_caps_at_nyquist() {
        let bands = band_edges(150.0);
        assert_abs_diff_eq!(bands[4].1, 75.0);

        let bands = band_edges(512.0);
        assert_abs_diff_eq!(bands[4].1, 100.0);
    }
}
