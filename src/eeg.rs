//! EEG recording access
//!
//! The pipeline only requires a channels-by-samples matrix plus a sampling
//! rate; where that matrix comes from is behind the [`EegReader`] trait.
//! The built-in [`EdfReader`] decodes EDF and BDF containers natively and
//! dispatches on file extension. EEGLAB `.set` archives are recognized but
//! must be converted to EDF/BDF first.

use crate::error::{EegError, Result};
use ndarray::Array2;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A loaded multi-channel EEG time series
#[derive(Debug, Clone)]
pub struct Recording {
    /// Channels x samples, physical units
    pub data: Array2<f64>,
    /// Sampling rate in Hz
    pub sfreq: f64,
}

impl Recording {
    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sfreq > 0.0 {
            self.n_samples() as f64 / self.sfreq
        } else {
            0.0
        }
    }
}

/// EEG container reader collaborator
pub trait EegReader: Send + Sync {
    /// Load a recording from the given file
    fn read(&self, path: &Path) -> Result<Recording>;
}

/// Built-in reader for EDF/EDF+ and BDF containers
#[derive(Debug, Default, Clone)]
pub struct EdfReader;

impl EegReader for EdfReader {
    fn read(&self, path: &Path) -> Result<Recording> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "edf" => read_edf_like(path, 2),
            "bdf" => read_edf_like(path, 3),
            "set" => Err(EegError::ReaderError(format!(
                "EEGLAB container {} must be converted to EDF/BDF before processing",
                path.display()
            ))),
            other => Err(EegError::ReaderError(format!(
                "unsupported EEG container extension '{}'",
                other
            ))),
        }
    }
}

/// Parse an EDF (2-byte samples) or BDF (3-byte samples) file.
///
/// Both formats share the same 256-byte ASCII header plus 256 bytes of
/// per-signal metadata; they differ only in sample width. Annotation
/// channels are skipped. All data channels must share one sampling rate.
fn read_edf_like(path: &Path, sample_width: usize) -> Result<Recording> {
    let mut file = File::open(path)
        .map_err(|e| EegError::ReaderError(format!("cannot open {}: {}", path.display(), e)))?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)
        .map_err(|e| EegError::ReaderError(format!("cannot read {}: {}", path.display(), e)))?;

    if raw.len() < 256 {
        return Err(EegError::ReaderError(
            "file too short for an EDF/BDF header".to_string(),
        ));
    }

    let header_bytes: usize = ascii_field(&raw, 184, 8)?
        .parse()
        .map_err(|_| EegError::ReaderError("malformed header-size field".to_string()))?;
    let n_records: i64 = ascii_field(&raw, 236, 8)?
        .parse()
        .map_err(|_| EegError::ReaderError("malformed record-count field".to_string()))?;
    let record_duration: f64 = ascii_field(&raw, 244, 8)?
        .parse()
        .map_err(|_| EegError::ReaderError("malformed record-duration field".to_string()))?;
    let n_signals: usize = ascii_field(&raw, 252, 4)?
        .parse()
        .map_err(|_| EegError::ReaderError("malformed signal-count field".to_string()))?;

    if n_signals == 0 || n_records <= 0 || record_duration <= 0.0 {
        return Err(EegError::ReaderError(
            "header describes no decodable data records".to_string(),
        ));
    }
    if raw.len() < header_bytes {
        return Err(EegError::ReaderError(
            "file truncated inside signal header".to_string(),
        ));
    }
    let n_records = n_records as usize;

    // Per-signal header blocks are stored field-major: all labels first,
    // then all transducer types, and so on. `cum_width` is the total byte
    // width of the fields preceding the one requested.
    let sig = |cum_width: usize, width: usize, idx: usize| -> Result<String> {
        ascii_field(&raw, 256 + cum_width * n_signals + width * idx, width)
    };

    let mut labels = Vec::with_capacity(n_signals);
    let mut phys_min = Vec::with_capacity(n_signals);
    let mut phys_max = Vec::with_capacity(n_signals);
    let mut dig_min = Vec::with_capacity(n_signals);
    let mut dig_max = Vec::with_capacity(n_signals);
    let mut samples_per_record = Vec::with_capacity(n_signals);

    for idx in 0..n_signals {
        labels.push(sig(0, 16, idx)?);
        // label(16) + transducer(80) + physical dimension(8) precede phys_min
        phys_min.push(parse_num(&sig(104, 8, idx)?)?);
        phys_max.push(parse_num(&sig(112, 8, idx)?)?);
        dig_min.push(parse_num(&sig(120, 8, idx)?)?);
        dig_max.push(parse_num(&sig(128, 8, idx)?)?);
        // prefiltering(80) sits between dig_max and samples-per-record
        samples_per_record.push(
            sig(216, 8, idx)?
                .parse::<usize>()
                .map_err(|_| {
                    EegError::ReaderError("malformed samples-per-record field".to_string())
                })?,
        );
    }

    let is_annotation =
        |label: &str| label.contains("EDF Annotations") || label.contains("BDF Annotations");

    let data_channels: Vec<usize> = (0..n_signals)
        .filter(|&i| !is_annotation(&labels[i]))
        .collect();
    if data_channels.is_empty() {
        return Err(EegError::ReaderError(
            "no data channels in container".to_string(),
        ));
    }

    let spr0 = samples_per_record[data_channels[0]];
    if spr0 == 0 {
        return Err(EegError::ReaderError(
            "zero samples per record".to_string(),
        ));
    }
    if data_channels.iter().any(|&i| samples_per_record[i] != spr0) {
        return Err(EegError::ReaderError(
            "mixed per-channel sampling rates are not supported".to_string(),
        ));
    }
    let sfreq = spr0 as f64 / record_duration;

    if data_channels
        .iter()
        .any(|&i| (dig_max[i] - dig_min[i]).abs() < f64::EPSILON)
    {
        return Err(EegError::ReaderError(
            "degenerate digital range in signal header".to_string(),
        ));
    }

    let record_len: usize = samples_per_record.iter().map(|&s| s * sample_width).sum();
    if raw.len() < header_bytes + record_len * n_records {
        return Err(EegError::ReaderError(
            "file truncated inside data records".to_string(),
        ));
    }

    let mut data = Array2::<f64>::zeros((data_channels.len(), spr0 * n_records));

    for rec in 0..n_records {
        let mut offset = header_bytes + rec * record_len;
        let mut row = 0usize;
        for ch in 0..n_signals {
            let spr = samples_per_record[ch];
            if is_annotation(&labels[ch]) {
                offset += spr * sample_width;
                continue;
            }
            let gain = (phys_max[ch] - phys_min[ch]) / (dig_max[ch] - dig_min[ch]);
            for s in 0..spr {
                let digital = decode_sample(&raw[offset + s * sample_width..], sample_width);
                data[[row, rec * spr0 + s]] =
                    gain * (digital as f64 - dig_min[ch]) + phys_min[ch];
            }
            offset += spr * sample_width;
            row += 1;
        }
    }

    Ok(Recording { data, sfreq })
}

fn decode_sample(bytes: &[u8], width: usize) -> i32 {
    match width {
        2 => i16::from_le_bytes([bytes[0], bytes[1]]) as i32,
        // 24-bit little-endian, sign-extended
        _ => {
            let v = (bytes[0] as i32) | ((bytes[1] as i32) << 8) | ((bytes[2] as i32) << 16);
            (v << 8) >> 8
        }
    }
}

fn ascii_field(raw: &[u8], offset: usize, len: usize) -> Result<String> {
    let slice = raw
        .get(offset..offset + len)
        .ok_or_else(|| EegError::ReaderError("header field out of bounds".to_string()))?;
    Ok(String::from_utf8_lossy(slice).trim().to_string())
}

fn parse_num(field: &str) -> Result<f64> {
    field
        .parse::<f64>()
        .map_err(|_| EegError::ReaderError(format!("malformed numeric field '{}'", field)))
}
