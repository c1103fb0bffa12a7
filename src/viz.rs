//! Diagnostic visualization artifacts

use crate::error::{EegError, Result};
use crate::mapper::NoteParameters;
use crate::midi;
use crate::spectral::{BandPowerTable, BandPowers};
use plotters::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const BAND_COLORS: [RGBColor; 5] = [
    RGBColor(31, 119, 180),  // delta
    RGBColor(255, 127, 14),  // theta
    RGBColor(44, 160, 44),   // alpha
    RGBColor(214, 39, 40),   // beta
    RGBColor(148, 103, 189), // gamma
];

/// Generate all diagnostic plots into the given directory
pub fn create_all_plots(
    table: &BandPowerTable,
    notes: &[NoteParameters],
    output_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    plot_wave_strengths(table, &output_dir.join("wave_strengths_plot.png"))?;
    plot_wave_heatmap(table, &output_dir.join("wave_heatmap.png"))?;
    plot_music_parameters(notes, &output_dir.join("music_parameters.png"))?;

    Ok(())
}

/// Line chart of band strengths across intervals
pub fn plot_wave_strengths(table: &BandPowerTable, path: &Path) -> Result<()> {
    if table.intervals.is_empty() {
        return Err(EegError::InputError(
            "no intervals to plot".to_string(),
        ));
    }

    let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| EegError::PlotError(format!("failed to fill plot background: {:?}", e)))?;

    let n = table.intervals.len();
    let mut chart = ChartBuilder::on(&root)
        .caption("EEG Wave Strengths Over Time", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(1..n.max(2), 0.0..1.0f64)
        .map_err(|e| EegError::PlotError(format!("failed to build chart: {:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Interval Number")
        .y_desc("Wave Strength")
        .draw()
        .map_err(|e| EegError::PlotError(format!("failed to draw mesh: {:?}", e)))?;

    for (band_idx, name) in BandPowers::NAMES.iter().enumerate() {
        let color = BAND_COLORS[band_idx];
        chart
            .draw_series(LineSeries::new(
                table
                    .intervals
                    .iter()
                    .enumerate()
                    .map(|(i, bp)| (i + 1, bp.as_array()[band_idx])),
                color.stroke_width(2),
            ))
            .map_err(|e| EegError::PlotError(format!("failed to draw series: {:?}", e)))?
            .label(*name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| EegError::PlotError(format!("failed to draw legend: {:?}", e)))?;

    Ok(())
}

/// Heatmap of band strengths (bands on the y axis, intervals on the x axis)
pub fn plot_wave_heatmap(table: &BandPowerTable, path: &Path) -> Result<()> {
    if table.intervals.is_empty() {
        return Err(EegError::InputError(
            "no intervals to plot".to_string(),
        ));
    }

    let root = BitMapBackend::new(path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| EegError::PlotError(format!("failed to fill plot background: {:?}", e)))?;

    let n = table.intervals.len();
    let mut chart = ChartBuilder::on(&root)
        .caption("Wave Strength Heatmap Over Time", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..n, 0..5usize)
        .map_err(|e| EegError::PlotError(format!("failed to build chart: {:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Time Interval")
        .y_desc("Wave Band")
        .y_label_formatter(&|idx| {
            BandPowers::NAMES
                .get(*idx)
                .map(|s| s.to_string())
                .unwrap_or_default()
        })
        .draw()
        .map_err(|e| EegError::PlotError(format!("failed to draw mesh: {:?}", e)))?;

    chart
        .draw_series(table.intervals.iter().enumerate().flat_map(|(x, bp)| {
            bp.as_array()
                .into_iter()
                .enumerate()
                .map(move |(y, strength)| {
                    // Map [0, 1] strength to a dark-to-bright ramp
                    let intensity = strength.clamp(0.0, 1.0);
                    let color = RGBColor(
                        (253.0 * intensity) as u8,
                        (231.0 * intensity) as u8,
                        (37.0 + 120.0 * (1.0 - intensity)) as u8,
                    );
                    Rectangle::new([(x, y), (x + 1, y + 1)], color.filled())
                })
        }))
        .map_err(|e| EegError::PlotError(format!("failed to draw series: {:?}", e)))?;

    Ok(())
}

/// Three stacked panels: pitch, step and duration per interval
pub fn plot_music_parameters(notes: &[NoteParameters], path: &Path) -> Result<()> {
    if notes.is_empty() {
        return Err(EegError::InputError("no notes to plot".to_string()));
    }

    let root = BitMapBackend::new(path, (1200, 900)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| EegError::PlotError(format!("failed to fill plot background: {:?}", e)))?;
    let panels = root.split_evenly((3, 1));

    let n = notes.len();
    let panel_specs: [(&str, Vec<f64>); 3] = [
        (
            "MIDI Pitch Over Time",
            notes.iter().map(|p| p.pitch as f64).collect(),
        ),
        (
            "Step Intervals Over Time",
            notes.iter().map(|p| p.step).collect(),
        ),
        (
            "Note Duration Over Time",
            notes.iter().map(|p| p.duration).collect(),
        ),
    ];

    for (panel, (title, values)) in panels.iter().zip(panel_specs) {
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let pad = ((max - min) * 0.1).max(0.5);

        let mut chart = ChartBuilder::on(panel)
            .caption(title, ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(35)
            .y_label_area_size(55)
            .build_cartesian_2d(1..n.max(2), (min - pad)..(max + pad))
            .map_err(|e| EegError::PlotError(format!("failed to build chart: {:?}", e)))?;

        chart
            .configure_mesh()
            .x_desc("Interval")
            .draw()
            .map_err(|e| EegError::PlotError(format!("failed to draw mesh: {:?}", e)))?;

        chart
            .draw_series(LineSeries::new(
                values.iter().enumerate().map(|(i, &v)| (i + 1, v)),
                BLUE.stroke_width(2),
            ))
            .map_err(|e| EegError::PlotError(format!("failed to draw series: {:?}", e)))?;

        chart
            .draw_series(
                values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| Circle::new((i + 1, v), 3, BLUE.filled())),
            )
            .map_err(|e| EegError::PlotError(format!("failed to draw markers: {:?}", e)))?;
    }

    Ok(())
}

/// Dump decoded MIDI events as CSV for inspection
pub fn write_midi_csv(midi_bytes: &[u8], path: &Path) -> Result<()> {
    let decoded = midi::decode_notes(midi_bytes)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;

    // Meta rows carry their value in the third column; note rows use
    // pitch + velocity
    writeln!(file, "event,tick,value,velocity")?;
    writeln!(file, "tempo_uspq,0,{},", decoded.tempo_uspq)?;
    if let Some(key) = &decoded.key_label {
        writeln!(file, "key,0,{},", key)?;
    }
    for note in &decoded.notes {
        writeln!(
            file,
            "note_on,{},{},{}",
            note.start_tick, note.pitch, note.velocity
        )?;
        writeln!(
            file,
            "note_off,{},{},{}",
            note.end_tick, note.pitch, note.velocity
        )?;
    }

    Ok(())
}
