//! Validation tests for the intermediate JSON artifact contract

use eeg2midi::artifacts::{
    format_interval_length, read_artifact, write_artifact, GlobalParametersArtifact,
    MusicParametersArtifact, WaveAnalysisArtifact,
};
use eeg2midi::mapper::{map_global_parameters, map_note_parameters, NoteParameters};
use eeg2midi::spectral::{BandPowerTable, BandPowers};

fn sample_table(n_intervals: usize) -> BandPowerTable {
    BandPowerTable {
        interval_length_secs: 5.0,
        intervals: (0..n_intervals)
            .map(|i| {
                let shift = (i % 3) as f64 * 0.05;
                BandPowers::from_array([0.5 - shift, 0.2, 0.15 + shift, 0.1, 0.05])
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wave_artifact_shape() {
        let artifact = WaveAnalysisArtifact::from_table(&sample_table(1));
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&artifact).unwrap()).unwrap();

        assert_eq!(json["interval_length"], "5");
        let row = json["wave_strengths"]["1"].as_array().unwrap();
        let values: Vec<&str> = row.iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(values, vec!["0.500", "0.200", "0.150", "0.100", "0.050"]);
    }

    #[test]
    fn test_interval_keys_are_one_based_and_numerically_ordered() {
        let artifact = WaveAnalysisArtifact::from_table(&sample_table(12));
        let json = serde_json::to_string_pretty(&artifact).unwrap();

        // "10" must serialize after "9", not lexicographically after "1"
        let positions: Vec<usize> = (1..=12)
            .map(|k| json.find(&format!("\"{}\":", k)).unwrap())
            .collect();
        for window in positions.windows(2) {
            assert!(window[0] < window[1], "interval keys out of order");
        }
    }

    #[test]
    fn test_music_artifact_pinned_values() {
        let notes: Vec<NoteParameters> = sample_table(1)
            .intervals
            .iter()
            .map(map_note_parameters)
            .collect();
        let artifact = MusicParametersArtifact::from_notes(&notes, "5");
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&artifact).unwrap()).unwrap();

        let row = json["musical_parameters"]["1"].as_array().unwrap();
        let values: Vec<&str> = row.iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(values, vec!["56", "2.5", "0.52"]);
    }

    #[test]
    fn test_whole_number_step_and_duration_keep_a_fractional_digit() {
        let notes = vec![
            NoteParameters {
                pitch: 60,
                step: 2.0,
                duration: 0.5,
            },
            NoteParameters {
                pitch: 58,
                step: 3.0,
                duration: 1.0,
            },
        ];
        let artifact = MusicParametersArtifact::from_notes(&notes, "5");
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&artifact).unwrap()).unwrap();

        let row = |k: &str| -> Vec<String> {
            json["musical_parameters"][k]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect()
        };
        assert_eq!(row("1"), vec!["60", "2.0", "0.5"]);
        assert_eq!(row("2"), vec!["58", "3.0", "1.0"]);

        // The text still parses back to the same values
        assert_eq!(artifact.to_notes().unwrap(), notes);
    }

    #[test]
    fn test_global_artifact_shape() {
        let globals = map_global_parameters(&sample_table(4)).unwrap();
        let artifact = GlobalParametersArtifact::from_params(&globals);
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&artifact).unwrap()).unwrap();

        assert!(json["average_wave_strengths"]["delta"].is_number());
        assert!(json["musical_parameters"]["tempo"].is_u64());
        assert_eq!(json["musical_parameters"]["key"], "A minor");
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let artifact = WaveAnalysisArtifact::from_table(&sample_table(11));
        let first = serde_json::to_string_pretty(&artifact).unwrap();
        let second = serde_json::to_string_pretty(&artifact).unwrap();
        assert_eq!(first, second);

        // Parse and re-serialize: still byte identical
        let reparsed: WaveAnalysisArtifact = serde_json::from_str(&first).unwrap();
        assert_eq!(serde_json::to_string_pretty(&reparsed).unwrap(), first);
    }

    #[test]
    fn test_wave_artifact_round_trips_to_table() {
        let table = sample_table(3);
        let artifact = WaveAnalysisArtifact::from_table(&table);
        let restored = artifact.to_table().unwrap();

        assert_eq!(restored.intervals.len(), 3);
        assert_eq!(restored.interval_length_secs, 5.0);
        // Values survive the 3-digit string format within its precision
        for (a, b) in table.intervals.iter().zip(&restored.intervals) {
            for (x, y) in a.as_array().iter().zip(b.as_array()) {
                assert!((x - y).abs() < 5e-4);
            }
        }
    }

    #[test]
    fn test_artifact_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("json").join("music_parameters.json");

        let notes: Vec<NoteParameters> = sample_table(4)
            .intervals
            .iter()
            .map(map_note_parameters)
            .collect();
        let artifact = MusicParametersArtifact::from_notes(&notes, "5");

        write_artifact(&path, &artifact).unwrap();
        let restored: MusicParametersArtifact = read_artifact(&path).unwrap();
        assert_eq!(restored, artifact);
        assert_eq!(restored.to_notes().unwrap(), notes);
    }

    #[test]
    fn test_interval_length_formatting() {
        assert_eq!(format_interval_length(5.0), "5");
        assert_eq!(format_interval_length(2.5), "2.5");
        assert_eq!(format_interval_length(10.0), "10");
    }
}
