//! Validation tests for job orchestration

use eeg2midi::eeg::{EegReader, Recording};
use eeg2midi::{Config, EegError, EegToMidi, JobStatus, Orchestrator};
use ndarray::Array2;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Deterministic in-memory reader standing in for container decoding
struct SyntheticReader {
    delay: Duration,
    fail: bool,
}

impl SyntheticReader {
    fn instant() -> Self {
        Self {
            delay: Duration::ZERO,
            fail: false,
        }
    }

    fn slow(millis: u64) -> Self {
        Self {
            delay: Duration::from_millis(millis),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            delay: Duration::ZERO,
            fail: true,
        }
    }
}

impl EegReader for SyntheticReader {
    fn read(&self, _path: &Path) -> eeg2midi::Result<Recording> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.fail {
            return Err(EegError::ReaderError("corrupt container".to_string()));
        }

        let sfreq = 256.0;
        let data = Array2::from_shape_fn((2, (12.0 * sfreq) as usize), |(ch, t)| {
            let t = t as f64 / sfreq;
            (2.0 * PI * 2.0 * t).sin()
                + 0.6 * (2.0 * PI * 10.0 * t).sin()
                + 0.3 * (2.0 * PI * (20.0 + ch as f64) * t).sin()
        });
        Ok(Recording { data, sfreq })
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    // Plot rendering is exercised separately; keep orchestration tests lean
    config.viz.enabled = false;
    config
}

fn orchestrator_with(reader: SyntheticReader, output_dir: PathBuf) -> Orchestrator {
    let pipeline = EegToMidi::with_reader(test_config(), Arc::new(reader));
    Orchestrator::new(pipeline, output_dir)
}

fn write_input(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![0u8; 512]).unwrap();
    path
}

async fn wait_for_terminal(orchestrator: &Orchestrator, job_id: &str) -> eeg2midi::JobSnapshot {
    for _ in 0..500 {
        let snapshot = orchestrator.get_status(job_id).await.unwrap();
        if matches!(snapshot.status, JobStatus::Completed | JobStatus::Failed) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not reach a terminal state", job_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_job_completes_with_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "recording.edf");
        let orchestrator = orchestrator_with(SyntheticReader::instant(), dir.path().join("out"));

        let job_id = orchestrator.submit(&input).await.unwrap();
        let snapshot = wait_for_terminal(&orchestrator, &job_id).await;

        assert!(matches!(snapshot.status, JobStatus::Completed));
        assert_eq!(snapshot.progress, 100);
        assert!(snapshot.processing_time.is_some());

        let outputs = snapshot.output_files.unwrap();
        for name in [
            "preprocessed_eeg",
            "music_parameters",
            "global_parameters",
            "midi_file",
            "midi_visualization",
        ] {
            let path = outputs.get(name).unwrap_or_else(|| panic!("missing {}", name));
            assert!(Path::new(path).exists(), "{} not on disk", path);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_submission_conflicts_until_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "recording.edf");
        let orchestrator = orchestrator_with(SyntheticReader::slow(400), dir.path().join("out"));

        let job_id = orchestrator.submit(&input).await.unwrap();

        // Second submission for the same file while the first is active
        let conflict = orchestrator.submit(&input).await;
        assert!(matches!(conflict, Err(EegError::ConflictError(_))));

        let snapshot = wait_for_terminal(&orchestrator, &job_id).await;
        assert!(matches!(snapshot.status, JobStatus::Completed));

        // Once the first job is terminal, a resubmission is accepted
        let second_id = orchestrator.submit(&input).await.unwrap();
        assert_ne!(second_id, job_id);
        wait_for_terminal(&orchestrator, &second_id).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_jobs_for_different_files_run_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_input(dir.path(), "first.edf");
        let second = write_input(dir.path(), "second.edf");
        let orchestrator = orchestrator_with(SyntheticReader::slow(100), dir.path().join("out"));

        let first_id = orchestrator.submit(&first).await.unwrap();
        let second_id = orchestrator.submit(&second).await.unwrap();

        assert!(matches!(
            wait_for_terminal(&orchestrator, &first_id).await.status,
            JobStatus::Completed
        ));
        assert!(matches!(
            wait_for_terminal(&orchestrator, &second_id).await.status,
            JobStatus::Completed
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stage_failure_marks_job_failed() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "recording.edf");
        let orchestrator = orchestrator_with(SyntheticReader::failing(), dir.path().join("out"));

        let job_id = orchestrator.submit(&input).await.unwrap();
        let snapshot = wait_for_terminal(&orchestrator, &job_id).await;

        assert!(matches!(snapshot.status, JobStatus::Failed));
        let error = snapshot.error.unwrap();
        assert!(error.contains("corrupt container"), "unexpected error: {}", error);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_job_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(SyntheticReader::instant(), dir.path().join("out"));

        let result = orchestrator.get_status("no-such-job").await;
        assert!(matches!(result, Err(EegError::NotFoundError(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_validation_rejects_before_processing() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(SyntheticReader::instant(), dir.path().join("out"));

        // Wrong extension
        let wrong = dir.path().join("recording.wav");
        std::fs::write(&wrong, vec![0u8; 512]).unwrap();
        assert!(matches!(
            orchestrator.submit(&wrong).await,
            Err(EegError::ValidationError(_))
        ));

        // Too small to be a plausible recording
        let tiny = dir.path().join("tiny.edf");
        std::fs::write(&tiny, vec![0u8; 10]).unwrap();
        assert!(matches!(
            orchestrator.submit(&tiny).await,
            Err(EegError::ValidationError(_))
        ));

        // Nothing was accepted, so nothing is tracked
        assert_eq!(orchestrator.job_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_store_retention_evicts_oldest_terminal_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.jobs.retain_jobs = 2;
        let pipeline = EegToMidi::with_reader(config, Arc::new(SyntheticReader::instant()));
        let orchestrator = Orchestrator::new(pipeline, dir.path().join("out"));

        for i in 0..4 {
            let input = write_input(dir.path(), &format!("recording_{}.edf", i));
            let job_id = orchestrator.submit(&input).await.unwrap();
            wait_for_terminal(&orchestrator, &job_id).await;
        }

        assert_eq!(orchestrator.job_count().await, 2);
    }
}
