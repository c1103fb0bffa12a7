//! Asynchronous pipeline orchestration
//!
//! One orchestrator owns the job store and sequences the pipeline stages
//! for each submitted file. Stages run strictly in order inside a spawned
//! task, with the CPU-bound spectral work dispatched to a blocking thread
//! so status queries stay responsive. The duplicate-submission guard and
//! the job insert happen under one write lock, so two concurrent submits
//! for the same file cannot both pass the check.

use crate::error::{EegError, Result};
use crate::job::{Job, JobSnapshot, JobStatus, JobStore};
use crate::{validate_input, EegToMidi};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Progress checkpoints reported as stages complete
mod checkpoint {
    pub const STARTED: u8 = 10;
    pub const BAND_POWERS: u8 = 30;
    pub const MUSIC_PARAMS: u8 = 50;
    pub const MIDI: u8 = 65;
    pub const MIDI_CSV: u8 = 75;
    pub const PLOTS: u8 = 90;
    pub const DONE: u8 = 100;
}

pub struct Orchestrator {
    pipeline: Arc<EegToMidi>,
    output_dir: PathBuf,
    store: Arc<RwLock<JobStore>>,
}

impl Orchestrator {
    pub fn new(pipeline: EegToMidi, output_dir: PathBuf) -> Self {
        let retain = pipeline.config().jobs.retain_jobs;
        Self {
            pipeline: Arc::new(pipeline),
            output_dir,
            store: Arc::new(RwLock::new(JobStore::new(retain))),
        }
    }

    /// Accept a processing request and start the pipeline in the background.
    ///
    /// Fails with `ValidationError` before any processing if the file is
    /// not acceptable, and with `ConflictError` if an active job already
    /// exists for the same input file.
    pub async fn submit(&self, input: &Path) -> Result<String> {
        validate_input(input, self.pipeline.config())?;

        let input = input.to_path_buf();
        let job_id = generate_job_id();

        {
            let mut store = self.store.write().await;
            if store.has_active_for(&input) {
                return Err(EegError::ConflictError(format!(
                    "file {} is already being processed by another job",
                    input.display()
                )));
            }
            store.insert(Job::new(job_id.clone(), input.clone()));
        }

        info!(job_id = %job_id, input = %input.display(), "job accepted");

        let store = Arc::clone(&self.store);
        let pipeline = Arc::clone(&self.pipeline);
        // Each job writes under its own directory so concurrent jobs for
        // different files cannot clobber each other's artifacts
        let job_dir = self.output_dir.join(&job_id);
        let id = job_id.clone();
        tokio::spawn(async move {
            run_job(store, pipeline, id, input, job_dir).await;
        });

        Ok(job_id)
    }

    /// Snapshot a job's current state
    pub async fn get_status(&self, job_id: &str) -> Result<JobSnapshot> {
        let store = self.store.read().await;
        store
            .get(job_id)
            .map(|job| job.snapshot())
            .ok_or_else(|| EegError::NotFoundError(format!("unknown job '{}'", job_id)))
    }

    /// Number of jobs currently retained in the store
    pub async fn job_count(&self) -> usize {
        self.store.read().await.len()
    }
}

fn generate_job_id() -> String {
    let value: u128 = rand::thread_rng().gen();
    format!("{:032x}", value)
}

async fn update_job<F>(store: &Arc<RwLock<JobStore>>, job_id: &str, f: F)
where
    F: FnOnce(&mut Job),
{
    let mut store = store.write().await;
    if let Some(job) = store.get_mut(job_id) {
        f(job);
    }
}

async fn run_job(
    store: Arc<RwLock<JobStore>>,
    pipeline: Arc<EegToMidi>,
    job_id: String,
    input: PathBuf,
    job_dir: PathBuf,
) {
    update_job(&store, &job_id, |job| {
        job.advance(JobStatus::Processing, checkpoint::STARTED)
    })
    .await;

    match execute_stages(&store, &pipeline, &job_id, &input, &job_dir).await {
        Ok(()) => {
            update_job(&store, &job_id, |job| {
                job.advance(JobStatus::Completed, checkpoint::DONE)
            })
            .await;
            info!(job_id = %job_id, "job completed");
        }
        Err(e) => {
            // Artifacts already written stay on disk for diagnostics
            let message = e.to_string();
            error!(job_id = %job_id, error = %message, "job failed");
            update_job(&store, &job_id, |job| job.fail(message)).await;
        }
    }
}

async fn execute_stages(
    store: &Arc<RwLock<JobStore>>,
    pipeline: &Arc<EegToMidi>,
    job_id: &str,
    input: &Path,
    job_dir: &Path,
) -> Result<()> {
    // Stage 1: spectral feature extraction (CPU bound, off the async threads)
    let (table, wave_path) = {
        let pipeline = Arc::clone(pipeline);
        let input = input.to_path_buf();
        let job_dir = job_dir.to_path_buf();
        tokio::task::spawn_blocking(move || pipeline.extract_stage(&input, &job_dir))
            .await
            .map_err(|e| EegError::StageFailure(format!("extraction task aborted: {}", e)))??
    };
    update_job(store, job_id, |job| {
        job.outputs
            .insert("preprocessed_eeg".to_string(), wave_path.clone());
        job.advance(JobStatus::Processing, checkpoint::BAND_POWERS);
    })
    .await;

    // Stage 2: musical parameter mapping
    let mapping = pipeline.mapping_stage(&table, job_dir)?;
    update_job(store, job_id, |job| {
        job.outputs
            .insert("music_parameters".to_string(), mapping.music_path.clone());
        job.outputs
            .insert("global_parameters".to_string(), mapping.global_path.clone());
        job.advance(JobStatus::Processing, checkpoint::MUSIC_PARAMS);
    })
    .await;

    // Stage 3: MIDI assembly and encoding
    let (midi_bytes, midi_path) = pipeline.midi_stage(&mapping.notes, &mapping.globals, job_dir)?;
    update_job(store, job_id, |job| {
        job.outputs.insert("midi_file".to_string(), midi_path.clone());
        job.advance(JobStatus::Processing, checkpoint::MIDI);
    })
    .await;

    // Stage 4: MIDI event CSV
    let csv_path = pipeline.csv_stage(&midi_bytes, job_dir)?;
    update_job(store, job_id, |job| {
        job.outputs
            .insert("midi_visualization".to_string(), csv_path.clone());
        job.advance(JobStatus::Processing, checkpoint::MIDI_CSV);
    })
    .await;

    // Stage 5: diagnostic plots
    if pipeline.config().viz.enabled {
        let plots_path = {
            let pipeline = Arc::clone(pipeline);
            let table = table.clone();
            let notes = mapping.notes.clone();
            let job_dir = job_dir.to_path_buf();
            tokio::task::spawn_blocking(move || pipeline.plot_stage(&table, &notes, &job_dir))
                .await
                .map_err(|e| EegError::StageFailure(format!("plot task aborted: {}", e)))??
        };
        update_job(store, job_id, |job| {
            job.outputs
                .insert("visualizations".to_string(), plots_path.clone());
            job.advance(JobStatus::Processing, checkpoint::PLOTS);
        })
        .await;
    }

    Ok(())
}
