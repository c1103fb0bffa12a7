//! Job records and the in-memory job store
//!
//! A job moves PENDING -> PROCESSING -> {COMPLETED | FAILED}; the terminal
//! states are immutable. The store is bounded: once more than
//! `retain_jobs` records exist, the oldest terminal jobs are evicted.
//! Active jobs are never evicted.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::time::Instant;

/// Lifecycle state of a processing job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// Orchestration record for one processing run
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub input: PathBuf,
    pub status: JobStatus,
    pub progress: u8,
    pub outputs: BTreeMap<String, PathBuf>,
    pub error: Option<String>,
    pub started: Instant,
    pub finished: Option<Instant>,
}

impl Job {
    pub fn new(id: String, input: PathBuf) -> Self {
        Self {
            id,
            input,
            status: JobStatus::Pending,
            progress: 0,
            outputs: BTreeMap::new(),
            error: None,
            started: Instant::now(),
            finished: None,
        }
    }

    /// Advance status and progress. Terminal jobs are never mutated.
    pub fn advance(&mut self, status: JobStatus, progress: u8) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        // Progress only moves forward
        self.progress = self.progress.max(progress);
        if status.is_terminal() {
            self.finished = Some(Instant::now());
        }
    }

    pub fn fail(&mut self, message: String) {
        if self.status.is_terminal() {
            return;
        }
        self.error = Some(message);
        self.status = JobStatus::Failed;
        self.finished = Some(Instant::now());
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let mut snapshot = JobSnapshot {
            job_id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            output_files: None,
            processing_time: None,
            error: None,
        };
        match self.status {
            JobStatus::Completed => {
                snapshot.output_files = Some(
                    self.outputs
                        .iter()
                        .map(|(k, v)| (k.clone(), v.display().to_string()))
                        .collect(),
                );
                if let Some(finished) = self.finished {
                    let secs = finished.duration_since(self.started).as_secs_f64();
                    snapshot.processing_time = Some((secs * 100.0).round() / 100.0);
                }
            }
            JobStatus::Failed => {
                snapshot.error = self.error.clone();
            }
            _ => {}
        }
        snapshot
    }
}

/// Status-query response shape handed to the API collaborator
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_files: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bounded in-memory job store
#[derive(Debug)]
pub struct JobStore {
    jobs: HashMap<String, Job>,
    insertion_order: VecDeque<String>,
    retain_jobs: usize,
}

impl JobStore {
    pub fn new(retain_jobs: usize) -> Self {
        Self {
            jobs: HashMap::new(),
            insertion_order: VecDeque::new(),
            retain_jobs: retain_jobs.max(1),
        }
    }

    pub fn insert(&mut self, job: Job) {
        self.insertion_order.push_back(job.id.clone());
        self.jobs.insert(job.id.clone(), job);
        self.evict();
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Job> {
        self.jobs.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Is any PENDING or PROCESSING job bound to this input file?
    pub fn has_active_for(&self, input: &std::path::Path) -> bool {
        self.jobs
            .values()
            .any(|job| job.status.is_active() && job.input == input)
    }

    fn evict(&mut self) {
        while self.jobs.len() > self.retain_jobs {
            // Walk from the oldest insertion; skip ids still active
            let Some(pos) = self
                .insertion_order
                .iter()
                .position(|id| {
                    self.jobs
                        .get(id)
                        .map(|job| job.status.is_terminal())
                        .unwrap_or(true)
                })
            else {
                // Everything is still active; nothing can be evicted
                break;
            };
            if let Some(id) = self.insertion_order.remove(pos) {
                self.jobs.remove(&id);
            }
        }
    }
}
