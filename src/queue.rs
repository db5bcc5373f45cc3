//! Fire-and-forget job dispatch for pipeline units.
//!
//! Uploads and on-demand triggers enqueue jobs and return immediately; a
//! single consumer drains the channel and spawns one task per job, so units
//! for different documents run concurrently. A per-(document, kind) in-flight
//! guard drops duplicate dispatches, closing the double-submit window that a
//! redelivered or double-clicked request would otherwise open.

use crate::pipeline::PipelineService;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

/// Kind of pipeline unit to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Primary pipeline for a freshly uploaded document.
    Process,
    /// On-demand summary regeneration from existing notes.
    Summary,
    /// On-demand quiz regeneration from existing notes.
    Quiz,
}

/// One unit of work for the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Job {
    /// What to run.
    pub kind: JobKind,
    /// Target document.
    pub document_id: Uuid,
}

/// Handle for enqueuing pipeline jobs.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
    in_flight: Arc<Mutex<HashSet<(Uuid, JobKind)>>>,
}

impl JobQueue {
    /// Start the queue consumer over the given pipeline and return the
    /// dispatch handle.
    pub fn start(pipeline: Arc<PipelineService>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let in_flight = Arc::new(Mutex::new(HashSet::new()));

        let guard = Arc::clone(&in_flight);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let pipeline = Arc::clone(&pipeline);
                let guard = Arc::clone(&guard);
                tokio::spawn(async move {
                    run_job(&pipeline, job).await;
                    guard.lock().await.remove(&(job.document_id, job.kind));
                });
            }
            tracing::debug!("Job queue consumer stopped");
        });

        Self { tx, in_flight }
    }

    /// Enqueue a job. Returns `false` when an identical job is already in
    /// flight or the consumer has shut down.
    pub async fn dispatch(&self, job: Job) -> bool {
        let key = (job.document_id, job.kind);
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(key) {
                tracing::warn!(
                    document_id = %job.document_id,
                    kind = ?job.kind,
                    "Duplicate dispatch dropped"
                );
                return false;
            }
        }

        if self.tx.send(job).is_err() {
            tracing::error!(
                document_id = %job.document_id,
                kind = ?job.kind,
                "Job queue is closed; dispatch dropped"
            );
            self.in_flight.lock().await.remove(&key);
            return false;
        }

        tracing::debug!(document_id = %job.document_id, kind = ?job.kind, "Job dispatched");
        true
    }
}

async fn run_job(pipeline: &PipelineService, job: Job) {
    match job.kind {
        JobKind::Process => pipeline.process_document(job.document_id).await,
        JobKind::Summary => pipeline.generate_summary_from_notes(job.document_id).await,
        JobKind::Quiz => pipeline.generate_quiz_from_notes(job.document_id).await,
    }
}
