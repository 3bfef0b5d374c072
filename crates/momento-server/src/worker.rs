//! Background processing queue
//!
//! Handlers hand diaries to the queue after their transaction commits and
//! return immediately. A dispatcher task receives jobs and spawns one task
//! per job; each job task is supervised, so an error or a panic inside the
//! processor still ends with the run marked FAILED.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use momento_core::{DiaryProcessor, ProcessingJob};

/// Handle for queueing processing jobs
#[derive(Clone)]
pub struct ProcessingQueue {
    tx: mpsc::UnboundedSender<ProcessingJob>,
    processor: DiaryProcessor,
}

impl ProcessingQueue {
    /// Start the dispatcher task
    ///
    /// The dispatcher runs until every handle to the queue has been dropped.
    pub fn start(processor: DiaryProcessor) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProcessingJob>();

        info!(mode = %processor.mode(), "Starting diary processing queue");

        let dispatcher = processor.clone();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                tokio::spawn(supervise(dispatcher.clone(), job));
            }
            debug!("Processing queue closed");
        });

        Self { tx, processor }
    }

    /// Announce a freshly committed run as QUEUED, then queue it
    pub async fn submit(&self, job: ProcessingJob) -> bool {
        self.processor.announce_queued(job.diary_id).await;
        self.enqueue(job)
    }

    /// Queue a job; returns false if the dispatcher is gone
    pub fn enqueue(&self, job: ProcessingJob) -> bool {
        match self.tx.send(job) {
            Ok(()) => {
                debug!(
                    diary_id = job.diary_id,
                    run_token = job.run_token,
                    "Diary queued for processing"
                );
                true
            }
            Err(_) => {
                error!(diary_id = job.diary_id, "Processing queue is closed");
                false
            }
        }
    }
}

/// Run one job in its own task and record a failure if that task dies
async fn supervise(processor: DiaryProcessor, job: ProcessingJob) {
    let worker = processor.clone();
    let handle = tokio::spawn(async move { worker.run(job).await });

    match handle.await {
        Ok(outcome) => {
            debug!(diary_id = job.diary_id, ?outcome, "Processing finished");
        }
        Err(e) => {
            error!(
                diary_id = job.diary_id,
                run_token = job.run_token,
                error = %e,
                "Processing task aborted"
            );
            processor
                .mark_failed(job, "processing task terminated unexpectedly")
                .await;
        }
    }
}
