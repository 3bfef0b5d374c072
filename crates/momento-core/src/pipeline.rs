//! Diary processing pipeline
//!
//! A [`ProcessingJob`] names one run of one diary: the diary ID plus the run
//! token the diary held when the job was queued. [`DiaryProcessor`] carries
//! the run through ANALYZING to COMPLETED (or FAILED), in one of two modes:
//!
//! - `Analysis`: the analysis server returns emotion and image URL
//! - `Tags`: the completion API extracts tags, which are linked to the diary
//!   and reduced to a coarse emotion label
//!
//! Every database write is conditional on the run token, so a run overtaken
//! by an edit stops quietly instead of clobbering the newer run.

use tracing::{debug, error, info, warn};

use crate::ai::{AIBackend, AIClient, AnalysisBackend, AnalysisClient, StatusUpdate};
use crate::config::PipelineMode;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Diary, ProcessingStatus};
use crate::tags::derive_emotion;

/// One processing run of one diary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingJob {
    pub diary_id: i64,
    pub run_token: i64,
}

impl ProcessingJob {
    pub fn new(diary_id: i64, run_token: i64) -> Self {
        Self {
            diary_id,
            run_token,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The run wrote its result; carries the status it recorded
    Finished(ProcessingStatus),
    /// A newer run (or a finished one) owns the diary; nothing was written
    Stale,
    /// The diary was deleted before the run started
    Missing,
    /// The run failed and was marked FAILED
    Failed,
}

/// Runs processing jobs against the database and AI backends
#[derive(Clone)]
pub struct DiaryProcessor {
    db: Database,
    analysis: Option<AnalysisClient>,
    ai: Option<AIClient>,
    mode: PipelineMode,
}

impl DiaryProcessor {
    pub fn new(
        db: Database,
        analysis: Option<AnalysisClient>,
        ai: Option<AIClient>,
        mode: PipelineMode,
    ) -> Self {
        Self {
            db,
            analysis,
            ai,
            mode,
        }
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    /// Run a job to completion, converting any error into a FAILED status
    ///
    /// Never returns an error: failures are logged and recorded.
    pub async fn run(&self, job: ProcessingJob) -> ProcessOutcome {
        match self.process(job).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    diary_id = job.diary_id,
                    run_token = job.run_token,
                    error = %e,
                    "Diary processing failed"
                );
                self.mark_failed(job, &e.to_string()).await;
                ProcessOutcome::Failed
            }
        }
    }

    /// Run a job, returning the first error instead of recording it
    pub async fn process(&self, job: ProcessingJob) -> Result<ProcessOutcome> {
        let Some(diary) = self.db.get_diary(job.diary_id)? else {
            debug!(diary_id = job.diary_id, "Diary gone before processing");
            return Ok(ProcessOutcome::Missing);
        };

        if !self.db.mark_analyzing(job.diary_id, job.run_token)? {
            debug!(
                diary_id = job.diary_id,
                run_token = job.run_token,
                "Run superseded before it started"
            );
            return Ok(ProcessOutcome::Stale);
        }
        self.push_status(job.diary_id, StatusUpdate::new(ProcessingStatus::Analyzing))
            .await;

        let outcome = match self.mode {
            PipelineMode::Analysis => self.run_analysis(job, &diary).await?,
            PipelineMode::Tags => self.run_tags(job, &diary).await?,
        };

        if outcome == ProcessOutcome::Stale {
            info!(
                diary_id = job.diary_id,
                run_token = job.run_token,
                "Discarded result of superseded run"
            );
        }
        Ok(outcome)
    }

    async fn run_analysis(&self, job: ProcessingJob, diary: &Diary) -> Result<ProcessOutcome> {
        let analysis = self
            .analysis
            .as_ref()
            .ok_or_else(|| Error::Config("Analysis server not configured".into()))?;

        let result = analysis.analyze(diary.id, &diary.content).await?;
        let applied = self.db.record_analysis(
            job.diary_id,
            job.run_token,
            result.status,
            result.emotion.as_deref(),
            result.image_url.as_deref(),
        )?;
        if !applied {
            return Ok(ProcessOutcome::Stale);
        }

        let mut update = StatusUpdate::new(result.status);
        if result.status == ProcessingStatus::Completed {
            update.emotion = result.emotion;
            update.image_url = result.image_url;
        }
        self.push_status(job.diary_id, update).await;

        Ok(ProcessOutcome::Finished(result.status))
    }

    async fn run_tags(&self, job: ProcessingJob, diary: &Diary) -> Result<ProcessOutcome> {
        let ai = self
            .ai
            .as_ref()
            .ok_or_else(|| Error::Config("Completion API not configured".into()))?;

        let extracted = ai.extract_tags(&diary.content).await;
        debug!(diary_id = diary.id, count = extracted.len(), "Tags extracted");

        let mut tag_ids = Vec::with_capacity(extracted.len());
        for tag in &extracted {
            tag_ids.push(self.db.find_or_create_tag(&tag.name, tag.tag_category())?);
        }
        if !self
            .db
            .link_tags_for_run(job.diary_id, job.run_token, &tag_ids)?
        {
            return Ok(ProcessOutcome::Stale);
        }

        // Judge the emotion on the distinct tags, as linked
        let mut names: Vec<&str> = Vec::with_capacity(extracted.len());
        for tag in &extracted {
            if !names.contains(&tag.name.as_str()) {
                names.push(tag.name.as_str());
            }
        }
        let emotion = derive_emotion(&names);
        if !self
            .db
            .complete_tag_run(job.diary_id, job.run_token, emotion.as_str())?
        {
            return Ok(ProcessOutcome::Stale);
        }

        let mut update = StatusUpdate::new(ProcessingStatus::Completed);
        update.emotion = Some(emotion.as_str().to_string());
        self.push_status(job.diary_id, update).await;

        Ok(ProcessOutcome::Finished(ProcessingStatus::Completed))
    }

    /// Record a run as FAILED (best effort; failures here are only logged)
    pub async fn mark_failed(&self, job: ProcessingJob, reason: &str) {
        match self.db.fail_run(job.diary_id, job.run_token) {
            Ok(true) => {
                warn!(
                    diary_id = job.diary_id,
                    run_token = job.run_token,
                    "Diary marked as failed"
                );
                self.push_status(job.diary_id, StatusUpdate::failed(reason))
                    .await;
            }
            Ok(false) => {
                debug!(
                    diary_id = job.diary_id,
                    run_token = job.run_token,
                    "Failed run was already superseded"
                );
            }
            Err(e) => {
                error!(
                    diary_id = job.diary_id,
                    error = %e,
                    "Failed to mark diary as failed"
                );
            }
        }
    }

    /// Tell the analysis server a new run is waiting (best effort)
    ///
    /// Called once the run's transaction has committed, before the run is
    /// handed to a worker.
    pub async fn announce_queued(&self, diary_id: i64) {
        self.push_status(diary_id, StatusUpdate::new(ProcessingStatus::Queued))
            .await;
    }

    /// Tell the analysis server about a status change (best effort)
    async fn push_status(&self, diary_id: i64, update: StatusUpdate) {
        let Some(ref analysis) = self.analysis else {
            return;
        };
        if let Err(e) = analysis.push_status(diary_id, &update).await {
            warn!(diary_id, status = %update.status, error = %e, "Status push failed");
        }
    }
}
