//! One-off processing of a single diary
//!
//! Starts a fresh run (same reset as an edit) and executes it in the
//! foreground instead of handing it to the server's queue. A server that is
//! running concurrently sees the new run token and drops its own stale run.

use anyhow::{bail, Result};
use momento_core::ai::{AIClient, AnalysisClient};
use momento_core::{AppConfig, Database, DiaryProcessor, ProcessOutcome, ProcessingJob};

pub async fn cmd_process(db: &Database, config: &AppConfig, diary_id: i64) -> Result<()> {
    let Some(status) = db.requeue_diary(diary_id)? else {
        bail!("Diary {} not found", diary_id);
    };

    let processor = DiaryProcessor::new(
        db.clone(),
        AnalysisClient::from_config(config),
        AIClient::from_config(config),
        config.pipeline,
    );

    processor.announce_queued(diary_id).await;

    println!(
        "🔄 Processing diary #{} (run {}, pipeline: {})...",
        diary_id, status.run_token, config.pipeline
    );

    match processor
        .run(ProcessingJob::new(diary_id, status.run_token))
        .await
    {
        ProcessOutcome::Finished(final_status) => {
            println!("✅ Finished with status {}", final_status);
            if let Some(diary) = db.get_diary(diary_id)? {
                if let Some(emotion) = diary.emotion {
                    println!("   Emotion: {}", emotion);
                }
                if let Some(url) = diary.image_url {
                    println!("   Image: {}", url);
                }
            }
            let tags = db.get_diary_tags(diary_id)?;
            if !tags.is_empty() {
                let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
                println!("   Tags: {}", names.join(", "));
            }
            Ok(())
        }
        ProcessOutcome::Stale => {
            println!("⚠️  Run was superseded by a newer edit; nothing written");
            Ok(())
        }
        ProcessOutcome::Missing => bail!("Diary {} was deleted during processing", diary_id),
        ProcessOutcome::Failed => bail!("Processing diary {} failed (see log)", diary_id),
    }
}
