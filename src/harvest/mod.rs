use anyhow::Context;
use chrono::{DateTime, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::extractors::{SubtitleFetcher, VideoItem};
use crate::output::{write_index, VideoRecord};
use crate::transcripts::TranscriptApi;
use crate::{HarvestError, Result};

pub mod cascade;

pub use cascade::{AttemptResult, CascadeController, CascadeReport, CascadeSettings, Stage};

/// Counts reported at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub ok: usize,
    pub missing: usize,
    pub error: usize,
    pub total: usize,
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn from_records(records: &[VideoRecord], started_at: DateTime<Utc>, interrupted: bool) -> Self {
        let count = |label: &str| records.iter().filter(|r| r.status.label() == label).count();
        Self {
            ok: count("ok"),
            missing: count("missing"),
            error: count("error"),
            total: records.len(),
            interrupted,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Print the one-line operator summary
    pub fn print(&self) {
        let elapsed = (self.finished_at - self.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        println!(
            "{} OK: {} | Missing: {} | Errors: {} | Total: {} ({})",
            style("[done]").bold(),
            style(self.ok).green(),
            style(self.missing).yellow(),
            style(self.error).red(),
            self.total,
            crate::utils::format_duration(elapsed)
        );
        if self.interrupted {
            println!("{} run interrupted, index holds partial results", style("[warn]").yellow());
        }
    }
}

/// Runs the cascade over every video and writes the index
pub struct HarvestPipeline {
    cascade: CascadeController,
    index_file: PathBuf,
    pause: Duration,
    show_progress: bool,
}

impl HarvestPipeline {
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn SubtitleFetcher>,
        api: Arc<dyn TranscriptApi>,
        show_progress: bool,
    ) -> Self {
        Self {
            cascade: CascadeController::new(fetcher, api, CascadeSettings::from(config)),
            index_file: config.paths.index_file.clone(),
            pause: Duration::from_secs_f64(config.pacing.pause_between_videos),
            show_progress,
        }
    }

    /// Process `videos`, stopping early on Ctrl-C
    pub async fn run(&self, videos: &[VideoItem]) -> Result<RunSummary> {
        self.run_until(videos, shutdown_signal()).await
    }

    /// Process `videos` until done or until `shutdown` resolves; the index is written either way
    pub async fn run_until<F>(&self, videos: &[VideoItem], shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        if videos.is_empty() {
            return Err(HarvestError::NoVideos("the video list is empty".into()).into());
        }

        let started_at = Utc::now();
        tracing::info!("Downloading transcripts for {} videos", videos.len());

        let progress = if self.show_progress {
            let progress = ProgressBar::new(videos.len() as u64);
            progress.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .context("Invalid progress template")?,
            );
            progress
        } else {
            ProgressBar::hidden()
        };

        tokio::pin!(shutdown);
        let mut records: Vec<VideoRecord> = Vec::with_capacity(videos.len());
        let mut interrupted = false;

        for video in videos {
            progress.set_message(video.id.clone());

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    interrupted = true;
                    break;
                }
                report = self.cascade.process(video) => {
                    tracing::info!(
                        "{} -> {} after {} attempts",
                        video.id,
                        report.record.status.label(),
                        report.attempts.len()
                    );
                    records.push(report.record);
                }
            }

            progress.inc(1);

            if !self.pause.is_zero() {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.pause) => {}
                }
            }
        }

        progress.finish_and_clear();
        if interrupted {
            tracing::warn!(
                "Interrupted by user after {} of {} videos",
                records.len(),
                videos.len()
            );
        }

        write_index(&self.index_file, &records)
            .with_context(|| format!("Failed to write index {}", self.index_file.display()))?;
        tracing::info!("Index written to {}", self.index_file.display());

        Ok(RunSummary::from_records(&records, started_at, interrupted))
    }
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{FetchOutcome, MockSubtitleFetcher, Strategy};
    use crate::output::index::read_index;
    use crate::transcripts::testing::FakeApi;
    use std::path::Path;
    use tokio::sync::Notify;

    fn config(root: &Path) -> Config {
        let mut config = Config::default();
        config.paths.subs_dir = root.join("subs");
        config.paths.index_file = root.join("chunks").join("transcripts_index.jsonl");
        config.pacing.pause_between_videos = 0.0;
        config
    }

    fn write_en(dir: &Path, id: &str) {
        fs_err::write(dir.join(format!("Transcript [{}].en.srt", id)), "z".repeat(500)).unwrap();
    }

    #[tokio::test]
    async fn test_one_record_per_video() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());

        let mut fetcher = MockSubtitleFetcher::new();
        fetcher.expect_supports_impersonation().returning(|| false);
        fetcher.expect_attempt().returning(|video, dir, strategy| match video.id.as_str() {
            "good" if *strategy == Strategy::Direct => {
                write_en(dir, &video.id);
                Ok(FetchOutcome::default())
            }
            "broken" => Err(anyhow::anyhow!("spawn failed")),
            _ => Ok(FetchOutcome::default()),
        });

        let api = FakeApi {
            disabled: true,
            ..Default::default()
        };
        let pipeline = HarvestPipeline::new(&config, Arc::new(fetcher), Arc::new(api), false);
        let videos = vec![
            VideoItem::from_id("good"),
            VideoItem::from_id("absent"),
            VideoItem::from_id("broken"),
        ];

        let summary = pipeline
            .run_until(&videos, std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!((summary.ok, summary.missing, summary.error, summary.total), (1, 1, 1, 3));
        assert!(!summary.interrupted);

        let records = read_index(&config.paths.index_file).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["good", "absent", "broken"]);

        let ok = &records[0];
        assert!(ok.paths.iter().all(|p| p.exists()));
        assert!(ok.paths[0].to_string_lossy().ends_with(".en.srt"));
    }

    #[tokio::test]
    async fn test_interrupt_keeps_partial_results() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let interrupt = Arc::new(Notify::new());

        let mut fetcher = MockSubtitleFetcher::new();
        let trigger = interrupt.clone();
        fetcher.expect_attempt().times(1).returning(move |video, dir, _| {
            write_en(dir, &video.id);
            trigger.notify_one();
            Ok(FetchOutcome::default())
        });

        let pipeline = HarvestPipeline::new(&config, Arc::new(fetcher), Arc::new(FakeApi::default()), false);
        let videos = vec![VideoItem::from_id("first"), VideoItem::from_id("second")];

        let waiter = interrupt.clone();
        let summary = pipeline
            .run_until(&videos, async move { waiter.notified().await })
            .await
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.total, 1);
        let records = read_index(&config.paths.index_file).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "first");
    }

    #[tokio::test]
    async fn test_empty_video_list_leaves_index_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let pipeline = HarvestPipeline::new(
            &config,
            Arc::new(MockSubtitleFetcher::new()),
            Arc::new(FakeApi::default()),
            false,
        );

        let err = pipeline.run_until(&[], std::future::pending::<()>()).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<HarvestError>(), Some(HarvestError::NoVideos(_))));
        assert!(!config.paths.index_file.exists());
    }
}
