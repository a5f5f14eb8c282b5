use anyhow::Context;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::extractors::{Strategy, SubtitleFetcher, VideoItem};
use crate::output::subtitles::lang_from_filename;
use crate::output::{SubtitleDir, VideoRecord};
use crate::transcripts::{SecondaryResolver, TranscriptApi};
use crate::utils::format_file_size;
use crate::Result;

/// Knobs for the per-video cascade
#[derive(Debug, Clone)]
pub struct CascadeSettings {
    pub subs_root: PathBuf,
    /// Acceptable languages, highest priority first
    pub languages: Vec<String>,
    pub impersonate_clients: Vec<String>,
    pub player_clients: Vec<String>,
    pub min_file_bytes: u64,
}

impl From<&Config> for CascadeSettings {
    fn from(config: &Config) -> Self {
        Self {
            subs_root: config.paths.subs_dir.clone(),
            languages: config.extractor.sub_langs.clone(),
            impersonate_clients: config.extractor.impersonate_clients.clone(),
            player_clients: config.extractor.player_clients.clone(),
            min_file_bytes: config.extractor.min_file_bytes,
        }
    }
}

/// Where in the cascade an attempt happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Extractor(Strategy),
    SecondaryApi,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extractor(strategy) => write!(f, "{}", strategy),
            Stage::SecondaryApi => write!(f, "secondary_api"),
        }
    }
}

/// One attempt made while resolving a video
#[derive(Debug, Clone)]
pub struct AttemptResult {
    pub stage: Stage,
    pub exit_code: Option<i32>,
    /// Acceptable file present after the attempt
    pub accepted: Option<PathBuf>,
}

/// Everything a cascade produced for one video
#[derive(Debug, Clone)]
pub struct CascadeReport {
    pub record: VideoRecord,
    pub attempts: Vec<AttemptResult>,
}

/// Resolves one video through direct fetch, impersonation or alternate player
/// clients, and finally the transcript API.
pub struct CascadeController {
    fetcher: Arc<dyn SubtitleFetcher>,
    resolver: SecondaryResolver,
    settings: CascadeSettings,
}

impl CascadeController {
    pub fn new(
        fetcher: Arc<dyn SubtitleFetcher>,
        api: Arc<dyn TranscriptApi>,
        settings: CascadeSettings,
    ) -> Self {
        let resolver = SecondaryResolver::new(api, settings.languages.clone());
        Self {
            fetcher,
            resolver,
            settings,
        }
    }

    /// Strategies tried after the direct fetch; impersonation and player clients never mix
    pub fn escalations(&self, impersonation: bool) -> Vec<Strategy> {
        if impersonation {
            self.settings
                .impersonate_clients
                .iter()
                .cloned()
                .map(Strategy::Impersonate)
                .collect()
        } else {
            self.settings
                .player_clients
                .iter()
                .cloned()
                .map(Strategy::PlayerClient)
                .collect()
        }
    }

    /// Run the whole cascade for one video. Failures become an `error` record.
    pub async fn process(&self, video: &VideoItem) -> CascadeReport {
        let subs = SubtitleDir::new(&self.settings.subs_root, &video.id, self.settings.min_file_bytes);
        let mut attempts = Vec::new();

        let record = match self.run(video, &subs, &mut attempts).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Error processing video {}: {:#}", video.id, e);
                VideoRecord::error(&video.id, &video.url, format!("{:#}", e), subs.path().to_path_buf())
            }
        };

        CascadeReport { record, attempts }
    }

    async fn run(
        &self,
        video: &VideoItem,
        subs: &SubtitleDir,
        attempts: &mut Vec<AttemptResult>,
    ) -> Result<VideoRecord> {
        let removed = subs
            .prepare()
            .with_context(|| format!("Failed to prepare {}", subs.path().display()))?;
        if removed > 0 {
            tracing::debug!("Removed {} previous outputs for {}", removed, video.id);
        }

        let mut found = self.attempt(video, subs, Strategy::Direct, attempts).await?;

        if found.is_none() {
            let impersonation = self.fetcher.supports_impersonation().await;
            for strategy in self.escalations(impersonation) {
                found = self.attempt(video, subs, strategy, attempts).await?;
                if found.is_some() {
                    break;
                }
            }
        }

        if found.is_none() {
            tracing::info!("Extractor exhausted for {}, trying transcript API", video.id);
            let resolved = match self.resolver.resolve(&video.id, subs).await {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("Transcript API could not resolve {}: {}", video.id, e);
                    None
                }
            };
            attempts.push(AttemptResult {
                stage: Stage::SecondaryApi,
                exit_code: None,
                accepted: resolved.clone(),
            });
            found = resolved;
        }

        let dir = subs.path().to_path_buf();
        let Some(path) = found else {
            tracing::info!("No transcript for {}", video.id);
            return Ok(VideoRecord::missing(&video.id, &video.url, dir));
        };

        let lang = lang_from_filename(&path)
            .with_context(|| format!("Unexpected subtitle filename {}", path.display()))?;
        let paths = subs.list_subtitles()?;

        Ok(VideoRecord::ok(&video.id, &video.url, lang, paths, dir))
    }

    async fn attempt(
        &self,
        video: &VideoItem,
        subs: &SubtitleDir,
        strategy: Strategy,
        attempts: &mut Vec<AttemptResult>,
    ) -> Result<Option<PathBuf>> {
        tracing::info!("Fetching subtitles for {} ({})", video.id, strategy);

        let outcome = self
            .fetcher
            .attempt(video, subs.path(), &strategy)
            .await
            .with_context(|| format!("{} attempt failed for {}", strategy, video.id))?;

        let accepted = subs.find_acceptable(&self.settings.languages);
        match &accepted {
            Some(path) => {
                let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                tracing::info!(
                    "{} produced {} ({})",
                    strategy,
                    path.display(),
                    format_file_size(size)
                );
            }
            None => tracing::debug!(
                "{} left no acceptable subtitle for {} (exit: {:?}, stderr: {})",
                strategy,
                video.id,
                outcome.exit_code,
                outcome.stderr_tail().unwrap_or("-")
            ),
        }

        attempts.push(AttemptResult {
            stage: Stage::Extractor(strategy),
            exit_code: outcome.exit_code,
            accepted: accepted.clone(),
        });

        Ok(accepted)
    }
}
