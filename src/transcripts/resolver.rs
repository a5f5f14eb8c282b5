use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ApiError, CaptionTrack, TranscriptApi, TranscriptSegment};
use crate::output::{write_srt, SubtitleDir};

/// Language every transcript is translated into when no English track exists
pub const TARGET_LANGUAGE: &str = "en";

/// Why the secondary resolver could not produce a file
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("video has no caption tracks")]
    NoTracks,

    #[error("{} is too small to be a usable transcript", .0.display())]
    Undersized(PathBuf),

    #[error("failed to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Last-resort transcript source that talks to the transcript API directly
pub struct SecondaryResolver {
    api: Arc<dyn TranscriptApi>,
    preferred: Vec<String>,
}

impl SecondaryResolver {
    pub fn new(api: Arc<dyn TranscriptApi>, preferred: Vec<String>) -> Self {
        Self { api, preferred }
    }

    /// Produce an acceptable SRT file for `video_id` inside `subs`.
    ///
    /// Order: preferred English tracks as-is, then the first manual (else generated)
    /// track translated to English, then that same track untranslated.
    pub async fn resolve(&self, video_id: &str, subs: &SubtitleDir) -> Result<PathBuf, ResolveError> {
        let list = self.api.list_tracks(video_id).await?;

        for lang in &self.preferred {
            let track = match list.find(&[lang.as_str()]) {
                Ok(track) => track,
                Err(_) => continue,
            };

            match self.api.fetch_track(track, None).await {
                Ok(segments) => {
                    let path = subs.subtitle_path(lang);
                    write(&path, &segments)?;
                    if subs.is_acceptable(&path) {
                        tracing::info!("Secondary API returned {} transcript for {}", lang, video_id);
                        return Ok(path);
                    }
                    tracing::debug!("{} transcript for {} is undersized", lang, video_id);
                }
                Err(e) if e.is_absence() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let candidate = list
            .first_manual()
            .or_else(|| list.first_generated())
            .ok_or(ResolveError::NoTracks)?;

        tracing::info!(
            "Translating {} track ({}) of {} into {}",
            candidate.language_code,
            if candidate.is_generated { "generated" } else { "manual" },
            video_id,
            TARGET_LANGUAGE
        );

        match self.fetch_translated(candidate).await {
            Ok(segments) => {
                let path = subs.subtitle_path(TARGET_LANGUAGE);
                write(&path, &segments)?;
                accept(subs, path)
            }
            Err(e) => {
                tracing::info!(
                    "Translation unavailable for {} ({}), keeping original {}",
                    video_id,
                    e,
                    candidate.language_code
                );
                let segments = self.api.fetch_track(candidate, None).await?;
                let path = subs.subtitle_path(&candidate.language_code);
                write(&path, &segments)?;
                accept(subs, path)
            }
        }
    }

    async fn fetch_translated(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSegment>, ApiError> {
        track.ensure_translatable(TARGET_LANGUAGE)?;
        self.api.fetch_track(track, Some(TARGET_LANGUAGE)).await
    }
}

fn write(path: &Path, segments: &[TranscriptSegment]) -> Result<(), ResolveError> {
    write_srt(path, segments).map_err(|e| ResolveError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn accept(subs: &SubtitleDir, path: PathBuf) -> Result<PathBuf, ResolveError> {
    if subs.is_acceptable(&path) {
        Ok(path)
    } else {
        Err(ResolveError::Undersized(path))
    }
}
