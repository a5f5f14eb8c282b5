use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod resolver;
pub mod youtube;

pub use resolver::{ResolveError, SecondaryResolver};
pub use youtube::YoutubeTranscriptApi;

/// Individual timed line of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// A language a track can be machine-translated into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationLanguage {
    pub language: String,
    pub language_code: String,
}

/// One caption track offered for a video
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    /// Produced by automatic speech recognition
    pub is_generated: bool,
    pub is_translatable: bool,
    pub base_url: String,
    pub translation_languages: Vec<TranslationLanguage>,
}

impl CaptionTrack {
    /// Check that the track can be served translated into `language_code`
    pub fn ensure_translatable(&self, language_code: &str) -> Result<(), ApiError> {
        if !self.is_translatable {
            return Err(ApiError::NotTranslatable(self.video_id.clone()));
        }

        if !self
            .translation_languages
            .iter()
            .any(|t| t.language_code == language_code)
        {
            return Err(ApiError::TranslationLanguageNotAvailable(language_code.to_string()));
        }

        Ok(())
    }
}

/// Tracks listed for a video, in the order the platform returned them
#[derive(Debug, Clone, Default)]
pub struct TrackList {
    pub video_id: String,
    pub tracks: Vec<CaptionTrack>,
}

impl TrackList {
    /// Track for the first matching language code, manual tracks before generated ones
    pub fn find(&self, language_codes: &[&str]) -> Result<&CaptionTrack, ApiError> {
        for code in language_codes {
            let matching = |generated: bool| {
                self.tracks
                    .iter()
                    .find(|t| t.language_code == *code && t.is_generated == generated)
            };
            if let Some(track) = matching(false).or_else(|| matching(true)) {
                return Ok(track);
            }
        }

        Err(ApiError::NoTranscriptFound {
            video_id: self.video_id.clone(),
            languages: language_codes.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn first_manual(&self) -> Option<&CaptionTrack> {
        self.tracks.iter().find(|t| !t.is_generated)
    }

    pub fn first_generated(&self) -> Option<&CaptionTrack> {
        self.tracks.iter().find(|t| t.is_generated)
    }
}

/// Failures reported by the transcript API
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("No transcript found for {video_id} in languages {languages:?}")]
    NoTranscriptFound {
        video_id: String,
        languages: Vec<String>,
    },

    #[error("Transcripts are disabled for {0}")]
    TranscriptsDisabled(String),

    #[error("Transcript for {0} is not translatable")]
    NotTranslatable(String),

    #[error("Translation language not available: {0}")]
    TranslationLanguageNotAvailable(String),

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("Video {0} is unplayable: {1}")]
    VideoUnplayable(String, String),

    #[error("Video {0} is age restricted")]
    AgeRestricted(String),

    #[error("Request for {0} was blocked (sign-in required)")]
    RequestBlocked(String),

    #[error("IP blocked while fetching {0}")]
    IpBlocked(String),

    #[error("Transcript for {0} requires a PO token")]
    PoTokenRequired(String),

    #[error("Failed to answer the consent page for {0}")]
    ConsentFailed(String),

    #[error("Could not parse YouTube data for {0}")]
    Unparsable(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl ApiError {
    /// Expected absence of a transcript, as opposed to a failure talking to the platform
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            ApiError::NoTranscriptFound { .. } | ApiError::TranscriptsDisabled(_)
        )
    }
}

/// Direct access to the platform's transcript listing
#[async_trait]
pub trait TranscriptApi: Send + Sync {
    /// List every caption track of a video
    async fn list_tracks(&self, video_id: &str) -> Result<TrackList, ApiError>;

    /// Fetch a track, optionally machine-translated into `translate_to`
    async fn fetch_track(
        &self,
        track: &CaptionTrack,
        translate_to: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>, ApiError>;
}
