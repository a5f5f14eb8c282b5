//! Transcript Harvester - A Rust CLI tool for collecting English transcripts from YouTube
//!
//! This library resolves subtitles for a list of videos through a cascade of strategies
//! (yt-dlp, browser impersonation, alternate player clients and the public transcript API),
//! writes them as SRT files and prepares text chunks for retrieval pipelines.

pub mod chunking;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod harvest;
pub mod output;
pub mod sources;
pub mod transcripts;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{FetchOutcome, Strategy, SubtitleFetcher, VideoItem};
pub use harvest::{CascadeController, HarvestPipeline, RunSummary};
pub use output::{VideoRecord, VideoStatus};
pub use transcripts::{TranscriptApi, TranscriptSegment};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the harvester
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("No videos to process: {0}")]
    NoVideos(String),

    #[error("Extractor tool is not available: {0}")]
    ExtractorUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
