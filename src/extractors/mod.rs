use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub mod ytdlp;

use crate::Result;

pub use ytdlp::YtDlp;

/// One unit of work: a video id and the URL handed to the extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub url: String,
}

impl VideoItem {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Build an item that points at the canonical watch page
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let url = crate::utils::watch_url(&id);
        Self { id, url }
    }
}

/// How a single extractor attempt is made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Baseline options only
    Direct,
    /// Mimic a browser's network fingerprint
    Impersonate(String),
    /// Request the video as an alternate internal player client
    PlayerClient(String),
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::Impersonate(client) => write!(f, "impersonate:{}", client),
            Strategy::PlayerClient(client) => write!(f, "player_client:{}", client),
        }
    }
}

/// Captured result of one extractor process.
///
/// The exit status is informational: a failing process may still leave a usable
/// file behind and a successful one may leave nothing.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl FetchOutcome {
    /// Last non-empty stderr line, handy for logs
    pub fn stderr_tail(&self) -> Option<&str> {
        self.stderr.lines().rev().map(str::trim).find(|line| !line.is_empty())
    }
}

/// Trait for tools that write subtitle files for one video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubtitleFetcher: Send + Sync {
    /// Run one attempt, writing any subtitle files into `output_dir`.
    ///
    /// Only a failure to run the tool at all is an error.
    async fn attempt(
        &self,
        video: &VideoItem,
        output_dir: &Path,
        strategy: &Strategy,
    ) -> Result<FetchOutcome>;

    /// Whether the installed tool can impersonate browsers
    async fn supports_impersonation(&self) -> bool;
}
