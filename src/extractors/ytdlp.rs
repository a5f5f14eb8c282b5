use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::OnceCell;

use super::{FetchOutcome, Strategy, SubtitleFetcher, VideoItem};
use crate::config::{AuthConfig, ExtractorConfig};
use crate::output::subtitles::OUTPUT_TEMPLATE;
use crate::{HarvestError, Result};

const IMPERSONATE_FLAG: &str = "--impersonate";

/// Subtitle fetcher backed by yt-dlp
pub struct YtDlp {
    yt_dlp_path: String,
    options: ExtractorConfig,
    auth: AuthConfig,
    impersonation: OnceCell<bool>,
}

impl YtDlp {
    pub fn new(options: ExtractorConfig, auth: AuthConfig) -> Self {
        Self {
            yt_dlp_path: options.binary.clone(),
            options,
            auth,
            impersonation: OnceCell::new(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Baseline option profile shared by every attempt
    pub fn base_args(&self, output_dir: &Path) -> Vec<String> {
        let opts = &self.options;
        let mut args: Vec<String> = vec![
            "--skip-download".into(),
            "--write-sub".into(),
            "--write-auto-sub".into(),
            "--sub-langs".into(),
            opts.sub_langs.join(","),
            "--sub-format".into(),
            "srt/best".into(),
            "--convert-subs".into(),
            "srt".into(),
            "--sleep-requests".into(),
            opts.sleep_requests.to_string(),
            "--sleep-interval".into(),
            opts.sleep_interval.to_string(),
            "--max-sleep-interval".into(),
            opts.max_sleep_interval.to_string(),
            "--retries".into(),
            opts.retries.to_string(),
            "-N".into(),
            "1".into(),
            "--force-ipv4".into(),
            "--geo-bypass".into(),
            "-o".into(),
            output_dir.join(OUTPUT_TEMPLATE).to_string_lossy().into_owned(),
        ];

        args.extend(self.auth_args());
        args
    }

    /// Cookie options; a browser profile wins over a cookie file
    fn auth_args(&self) -> Vec<String> {
        if let Some(profile) = &self.auth.browser_profile {
            return vec!["--cookies-from-browser".into(), profile.clone()];
        }

        match &self.auth.cookies_file {
            Some(cookies) if cookies.exists() => {
                vec!["--cookies".into(), cookies.to_string_lossy().into_owned()]
            }
            Some(cookies) => {
                tracing::debug!("Cookie file {} not found, skipping", cookies.display());
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Options appended after the baseline for a given strategy
    pub fn strategy_args(strategy: &Strategy) -> Vec<String> {
        match strategy {
            Strategy::Direct => Vec::new(),
            Strategy::Impersonate(client) => vec![IMPERSONATE_FLAG.into(), client.clone()],
            Strategy::PlayerClient(client) => vec![
                "--extractor-args".into(),
                format!("youtube:player_client={}", client),
            ],
        }
    }

    /// Full argument list for one attempt
    pub fn attempt_args(&self, video: &VideoItem, output_dir: &Path, strategy: &Strategy) -> Vec<String> {
        let mut args = self.base_args(output_dir);
        args.extend(Self::strategy_args(strategy));
        args.push(video.url.clone());
        args
    }

    async fn probe_impersonation(&self) -> bool {
        let output = Command::new(&self.yt_dlp_path)
            .arg("--help")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) => {
                let supported = help_mentions_impersonation(
                    &String::from_utf8_lossy(&output.stdout),
                    &String::from_utf8_lossy(&output.stderr),
                );
                tracing::info!("yt-dlp impersonation support: {}", supported);
                supported
            }
            Err(e) => {
                tracing::warn!("Could not probe yt-dlp capabilities: {}", e);
                false
            }
        }
    }

    /// List the videos of a channel without downloading anything
    pub async fn list_channel(&self, channel_url: &str) -> Result<Vec<VideoItem>> {
        tracing::info!("Listing videos for channel: {}", channel_url);

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--skip-download",
                "--flat-playlist",
                "--print",
                "%(id)s\t%(webpage_url)s",
                channel_url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| HarvestError::ExtractorUnavailable(format!("{}: {}", self.yt_dlp_path, e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("Channel listing failed: {}", error.trim());
            return Ok(Vec::new());
        }

        Ok(parse_flat_listing(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[async_trait]
impl SubtitleFetcher for YtDlp {
    async fn attempt(
        &self,
        video: &VideoItem,
        output_dir: &Path,
        strategy: &Strategy,
    ) -> Result<FetchOutcome> {
        let args = self.attempt_args(video, output_dir, strategy);
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| HarvestError::ExtractorUnavailable(format!("{}: {}", self.yt_dlp_path, e)))?;

        Ok(FetchOutcome {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn supports_impersonation(&self) -> bool {
        *self
            .impersonation
            .get_or_init(|| self.probe_impersonation())
            .await
    }
}

fn help_mentions_impersonation(stdout: &str, stderr: &str) -> bool {
    stdout.contains(IMPERSONATE_FLAG) || stderr.contains(IMPERSONATE_FLAG)
}

/// Parse `id<TAB>url` lines printed by a flat playlist listing
fn parse_flat_listing(stdout: &str) -> Vec<VideoItem> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.trim().split('\t');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(id), Some(url), None) if !id.is_empty() && !url.is_empty() && id != "NA" => {
                    let url = if url == "NA" {
                        crate::utils::watch_url(id)
                    } else {
                        url.to_string()
                    };
                    Some(VideoItem::new(id, url))
                }
                _ => None,
            }
        })
        .collect()
}
