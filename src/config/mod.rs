use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::HarvestError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filesystem layout
    pub paths: PathsConfig,

    /// yt-dlp invocation settings
    pub extractor: ExtractorConfig,

    /// Authentication passed to the extractor
    pub auth: AuthConfig,

    /// Where the video list comes from
    pub source: SourceConfig,

    /// Request pacing between videos
    pub pacing: PacingConfig,

    /// Text splitting for the chunk command
    pub chunking: ChunkingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Newline-delimited list of videos to process
    pub ids_file: PathBuf,

    /// Root for per-video subtitle directories
    pub subs_dir: PathBuf,

    /// JSONL index rewritten at the end of every run
    pub index_file: PathBuf,

    /// Output directory for chunked documents
    pub chunks_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Path or name of the yt-dlp binary
    pub binary: String,

    /// Subtitle languages requested, in priority order
    pub sub_langs: Vec<String>,

    /// Seconds to sleep between requests
    pub sleep_requests: u32,

    /// Lower bound of the randomized sleep before each download
    pub sleep_interval: u32,

    /// Upper bound of the randomized sleep before each download
    pub max_sleep_interval: u32,

    /// Retry count handed to yt-dlp
    pub retries: u32,

    /// Browser identities tried when `--impersonate` is supported
    pub impersonate_clients: Vec<String>,

    /// Player clients tried when `--impersonate` is not supported
    pub player_clients: Vec<String>,

    /// Files at or below this size are treated as absent
    pub min_file_bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Browser profile for `--cookies-from-browser`, e.g. "chrome:Profile 1"
    pub browser_profile: Option<String>,

    /// Netscape cookie file for `--cookies`
    pub cookies_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Channel listing used when the ids file yields nothing
    pub channel_url: Option<String>,

    /// Maximum number of videos per run (0 = unlimited)
    pub max_videos: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause after every video, in seconds
    pub pause_between_videos: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            ids_file: PathBuf::from("data/video_ids.jsonl"),
            subs_dir: PathBuf::from("data/raw/subs"),
            index_file: PathBuf::from("data/chunks/transcripts_index.jsonl"),
            chunks_dir: PathBuf::from("data/chunks"),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            sub_langs: vec!["en-US".to_string(), "en".to_string()],
            sleep_requests: 3,
            sleep_interval: 3,
            max_sleep_interval: 8,
            retries: 15,
            impersonate_clients: vec![
                "chrome".to_string(),
                "safari15_3".to_string(),
                "edge".to_string(),
            ],
            player_clients: vec![
                "ios".to_string(),
                "android".to_string(),
                "web_creator".to_string(),
            ],
            min_file_bytes: 100,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            pause_between_videos: 1.0,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub browser_profile: Option<String>,
    pub cookies_file: Option<PathBuf>,
    pub channel_url: Option<String>,
    pub max_videos: Option<usize>,
    pub ids_file: Option<PathBuf>,
    pub subs_dir: Option<PathBuf>,
    pub index_file: Option<PathBuf>,
    pub pause_between_videos: Option<f64>,
}

impl Config {
    /// Load configuration from an explicit path, the working directory or the user config dir
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path().ok().filter(|path| path.exists()),
        };

        let config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("transcript-harvester").join("config.yaml"))
    }

    /// Fold command line / environment values over the file values
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(profile) = overrides.browser_profile.filter(|p| !p.trim().is_empty()) {
            self.auth.browser_profile = Some(profile);
        }
        if let Some(cookies) = overrides.cookies_file {
            self.auth.cookies_file = Some(cookies);
        }
        if let Some(channel) = overrides.channel_url.filter(|c| !c.trim().is_empty()) {
            self.source.channel_url = Some(channel);
        }
        if let Some(max) = overrides.max_videos {
            self.source.max_videos = max;
        }
        if let Some(ids) = overrides.ids_file {
            self.paths.ids_file = ids;
        }
        if let Some(subs) = overrides.subs_dir {
            self.paths.subs_dir = subs;
        }
        if let Some(index) = overrides.index_file {
            self.paths.index_file = index;
        }
        if let Some(pause) = overrides.pause_between_videos {
            self.pacing.pause_between_videos = pause;
        }

        self.validate()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(HarvestError::InvalidConfig("chunk_size must be positive".into()).into());
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(HarvestError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            ))
            .into());
        }

        if !self.pacing.pause_between_videos.is_finite() || self.pacing.pause_between_videos < 0.0
        {
            return Err(HarvestError::InvalidConfig(
                "pause_between_videos must be a non-negative number of seconds".into(),
            )
            .into());
        }

        if let Some(channel) = &self.source.channel_url {
            crate::utils::validate_url(channel)
                .map_err(|e| HarvestError::InvalidConfig(format!("channel_url: {e}")))?;
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Ids File: {}", self.paths.ids_file.display());
        println!("  Subtitles Dir: {}", self.paths.subs_dir.display());
        println!("  Index File: {}", self.paths.index_file.display());
        println!("  Chunks Dir: {}", self.paths.chunks_dir.display());
        println!("  Extractor: {}", self.extractor.binary);
        if let Some(profile) = &self.auth.browser_profile {
            println!("  Browser Profile: {}", profile);
        }
        if let Some(cookies) = &self.auth.cookies_file {
            println!("  Cookies File: {}", cookies.display());
        }
        if let Some(channel) = &self.source.channel_url {
            println!("  Channel: {}", channel);
        }
        println!("  Max Videos: {}", self.source.max_videos);
        println!("  Pause Between Videos: {}s", self.pacing.pause_between_videos);
        println!(
            "  Chunking: {} chars, {} overlap",
            self.chunking.chunk_size, self.chunking.chunk_overlap
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_layout() {
        let config = Config::default();
        assert_eq!(config.paths.subs_dir, PathBuf::from("data/raw/subs"));
        assert_eq!(config.extractor.sub_langs, vec!["en-US", "en"]);
        assert_eq!(config.extractor.impersonate_clients, vec!["chrome", "safari15_3", "edge"]);
        assert_eq!(config.extractor.player_clients, vec!["ios", "android", "web_creator"]);
        assert_eq!(config.extractor.min_file_bytes, 100);
        assert_eq!(config.source.max_videos, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(
            &path,
            "source:\n  channel_url: https://www.youtube.com/@example/videos\n  max_videos: 5\npacing:\n  pause_between_videos: 0.5\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.source.max_videos, 5);
        assert_eq!(config.pacing.pause_between_videos, 0.5);
        assert_eq!(config.extractor.retries, 15);
        assert_eq!(config.chunking.chunk_size, 1000);
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = Config::default();
        config.auth.cookies_file = Some(PathBuf::from("old.txt"));

        config
            .apply_overrides(Overrides {
                browser_profile: Some("chrome:Profile 1".to_string()),
                max_videos: Some(3),
                channel_url: Some("   ".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.auth.browser_profile.as_deref(), Some("chrome:Profile 1"));
        assert_eq!(config.auth.cookies_file, Some(PathBuf::from("old.txt")));
        assert_eq!(config.source.max_videos, 3);
        assert!(config.source.channel_url.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.chunking.chunk_overlap = 1000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.source.channel_url = Some("ftp://example.com/channel".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pacing.pause_between_videos = -1.0;
        assert!(config.validate().is_err());
    }
}
