use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;

#[derive(Parser)]
#[command(
    name = "harvester",
    about = "Transcript Harvester - Collect English transcripts for a list of YouTube videos",
    version,
    long_about = "Resolves subtitles for every video in a list through a cascade of strategies \
(plain yt-dlp, browser impersonation or alternate player clients, then the public transcript API), \
writes them as SRT files with a JSONL index, and splits the result into chunks for retrieval pipelines."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./config.yaml, then the user config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download transcripts for every listed video and write the index
    Fetch(FetchArgs),

    /// List a channel's videos into the ids file
    Ids {
        /// Channel URL to list
        #[arg(long, env = "CHANNEL_URL", value_name = "URL")]
        channel: Option<String>,

        /// Output file (defaults to the configured ids file)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Skip YouTube Shorts
        #[arg(long)]
        exclude_shorts: bool,

        /// Maximum number of videos to keep (0 = unlimited)
        #[arg(long, env = "MAX_VIDEOS", value_name = "COUNT")]
        max_videos: Option<usize>,
    },

    /// Split downloaded transcripts into retrieval chunks
    Chunk {
        /// Index file to read (defaults to the configured index)
        #[arg(long, value_name = "FILE")]
        index: Option<PathBuf>,

        /// Directory for langchain_docs.jsonl and corpus.jsonl
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Maximum characters per chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Characters shared between neighbouring chunks
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration to the user config directory
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct FetchArgs {
    /// Browser profile to read cookies from, e.g. "chrome:Profile 1"
    #[arg(long, env = "BROWSER_PROFILE", value_name = "PROFILE")]
    pub browser_profile: Option<String>,

    /// Netscape cookie file
    #[arg(long, env = "YT_COOKIES", value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    /// Channel listed when the ids file yields no videos
    #[arg(long, env = "CHANNEL_URL", value_name = "URL")]
    pub channel: Option<String>,

    /// Maximum number of videos to process (0 = unlimited)
    #[arg(long, env = "MAX_VIDEOS", value_name = "COUNT")]
    pub max_videos: Option<usize>,

    /// Newline-delimited list of videos
    #[arg(long, value_name = "FILE")]
    pub ids_file: Option<PathBuf>,

    /// Root directory for subtitle files
    #[arg(long, value_name = "DIR")]
    pub subs_dir: Option<PathBuf>,

    /// Index file to write
    #[arg(long, value_name = "FILE")]
    pub index_file: Option<PathBuf>,

    /// Seconds to pause after each video
    #[arg(long, value_name = "SECONDS")]
    pub pause: Option<f64>,
}

impl From<FetchArgs> for Overrides {
    fn from(args: FetchArgs) -> Self {
        Self {
            browser_profile: args.browser_profile,
            cookies_file: args.cookies,
            channel_url: args.channel,
            max_videos: args.max_videos,
            ids_file: args.ids_file,
            subs_dir: args.subs_dir,
            index_file: args.index_file,
            pause_between_videos: args.pause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "harvester",
            "fetch",
            "--ids-file",
            "ids.jsonl",
            "--max-videos",
            "5",
            "--pause",
            "0",
        ])
        .unwrap();

        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        let overrides = Overrides::from(args);
        assert_eq!(overrides.ids_file, Some(PathBuf::from("ids.jsonl")));
        assert_eq!(overrides.max_videos, Some(5));
        assert_eq!(overrides.pause_between_videos, Some(0.0));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["harvester", "chunk", "--quiet", "--config", "c.yaml"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
    }
}
