use anyhow::Result;
use clap::Parser;
use console::style;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_harvester::chunking::{self, RecursiveSplitter};
use transcript_harvester::cli::{Cli, Commands};
use transcript_harvester::config::Config;
use transcript_harvester::extractors::YtDlp;
use transcript_harvester::harvest::HarvestPipeline;
use transcript_harvester::transcripts::YoutubeTranscriptApi;
use transcript_harvester::{sources, utils, HarvestError};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "transcript_harvester=debug"
    } else {
        "transcript_harvester=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(cli.config.as_deref()).await?;

    if matches!(cli.command, Commands::Fetch(_) | Commands::Ids { .. }) {
        let missing_deps = utils::check_dependencies(&config.extractor.binary).await;
        if !missing_deps.is_empty() {
            eprintln!("{} Dependency check warnings:", style("⚠️ ").yellow());
            for dep in missing_deps {
                eprintln!("   • {}", dep);
            }
            eprintln!("   (Continuing anyway - tools may be available)");
        }
    }

    match cli.command {
        Commands::Fetch(args) => {
            config.apply_overrides(args.into())?;

            let extractor = Arc::new(YtDlp::new(config.extractor.clone(), config.auth.clone()));
            let videos = sources::load_videos(&config, &extractor).await?;
            if videos.is_empty() {
                return Err(HarvestError::NoVideos(format!(
                    "{} is empty and no channel URL is configured (set CHANNEL_URL)",
                    config.paths.ids_file.display()
                ))
                .into());
            }

            let api = Arc::new(YoutubeTranscriptApi::new()?);
            let pipeline = HarvestPipeline::new(&config, extractor, api, !cli.quiet);
            let summary = pipeline.run(&videos).await?;
            summary.print();
            println!("Index: {}", config.paths.index_file.display());
        }
        Commands::Ids {
            channel,
            output,
            exclude_shorts,
            max_videos,
        } => {
            let channel = channel
                .or(config.source.channel_url.clone())
                .ok_or_else(|| HarvestError::InvalidConfig("no channel URL given (use --channel or CHANNEL_URL)".into()))?;
            utils::validate_url(&channel)?;

            let extractor = YtDlp::new(config.extractor.clone(), config.auth.clone());
            if !extractor.check_availability().await {
                return Err(HarvestError::ExtractorUnavailable(config.extractor.binary.clone()).into());
            }

            let output = output.unwrap_or_else(|| config.paths.ids_file.clone());
            let count = sources::export_channel(
                &extractor,
                &channel,
                &output,
                exclude_shorts,
                max_videos.unwrap_or(config.source.max_videos),
            )
            .await?;
            println!("Saved {} videos to {}", count, output.display());
        }
        Commands::Chunk {
            index,
            output_dir,
            chunk_size,
            chunk_overlap,
        } => {
            if let Some(size) = chunk_size {
                config.chunking.chunk_size = size;
            }
            if let Some(overlap) = chunk_overlap {
                config.chunking.chunk_overlap = overlap;
            }
            config.validate()?;

            let index = index.unwrap_or_else(|| config.paths.index_file.clone());
            let output_dir = output_dir.unwrap_or_else(|| config.paths.chunks_dir.clone());
            let splitter = RecursiveSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap);

            let summary = chunking::build_chunks(&index, &output_dir, &splitter)?;
            println!(
                "{} Wrote {} chunks from {} videos to:",
                style("[done]").bold(),
                summary.chunks,
                summary.videos
            );
            println!("  - {}", output_dir.join(chunking::DOCS_FILE).display());
            println!("  - {}", output_dir.join(chunking::CORPUS_FILE).display());
            if summary.skipped > 0 {
                println!("  ({} videos skipped without usable text)", summary.skipped);
            }
        }
        Commands::Config { show, init } => {
            if init {
                let path = Config::default().save().await?;
                println!("Default configuration written to {}", path.display());
            } else if show {
                config.display();
            } else {
                config.display();
                println!();
                println!("Edit the YAML file or run `harvester config --init` to create one.");
            }
        }
    }

    Ok(())
}
