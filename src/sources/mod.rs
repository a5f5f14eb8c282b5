use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::config::Config;
use crate::extractors::{VideoItem, YtDlp};
use crate::Result;

#[derive(Debug, Deserialize)]
struct IdLine {
    id: Option<String>,
    video_id: Option<String>,
    url: Option<String>,
}

/// Parse one line of the ids file: a JSON object or a bare id/URL
fn parse_line(line: &str) -> Option<VideoItem> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('{') {
        let entry: IdLine = serde_json::from_str(line).ok()?;
        let id = [entry.id, entry.video_id]
            .into_iter()
            .flatten()
            .find(|id| !id.trim().is_empty())
            .or_else(|| entry.url.as_deref().and_then(crate::utils::extract_video_id))?;
        return Some(match entry.url.filter(|url| !url.trim().is_empty()) {
            Some(url) => VideoItem::new(id.trim(), url),
            None => VideoItem::from_id(id.trim()),
        });
    }

    crate::utils::extract_video_id(line).map(|id| {
        if line.contains("://") {
            VideoItem::new(id, line)
        } else {
            VideoItem::from_id(id)
        }
    })
}

/// Read videos from a newline-delimited file; a missing file yields an empty list
pub fn read_ids_file(path: &Path) -> Result<Vec<VideoItem>> {
    if !path.exists() {
        tracing::debug!("Ids file {} does not exist", path.display());
        return Ok(Vec::new());
    }

    let reader = BufReader::new(fs_err::File::open(path)?);
    let mut videos = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Some(video) => videos.push(video),
            None if line.trim().is_empty() => {}
            None => tracing::debug!("Skipping unparsable line {} of {}", number + 1, path.display()),
        }
    }
    Ok(videos)
}

/// Write videos as `{id, url}` lines
pub fn write_ids_file(path: &Path, videos: &[VideoItem]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs_err::File::create(path)?);
    for video in videos {
        serde_json::to_writer(&mut writer, video)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Drop repeated ids keeping the first occurrence, then apply the limit (0 = unlimited)
pub fn dedupe_and_limit(videos: Vec<VideoItem>, max_videos: usize) -> Vec<VideoItem> {
    let mut seen = HashSet::new();
    let mut unique: Vec<VideoItem> = videos.into_iter().filter(|v| seen.insert(v.id.clone())).collect();
    if max_videos > 0 {
        unique.truncate(max_videos);
    }
    unique
}

pub fn is_short(video: &VideoItem) -> bool {
    video.url.contains("/shorts/")
}

/// Videos for a fetch run: the ids file first, the configured channel otherwise
pub async fn load_videos(config: &Config, extractor: &YtDlp) -> Result<Vec<VideoItem>> {
    let ids_file = &config.paths.ids_file;
    let videos = read_ids_file(ids_file)
        .with_context(|| format!("Failed to read ids file {}", ids_file.display()))?;

    if !videos.is_empty() {
        tracing::info!("Loaded {} videos from {}", videos.len(), ids_file.display());
        return Ok(dedupe_and_limit(videos, config.source.max_videos));
    }

    match config.source.channel_url.as_deref() {
        Some(channel) => {
            tracing::info!("No videos in {}, listing channel instead", ids_file.display());
            let videos = extractor.list_channel(channel).await?;
            Ok(dedupe_and_limit(videos, config.source.max_videos))
        }
        None => Ok(Vec::new()),
    }
}

/// List a channel and persist the result as the ids file
pub async fn export_channel(
    extractor: &YtDlp,
    channel_url: &str,
    output: &Path,
    exclude_shorts: bool,
    max_videos: usize,
) -> Result<usize> {
    let mut videos = extractor.list_channel(channel_url).await?;
    if exclude_shorts {
        let before = videos.len();
        videos.retain(|v| !is_short(v));
        tracing::info!("Skipped {} shorts", before - videos.len());
    }
    let videos = dedupe_and_limit(videos, max_videos);

    write_ids_file(output, &videos)
        .with_context(|| format!("Failed to write ids file {}", output.display()))?;
    Ok(videos.len())
}
