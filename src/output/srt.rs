use anyhow::Result;
use std::path::Path;

use crate::transcripts::TranscriptSegment;

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`), truncating sub-millisecond precision
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let whole = seconds.trunc();
    let millis = ((seconds - whole) * 1000.0) as u64;
    let total = whole as u64;

    format!(
        "{:02}:{:02}:{:02},{:03}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        millis.min(999)
    )
}

/// Render segments as SRT, dropping empty ones and numbering the rest contiguously
pub fn format_srt(segments: &[TranscriptSegment]) -> String {
    let blocks: Vec<String> = segments
        .iter()
        .filter_map(|segment| {
            let text = segment.text.replace('\n', " ");
            let text = text.trim();
            (!text.is_empty()).then(|| (segment, text.to_string()))
        })
        .enumerate()
        .map(|(i, (segment, text))| {
            format!(
                "{}\n{} --> {}\n{}",
                i + 1,
                format_timestamp(segment.start),
                format_timestamp(segment.start + segment.duration),
                text
            )
        })
        .collect();

    let mut content = blocks.join("\n\n");
    content.push('\n');
    content
}

/// Write segments to `path` as SRT, replacing any existing file
pub fn write_srt(path: &Path, segments: &[TranscriptSegment]) -> Result<()> {
    fs_err::write(path, format_srt(segments))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, start: f64, duration: f64) -> TranscriptSegment {
        TranscriptSegment {
            text: text.to_string(),
            start,
            duration,
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(1.5), "00:00:01,500");
        assert_eq!(format_timestamp(61.25), "00:01:01,250");
        assert_eq!(format_timestamp(3723.5), "01:02:03,500");
        assert_eq!(format_timestamp(-4.0), "00:00:00,000");
    }

    #[test]
    fn test_empty_segments_are_dropped_and_indices_stay_contiguous() {
        let segments = vec![
            seg("Hello there", 0.0, 1.5),
            seg("   ", 1.5, 1.0),
            seg("", 2.5, 1.0),
            seg("General\nKenobi", 3.5, 2.0),
        ];

        let srt = format_srt(&segments);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,500\nHello there\n\n\
             2\n00:00:03,500 --> 00:00:05,500\nGeneral Kenobi\n"
        );
    }

    #[test]
    fn test_no_segments_yields_single_newline() {
        assert_eq!(format_srt(&[]), "\n");
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Transcript [abc123].en.srt");
        fs_err::write(&path, "stale content that should disappear entirely").unwrap();

        write_srt(&path, &[seg("fresh", 10.0, 2.0)]).unwrap();

        let content = fs_err::read_to_string(&path).unwrap();
        assert_eq!(content, "1\n00:00:10,000 --> 00:00:12,000\nfresh\n");
    }
}
