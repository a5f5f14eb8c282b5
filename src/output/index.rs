use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Final state of one video, serialized as the `status` tag of its index line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VideoStatus {
    /// An acceptable subtitle file exists for `lang`
    Ok { lang: String },
    /// Every strategy was exhausted
    Missing { lang: Option<String> },
    /// The cascade for this video failed unexpectedly
    Error { error: String },
}

impl VideoStatus {
    pub fn label(&self) -> &'static str {
        match self {
            VideoStatus::Ok { .. } => "ok",
            VideoStatus::Missing { .. } => "missing",
            VideoStatus::Error { .. } => "error",
        }
    }
}

/// One line of the transcripts index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub url: String,
    #[serde(flatten)]
    pub status: VideoStatus,
    pub paths: Vec<PathBuf>,
    pub dir: PathBuf,
}

impl VideoRecord {
    pub fn ok(id: &str, url: &str, lang: String, paths: Vec<PathBuf>, dir: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            status: VideoStatus::Ok { lang },
            paths,
            dir,
        }
    }

    pub fn missing(id: &str, url: &str, dir: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            status: VideoStatus::Missing { lang: None },
            paths: Vec::new(),
            dir,
        }
    }

    pub fn error(id: &str, url: &str, error: String, dir: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            status: VideoStatus::Error { error },
            paths: Vec::new(),
            dir,
        }
    }

    pub fn lang(&self) -> Option<&str> {
        match &self.status {
            VideoStatus::Ok { lang } => Some(lang),
            VideoStatus::Missing { lang } => lang.as_deref(),
            VideoStatus::Error { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, VideoStatus::Ok { .. })
    }
}

/// Rewrite the index file with one JSON object per record
pub fn write_index(path: &Path, records: &[VideoRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }

    let file = fs_err::File::create(path)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record).context("Failed to serialize index record")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(())
}

/// Read an index written by [`write_index`], skipping blank lines
pub fn read_index(path: &Path) -> Result<Vec<VideoRecord>> {
    let file = fs_err::File::open(path)?;
    let mut records = Vec::new();

    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: VideoRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid index line {} in {}", n + 1, path.display()))?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn dir() -> PathBuf {
        PathBuf::from("data/raw/subs/abc123")
    }

    #[test]
    fn test_ok_record_shape() {
        let record = VideoRecord::ok(
            "abc123",
            "https://www.youtube.com/watch?v=abc123",
            "en".to_string(),
            vec![dir().join("Transcript [abc123].en.srt")],
            dir(),
        );

        let value: Value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "abc123",
                "url": "https://www.youtube.com/watch?v=abc123",
                "status": "ok",
                "lang": "en",
                "paths": ["data/raw/subs/abc123/Transcript [abc123].en.srt"],
                "dir": "data/raw/subs/abc123",
            })
        );
    }

    #[test]
    fn test_missing_record_has_null_lang() {
        let record = VideoRecord::missing("abc123", "u", dir());
        let value: Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "missing");
        assert_eq!(value["lang"], Value::Null);
        assert_eq!(value["paths"], json!([]));
    }

    #[test]
    fn test_error_record_carries_message_instead_of_lang() {
        let record = VideoRecord::error("abc123", "u", "boom".to_string(), dir());
        let value: Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
        assert!(value.get("lang").is_none());
        assert_eq!(record.lang(), None);
    }

    #[test]
    fn test_index_is_rewritten_not_appended() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chunks").join("transcripts_index.jsonl");

        let first = vec![
            VideoRecord::missing("a", "ua", dir()),
            VideoRecord::missing("b", "ub", dir()),
        ];
        write_index(&path, &first).unwrap();

        let second = vec![VideoRecord::ok("c", "uc", "en-US".to_string(), vec![], dir())];
        write_index(&path, &second).unwrap();

        let content = fs_err::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert_eq!(read_index(&path).unwrap(), second);
    }
}
