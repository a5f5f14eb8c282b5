use anyhow::Context;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::output::index::read_index;
use crate::output::subtitles::lang_from_filename;
use crate::output::VideoRecord;
use crate::Result;

pub mod splitter;
pub mod text;

pub use splitter::RecursiveSplitter;
pub use text::{clean_text, srt_to_text};

pub const DOCS_FILE: &str = "langchain_docs.jsonl";
pub const CORPUS_FILE: &str = "corpus.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub video_id: String,
    pub url: String,
    pub language: Option<String>,
    pub chunk_id: String,
    pub n_total_chunks: usize,
}

/// One chunk in the document-loader layout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkDocument {
    pub page_content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Serialize)]
struct CorpusEntry<'a> {
    id: &'a str,
    text: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkSummary {
    pub videos: usize,
    pub chunks: usize,
    pub skipped: usize,
}

/// The file a record's text is read from: the one matching its language, else the first
fn primary_path(record: &VideoRecord) -> Option<&PathBuf> {
    let lang = record.lang();
    record
        .paths
        .iter()
        .find(|p| lang.is_some() && lang_from_filename(p).as_deref() == lang)
        .or_else(|| record.paths.first())
}

/// Split one successful record into documents; `None` when it has no usable text
pub fn documents_for(record: &VideoRecord, splitter: &RecursiveSplitter) -> Result<Option<Vec<ChunkDocument>>> {
    let Some(path) = primary_path(record) else {
        return Ok(None);
    };

    let raw = fs_err::read_to_string(path)?;
    let text = clean_text(&srt_to_text(&raw));
    if text.is_empty() {
        return Ok(None);
    }

    let chunks = splitter.split_text(&text);
    let total = chunks.len();
    let docs = chunks
        .into_iter()
        .enumerate()
        .map(|(i, page_content)| ChunkDocument {
            page_content,
            metadata: ChunkMetadata {
                source: "youtube".to_string(),
                video_id: record.id.clone(),
                url: record.url.clone(),
                language: record.lang().map(str::to_string),
                chunk_id: format!("{}:{}", record.id, i),
                n_total_chunks: total,
            },
        })
        .collect();
    Ok(Some(docs))
}

/// Chunk every `ok` record of the index into `<out_dir>/langchain_docs.jsonl` and `<out_dir>/corpus.jsonl`
pub fn build_chunks(index_file: &Path, out_dir: &Path, splitter: &RecursiveSplitter) -> Result<ChunkSummary> {
    let records = read_index(index_file)
        .with_context(|| format!("Failed to read index {}. Run `harvester fetch` first", index_file.display()))?;

    fs_err::create_dir_all(out_dir)?;
    let mut docs_out = BufWriter::new(fs_err::File::create(out_dir.join(DOCS_FILE))?);
    let mut corpus_out = BufWriter::new(fs_err::File::create(out_dir.join(CORPUS_FILE))?);
    let mut summary = ChunkSummary::default();

    for record in records.iter().filter(|r| r.is_ok()) {
        let docs = match documents_for(record, splitter) {
            Ok(Some(docs)) => docs,
            Ok(None) => {
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {:#}", record.id, e);
                summary.skipped += 1;
                continue;
            }
        };

        for doc in &docs {
            serde_json::to_writer(&mut docs_out, doc)?;
            docs_out.write_all(b"\n")?;
            serde_json::to_writer(
                &mut corpus_out,
                &CorpusEntry {
                    id: &doc.metadata.chunk_id,
                    text: &doc.page_content,
                },
            )?;
            corpus_out.write_all(b"\n")?;
        }
        tracing::debug!("{} split into {} chunks", record.id, docs.len());
        summary.chunks += docs.len();
        summary.videos += 1;
    }

    docs_out.flush()?;
    corpus_out.flush()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::write_index;

    fn srt_file(dir: &Path, name: &str, lines: usize) -> PathBuf {
        let body: String = (0..lines)
            .map(|i| format!("{}\n00:00:{:02},000 --> 00:00:{:02},500\n[Music] sentence number {}\n\n", i + 1, i, i, i))
            .collect();
        let path = dir.join(name);
        fs_err::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_documents_carry_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let path = srt_file(tmp.path(), "Transcript [abc123].en.srt", 40);
        let record = VideoRecord::ok("abc123", "https://www.youtube.com/watch?v=abc123", "en".to_string(), vec![path], tmp.path().to_path_buf());

        let docs = documents_for(&record, &RecursiveSplitter::new(200, 40)).unwrap().unwrap();
        assert!(docs.len() > 1);
        assert_eq!(docs[0].metadata.chunk_id, "abc123:0");
        assert_eq!(docs[0].metadata.language.as_deref(), Some("en"));
        assert!(docs.iter().all(|d| d.metadata.n_total_chunks == docs.len()));
        assert!(docs[0].page_content.starts_with("sentence number 0"));
        assert!(!docs.iter().any(|d| d.page_content.contains("[Music]")));
    }

    #[test]
    fn test_build_chunks_skips_non_ok_records() {
        let tmp = tempfile::tempdir().unwrap();
        let path = srt_file(tmp.path(), "Transcript [abc123].en.srt", 3);
        let index = tmp.path().join("index.jsonl");
        write_index(
            &index,
            &[
                VideoRecord::ok("abc123", "https://www.youtube.com/watch?v=abc123", "en".to_string(), vec![path], tmp.path().to_path_buf()),
                VideoRecord::missing("def456", "https://www.youtube.com/watch?v=def456", tmp.path().to_path_buf()),
                VideoRecord::error("ghi789", "https://www.youtube.com/watch?v=ghi789", "boom".to_string(), tmp.path().to_path_buf()),
            ],
        )
        .unwrap();

        let out = tmp.path().join("chunks");
        let summary = build_chunks(&index, &out, &RecursiveSplitter::default()).unwrap();
        assert_eq!((summary.videos, summary.chunks), (1, 1));

        let corpus = fs_err::read_to_string(out.join(CORPUS_FILE)).unwrap();
        let entry: serde_json::Value = serde_json::from_str(corpus.lines().next().unwrap()).unwrap();
        assert_eq!(entry["id"], "abc123:0");
        assert_eq!(entry["text"], "sentence number 0 sentence number 1 sentence number 2");

        let docs = fs_err::read_to_string(out.join(DOCS_FILE)).unwrap();
        let doc: serde_json::Value = serde_json::from_str(docs.trim()).unwrap();
        assert_eq!(doc["metadata"]["source"], "youtube");
        assert_eq!(doc["metadata"]["n_total_chunks"], 1);
    }

    #[test]
    fn test_missing_index_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = build_chunks(&tmp.path().join("none.jsonl"), tmp.path(), &RecursiveSplitter::default());
        assert!(result.is_err());
    }
}
