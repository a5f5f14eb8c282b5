use anyhow::Result;
use std::path::{Path, PathBuf};

/// yt-dlp output template; yt-dlp appends `.<lang>.srt` for subtitle tracks
pub const OUTPUT_TEMPLATE: &str = "Transcript [%(id)s].%(ext)s";

/// Per-video subtitle directory: `<subs_root>/<video_id>/`
#[derive(Debug, Clone)]
pub struct SubtitleDir {
    dir: PathBuf,
    video_id: String,
    min_bytes: u64,
}

impl SubtitleDir {
    pub fn new(subs_root: &Path, video_id: &str, min_bytes: u64) -> Self {
        Self {
            dir: subs_root.join(video_id),
            video_id: video_id.to_string(),
            min_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn prefix(&self) -> String {
        format!("Transcript [{}].", self.video_id)
    }

    /// `Transcript [<id>].<lang>.srt`
    pub fn subtitle_path(&self, lang: &str) -> PathBuf {
        self.dir.join(format!("{}{}.srt", self.prefix(), lang))
    }

    /// Create the directory and remove every earlier output for this video
    pub fn prepare(&self) -> Result<usize> {
        fs_err::create_dir_all(&self.dir)?;

        let prefix = self.prefix();
        let mut removed = 0;
        for entry in fs_err::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_name().to_string_lossy().starts_with(&prefix) {
                continue;
            }

            let path = entry.path();
            if entry.file_type()?.is_dir() {
                fs_err::remove_dir_all(&path)?;
            } else {
                fs_err::remove_file(&path)?;
            }
            removed += 1;
        }

        Ok(removed)
    }

    /// A file counts only when it exists and is larger than the threshold
    pub fn is_acceptable(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|meta| meta.is_file() && meta.len() > self.min_bytes)
            .unwrap_or(false)
    }

    /// First acceptable subtitle among `langs`, in the given priority order
    pub fn find_acceptable<S: AsRef<str>>(&self, langs: &[S]) -> Option<PathBuf> {
        langs
            .iter()
            .map(|lang| self.subtitle_path(lang.as_ref()))
            .find(|path| self.is_acceptable(path))
    }

    /// Every `Transcript [<id>].*.srt` currently in the directory, sorted
    pub fn list_subtitles(&self) -> Result<Vec<PathBuf>> {
        let prefix = self.prefix();
        let mut paths = Vec::new();

        for entry in fs_err::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && name.ends_with(".srt") && entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }

        paths.sort();
        Ok(paths)
    }
}

/// Language tag encoded in `Transcript [<id>].<lang>.srt`
pub fn lang_from_filename(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let (_, rest) = name.split_once("].")?;
    let (lang, _ext) = rest.rsplit_once('.')?;
    (!lang.is_empty()).then(|| lang.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_bytes(path: &Path, len: usize) {
        fs_err::write(path, "x".repeat(len)).unwrap();
    }

    #[test]
    fn test_subtitle_path_naming() {
        let subs = SubtitleDir::new(Path::new("data/raw/subs"), "abc123", 100);
        assert_eq!(
            subs.subtitle_path("en-US"),
            PathBuf::from("data/raw/subs/abc123/Transcript [abc123].en-US.srt")
        );
    }

    #[test]
    fn test_acceptability_threshold_is_strict() {
        let root = tempfile::tempdir().unwrap();
        let subs = SubtitleDir::new(root.path(), "abc123", 100);
        subs.prepare().unwrap();

        let path = subs.subtitle_path("en");
        write_bytes(&path, 100);
        assert!(!subs.is_acceptable(&path));

        write_bytes(&path, 101);
        assert!(subs.is_acceptable(&path));

        assert!(!subs.is_acceptable(&subs.subtitle_path("fr")));
    }

    #[test]
    fn test_en_us_wins_over_en() {
        let root = tempfile::tempdir().unwrap();
        let subs = SubtitleDir::new(root.path(), "abc123", 100);
        subs.prepare().unwrap();

        write_bytes(&subs.subtitle_path("en"), 500);
        write_bytes(&subs.subtitle_path("en-US"), 200);

        assert_eq!(
            subs.find_acceptable(&["en-US", "en"]),
            Some(subs.subtitle_path("en-US"))
        );
    }

    #[test]
    fn test_undersized_preferred_language_falls_through() {
        let root = tempfile::tempdir().unwrap();
        let subs = SubtitleDir::new(root.path(), "abc123", 100);
        subs.prepare().unwrap();

        write_bytes(&subs.subtitle_path("en-US"), 10);
        write_bytes(&subs.subtitle_path("en"), 300);

        assert_eq!(subs.find_acceptable(&["en-US", "en"]), Some(subs.subtitle_path("en")));
    }

    #[test]
    fn test_prepare_removes_only_this_video() {
        let root = tempfile::tempdir().unwrap();
        let subs = SubtitleDir::new(root.path(), "abc123", 100);
        subs.prepare().unwrap();

        write_bytes(&subs.subtitle_path("en"), 300);
        write_bytes(&subs.path().join("Transcript [abc123].en.vtt"), 300);
        fs_err::create_dir_all(subs.path().join("Transcript [abc123].part")).unwrap();
        write_bytes(&subs.path().join("notes.txt"), 5);

        assert_eq!(subs.prepare().unwrap(), 3);
        assert!(subs.list_subtitles().unwrap().is_empty());
        assert!(subs.path().join("notes.txt").exists());
    }

    #[test]
    fn test_list_subtitles_sorted() {
        let root = tempfile::tempdir().unwrap();
        let subs = SubtitleDir::new(root.path(), "abc123", 100);
        subs.prepare().unwrap();

        write_bytes(&subs.subtitle_path("es"), 300);
        write_bytes(&subs.subtitle_path("en"), 300);
        write_bytes(&subs.path().join("Transcript [abc123].en.vtt"), 300);

        assert_eq!(
            subs.list_subtitles().unwrap(),
            vec![subs.subtitle_path("en"), subs.subtitle_path("es")]
        );
    }

    #[test]
    fn test_lang_from_filename() {
        assert_eq!(
            lang_from_filename(Path::new("/x/Transcript [abc123].en-US.srt")),
            Some("en-US".to_string())
        );
        assert_eq!(
            lang_from_filename(Path::new("Transcript [abc123].pt-BR.srt")),
            Some("pt-BR".to_string())
        );
        assert_eq!(lang_from_filename(Path::new("random.srt")), None);
    }
}
