use regex::Regex;
use std::sync::OnceLock;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

/// Plain text of an SRT document: cue numbers, timings and markup dropped,
/// with consecutive repeated lines (rolling auto-captions) kept once
pub fn srt_to_text(srt: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let tags = regex(&TAGS, r"<[^>]+>");

    let mut lines: Vec<String> = Vec::new();
    for line in srt.lines() {
        let line = line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() || line.contains("-->") || line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let line = tags.replace_all(line, "").trim().to_string();
        if line.is_empty() || lines.last() == Some(&line) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Remove `[...]` annotations and collapse all whitespace runs to single spaces
pub fn clean_text(text: &str) -> String {
    static BRACKETS: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();

    let stripped = regex(&BRACKETS, r"\[.*?\]").replace_all(text, "");
    regex(&SPACES, r"\s+").replace_all(&stripped, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLLING: &str = "1\n00:00:00,000 --> 00:00:02,000\nhello there\n\n\
2\n00:00:02,000 --> 00:00:04,000\nhello there\n\n\
3\n00:00:04,000 --> 00:00:06,000\n<i>general</i> kenobi\n";

    #[test]
    fn test_srt_to_text_drops_timing_and_repeats() {
        assert_eq!(srt_to_text(ROLLING), "hello there\ngeneral kenobi");
    }

    #[test]
    fn test_numeric_caption_text_is_treated_as_index() {
        assert_eq!(srt_to_text("1\n00:00:00,000 --> 00:00:01,000\n42\n"), "");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("[Music]  so   today\n[Applause] we"), "so today we");
        assert_eq!(clean_text("  \n "), "");
    }
}
