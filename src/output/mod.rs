//! Everything the harvester writes to disk: SRT files, the per-video subtitle
//! layout and the run index.

pub mod index;
pub mod srt;
pub mod subtitles;

pub use index::{write_index, VideoRecord, VideoStatus};
pub use srt::{format_srt, format_timestamp, write_srt};
pub use subtitles::SubtitleDir;
