mod history;
mod transcript;

pub use history::History;
pub use transcript::{parse_vtt, video_title, TranscriptFetcher, TranscriptRun};
