//! Video transcript retrieval, analysis and summarization

mod analysis;
mod youtube;

pub use analysis::{Analysis, Section, Summarizer, Summary, TranscriptAnalyzer};
pub use youtube::{youtube_video_id, TranscriptSource, YouTubeTranscriptFetcher};
