//! YouTube URL parsing and caption download

use crate::error::{EdutopiaError, Result};
use crate::markup::unescape_entities;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

lazy_static! {
    static ref CAPTION_SEGMENT: Regex = Regex::new(r"(?s)<text[^>]*>(.*?)</text>").unwrap();
}

const WATCH_URL: &str = "https://www.youtube.com/watch";

/// Extract the video id from a YouTube URL.
///
/// Short links carry the id in the path (`youtu.be/<id>`), watch links in
/// the `v` query parameter.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();

    let id = match host.as_str() {
        "youtu.be" | "www.youtu.be" => parsed.path().trim_start_matches('/').to_string(),
        "youtube.com" | "www.youtube.com" | "m.youtube.com" => parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?,
        _ => return None,
    };

    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Source of video transcripts
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Full transcript text for a video, segments joined with spaces
    async fn fetch(&self, video_id: &str) -> Result<String>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    /// `asr` for auto-generated tracks
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn is_english(&self) -> bool {
        self.language_code == "en" || self.language_code.starts_with("en-")
    }
}

/// Fetches captions from the public YouTube watch page
pub struct YouTubeTranscriptFetcher {
    http: reqwest::Client,
}

impl YouTubeTranscriptFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    async fn caption_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let page = self
            .http
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_caption_tracks(&page).ok_or_else(|| {
            EdutopiaError::NotFound(format!("No transcripts available for video {}", video_id))
        })
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscriptFetcher {
    async fn fetch(&self, video_id: &str) -> Result<String> {
        let tracks = self.caption_tracks(video_id).await?;
        let track = select_track(&tracks).ok_or_else(|| {
            EdutopiaError::NotFound(format!("No transcripts available for video {}", video_id))
        })?;
        tracing::debug!(
            "Using {} caption track '{}' for {}",
            if track.is_generated() { "generated" } else { "manual" },
            track.language_code,
            video_id
        );

        let xml = self
            .http
            .get(&track.base_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let transcript = parse_timedtext(&xml);
        if transcript.is_empty() {
            return Err(EdutopiaError::NotFound(format!(
                "Empty transcript for video {}",
                video_id
            )));
        }
        Ok(transcript)
    }
}

/// Read the `captionTracks` array embedded in a watch page
fn parse_caption_tracks(page: &str) -> Option<Vec<CaptionTrack>> {
    const KEY: &str = "\"captionTracks\":";
    let start = page.find(KEY)? + KEY.len();
    serde_json::Deserializer::from_str(&page[start..])
        .into_iter::<Vec<CaptionTrack>>()
        .next()?
        .ok()
        .filter(|tracks| !tracks.is_empty())
}

/// Manually created English first, then any English, then whatever is listed first
fn select_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.is_english() && !t.is_generated())
        .or_else(|| tracks.iter().find(|t| t.is_english()))
        .or_else(|| tracks.first())
}

/// Join timedtext segments into one line of text
fn parse_timedtext(xml: &str) -> String {
    CAPTION_SEGMENT
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| unescape_entities(&unescape_entities(m.as_str())).replace('\n', " "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_from_watch_and_short_links() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://youtube.com/watch?feature=share&v=abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            youtube_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://m.youtube.com/watch?v=xyz").as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn test_video_id_rejects_other_urls() {
        assert_eq!(youtube_video_id("https://vimeo.com/12345"), None);
        assert_eq!(youtube_video_id("https://www.youtube.com/watch"), None);
        assert_eq!(youtube_video_id("https://youtu.be/"), None);
        assert_eq!(youtube_video_id("not a url"), None);
    }

    #[test]
    fn test_parse_caption_tracks_from_page() {
        let page = r#"var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=a&lang=de","name":{"simpleText":"German"},"languageCode":"de"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=a&lang=en","languageCode":"en","kind":"asr"}],"audioTracks":[]}}};"#;
        let tracks = parse_caption_tracks(page).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(
            tracks[1].base_url,
            "https://www.youtube.com/api/timedtext?v=a&lang=en"
        );
        assert!(tracks[1].is_generated());

        assert!(parse_caption_tracks("<html>no captions</html>").is_none());
    }

    #[test]
    fn test_select_track_preference() {
        let track = |lang: &str, kind: Option<&str>| CaptionTrack {
            base_url: format!("u-{}-{:?}", lang, kind),
            language_code: lang.to_string(),
            kind: kind.map(String::from),
        };

        let tracks = vec![track("de", None), track("en", Some("asr")), track("en", None)];
        assert_eq!(select_track(&tracks).unwrap().base_url, "u-en-None");

        let tracks = vec![track("de", None), track("en", Some("asr"))];
        assert_eq!(select_track(&tracks).unwrap().language_code, "en");

        let tracks = vec![track("fr", None), track("de", None)];
        assert_eq!(select_track(&tracks).unwrap().language_code, "fr");

        assert!(select_track(&[]).is_none());
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1.2">Hello &amp;amp; welcome</text><text start="1.2" dur="2">it&amp;#39;s a
lecture</text><text start="3" dur="1"></text></transcript>"#;
        assert_eq!(parse_timedtext(xml), "Hello & welcome it's a lecture");
    }
}
