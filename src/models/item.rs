use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Character cap for article bodies.
pub const ARTICLE_CONTENT_CAP: usize = 2000;
/// Character cap for video transcripts.
pub const VIDEO_CONTENT_CAP: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Article,
    Video,
}

impl ItemKind {
    pub fn content_cap(self) -> usize {
        match self {
            ItemKind::Article => ARTICLE_CONTENT_CAP,
            ItemKind::Video => VIDEO_CONTENT_CAP,
        }
    }
}

/// One piece of collected content, ready to be placed in a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub source: String,
    pub source_url: Option<String>,
    pub title: String,
    pub content: String,
    pub link: String,
    pub date: DateTime<Utc>,
}

impl ContentItem {
    pub fn article(
        source: impl Into<String>,
        source_url: impl Into<String>,
        title: impl Into<String>,
        content: &str,
        link: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: ItemKind::Article,
            source: source.into(),
            source_url: Some(source_url.into()),
            title: title.into(),
            content: truncate_chars(content, ARTICLE_CONTENT_CAP).to_string(),
            link: link.into(),
            date,
        }
    }

    pub fn video(
        title: impl Into<String>,
        transcript: &str,
        link: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: ItemKind::Video,
            source: "youtube".to_string(),
            source_url: None,
            title: title.into(),
            content: truncate_chars(transcript, VIDEO_CONTENT_CAP).to_string(),
            link: link.into(),
            date,
        }
    }
}

/// Returns the longest prefix of `text` holding at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
