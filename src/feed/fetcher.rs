use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::FeedStatus;

/// Hard transport limit; the per-feed `timeout` in [`FeedFilter`] is only a reporting label.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Filters applied to one feed's entries.
#[derive(Debug, Clone)]
pub struct FeedFilter {
    pub days_back: u32,
    pub max_items: Option<usize>,
    pub keywords: Option<Vec<String>>,
    pub timeout: Duration,
}

impl Default for FeedFilter {
    fn default() -> Self {
        Self {
            days_back: 7,
            max_items: None,
            keywords: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// An entry that survived date and keyword filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: DateTime<Utc>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Vec<FeedEntry>),
    Warning { entries: Vec<FeedEntry>, detail: String },
    Empty(String),
    Timeout { entries: Vec<FeedEntry>, detail: String },
    Error(String),
}

impl FetchOutcome {
    pub fn status(&self) -> FeedStatus {
        match self {
            FetchOutcome::Success(_) => FeedStatus::Success,
            FetchOutcome::Warning { .. } => FeedStatus::Warning,
            FetchOutcome::Empty(_) => FeedStatus::Empty,
            FetchOutcome::Timeout { .. } => FeedStatus::Timeout,
            FetchOutcome::Error(_) => FeedStatus::Error,
        }
    }

    pub fn entries(&self) -> &[FeedEntry] {
        match self {
            FetchOutcome::Success(entries)
            | FetchOutcome::Warning { entries, .. }
            | FetchOutcome::Timeout { entries, .. } => entries,
            FetchOutcome::Empty(_) | FetchOutcome::Error(_) => &[],
        }
    }

    pub fn into_entries(self) -> Vec<FeedEntry> {
        match self {
            FetchOutcome::Success(entries)
            | FetchOutcome::Warning { entries, .. }
            | FetchOutcome::Timeout { entries, .. } => entries,
            FetchOutcome::Empty(_) | FetchOutcome::Error(_) => Vec::new(),
        }
    }

    fn detail(&self) -> &str {
        match self {
            FetchOutcome::Success(_) => "",
            FetchOutcome::Warning { detail, .. }
            | FetchOutcome::Timeout { detail, .. }
            | FetchOutcome::Empty(detail)
            | FetchOutcome::Error(detail) => detail,
        }
    }
}

/// Result of fetching one feed: the outcome plus the numbers for its health entry.
#[derive(Debug, Clone)]
pub struct FeedFetch {
    pub outcome: FetchOutcome,
    pub total_entries: usize,
    pub fetch_time: Duration,
}

impl FeedFetch {
    fn failed(detail: String, fetch_time: Duration) -> Self {
        Self {
            outcome: FetchOutcome::Error(detail),
            total_entries: 0,
            fetch_time,
        }
    }

    pub fn status(&self) -> FeedStatus {
        self.outcome.status()
    }

    pub fn filtered_entries(&self) -> usize {
        self.outcome.entries().len()
    }

    pub fn message(&self) -> String {
        let detail = self.outcome.detail();
        if detail.is_empty() && self.total_entries > 0 && self.filtered_entries() == 0 {
            format!("No items matched filters (found {} total)", self.total_entries)
        } else {
            detail.to_string()
        }
    }
}

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("distil/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Fetches and filters one feed. Never fails: problems become [`FetchOutcome::Error`].
    pub async fn fetch(&self, url: &str, filter: &FeedFilter) -> FeedFetch {
        tracing::info!("Fetching: {}", url);
        let started = Instant::now();

        let bytes = match self.load(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let fetch = FeedFetch::failed(format!("Failed to fetch feed: {e}"), started.elapsed());
                tracing::warn!("{}: {}", url, fetch.message());
                return fetch;
            }
        };

        let fetch = evaluate(&bytes, filter, Utc::now(), started.elapsed());
        match fetch.status() {
            FeedStatus::Success => tracing::info!(
                "  {} items from {} entries in {:.2}s",
                fetch.filtered_entries(),
                fetch.total_entries,
                fetch.fetch_time.as_secs_f64()
            ),
            status => tracing::warn!("  {} {}: {}", status.icon(), url, fetch.message()),
        }
        fetch
    }

    /// Reads the raw feed document from an http(s) URL, a `file://` URL or a local path.
    async fn load(&self, url: &str) -> Result<Vec<u8>> {
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                let response = self.client.get(parsed).send().await?;

                if !response.status().is_success() {
                    return Err(anyhow::anyhow!("HTTP {}", response.status()).into());
                }

                Ok(response.bytes().await?.to_vec())
            }
            Ok(parsed) if parsed.scheme() == "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| AppError::Other(anyhow::anyhow!("invalid file url: {url}")))?;
                Ok(tokio::fs::read(path).await?)
            }
            Ok(parsed) if parsed.scheme().len() > 1 => {
                Err(anyhow::anyhow!("unsupported url scheme: {}", parsed.scheme()).into())
            }
            _ => Ok(tokio::fs::read(url).await?),
        }
    }
}

/// Parses a feed document and applies `filter` relative to `now`.
///
/// `elapsed` is the time already spent obtaining and parsing the document; it only
/// decides whether the outcome is labelled as a timeout.
pub fn evaluate(bytes: &[u8], filter: &FeedFilter, now: DateTime<Utc>, elapsed: Duration) -> FeedFetch {
    let feed = match parser::parse(bytes) {
        Ok(feed) => feed,
        Err(e) => return FeedFetch::failed(format!("Failed to fetch feed: {e}"), elapsed),
    };

    let total_entries = feed.entries.len();
    if total_entries == 0 {
        return FeedFetch {
            outcome: FetchOutcome::Empty(format!(
                "No entries found in feed (took {:.2}s)",
                elapsed.as_secs_f64()
            )),
            total_entries,
            fetch_time: elapsed,
        };
    }

    let mut malformed = 0;
    let resolved: Vec<FeedEntry> = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let resolved = resolve_entry(entry, now);
            if resolved.is_none() {
                malformed += 1;
            }
            resolved
        })
        .collect();

    let entries = apply_filter(resolved, filter, now);

    let outcome = if elapsed > filter.timeout {
        FetchOutcome::Timeout {
            entries,
            detail: format!(
                "Feed fetch took {:.2}s (timeout: {}s)",
                elapsed.as_secs_f64(),
                filter.timeout.as_secs()
            ),
        }
    } else if malformed > 0 {
        FetchOutcome::Warning {
            entries,
            detail: format!("Feed parsing issues: {malformed} entries without a title or link were skipped"),
        }
    } else {
        FetchOutcome::Success(entries)
    };

    FeedFetch {
        outcome,
        total_entries,
        fetch_time: elapsed,
    }
}

/// Maps a parsed entry to a [`FeedEntry`], or `None` when it has no title or link.
fn resolve_entry(entry: Entry, now: DateTime<Utc>) -> Option<FeedEntry> {
    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())?;
    let link = entry.links.first().map(|l| l.href.clone())?;

    let summary_html = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();

    Some(FeedEntry {
        title,
        link,
        published: entry.published.or(entry.updated).unwrap_or(now),
        summary: html_to_text(&summary_html),
    })
}

fn apply_filter(entries: Vec<FeedEntry>, filter: &FeedFilter, now: DateTime<Utc>) -> Vec<FeedEntry> {
    // A window reaching past the representable range means no cutoff.
    let cutoff = chrono::Duration::try_days(i64::from(filter.days_back))
        .and_then(|window| now.checked_sub_signed(window));
    let keywords: Vec<String> = filter
        .keywords
        .iter()
        .flatten()
        .map(|k| k.to_lowercase())
        .collect();
    let limit = filter.max_items.filter(|&m| m > 0).unwrap_or(usize::MAX);

    entries
        .into_iter()
        .filter(|e| cutoff.map_or(true, |cutoff| e.published >= cutoff))
        .filter(|e| {
            if keywords.is_empty() {
                return true;
            }
            let text = format!("{} {}", e.title, e.summary).to_lowercase();
            keywords.iter().any(|k| text.contains(k.as_str()))
        })
        .take(limit)
        .collect()
}

fn html_to_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = html2text::from_read(html.as_bytes(), 200).unwrap_or_else(|e| {
        tracing::debug!("Failed to convert summary HTML to text: {}", e);
        html.to_string()
    });
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
