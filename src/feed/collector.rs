use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;

use crate::config::{Config, FeedConfig};
use crate::error::Result;
use crate::feed::{FeedFetcher, FeedFilter};
use crate::models::{ContentItem, FeedHealthReport, FeedHealthStatus, FeedId, FeedStatus};
use crate::services::{parse_vtt, video_title, TranscriptFetcher};

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub days_back: u32,
    pub feed_timeout: Duration,
    /// Below this many articles the collection is flagged, not failed.
    pub min_items: usize,
    pub transcript_dir: PathBuf,
}

impl CollectOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            days_back: config.fetch.days_back,
            feed_timeout: Duration::from_secs(config.fetch.feed_timeout_secs),
            min_items: config.fetch.min_items,
            transcript_dir: config.transcript_dir(),
        }
    }
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            days_back: 7,
            feed_timeout: Duration::from_secs(30),
            min_items: 0,
            transcript_dir: PathBuf::from("transcripts"),
        }
    }
}

/// Everything one collection run produced.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Articles in feed-then-entry order, followed by video transcripts.
    pub items: Vec<ContentItem>,
    pub health: FeedHealthReport,
    pub below_threshold: bool,
}

pub struct Collector {
    fetcher: FeedFetcher,
    transcripts: TranscriptFetcher,
}

impl Collector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fetcher: FeedFetcher::new()?,
            transcripts: TranscriptFetcher::new(),
        })
    }

    pub fn with_transcript_fetcher(mut self, transcripts: TranscriptFetcher) -> Self {
        self.transcripts = transcripts;
        self
    }

    pub async fn collect(
        &self,
        feeds: &[FeedConfig],
        transcript_urls: &[String],
        options: &CollectOptions,
    ) -> Collection {
        tracing::info!(
            "Collecting content from {} RSS feeds (last {} days, timeout {}s per feed)",
            feeds.len(),
            options.days_back,
            options.feed_timeout.as_secs()
        );

        let mut collection = Collection::default();

        for (i, feed) in feeds.iter().enumerate() {
            let position = i + 1;
            let name = feed.display_name(position);
            let (items, status) = self.collect_feed(position, &name, feed, options).await;
            collection.items.extend(items);
            collection.health.record(status);
        }

        let articles = collection.items.len();
        collection.below_threshold = articles < options.min_items;
        if collection.below_threshold {
            tracing::warn!(
                "Only {} items collected (threshold: {})",
                articles,
                options.min_items
            );
        } else {
            tracing::info!("Collected {} items from feeds", articles);
        }

        for url in transcript_urls {
            let run = self
                .transcripts
                .fetch_transcript(url, &options.transcript_dir)
                .await;
            if !run.success {
                tracing::warn!("Transcript download reported failure for {}", url);
            }
            for path in &run.files {
                match tokio::fs::read_to_string(path).await {
                    Ok(source) => collection.items.push(ContentItem::video(
                        video_title(path),
                        &parse_vtt(&source),
                        path.to_string_lossy(),
                        Utc::now(),
                    )),
                    Err(e) => tracing::warn!("Skipping transcript {}: {}", path.display(), e),
                }
            }
        }

        tracing::info!(
            "Content collection complete: {} items from {}/{} feeds",
            collection.items.len(),
            collection.health.successful_feeds(),
            feeds.len()
        );

        collection
    }

    async fn collect_feed(
        &self,
        position: usize,
        name: &str,
        feed: &FeedConfig,
        options: &CollectOptions,
    ) -> (Vec<ContentItem>, FeedHealthStatus) {
        let filter = FeedFilter {
            days_back: options.days_back,
            max_items: feed.max_items,
            keywords: feed.keywords.clone(),
            timeout: options.feed_timeout,
        };

        let started = Instant::now();
        let fetched = AssertUnwindSafe(self.fetcher.fetch(&feed.url, &filter))
            .catch_unwind()
            .await;

        let mut status = FeedHealthStatus {
            id: FeedId::new(position, name),
            name: name.to_string(),
            url: feed.url.clone(),
            status: FeedStatus::Error,
            message: String::new(),
            total_entries: 0,
            filtered_entries: 0,
            fetch_time: 0.0,
            keywords: feed.keywords.clone(),
            max_items: feed.max_items,
        };

        let items = match fetched {
            Ok(fetch) => {
                status.status = fetch.status();
                status.message = fetch.message();
                status.total_entries = fetch.total_entries;
                status.filtered_entries = fetch.filtered_entries();
                fetch
                    .outcome
                    .into_entries()
                    .into_iter()
                    .map(|entry| {
                        ContentItem::article(
                            name,
                            &feed.url,
                            entry.title,
                            &entry.summary,
                            entry.link,
                            entry.published,
                        )
                    })
                    .collect()
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| panic.downcast_ref::<&str>().copied())
                    .unwrap_or("unknown panic");
                tracing::error!("Unexpected error fetching {}: {}", feed.url, detail);
                status.message = format!("Unexpected error: {detail}");
                Vec::new()
            }
        };

        status.fetch_time = started.elapsed().as_secs_f64();
        (items, status)
    }
}
