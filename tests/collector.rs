mod mocks;

use distil::config::FeedConfig;
use distil::feed::{CollectOptions, Collector};
use distil::models::{FeedId, FeedStatus, ItemKind, VIDEO_CONTENT_CAP};
use distil::services::TranscriptFetcher;
use mocks::feed::write_feed;
use tempfile::TempDir;

fn named(url: String, name: &str) -> FeedConfig {
    FeedConfig {
        name: Some(name.to_string()),
        ..FeedConfig::new(url)
    }
}

#[tokio::test]
async fn test_mixed_feeds_are_all_reported() {
    let dir = TempDir::new().unwrap();
    let feeds = vec![
        named(write_feed(dir.path(), "full.xml", 5), "Full"),
        named(write_feed(dir.path(), "empty.xml", 0), "Empty"),
        named(dir.path().join("missing.xml").to_string_lossy().into_owned(), "Broken"),
    ];

    let collection = Collector::new()
        .unwrap()
        .collect(&feeds, &[], &CollectOptions::default())
        .await;

    assert_eq!(collection.items.len(), 5);
    assert!(collection.items.iter().all(|item| item.kind == ItemKind::Article));
    assert!(collection.items.iter().all(|item| item.source == "Full"));
    assert_eq!(collection.items[0].content, "Body 0");

    let statuses: Vec<FeedStatus> = collection.health.iter().map(|feed| feed.status).collect();
    assert_eq!(
        statuses,
        vec![FeedStatus::Success, FeedStatus::Empty, FeedStatus::Error]
    );
    assert_eq!(collection.health.successful_feeds(), 1);
    assert_eq!(collection.health.total_items(), 5);

    let broken = collection.health.get(&FeedId::new(3, "Broken")).unwrap();
    assert!(broken.message.starts_with("Failed to fetch feed"));
    assert_eq!(broken.filtered_entries, 0);
}

#[tokio::test]
async fn test_duplicate_names_get_separate_entries() {
    let dir = TempDir::new().unwrap();
    let feeds = vec![
        named(write_feed(dir.path(), "a.xml", 2), "Same"),
        named(write_feed(dir.path(), "b.xml", 3), "Same"),
    ];

    let collection = Collector::new()
        .unwrap()
        .collect(&feeds, &[], &CollectOptions::default())
        .await;

    assert_eq!(collection.health.len(), 2);
    assert_eq!(collection.health.get(&FeedId::new(1, "Same")).unwrap().filtered_entries, 2);
    assert_eq!(collection.health.get(&FeedId::new(2, "Same")).unwrap().filtered_entries, 3);
}

#[tokio::test]
async fn test_unnamed_feeds_use_their_position() {
    let dir = TempDir::new().unwrap();
    let feeds = vec![
        FeedConfig::new(write_feed(dir.path(), "a.xml", 1)),
        FeedConfig::new(write_feed(dir.path(), "b.xml", 1)),
    ];

    let collection = Collector::new()
        .unwrap()
        .collect(&feeds, &[], &CollectOptions::default())
        .await;

    let names: Vec<&str> = collection.health.iter().map(|feed| feed.name.as_str()).collect();
    assert_eq!(names, vec!["Feed 1", "Feed 2"]);
    assert_eq!(collection.items[1].source, "Feed 2");
}

#[tokio::test]
async fn test_threshold_flags_but_keeps_items() {
    let dir = TempDir::new().unwrap();
    let feeds = vec![FeedConfig::new(write_feed(dir.path(), "a.xml", 2))];
    let options = CollectOptions {
        min_items: 10,
        ..CollectOptions::default()
    };

    let collection = Collector::new().unwrap().collect(&feeds, &[], &options).await;

    assert!(collection.below_threshold);
    assert_eq!(collection.items.len(), 2);
}

#[tokio::test]
async fn test_keywords_and_cap_apply_per_feed() {
    let dir = TempDir::new().unwrap();
    let feeds = vec![FeedConfig {
        max_items: Some(2),
        keywords: Some(vec!["STORY".to_string()]),
        ..FeedConfig::new(write_feed(dir.path(), "a.xml", 4))
    }];

    let collection = Collector::new()
        .unwrap()
        .collect(&feeds, &[], &CollectOptions::default())
        .await;

    let titles: Vec<&str> = collection.items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, vec!["Story 0", "Story 1"]);
    let feed = collection.health.iter().next().unwrap();
    assert_eq!((feed.total_entries, feed.filtered_entries), (4, 2));
}

#[cfg(unix)]
#[tokio::test]
async fn test_transcripts_follow_articles() {
    let dir = TempDir::new().unwrap();
    let transcripts = dir.path().join("transcripts");
    std::fs::create_dir_all(&transcripts).unwrap();
    std::fs::write(
        transcripts.join("Stale.en.vtt"),
        "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nold news\n",
    )
    .unwrap();

    let fixture = dir.path().join("fixture.vtt");
    let long_line = "word ".repeat(1500);
    std::fs::write(
        &fixture,
        format!("WEBVTT\n\n00:00:00.000 --> 00:00:05.000\n{long_line}\n"),
    )
    .unwrap();

    // ${11} is the video url and $8 the output template in the downloader's arguments.
    let script = format!(
        r#"case "${{11}}" in *broken*) exit 1;; esac; cp '{}' "$(dirname "$8")/Deep Dive.en.vtt""#,
        fixture.display()
    );
    let collector = Collector::new()
        .unwrap()
        .with_transcript_fetcher(TranscriptFetcher::with_command(
            "sh",
            ["-c".to_string(), script, "yt-dlp".to_string()],
        ));

    let feeds = vec![FeedConfig::new(write_feed(dir.path(), "a.xml", 2))];
    let urls = vec![
        "https://youtube.com/watch?v=broken".to_string(),
        "https://youtube.com/watch?v=good".to_string(),
    ];
    let options = CollectOptions {
        transcript_dir: transcripts.clone(),
        ..CollectOptions::default()
    };

    let collection = collector.collect(&feeds, &urls, &options).await;

    let kinds: Vec<ItemKind> = collection.items.iter().map(|item| item.kind).collect();
    assert_eq!(kinds, vec![ItemKind::Article, ItemKind::Article, ItemKind::Video]);

    let video = &collection.items[2];
    assert_eq!(video.source, "youtube");
    assert_eq!(video.source_url, None);
    assert_eq!(video.title, "Deep Dive");
    assert_eq!(video.content.chars().count(), VIDEO_CONTENT_CAP);
    assert!(video.link.ends_with("Deep Dive.en.vtt"));

    assert!(collection.items.iter().all(|item| item.title != "Stale"));
    assert_eq!(collection.health.len(), 1);
}
