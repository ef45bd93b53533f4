use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Success,
    Warning,
    Empty,
    Timeout,
    Error,
}

impl FeedStatus {
    pub fn icon(self) -> &'static str {
        match self {
            FeedStatus::Success => "✅",
            FeedStatus::Warning => "⚠️",
            FeedStatus::Empty => "📭",
            FeedStatus::Timeout => "⏰",
            FeedStatus::Error => "❌",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedStatus::Success => "success",
            FeedStatus::Warning => "warning",
            FeedStatus::Empty => "empty",
            FeedStatus::Timeout => "timeout",
            FeedStatus::Error => "error",
        }
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of one configured feed within a collection run.
///
/// Display names are not unique, so the 1-based position is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedId(String);

impl FeedId {
    pub fn new(position: usize, name: &str) -> Self {
        Self(format!("{position}:{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedHealthStatus {
    pub id: FeedId,
    pub name: String,
    pub url: String,
    pub status: FeedStatus,
    pub message: String,
    pub total_entries: usize,
    pub filtered_entries: usize,
    /// Seconds.
    pub fetch_time: f64,
    pub keywords: Option<Vec<String>>,
    pub max_items: Option<usize>,
}

/// Per-feed outcomes of one collection run, in configuration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedHealthReport {
    feeds: Vec<FeedHealthStatus>,
}

impl FeedHealthReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, status: FeedHealthStatus) {
        match self.feeds.iter_mut().find(|f| f.id == status.id) {
            Some(existing) => *existing = status,
            None => self.feeds.push(status),
        }
    }

    pub fn get(&self, id: &FeedId) -> Option<&FeedHealthStatus> {
        self.feeds.iter().find(|f| &f.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedHealthStatus> {
        self.feeds.iter()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Feeds that contributed at least one item.
    pub fn successful_feeds(&self) -> usize {
        self.feeds.iter().filter(|f| f.filtered_entries > 0).count()
    }

    pub fn total_items(&self) -> usize {
        self.feeds.iter().map(|f| f.filtered_entries).sum()
    }
}

impl fmt::Display for FeedHealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "📊 FEED HEALTH REPORT")?;
        writeln!(f, "{rule}")?;

        for feed in &self.feeds {
            writeln!(f, "{} {}", feed.status.icon(), feed.name)?;
            writeln!(f, "   URL: {}", feed.url)?;
            writeln!(f, "   Status: {}", feed.status.as_str().to_uppercase())?;
            if !feed.message.is_empty() {
                writeln!(f, "   Message: {}", feed.message)?;
            }
            writeln!(
                f,
                "   Entries: {}/{} (filtered/total)",
                feed.filtered_entries, feed.total_entries
            )?;
            writeln!(f, "   Fetch time: {:.2}s", feed.fetch_time)?;
            if let Some(keywords) = feed.keywords.as_ref().filter(|k| !k.is_empty()) {
                writeln!(f, "   Keywords: {} filters", keywords.len())?;
            }
            if let Some(max) = feed.max_items {
                writeln!(f, "   Max items: {max}")?;
            }
            writeln!(f)?;
        }

        writeln!(
            f,
            "📈 Summary: {}/{} feeds successful, {} items total",
            self.successful_feeds(),
            self.len(),
            self.total_items()
        )?;
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(position: usize, name: &str, filtered: usize) -> FeedHealthStatus {
        FeedHealthStatus {
            id: FeedId::new(position, name),
            name: name.to_string(),
            url: format!("https://example.com/{position}"),
            status: if filtered > 0 { FeedStatus::Success } else { FeedStatus::Empty },
            message: String::new(),
            total_entries: filtered + 2,
            filtered_entries: filtered,
            fetch_time: 0.25,
            keywords: None,
            max_items: None,
        }
    }

    #[test]
    fn duplicate_names_keep_separate_entries() {
        let mut report = FeedHealthReport::new();
        report.record(status(1, "Nature", 3));
        report.record(status(2, "Nature", 0));

        assert_eq!(report.len(), 2);
        assert_eq!(report.get(&FeedId::new(1, "Nature")).unwrap().filtered_entries, 3);
        assert_eq!(report.get(&FeedId::new(2, "Nature")).unwrap().status, FeedStatus::Empty);
    }

    #[test]
    fn totals_count_only_contributing_feeds() {
        let mut report = FeedHealthReport::new();
        report.record(status(1, "A", 3));
        report.record(status(2, "B", 0));
        report.record(status(3, "C", 4));

        assert_eq!(report.successful_feeds(), 2);
        assert_eq!(report.total_items(), 7);

        let rendered = report.to_string();
        assert!(rendered.contains("2/3 feeds successful, 7 items total"));
        assert!(rendered.contains("Status: EMPTY"));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&FeedStatus::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
    }
}
