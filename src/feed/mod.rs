mod collector;
mod fetcher;

pub use collector::{CollectOptions, Collection, Collector};
pub use fetcher::{evaluate, FeedEntry, FeedFetch, FeedFetcher, FeedFilter, FetchOutcome};
