mod health;
mod item;

pub use health::{FeedHealthReport, FeedHealthStatus, FeedId, FeedStatus};
pub use item::{truncate_chars, ContentItem, ItemKind, ARTICLE_CONTENT_CAP, VIDEO_CONTENT_CAP};
