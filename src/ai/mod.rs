mod client;
pub mod prompts;
mod stream;
mod summarizer;

pub use client::{LanguageModel, ModelClient, Provider};
pub use summarizer::{BatchSummarizer, DistilEvent, DistilOptions, Phase, Progress, NO_ITEMS_MESSAGE};
