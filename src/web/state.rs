use std::sync::Arc;

use crate::ai::{prompts, BatchSummarizer, DistilOptions, LanguageModel};
use crate::config::Config;
use crate::error::Result;
use crate::feed::{CollectOptions, Collector};
use crate::services::History;

use super::session::SessionStore;

/// Services shared by every request of the web UI.
pub struct AppState {
    pub config: Config,
    pub collector: Collector,
    pub summarizer: BatchSummarizer,
    pub history: History,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, model: Arc<dyn LanguageModel>) -> Result<Self> {
        let history = History::new(config.output_dir());
        Ok(Self {
            collector: Collector::new()?,
            summarizer: BatchSummarizer::new(model),
            history,
            sessions: SessionStore::new(),
            config,
        })
    }

    pub fn with_collector(mut self, collector: Collector) -> Self {
        self.collector = collector;
        self
    }

    /// Collection settings for a fetch from the UI; no minimum item count applies.
    pub fn collect_options(&self, days_back: u32) -> CollectOptions {
        CollectOptions {
            days_back,
            min_items: 0,
            ..CollectOptions::from_config(&self.config)
        }
    }

    pub fn distil_options(&self) -> DistilOptions {
        DistilOptions::from_config(&self.config)
    }

    pub fn system_prompt(&self) -> String {
        prompts::system_prompt(&self.config.domain.focus)
    }
}
