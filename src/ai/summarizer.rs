use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::ContentItem;

use super::client::LanguageModel;
use super::prompts::{batch_prompt, consolidation_prompt, distil_prompt};

pub const NO_ITEMS_MESSAGE: &str = "No items to process.";

#[derive(Debug, Clone)]
pub struct DistilOptions {
    pub batch_size: usize,
    /// Target reading time in minutes.
    pub reading_time: u32,
    pub domain: String,
}

impl DistilOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.fetch.batch_size,
            reading_time: config.output.reading_time_minutes,
            domain: config.domain.focus.clone(),
        }
    }
}

/// Which model call a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// 1-based batch number of the map phase.
    Batch(usize),
    /// The single-pass call or the consolidation call; its text is the distil.
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Progress {
    SinglePass { items: usize },
    BatchStarted { batch: usize, total: usize, items: usize },
    Consolidating { batches: usize },
}

/// One message of a streaming run. Progress never carries distil text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistilEvent {
    Progress(Progress),
    Chunk { phase: Phase, text: String },
}

/// Summarizes any number of items within the model's context by batching them
/// and consolidating the batch summaries with one final call.
pub struct BatchSummarizer {
    model: Arc<dyn LanguageModel>,
}

impl BatchSummarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub async fn summarize(
        &self,
        system_prompt: &str,
        items: &[ContentItem],
        options: &DistilOptions,
    ) -> Result<String> {
        if items.is_empty() {
            return Ok(NO_ITEMS_MESSAGE.to_string());
        }
        let batch_size = checked_batch_size(options)?;

        if items.len() <= batch_size {
            tracing::info!("Processing {} items in a single pass", items.len());
            let prompt = distil_prompt(items, options.reading_time, &options.domain);
            return self.model.complete(system_prompt, &prompt).await;
        }

        let total = items.len().div_ceil(batch_size);
        let mut summaries = Vec::with_capacity(total);

        for (i, batch) in items.chunks(batch_size).enumerate() {
            tracing::info!("Processing batch {}/{} ({} items)", i + 1, total, batch.len());
            let summary = self
                .model
                .complete(system_prompt, &batch_prompt(batch))
                .await?;
            summaries.push(summary);
        }

        tracing::info!("Consolidating {} batch summaries into final distil", total);
        let prompt = consolidation_prompt(&summaries, options.reading_time);
        self.model.complete(system_prompt, &prompt).await
    }

    /// Same calls in the same order as [`summarize`](Self::summarize), delivering
    /// progress and text fragments to `events` as they arrive.
    ///
    /// Returns the distil, which equals the concatenated [`Phase::Final`] chunks.
    pub async fn summarize_stream(
        &self,
        system_prompt: &str,
        items: &[ContentItem],
        options: &DistilOptions,
        events: &mpsc::Sender<DistilEvent>,
    ) -> Result<String> {
        if items.is_empty() {
            return Ok(NO_ITEMS_MESSAGE.to_string());
        }
        let batch_size = checked_batch_size(options)?;

        if items.len() <= batch_size {
            emit(events, DistilEvent::Progress(Progress::SinglePass { items: items.len() })).await?;
            let prompt = distil_prompt(items, options.reading_time, &options.domain);
            return self
                .stream_call(system_prompt, &prompt, Phase::Final, events)
                .await;
        }

        let total = items.len().div_ceil(batch_size);
        let mut summaries = Vec::with_capacity(total);

        for (i, batch) in items.chunks(batch_size).enumerate() {
            let progress = Progress::BatchStarted {
                batch: i + 1,
                total,
                items: batch.len(),
            };
            emit(events, DistilEvent::Progress(progress)).await?;

            let summary = self
                .stream_call(system_prompt, &batch_prompt(batch), Phase::Batch(i + 1), events)
                .await?;
            summaries.push(summary);
        }

        emit(events, DistilEvent::Progress(Progress::Consolidating { batches: total })).await?;
        let prompt = consolidation_prompt(&summaries, options.reading_time);
        self.stream_call(system_prompt, &prompt, Phase::Final, events)
            .await
    }

    async fn stream_call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        phase: Phase,
        events: &mpsc::Sender<DistilEvent>,
    ) -> Result<String> {
        let mut fragments = self.model.complete_stream(system_prompt, user_prompt).await?;
        let mut text = String::new();
        let mut count = 0usize;

        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            text.push_str(&fragment);
            count += 1;
            emit(events, DistilEvent::Chunk { phase, text: fragment }).await?;
        }

        tracing::debug!("Streaming completed for {:?}: {} chunks", phase, count);
        Ok(text)
    }
}

fn checked_batch_size(options: &DistilOptions) -> Result<usize> {
    match options.batch_size {
        0 => Err(AppError::Config("batch size must be at least 1".into())),
        size => Ok(size),
    }
}

async fn emit(events: &mpsc::Sender<DistilEvent>, event: DistilEvent) -> Result<()> {
    events.send(event).await.map_err(|_| AppError::StreamClosed)
}
