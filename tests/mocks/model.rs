use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use distil::ai::LanguageModel;
use distil::error::{AppError, Result};
use futures::stream::{self, BoxStream};

/// Deterministic model: the n-th call (1-based) answers "Summary n of the prompt."
/// and records every user prompt it receives.
#[derive(Clone)]
pub struct MockModel {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_on_call: Option<usize>,
    /// Streams part of the answer for this call, then yields an error.
    pub break_stream_on_call: Option<usize>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on_call: None,
            break_stream_on_call: None,
        }
    }

    /// Fails the `n`-th call (1-based) with an LLM error.
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::new()
        }
    }

    /// The `n`-th streamed call (1-based) fails after its first two fragments.
    pub fn breaking_stream_on(n: usize) -> Self {
        Self {
            break_stream_on_call: Some(n),
            ..Self::new()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, user_prompt: &str) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(user_prompt.to_string());
        let n = calls.len();
        if self.fail_on_call == Some(n) {
            return Err(AppError::Llm(format!("mock failure on call {n}")));
        }
        Ok(format!("Summary {n} of the prompt."))
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn model_id(&self) -> &str {
        "mock/echo"
    }

    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.answer(user_prompt)
    }

    async fn complete_stream(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let text = self.answer(user_prompt)?;
        let mut words: Vec<Result<String>> = text
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();

        let n = self.calls.lock().unwrap().len();
        if self.break_stream_on_call == Some(n) {
            words.truncate(2);
            words.push(Err(AppError::Llm(format!("connection reset during call {n}"))));
        }
        Ok(Box::pin(stream::iter(words)))
    }
}
