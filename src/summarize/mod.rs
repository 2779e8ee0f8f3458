//! Summarization pipeline: length policy, chunking, and model generation.

mod chunking;
mod engine;
/// Length tiers and the generation bound policy.
pub mod length;

pub use length::LengthTier;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{OnceCell, Semaphore};

use crate::config::get_config;
use engine::SummaryEngine;

/// Errors emitted by the summarization pipeline.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Input contained no words after whitespace stripping.
    #[error("No text provided.")]
    EmptyInput,
    /// Model or tokenizer files could not be fetched or loaded.
    #[error("Failed to load summarization model: {0}")]
    ModelLoad(String),
    /// Generation failed after the model was loaded.
    #[error("Failed to generate summary: {0}")]
    Generation(String),
}

/// Abstraction over the summarization pipeline used by the HTTP surface.
#[async_trait]
pub trait SummarizerApi: Send + Sync {
    /// Produce an abstractive summary of `text` at the requested tier.
    async fn summarize(&self, text: &str, tier: LengthTier) -> Result<String, SummarizeError>;

    /// Whether the model singleton has been loaded yet.
    fn model_loaded(&self) -> bool;
}

/// Coordinates the full summarization pipeline: length policy, chunking, and
/// beam-search generation over a lazily loaded model.
///
/// The engine is created on first use through a single-flight cell, so
/// concurrent first requests trigger exactly one model load and later
/// requests reuse the cached handle. A semaphore bounds how many generation
/// calls run at once, since beam search is memory- and compute-intensive.
/// Construct the service once near process start and share it through an
/// `Arc`.
pub struct SummarizerService {
    engine: OnceCell<Arc<Mutex<SummaryEngine>>>,
    permits: Semaphore,
}

impl SummarizerService {
    /// Build a new summarizer service. The model is not loaded until the
    /// first summarization request arrives.
    pub fn new() -> Self {
        Self {
            engine: OnceCell::new(),
            permits: Semaphore::new(get_config().max_concurrent),
        }
    }

    async fn engine(&self) -> Result<Arc<Mutex<SummaryEngine>>, SummarizeError> {
        self.engine
            .get_or_try_init(|| async {
                let engine = tokio::task::spawn_blocking(SummaryEngine::load)
                    .await
                    .map_err(|err| SummarizeError::ModelLoad(err.to_string()))??;
                Ok(Arc::new(Mutex::new(engine)))
            })
            .await
            .cloned()
    }

    /// Summarize `text` at the requested tier.
    ///
    /// Word-counts the input, derives generation bounds from the length
    /// policy, chunks inputs longer than the configured window, and generates
    /// each chunk's summary in order. Per-chunk summaries are joined with a
    /// single space. Failures propagate immediately; nothing is retried and
    /// no partial result is returned.
    pub async fn summarize(
        &self,
        text: &str,
        tier: LengthTier,
    ) -> Result<String, SummarizeError> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        let config = get_config();
        let (min_length, max_length) = length::length_bounds(tier, words.len());
        let chunks = chunking::chunk_words(&words, config.input_window);
        let (chunk_min, chunk_max) =
            chunking::per_chunk_bounds(min_length, max_length, chunks.len());
        tracing::debug!(
            tier = ?tier,
            words = words.len(),
            chunks = chunks.len(),
            chunk_min,
            chunk_max,
            "Prepared summarization request"
        );

        let engine = self.engine().await?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|err| SummarizeError::Generation(err.to_string()))?;

        let summary = tokio::task::spawn_blocking(move || {
            let mut engine = engine
                .lock()
                .map_err(|_| SummarizeError::Generation("engine lock poisoned".into()))?;
            let mut pieces = Vec::with_capacity(chunks.len());
            for chunk in &chunks {
                pieces.push(engine.summarize_chunk(chunk, chunk_min, chunk_max)?);
            }
            Ok::<String, SummarizeError>(pieces.join(" "))
        })
        .await
        .map_err(|err| SummarizeError::Generation(err.to_string()))??;

        tracing::debug!(summary_chars = summary.len(), "Generated summary");
        Ok(summary)
    }

    /// Whether the model has been loaded by a previous request.
    pub fn model_loaded(&self) -> bool {
        self.engine.initialized()
    }
}

#[async_trait]
impl SummarizerApi for SummarizerService {
    async fn summarize(&self, text: &str, tier: LengthTier) -> Result<String, SummarizeError> {
        SummarizerService::summarize(self, text, tier).await
    }

    fn model_loaded(&self) -> bool {
        SummarizerService::model_loaded(self)
    }
}
