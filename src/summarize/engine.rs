//! Local sequence-to-sequence generation backed by candle.
//!
//! The engine owns the tokenizer and a T5-family conditional-generation model
//! fetched from the Hugging Face Hub. Generation is deterministic beam search:
//! no sampling, a fixed beam width, EOS masked until the minimum length is
//! reached, and early stop once every beam has finished. Decoding re-runs the
//! full decoder prefix per step instead of juggling per-beam KV caches; beam
//! widths here are small enough that correctness wins over the cache
//! bookkeeping.

use std::cmp::Ordering;
use std::fs::File;

use anyhow::Context;
use candle_core::{D, DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_nn::ops::log_softmax;
use candle_transformers::models::t5::{Config as ModelConfig, T5ForConditionalGeneration};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::Tokenizer;

use crate::config::{DevicePreference, PrecisionPreference, get_config};
use crate::summarize::SummarizeError;

/// Tokenizer plus generation model, loaded once per process.
pub(crate) struct SummaryEngine {
    model: T5ForConditionalGeneration,
    tokenizer: Tokenizer,
    device: Device,
    input_window: usize,
    num_beams: usize,
    decoder_start: u32,
    eos_token: u32,
}

/// A partial decoder hypothesis tracked during beam search.
#[derive(Clone)]
struct Beam {
    tokens: Vec<u32>,
    score: f32,
    finished: bool,
}

impl SummaryEngine {
    /// Download model files and build the engine. Blocking; call off the
    /// async runtime.
    pub(crate) fn load() -> Result<Self, SummarizeError> {
        Self::load_inner().map_err(|err| SummarizeError::ModelLoad(format!("{err:#}")))
    }

    fn load_inner() -> anyhow::Result<Self> {
        let config = get_config();
        let device = select_device(config.device)?;
        let dtype = select_dtype(config.precision, &device);
        tracing::info!(
            model = %config.model_id,
            revision = %config.model_revision,
            device = ?device,
            dtype = ?dtype,
            "Loading summarization model"
        );

        let api = Api::new()?;
        let repo = api.repo(Repo::with_revision(
            config.model_id.clone(),
            RepoType::Model,
            config.model_revision.clone(),
        ));
        let tokenizer_path = repo.get("tokenizer.json")?;
        let config_path = repo.get("config.json")?;
        let weights_path = repo.get("model.safetensors")?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|err| anyhow::anyhow!(err))?;
        let config_file = File::open(&config_path)
            .with_context(|| format!("failed to open {}", config_path.display()))?;
        let model_config: ModelConfig = serde_json::from_reader(config_file)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        let vars = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], dtype, &device)? };
        let model = T5ForConditionalGeneration::load(vars, &model_config)?;

        let decoder_start = model_config
            .decoder_start_token_id
            .unwrap_or(model_config.pad_token_id) as u32;
        let eos_token = model_config.eos_token_id as u32;
        tracing::info!(model = %config.model_id, "Summarization model ready");

        Ok(Self {
            model,
            tokenizer,
            device,
            input_window: config.input_window,
            num_beams: config.num_beams,
            decoder_start,
            eos_token,
        })
    }

    /// Summarize one chunk of text within the given generated-token bounds.
    pub(crate) fn summarize_chunk(
        &mut self,
        text: &str,
        min_length: usize,
        max_length: usize,
    ) -> Result<String, SummarizeError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|err| SummarizeError::Generation(err.to_string()))?;
        let mut input_ids: Vec<u32> = encoding.get_ids().to_vec();
        input_ids.truncate(self.input_window);
        if input_ids.is_empty() {
            return Err(SummarizeError::Generation(
                "chunk produced no input tokens".into(),
            ));
        }

        let input_tensor = Tensor::new(input_ids.as_slice(), &self.device)
            .and_then(|tensor| tensor.unsqueeze(0))
            .map_err(generation_error)?;
        self.model.clear_kv_cache();
        let encoder_output = self.model.encode(&input_tensor).map_err(generation_error)?;

        let tokens = self.beam_search(&encoder_output, min_length, max_length)?;
        let summary = self
            .tokenizer
            .decode(&tokens, true)
            .map_err(|err| SummarizeError::Generation(err.to_string()))?;
        Ok(summary.trim().to_string())
    }

    /// Deterministic beam search over the decoder.
    fn beam_search(
        &mut self,
        encoder_output: &Tensor,
        min_length: usize,
        max_length: usize,
    ) -> Result<Vec<u32>, SummarizeError> {
        let width = self.num_beams.max(1);
        let mut beams = vec![Beam {
            tokens: vec![self.decoder_start],
            score: 0.0,
            finished: false,
        }];

        for step in 0..max_length.max(1) {
            if beams.iter().all(|beam| beam.finished) {
                break;
            }

            let banned = (step < min_length).then_some(self.eos_token);
            let mut candidates: Vec<Beam> = Vec::with_capacity(width * (width + 1));
            for beam in &beams {
                if beam.finished {
                    candidates.push(beam.clone());
                    continue;
                }
                let log_probs = self.next_log_probs(&beam.tokens, encoder_output)?;
                for (token, log_prob) in top_tokens(&log_probs, width, banned) {
                    let mut tokens = beam.tokens.clone();
                    tokens.push(token);
                    candidates.push(Beam {
                        finished: token == self.eos_token,
                        score: beam.score + log_prob,
                        tokens,
                    });
                }
            }

            candidates.sort_by(|a, b| compare_scores(b.score, a.score));
            candidates.truncate(width);
            beams = candidates;
        }

        beams
            .into_iter()
            .max_by(|a, b| compare_scores(a.score, b.score))
            .map(|beam| beam.tokens)
            .ok_or_else(|| SummarizeError::Generation("beam search produced no hypotheses".into()))
    }

    /// Log-probabilities over the vocabulary for the next token after `tokens`.
    fn next_log_probs(
        &mut self,
        tokens: &[u32],
        encoder_output: &Tensor,
    ) -> Result<Vec<f32>, SummarizeError> {
        // Full-prefix decode: the KV cache belongs to whichever beam ran last,
        // so it must be cleared before every call.
        self.model.clear_kv_cache();
        let decoder_ids = Tensor::new(tokens, &self.device)
            .and_then(|tensor| tensor.unsqueeze(0))
            .map_err(generation_error)?;
        let logits = self
            .model
            .decode(&decoder_ids, encoder_output)
            .and_then(|logits| logits.squeeze(0))
            .map_err(generation_error)?;
        let log_probs = logits
            .to_dtype(DType::F32)
            .and_then(|logits| log_softmax(&logits, D::Minus1))
            .and_then(|probs| probs.to_vec1())
            .map_err(generation_error)?;
        Ok(log_probs)
    }
}

/// Best `count` next tokens by log-probability, optionally excluding one id.
fn top_tokens(log_probs: &[f32], count: usize, banned: Option<u32>) -> Vec<(u32, f32)> {
    let mut ranked: Vec<(u32, f32)> = log_probs
        .iter()
        .enumerate()
        .map(|(idx, &log_prob)| (idx as u32, log_prob))
        .filter(|(token, _)| banned != Some(*token))
        .collect();
    ranked.sort_by(|a, b| compare_scores(b.1, a.1));
    ranked.truncate(count);
    ranked
}

fn compare_scores(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn select_device(preference: DevicePreference) -> anyhow::Result<Device> {
    match preference {
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Cuda => Ok(Device::new_cuda(0)?),
        DevicePreference::Auto => Ok(Device::cuda_if_available(0)?),
    }
}

fn select_dtype(preference: PrecisionPreference, device: &Device) -> DType {
    match preference {
        PrecisionPreference::Full => DType::F32,
        PrecisionPreference::Half => DType::F16,
        PrecisionPreference::Auto => {
            if device.is_cuda() {
                DType::F16
            } else {
                DType::F32
            }
        }
    }
}

fn generation_error(err: candle_core::Error) -> SummarizeError {
    SummarizeError::Generation(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_tokens_ranks_by_log_prob() {
        let log_probs = [-3.0, -0.5, -2.0, -1.0];
        let ranked = top_tokens(&log_probs, 2, None);
        assert_eq!(ranked, vec![(1, -0.5), (3, -1.0)]);
    }

    #[test]
    fn top_tokens_skips_banned_token() {
        let log_probs = [-3.0, -0.5, -2.0, -1.0];
        let ranked = top_tokens(&log_probs, 2, Some(1));
        assert_eq!(ranked, vec![(3, -1.0), (2, -2.0)]);
    }

    #[test]
    fn dtype_auto_prefers_full_precision_on_cpu() {
        assert_eq!(
            select_dtype(PrecisionPreference::Auto, &Device::Cpu),
            DType::F32
        );
        assert_eq!(
            select_dtype(PrecisionPreference::Half, &Device::Cpu),
            DType::F16
        );
    }
}
