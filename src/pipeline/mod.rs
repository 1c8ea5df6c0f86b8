//! # Pipeline Module
//!
//! Composes the tokenizer and the ONNX session into a text-generation
//! pipeline: prompt string in, generated text out. Decoding is greedy by
//! default, matching the exported models' verification runs; temperature and
//! top-p sampling can be switched on through the generation settings.

use std::error::Error;
use std::fmt;
use std::time::Duration;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use tracing::{debug, info};
use crate::config::GenerationConfig;
use crate::model::ModelDir;
use crate::onnx::{argmax, softmax, OnnxSession};
use crate::rerank::{self, SentenceScore};
use crate::tokenizer::ModelTokenizer;

/// Errors raised by the generation pipeline
#[derive(Debug)]
pub enum PipelineError {
    /// The prompt was empty or produced no tokens
    EmptyPrompt,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::EmptyPrompt => write!(f, "Prompt produced no tokens"),
        }
    }
}

impl Error for PipelineError {}

/// Decoding parameters for one pipeline instance.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub max_new_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub do_sample: bool,
}

impl GenerationOptions {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            do_sample: config.do_sample,
        }
    }
}

/// Output of a single generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// The prompt as given
    pub prompt: String,
    /// Prompt plus continuation, decoded together
    pub text: String,
    /// Only the generated continuation
    pub completion: String,
    /// Number of tokens appended to the prompt
    pub generated_tokens: usize,
}

/// Text-generation pipeline over a converted model folder.
pub struct GenerationPipeline {
    tokenizer: ModelTokenizer,
    session: OnnxSession,
    options: GenerationOptions,
}

impl GenerationPipeline {
    /// Loads the tokenizer and decoder graph from a model folder.
    pub fn load(model: &ModelDir, options: GenerationOptions) -> Result<Self, Box<dyn Error + Send + Sync>> {
        info!("Loading model: {}", model.name());
        let tokenizer = ModelTokenizer::load(model)?;
        let session = OnnxSession::open(model.decoder_path())?;

        Ok(Self {
            tokenizer,
            session,
            options,
        })
    }

    /// Generates a continuation for the prompt.
    ///
    /// Runs the decoder once per new token over the accumulated sequence,
    /// stopping at EOS or after `max_new_tokens`.
    pub fn generate(&mut self, prompt: &str) -> Result<GenerationResult, Box<dyn Error + Send + Sync>> {
        if prompt.trim().is_empty() {
            return Err(Box::new(PipelineError::EmptyPrompt));
        }

        let mut tokens = self.tokenizer.encode(prompt)?;
        if tokens.is_empty() {
            return Err(Box::new(PipelineError::EmptyPrompt));
        }

        let prompt_len = tokens.len();
        let eos_id = self.tokenizer.eos_id();
        debug!(
            "Generating up to {} token(s) from {} prompt token(s)",
            self.options.max_new_tokens, prompt_len
        );

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{prefix:.bold.dim} {spinner} {wide_msg}")
                .unwrap()
        );
        pb.enable_steady_tick(Duration::from_millis(120));

        let mut rng = rand::rng();
        for step in 0..self.options.max_new_tokens {
            pb.set_message(format!("Generating token {}/{}", step + 1, self.options.max_new_tokens));

            let next = if self.options.do_sample {
                let row = self.session.last_logits(&tokens)?;
                sample_token(&row, self.options.temperature, self.options.top_p, &mut rng)
            } else {
                let (token, _prob) = self.session.next_token(&tokens)?;
                token
            };

            // EOS never enters the output
            if Some(next) == eos_id {
                debug!("EOS after {} generated token(s)", step);
                break;
            }

            tokens.push(next);
        }
        pb.finish_and_clear();

        let text = self.tokenizer.decode(&tokens)?;
        let completion = self.tokenizer.decode(&tokens[prompt_len..])?;
        let generated_tokens = tokens.len() - prompt_len;
        info!("Generated {} token(s) for prompt {:?}", generated_tokens, prompt);

        Ok(GenerationResult {
            prompt: prompt.to_string(),
            text,
            completion,
            generated_tokens,
        })
    }

    /// Scores a set of near-duplicate sentences against the model.
    pub fn rerank(&mut self, sentences: &[String]) -> Result<Vec<SentenceScore>, Box<dyn Error + Send + Sync>> {
        rerank::score_sentences(&mut self.session, &self.tokenizer, sentences)
    }

    /// Access to the underlying tokenizer.
    pub fn tokenizer(&self) -> &ModelTokenizer {
        &self.tokenizer
    }
}

/// Samples a token from the logits with temperature and top-p filtering.
///
/// A temperature at or near zero degrades to greedy argmax.
pub fn sample_token(logits: &[f32], temperature: f32, top_p: f32, rng: &mut impl Rng) -> i64 {
    if temperature <= f32::EPSILON {
        return argmax(logits) as i64;
    }

    // Apply temperature, then softmax
    let scaled: Vec<f32> = logits.iter().map(|&x| x / temperature).collect();
    let probs = softmax(&scaled);

    // Keep the smallest set of tokens whose cumulative probability reaches
    // top_p, most probable first
    let mut sorted_indices: Vec<usize> = (0..probs.len()).collect();
    sorted_indices.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));

    let mut cumulative_prob = 0.0;
    let mut cutoff_index = probs.len();
    for (i, &idx) in sorted_indices.iter().enumerate() {
        cumulative_prob += probs[idx];
        if cumulative_prob >= top_p {
            cutoff_index = i + 1;
            break;
        }
    }

    // Sample within the kept set, renormalized so the draw spans exactly
    // the mass the set actually carries
    let kept_mass: f32 = sorted_indices
        .iter()
        .take(cutoff_index)
        .map(|&idx| probs[idx])
        .sum();
    let random_value: f32 = rng.random::<f32>() * kept_mass;
    let mut cumulative = 0.0;
    for &idx in sorted_indices.iter().take(cutoff_index) {
        cumulative += probs[idx];
        if random_value <= cumulative {
            return idx as i64;
        }
    }

    // Fallback to the most probable token
    sorted_indices[0] as i64
}
