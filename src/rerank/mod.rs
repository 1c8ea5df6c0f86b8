//! # Rerank Module
//!
//! Scores near-duplicate sentences by how probable the model finds them.
//! All sentences share a single padded forward pass; each token after the
//! first contributes the softmax probability the model assigned to it given
//! the preceding tokens, and the sentence end contributes the probability of
//! EOS. The total score is the sum of natural logs, so less negative means
//! more plausible.

use std::error::Error;
use std::fmt;
use ndarray::Array3;
use tracing::debug;
use crate::onnx::{softmax, OnnxSession};
use crate::tokenizer::ModelTokenizer;

/// Errors raised by sentence scoring
#[derive(Debug)]
pub enum RerankError {
    /// No sentences were given
    EmptyInput,
    /// A sentence produced no tokens
    EmptySentence(String),
}

impl fmt::Display for RerankError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RerankError::EmptyInput => write!(f, "No sentences to score"),
            RerankError::EmptySentence(s) => write!(f, "Sentence produced no tokens: {:?}", s),
        }
    }
}

impl Error for RerankError {}

/// Score of a single sentence within a comparison set.
#[derive(Debug, Clone)]
pub struct SentenceScore {
    /// The original sentence text
    pub sentence: String,
    /// Token ids of the sentence
    pub tokens: Vec<i64>,
    /// Probability chain: 1.0 for the first token, then p(tok_j | tok_..j),
    /// and finally p(eos | sentence) when the model declares an EOS id
    pub probs: Vec<f32>,
    /// Sum of natural logs over the whole chain
    pub log_prob: f32,
    /// Same sum restricted to positions at or after the point where the
    /// compared sentences diverge
    pub diff_log_prob: f32,
}

/// Length of the shared token prefix across all sentences.
///
/// Returns the first position at which some sentence ends or carries a
/// different token than the others.
pub fn common_prefix_len(token_lists: &[Vec<i64>]) -> usize {
    let first = match token_lists.first() {
        Some(first) => first,
        None => return 0,
    };

    for i in 0..first.len() {
        let target = first[i];
        for other in &token_lists[1..] {
            if i >= other.len() || other[i] != target {
                return i;
            }
        }
    }

    first.len()
}

/// Probability of a token id within a softmaxed row. Ids outside the
/// vocabulary score as good as impossible instead of panicking.
fn prob_of(distribution: &[f32], token: i64) -> f32 {
    usize::try_from(token)
        .ok()
        .and_then(|idx| distribution.get(idx).copied())
        .unwrap_or(f32::MIN_POSITIVE)
}

/// Computes sentence scores from a batched logits tensor.
///
/// `logits` must be the `[batch, seq, vocab]` output of one forward pass
/// over the padded sentence batch, in the same order as `token_lists`.
/// Token lists that are empty have no probability chain and are skipped.
pub fn score_from_logits(
    logits: &Array3<f32>,
    sentences: &[String],
    token_lists: &[Vec<i64>],
    eos_id: Option<i64>,
) -> Vec<SentenceScore> {
    let divergence = common_prefix_len(token_lists);
    let mut result = Vec::with_capacity(token_lists.len());

    for (i, tokens) in token_lists.iter().enumerate() {
        if tokens.is_empty() {
            continue;
        }

        let mut probs = Vec::with_capacity(tokens.len() + 1);
        // The first token has no left context to be predicted from
        probs.push(1.0f32);

        for j in 1..tokens.len() {
            let row = logits.index_axis(ndarray::Axis(0), i).row(j - 1).to_vec();
            let distribution = softmax(&row);
            probs.push(prob_of(&distribution, tokens[j]));
        }

        // EOS closes the chain: a sentence that reads as complete scores
        // higher than one the model wants to continue
        if let Some(eos_id) = eos_id {
            let row = logits
                .index_axis(ndarray::Axis(0), i)
                .row(tokens.len() - 1)
                .to_vec();
            let distribution = softmax(&row);
            probs.push(prob_of(&distribution, eos_id));
        }

        let log_prob: f32 = probs.iter().map(|&p| p.ln()).sum();
        let diff_log_prob: f32 = probs[divergence.min(probs.len())..]
            .iter()
            .map(|&p| p.ln())
            .sum();

        result.push(SentenceScore {
            sentence: sentences[i].clone(),
            tokens: tokens.clone(),
            probs,
            log_prob,
            diff_log_prob,
        });
    }

    result
}

/// Scores a set of sentences against the model.
///
/// Encodes every sentence, runs one batched forward pass and derives the
/// probability chains from the logits.
pub fn score_sentences(
    session: &mut OnnxSession,
    tokenizer: &ModelTokenizer,
    sentences: &[String],
) -> Result<Vec<SentenceScore>, Box<dyn Error + Send + Sync>> {
    if sentences.is_empty() {
        return Err(Box::new(RerankError::EmptyInput));
    }

    let mut token_lists = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        let tokens = tokenizer.encode(sentence)?;
        if tokens.is_empty() {
            return Err(Box::new(RerankError::EmptySentence(sentence.clone())));
        }
        token_lists.push(tokens);
    }

    debug!(
        "Scoring {} sentence(s), shared prefix length {}",
        sentences.len(),
        common_prefix_len(&token_lists)
    );

    let logits = session.evaluate_batch(&token_lists)?;

    Ok(score_from_logits(&logits, sentences, &token_lists, tokenizer.eos_id()))
}
