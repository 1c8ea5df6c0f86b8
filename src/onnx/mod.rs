//! # ONNX Module
//!
//! Runs the exported decoder graph through ONNX Runtime. The session wrapper
//! lives in `session`; this module holds the error type and the small pieces
//! of logits math (softmax, argmax, batch padding) shared by prediction and
//! reranking.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use ndarray::{ArrayD, IxDyn};

pub mod session;
pub use session::OnnxSession;

/// Errors raised by session creation and graph execution
#[derive(Debug)]
pub enum OnnxError {
    /// The decoder graph file does not exist
    ModelNotFound(PathBuf),
    /// ONNX Runtime session could not be created
    SessionFailed(String),
    /// Running the graph failed
    InferenceFailed(String),
    /// The graph produced an output this harness cannot interpret
    UnexpectedOutput(String),
}

impl fmt::Display for OnnxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OnnxError::ModelNotFound(path) => write!(f, "ONNX model file not found: {}", path.display()),
            OnnxError::SessionFailed(msg) => write!(f, "Failed to create ONNX session: {}", msg),
            OnnxError::InferenceFailed(msg) => write!(f, "ONNX inference failed: {}", msg),
            OnnxError::UnexpectedOutput(msg) => write!(f, "Unexpected ONNX output: {}", msg),
        }
    }
}

impl Error for OnnxError {}

/// Numerically stable softmax over a logits row.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp: Vec<f32> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.iter().map(|&x| x / sum).collect()
}

/// Index of the largest logit. Ties resolve to the first occurrence.
pub fn argmax(logits: &[f32]) -> usize {
    let mut result_index = 0;
    let mut max_logit = f32::NEG_INFINITY;
    for (i, &logit) in logits.iter().enumerate() {
        if logit > max_logit {
            max_logit = logit;
            result_index = i;
        }
    }
    result_index
}

/// Right-pads a batch of token sequences to the longest one.
///
/// Returns `[batch, max_len]` input_ids and attention_mask tensors. Padding
/// positions hold token 0 and mask 0, real tokens mask 1; the pad id never
/// reaches the loss because masked positions are ignored by the graph.
pub fn pad_batch(sentences: &[Vec<i64>]) -> (ArrayD<i64>, ArrayD<i64>) {
    let batch = sentences.len();
    let max_len = sentences.iter().map(|s| s.len()).max().unwrap_or(0);

    let mut token_array = vec![0i64; batch * max_len];
    let mut mask_array = vec![0i64; batch * max_len];

    for (i, sentence) in sentences.iter().enumerate() {
        let row = i * max_len;
        for (j, &token) in sentence.iter().enumerate() {
            token_array[row + j] = token;
            mask_array[row + j] = 1;
        }
    }

    let shape = IxDyn(&[batch, max_len]);
    (
        ArrayD::from_shape_vec(shape.clone(), token_array).expect("shape matches buffer"),
        ArrayD::from_shape_vec(shape, mask_array).expect("shape matches buffer"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        // Larger logit gets larger probability
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        // Without the max shift these would overflow to inf
        let probs = softmax(&[1000.0, 1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs[0] - probs[1]).abs() < 1e-6);
    }

    #[test]
    fn test_argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 3.5, -2.0, 3.4]), 1);
        assert_eq!(argmax(&[-5.0, -1.0]), 1);
    }

    #[test]
    fn test_argmax_tie_resolves_to_first() {
        assert_eq!(argmax(&[2.0, 2.0, 1.0]), 0);
    }

    #[test]
    fn test_pad_batch_shapes_and_masks() {
        let sentences = vec![vec![5, 6, 7], vec![8]];
        let (tokens, mask) = pad_batch(&sentences);

        assert_eq!(tokens.shape(), &[2, 3]);
        assert_eq!(mask.shape(), &[2, 3]);

        // First row fully populated
        assert_eq!(tokens[[0, 0]], 5);
        assert_eq!(tokens[[0, 2]], 7);
        assert_eq!(mask[[0, 2]], 1);

        // Second row padded with zeros and masked out
        assert_eq!(tokens[[1, 0]], 8);
        assert_eq!(tokens[[1, 1]], 0);
        assert_eq!(mask[[1, 0]], 1);
        assert_eq!(mask[[1, 1]], 0);
        assert_eq!(mask[[1, 2]], 0);
    }

    #[test]
    fn test_pad_batch_single_sentence() {
        let (tokens, mask) = pad_batch(&[vec![1, 2]]);
        assert_eq!(tokens.shape(), &[1, 2]);
        assert_eq!(mask.iter().filter(|&&m| m == 1).count(), 2);
    }
}
