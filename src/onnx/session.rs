use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use ndarray::{Array3, ArrayD};
use ort::execution_providers::{CPUExecutionProvider, ExecutionProvider};
use ort::session::Session;
use ort::value::{DynValueTypeMarker, Value as OrtValue};
use tracing::{debug, info};
use crate::onnx::{argmax, pad_batch, softmax, OnnxError};

/// Wrapper around an ONNX Runtime session for a causal decoder graph.
///
/// The graph is expected to take `input_ids` and `attention_mask` tensors of
/// shape `[batch, seq]` and produce `logits` of shape `[batch, seq, vocab]`,
/// which is what the optimum causal-LM export emits.
pub struct OnnxSession {
    session: Session,
}

impl OnnxSession {
    /// Opens the decoder graph with the CPU execution provider.
    pub fn open<P: AsRef<Path>>(model_path: P) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(Box::new(OnnxError::ModelNotFound(model_path.to_path_buf())));
        }

        let mut builder = Session::builder()
            .map_err(|e| OnnxError::SessionFailed(format!("session builder: {}", e)))?;

        let ep = CPUExecutionProvider::default();
        ep.register(&mut builder)
            .map_err(|e| OnnxError::SessionFailed(format!("register CPU provider: {}", e)))?;

        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| OnnxError::SessionFailed(format!("{}: {}", model_path.display(), e)))?;

        info!(
            "ONNX session ready: {} ({} inputs, {} outputs)",
            model_path.display(),
            session.inputs.len(),
            session.outputs.len()
        );
        for input in &session.inputs {
            debug!("  graph input: {}", input.name);
        }
        for output in &session.outputs {
            debug!("  graph output: {}", output.name);
        }

        Ok(Self { session })
    }

    /// Predicts the next token for a token sequence.
    ///
    /// Returns the argmax token of the final logits row together with its
    /// softmax probability.
    pub fn next_token(&mut self, tokens: &[i64]) -> Result<(i64, f32), Box<dyn Error + Send + Sync>> {
        let row = self.last_logits(tokens)?;
        let probs = softmax(&row);
        let index = argmax(&row);
        Ok((index as i64, probs[index]))
    }

    /// Logits row for the final position of a single token sequence.
    pub fn last_logits(&mut self, tokens: &[i64]) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
        if tokens.is_empty() {
            return Err(Box::new(OnnxError::InferenceFailed(
                "cannot predict from an empty token sequence".to_string(),
            )));
        }

        let logits = self.evaluate_batch(&[tokens.to_vec()])?;
        let last = logits.shape()[1] - 1;
        Ok(logits.index_axis(ndarray::Axis(0), 0).row(last).to_vec())
    }

    /// Runs the graph over a padded batch of token sequences.
    ///
    /// Every sequence shares one forward pass; shorter sequences are padded
    /// and masked. Returns the full `[batch, seq, vocab]` logits tensor.
    pub fn evaluate_batch(&mut self, sentences: &[Vec<i64>]) -> Result<Array3<f32>, Box<dyn Error + Send + Sync>> {
        if sentences.is_empty() || sentences.iter().any(|s| s.is_empty()) {
            return Err(Box::new(OnnxError::InferenceFailed(
                "batch must contain at least one non-empty token sequence".to_string(),
            )));
        }

        let (input_ids, attention_mask) = pad_batch(sentences);
        self.run_graph(input_ids, attention_mask)
    }

    fn run_graph(
        &mut self,
        input_ids: ArrayD<i64>,
        attention_mask: ArrayD<i64>,
    ) -> Result<Array3<f32>, Box<dyn Error + Send + Sync>> {
        let mut inputs: HashMap<String, OrtValue<DynValueTypeMarker>> = HashMap::new();
        inputs.insert(
            "input_ids".to_string(),
            OrtValue::from_array(input_ids)
                .map_err(|e| OnnxError::InferenceFailed(format!("bind input_ids: {}", e)))?
                .into_dyn(),
        );
        inputs.insert(
            "attention_mask".to_string(),
            OrtValue::from_array(attention_mask)
                .map_err(|e| OnnxError::InferenceFailed(format!("bind attention_mask: {}", e)))?
                .into_dyn(),
        );

        let outputs = self.session
            .run(inputs)
            .map_err(|e| OnnxError::InferenceFailed(e.to_string()))?;

        let logits = outputs
            .get("logits")
            .ok_or_else(|| OnnxError::UnexpectedOutput("graph has no 'logits' output".to_string()))?;

        let (shape, data) = logits
            .try_extract_tensor::<f32>()
            .map_err(|e| OnnxError::UnexpectedOutput(format!("extract logits: {}", e)))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        if dims.len() != 3 {
            return Err(Box::new(OnnxError::UnexpectedOutput(format!(
                "expected [batch, seq, vocab] logits, got shape {:?}",
                dims
            ))));
        }

        let logits = Array3::from_shape_vec((dims[0], dims[1], dims[2]), data.to_vec())
            .map_err(|e| OnnxError::UnexpectedOutput(format!("reshape logits: {}", e)))?;

        Ok(logits)
    }
}
