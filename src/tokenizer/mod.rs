//! # Tokenizer Module
//!
//! Wraps the Hugging Face `tokenizers` runtime for the converted model's
//! `tokenizer.json`. Token ids are widened to `i64` because that is what the
//! decoder graph consumes, and special-token ids come from the model's
//! `config.json` rather than the tokenizer file.

use std::error::Error;
use std::fmt;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::debug;
use crate::model::{read_model_config, ModelDir, ModelError, TOKENIZER_FILENAME};

/// Errors raised by tokenizer loading and use
#[derive(Debug)]
pub enum TokenizerError {
    /// tokenizer.json could not be read or parsed
    LoadFailed(String),
    /// Encoding a text failed
    EncodeFailed(String),
    /// Decoding a token sequence failed
    DecodeFailed(String),
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenizerError::LoadFailed(msg) => write!(f, "Failed to load tokenizer: {}", msg),
            TokenizerError::EncodeFailed(msg) => write!(f, "Failed to encode text: {}", msg),
            TokenizerError::DecodeFailed(msg) => write!(f, "Failed to decode tokens: {}", msg),
        }
    }
}

impl Error for TokenizerError {}

/// Tokenizer for a converted model folder.
pub struct ModelTokenizer {
    inner: Tokenizer,
    bos_id: Option<i64>,
    eos_id: Option<i64>,
}

impl ModelTokenizer {
    /// Loads tokenizer.json from a validated model folder.
    pub fn load(model: &ModelDir) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Self::open(model.path())
    }

    /// Loads tokenizer.json directly from a folder path.
    ///
    /// Unlike `ModelDir::open` this does not require a decoder graph, so
    /// tokenization works on folders where only the tokenizer files were
    /// exported.
    pub fn open<P: AsRef<Path>>(model_path: P) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let model_path = model_path.as_ref();
        let tokenizer_path = model_path.join(TOKENIZER_FILENAME);
        if !tokenizer_path.exists() {
            return Err(Box::new(ModelError::MissingFile(tokenizer_path)));
        }

        let inner = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| TokenizerError::LoadFailed(format!("{}: {}", tokenizer_path.display(), e)))?;

        debug!("Loaded tokenizer from {}", tokenizer_path.display());

        let config = read_model_config(model_path)?;
        Ok(Self {
            inner,
            bos_id: config.bos_token_id,
            eos_id: config.eos_token_id,
        })
    }

    /// Encodes text into decoder token ids.
    ///
    /// No special tokens are added; the decoder graphs this harness targets
    /// were exported without them in the prompt.
    pub fn encode(&self, text: &str) -> Result<Vec<i64>, Box<dyn Error + Send + Sync>> {
        let encoding = self.inner
            .encode(text, false)
            .map_err(|e| TokenizerError::EncodeFailed(e.to_string()))?;

        Ok(encoding.get_ids().iter().map(|&id| id as i64).collect())
    }

    /// Decodes token ids back into text, skipping special tokens.
    pub fn decode(&self, ids: &[i64]) -> Result<String, Box<dyn Error + Send + Sync>> {
        let ids: Vec<u32> = ids.iter().map(|&id| id as u32).collect();
        let text = self.inner
            .decode(&ids, true)
            .map_err(|e| TokenizerError::DecodeFailed(e.to_string()))?;

        Ok(text)
    }

    /// Beginning-of-sequence token id, if the model declares one.
    pub fn bos_id(&self) -> Option<i64> {
        self.bos_id
    }

    /// End-of-sequence token id, if the model declares one.
    pub fn eos_id(&self) -> Option<i64> {
        self.eos_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    // Whole-word vocabulary, no pre-tokenizer: each input string maps to a
    // single id if it is in the vocab.
    const MINIMAL_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": null,
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"hello": 0, "world": 1, "[UNK]": 2},
            "unk_token": "[UNK]"
        }
    }"#;

    fn temp_tokenizer_dir(name: &str, config: Option<&str>) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("onnxgen-tokenizer-tests")
            .join(format!("{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(TOKENIZER_FILENAME), MINIMAL_TOKENIZER).unwrap();
        if let Some(config) = config {
            fs::write(dir.join("config.json"), config).unwrap();
        }
        dir
    }

    #[test]
    fn test_open_works_without_decoder_graph() {
        // The folder holds no .onnx file at all
        let dir = temp_tokenizer_dir("nodecoder", Some(r#"{"eos_token_id": 3}"#));

        let tokenizer = ModelTokenizer::open(&dir).unwrap();
        assert_eq!(tokenizer.eos_id(), Some(3));

        let tokens = tokenizer.encode("hello").unwrap();
        assert_eq!(tokens, vec![0]);
        assert_eq!(tokenizer.decode(&tokens).unwrap(), "hello");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_open_reports_missing_tokenizer_file() {
        let dir = temp_tokenizer_dir("notok", None);
        fs::remove_file(dir.join(TOKENIZER_FILENAME)).unwrap();

        let result = ModelTokenizer::open(&dir);
        assert!(result.is_err());

        let _ = fs::remove_dir_all(&dir);
    }
}
