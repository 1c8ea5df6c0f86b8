//! # Model Module
//!
//! Handles converted model folders on disk. A model folder is the output of
//! an export run: it contains the decoder graph (`decoder_model.onnx` or
//! `model.onnx`), the tokenizer definition (`tokenizer.json`) and the model
//! configuration (`config.json`). This module resolves and validates those
//! files and maintains a registry of every model folder found in the models
//! directory.

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc, serde::ts_seconds};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod registry;
pub use registry::ModelRegistry;

/// Errors raised while resolving or reading a model folder
#[derive(Debug)]
pub enum ModelError {
    /// The model folder itself does not exist
    NotFound(PathBuf),
    /// A required file inside the folder is missing
    MissingFile(PathBuf),
    /// config.json exists but could not be parsed
    InvalidConfig(String),
    /// Wraps std::io::Error for file operations
    IoError(std::io::Error),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::NotFound(path) => write!(f, "Model folder not found: {}", path.display()),
            ModelError::MissingFile(path) => write!(f, "Required model file not found: {}", path.display()),
            ModelError::InvalidConfig(msg) => write!(f, "Invalid config.json: {}", msg),
            ModelError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(e: std::io::Error) -> Self {
        ModelError::IoError(e)
    }
}

/// Decoder graph filenames tried inside a model folder, in order.
const DECODER_FILENAMES: [&str; 2] = ["decoder_model.onnx", "model.onnx"];

/// Filename of the tokenizer definition inside a model folder.
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Model metadata read from config.json.
///
/// Only the fields the harness needs are extracted; everything else in the
/// exported configuration is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_type: Option<String>,
    pub vocab_size: Option<u64>,
    pub max_position_embeddings: Option<u64>,
    pub bos_token_id: Option<i64>,
    pub eos_token_id: Option<i64>,
    pub pad_token_id: Option<i64>,
}

impl ModelConfig {
    /// Extracts the relevant fields from a parsed config.json document.
    pub fn from_json(config: &Value) -> Self {
        Self {
            model_type: config
                .get("model_type")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            vocab_size: config.get("vocab_size").and_then(|v| v.as_u64()),
            max_position_embeddings: config
                .get("max_position_embeddings")
                .and_then(|v| v.as_u64()),
            bos_token_id: config.get("bos_token_id").and_then(|v| v.as_i64()),
            eos_token_id: config.get("eos_token_id").and_then(|v| v.as_i64()),
            pad_token_id: config.get("pad_token_id").and_then(|v| v.as_i64()),
        }
    }
}

/// A validated model folder with its parsed configuration.
#[derive(Debug, Clone)]
pub struct ModelDir {
    path: PathBuf,
    decoder_path: PathBuf,
    config: ModelConfig,
}

impl ModelDir {
    /// Opens a model folder, resolving the decoder graph and reading
    /// config.json.
    ///
    /// # Errors
    /// Returns a `ModelError` naming the missing path when the folder, the
    /// decoder graph or tokenizer.json is absent, or when config.json cannot
    /// be parsed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref().to_path_buf();

        if !path.is_dir() {
            return Err(ModelError::NotFound(path));
        }

        // Resolve the decoder graph, preferring the optimum export name
        let decoder_path = DECODER_FILENAMES
            .iter()
            .map(|name| path.join(name))
            .find(|candidate| candidate.exists())
            .ok_or_else(|| ModelError::MissingFile(path.join(DECODER_FILENAMES[0])))?;

        let tokenizer_path = path.join(TOKENIZER_FILENAME);
        if !tokenizer_path.exists() {
            return Err(ModelError::MissingFile(tokenizer_path));
        }

        let config = read_model_config(&path)?;

        Ok(Self {
            path,
            decoder_path,
            config,
        })
    }

    /// Folder name of the model, used as its display name.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Path to the model folder.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path to the decoder graph file.
    pub fn decoder_path(&self) -> &Path {
        &self.decoder_path
    }

    /// Parsed config.json metadata.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

/// Reads config.json from a model folder.
///
/// config.json is optional for foreign exports; when it is absent every
/// metadata field stays unset, which just disables the EOS stop condition
/// during generation.
pub fn read_model_config(dir: &Path) -> Result<ModelConfig, ModelError> {
    let config_path = dir.join("config.json");
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        let parsed: Value = serde_json::from_str(&content)
            .map_err(|e| ModelError::InvalidConfig(e.to_string()))?;
        Ok(ModelConfig::from_json(&parsed))
    } else {
        Ok(ModelConfig::from_json(&Value::Null))
    }
}

/// Checks whether a directory looks like a converted model folder.
pub fn is_model_dir(path: &Path) -> bool {
    path.is_dir()
        && path.join(TOKENIZER_FILENAME).exists()
        && DECODER_FILENAMES.iter().any(|name| path.join(name).exists())
}

/// Represents a model entry in the registry file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Display number, assigned newest first after each registry load
    pub number: Option<usize>,
    /// Folder name of the model
    pub name: String,
    /// Architecture from config.json (model_type), if present
    pub architecture: String,
    /// Vocabulary size from config.json, if present
    pub vocab_size: Option<u64>,
    /// Date the model was first seen by the registry
    #[serde(with = "ts_seconds")]
    pub added_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_model_dir(name: &str, decoder: &str, config: Option<&str>) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("onnxgen-model-tests")
            .join(format!("{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(decoder), b"onnx").unwrap();
        fs::write(dir.join(TOKENIZER_FILENAME), b"{}").unwrap();
        if let Some(config) = config {
            fs::write(dir.join("config.json"), config).unwrap();
        }
        dir
    }

    #[test]
    fn test_open_missing_folder() {
        let result = ModelDir::open(std::env::temp_dir().join("onnxgen-does-not-exist"));
        assert!(matches!(result, Err(ModelError::NotFound(_))));
    }

    #[test]
    fn test_open_resolves_decoder_and_config() {
        let config = r#"{
            "model_type": "gpt_neox",
            "vocab_size": 32000,
            "max_position_embeddings": 2048,
            "bos_token_id": 2,
            "eos_token_id": 3
        }"#;
        let dir = temp_model_dir("resolve", "decoder_model.onnx", Some(config));

        let model = ModelDir::open(&dir).unwrap();
        assert!(model.decoder_path().ends_with("decoder_model.onnx"));
        assert_eq!(model.config().model_type.as_deref(), Some("gpt_neox"));
        assert_eq!(model.config().vocab_size, Some(32000));
        assert_eq!(model.config().eos_token_id, Some(3));
        assert_eq!(model.config().pad_token_id, None);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_open_falls_back_to_model_onnx() {
        let dir = temp_model_dir("fallback", "model.onnx", None);

        let model = ModelDir::open(&dir).unwrap();
        assert!(model.decoder_path().ends_with("model.onnx"));
        // No config.json: all metadata fields stay unset
        assert!(model.config().eos_token_id.is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_tokenizer_is_reported() {
        let dir = temp_model_dir("notok", "decoder_model.onnx", None);
        fs::remove_file(dir.join(TOKENIZER_FILENAME)).unwrap();

        let result = ModelDir::open(&dir);
        match result {
            Err(ModelError::MissingFile(path)) => {
                assert!(path.ends_with(TOKENIZER_FILENAME));
            }
            other => panic!("expected MissingFile, got {:?}", other),
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_is_model_dir() {
        let dir = temp_model_dir("check", "decoder_model.onnx", None);
        assert!(is_model_dir(&dir));
        assert!(!is_model_dir(&dir.join("nothing-here")));

        let _ = fs::remove_dir_all(&dir);
    }
}
