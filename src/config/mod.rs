// Required external crates for configuration management and serialization
use serde::Deserialize;
use std::path::PathBuf;
use config::{Config, ConfigError, Environment, File};

/// Configuration for locating converted model folders
#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    /// Directory where converted model folders are stored
    pub directory: PathBuf,
    /// Name of the model folder to use when none is given on the command line
    pub default: String,
}

/// Configuration for text generation
#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Maximum number of tokens to append to the prompt
    pub max_new_tokens: usize,
    /// Controls randomness when sampling (0.0-1.0)
    pub temperature: f32,
    /// Nucleus sampling cutoff (0.0-1.0)
    pub top_p: f32,
    /// When false the next token is always the argmax of the logits
    pub do_sample: bool,
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Optional log file path
    pub file: Option<PathBuf>,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Model location settings
    pub models: ModelsConfig,
    /// Generation settings
    pub generation: GenerationConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Implementation for loading and parsing configuration
impl Settings {
    /// Creates a new Settings instance by loading config from multiple sources
    /// in the following order of precedence (highest to lowest):
    /// 1. Environment variables prefixed with ONNXGEN_
    /// 2. Local config file (local.toml) if present
    /// 3. Default config file (default.toml)
    pub fn new() -> Result<Self, ConfigError> {
        // Check if current directory exists
        let config_dir = std::env::current_dir()
            .map_err(|e| ConfigError::Message(
                format!("Failed to get current directory: {}", e)
            ))?
            .join("config");

        // Check if config directory exists
        if !config_dir.exists() {
            return Err(ConfigError::Message(
                format!("Config directory not found at: {}", config_dir.display())
            ));
        }

        // Check if default.toml exists
        let default_config = config_dir.join("default.toml");
        if !default_config.exists() {
            return Err(ConfigError::Message(
                format!("Default configuration file not found at: {}", default_config.display())
            ));
        }

        // Create the local config path
        let local_config = config_dir.join("local.toml");

        // Convert paths to strings and keep them alive
        let default_config_path = default_config.to_string_lossy();
        let local_config_path = local_config.to_string_lossy();

        // Load and validate configuration
        let settings = Config::builder()
            .add_source(File::with_name(&default_config_path))
            .add_source(File::with_name(&local_config_path).required(false))
            .add_source(Environment::with_prefix("ONNXGEN").separator("_"))
            .build()?
            .try_deserialize::<Settings>()?;

        // Validate settings after loading
        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        // Create models directory if it doesn't exist
        if !self.models.directory.exists() {
            std::fs::create_dir_all(&self.models.directory).map_err(|e| {
                ConfigError::Message(format!(
                    "Failed to create models directory at {}: {}",
                    self.models.directory.display(), e
                ))
            })?;
        }

        // The default model name is used whenever --model is not given
        if self.models.default.trim().is_empty() {
            return Err(ConfigError::Message(
                "models.default must not be empty".to_string()
            ));
        }

        // Validate temperature range
        if !(0.0..=1.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Message(
                format!("Temperature must be between 0.0 and 1.0, got: {}", self.generation.temperature)
            ));
        }

        // Validate top_p range
        if !(0.0..=1.0).contains(&self.generation.top_p) {
            return Err(ConfigError::Message(
                format!("top_p must be between 0.0 and 1.0, got: {}", self.generation.top_p)
            ));
        }

        // Validate max_new_tokens
        if self.generation.max_new_tokens == 0 {
            return Err(ConfigError::Message(
                "max_new_tokens must be greater than 0".to_string()
            ));
        }

        // Validate logging level
        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(
                format!("Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                    self.logging.level)
            )),
        }?;

        // Create log file directory if configured and doesn't exist
        if let Some(log_file) = &self.logging.file {
            if let Some(parent) = log_file.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ConfigError::Message(format!(
                            "Failed to create log directory at {}: {}",
                            parent.display(), e
                        ))
                    })?;
                }
            }
        }

        Ok(())
    }
}
