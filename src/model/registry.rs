use std::error::Error;
use std::fs;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, error};
use serde_json::Value;
use crate::model::{is_model_dir, ModelConfig, ModelEntry};

/// Manages the model registry, including scanning for model folders and
/// loading registry data.
pub struct ModelRegistry {
    /// Directory where model folders are stored
    pub models_dir: PathBuf,
    /// Registry of all known models and their metadata
    registry: HashMap<String, ModelEntry>,
}

impl ModelRegistry {
    /// Creates a new model registry for the specified models directory.
    pub fn new(models_dir: PathBuf) -> Self {
        Self {
            models_dir,
            registry: HashMap::new(),
        }
    }

    /// Loads or creates the model registry file.
    ///
    /// The registry is a JSON file that tracks all known model folders and
    /// their metadata.
    pub fn load_or_create_registry(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let registry_path = self.models_dir.join("model_registry.json");

        if registry_path.exists() {
            let content = fs::read_to_string(&registry_path)?;
            self.registry = serde_json::from_str(&content)?;
        }

        self.assign_numbers();
        Ok(())
    }

    /// Assigns display numbers based on added_date (newest first).
    fn assign_numbers(&mut self) {
        let mut models: Vec<(String, ModelEntry)> = self.registry.iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        // Sort by added_date in descending order (newest first)
        models.sort_by(|a, b| b.1.added_date.cmp(&a.1.added_date));

        for (i, (name, model_entry)) in models.into_iter().enumerate() {
            let mut updated_model = model_entry;
            updated_model.number = Some(i + 1);
            self.registry.insert(name, updated_model);
        }
    }

    /// Scans the models directory for new model folders and updates the
    /// registry file.
    pub fn scan_models(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.load_or_create_registry()?;

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{prefix:.bold.dim} {spinner} {wide_msg}")
                .unwrap()
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message("Checking models directory...");

        if !self.models_dir.exists() {
            fs::create_dir_all(&self.models_dir)?;
            info!("Created models directory: {}", self.models_dir.display());
        }

        // Candidate folders: subdirectories carrying a decoder graph and a
        // tokenizer definition
        let candidates: Vec<PathBuf> = fs::read_dir(&self.models_dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_model_dir(path))
            .collect();

        if candidates.is_empty() {
            pb.finish_with_message("No converted model folders found in models directory");
            return Ok(());
        }

        let mut added = 0;
        for path in candidates {
            let name = match path.file_name().map(|n| n.to_string_lossy().to_string()) {
                Some(name) => name,
                None => continue,
            };

            if self.registry.contains_key(&name) {
                continue;
            }

            pb.set_message(format!("Registering model: {}", name));

            // config.json supplies the display metadata when present
            let config = match fs::read_to_string(path.join("config.json")) {
                Ok(content) => match serde_json::from_str::<Value>(&content) {
                    Ok(parsed) => ModelConfig::from_json(&parsed),
                    Err(e) => {
                        error!("Skipping unreadable config.json in {}: {}", path.display(), e);
                        ModelConfig::from_json(&Value::Null)
                    }
                },
                Err(_) => ModelConfig::from_json(&Value::Null),
            };

            self.registry.insert(name.clone(), ModelEntry {
                number: None,
                name,
                architecture: config.model_type.unwrap_or_else(|| "unknown".to_string()),
                vocab_size: config.vocab_size,
                added_date: Utc::now(),
            });
            added += 1;
        }

        self.assign_numbers();
        self.save_registry()?;

        pb.finish_with_message(format!("Registered {} new model(s)", added));
        info!("Model scan complete: {} model(s) in registry", self.registry.len());
        Ok(())
    }

    /// Persists the registry to model_registry.json.
    fn save_registry(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let registry_path = self.models_dir.join("model_registry.json");
        let content = serde_json::to_string_pretty(&self.registry)?;
        fs::write(&registry_path, content)?;
        Ok(())
    }

    /// Returns all registry entries ordered by display number.
    pub fn list_models(&self) -> Vec<ModelEntry> {
        let mut models: Vec<ModelEntry> = self.registry.values().cloned().collect();
        models.sort_by_key(|m| m.number.unwrap_or(usize::MAX));
        models
    }

}
