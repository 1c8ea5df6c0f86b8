use std::error::Error;
use std::path::Path;
use clap::Parser;
use tracing::info;

use onnxgen::cli::{Cli, Command};
use onnxgen::config::Settings;
use onnxgen::display;
use onnxgen::model::{ModelDir, ModelRegistry};
use onnxgen::tokenizer::ModelTokenizer;
use onnxgen::pipeline::{GenerationOptions, GenerationPipeline};
use onnxgen::verify;

/// Main entry point for the onnxgen harness
///
/// Loads settings, initializes logging and dispatches the selected command.
/// Without a subcommand the built-in smoke suites are run against the
/// configured default model.
///
/// # Errors
/// Returns an error if configuration loading fails, the model folder is
/// invalid, or the selected operation fails.
fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    // Load settings first
    let settings = Settings::new()?;

    // Initialize the subscriber first, before any file operations
    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        // Use log file path from settings, or default to "logs"
        settings.logging.file.as_deref().unwrap_or_else(|| Path::new("logs")),
        "onnxgen",
    );

    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        // Disable ANSI colors for cleaner log files
        .with_ansi(false)
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_max_level(parse_level(&settings.logging.level))
        .init();

    info!("onnxgen starting up");

    // Models directory location
    let models_path = std::fs::canonicalize(&settings.models.directory)?;
    info!("Models directory: {}", models_path.display());

    // The registry listing works without loading any model
    if let Some(Command::Models) = &cli.command {
        let mut registry = ModelRegistry::new(models_path);
        registry.scan_models()?;
        display::display_models_table(&registry.list_models());
        return Ok(());
    }

    let model_name = cli.model.as_deref().unwrap_or(&settings.models.default);

    // Tokenization needs only tokenizer.json, not the decoder graph
    if let Some(Command::Tokenize { text }) = &cli.command {
        let tokenizer = ModelTokenizer::open(models_path.join(model_name))?;
        let tokens = tokenizer.encode(text)?;
        let decoded = tokenizer.decode(&tokens)?;
        display::display_tokens(text, &tokens, &decoded);
        return Ok(());
    }

    // Every remaining command needs the full model folder
    let model = ModelDir::open(models_path.join(model_name))?;
    info!("Using model: {}", model.name());

    match cli.command {
        None | Some(Command::Verify) => {
            let options = GenerationOptions::from_config(&settings.generation);
            let mut pipeline = GenerationPipeline::load(&model, options)?;
            verify::run(&mut pipeline)?;
        }
        Some(Command::Generate { prompts, max_new_tokens }) => {
            let mut options = GenerationOptions::from_config(&settings.generation);
            if let Some(max_new_tokens) = max_new_tokens {
                options.max_new_tokens = max_new_tokens;
            }
            let mut pipeline = GenerationPipeline::load(&model, options)?;

            // Fall back to the smoke prompts when none are given
            let prompts = if prompts.is_empty() {
                verify::GENERATION_PROMPTS.iter().map(|p| p.to_string()).collect()
            } else {
                prompts
            };

            for prompt in prompts {
                let result = pipeline.generate(&prompt)?;
                display::display_generation(&result);
            }
        }
        Some(Command::Rerank { sentences }) => {
            let options = GenerationOptions::from_config(&settings.generation);
            let mut pipeline = GenerationPipeline::load(&model, options)?;
            let scores = pipeline.rerank(&sentences)?;
            display::display_rerank_table(&scores);
        }
        // Both handled before the full model folder was opened
        Some(Command::Tokenize { .. }) | Some(Command::Models) => {}
    }

    Ok(())
}

/// Maps the configured level string onto a tracing level.
fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}
