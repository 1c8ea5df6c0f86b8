//! # CLI Module
//!
//! Command-line definitions for the harness.

use clap::{Parser, Subcommand};

/// Verification harness for ONNX-exported causal language models
#[derive(Debug, Parser)]
#[command(name = "onnxgen", version, about)]
pub struct Cli {
    /// Model folder name, overriding the configured default
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the built-in generation and rerank smoke suites (the default)
    Verify,

    /// Generate continuations for the given prompts
    Generate {
        /// Prompts to complete; the smoke prompts are used when omitted
        prompts: Vec<String>,

        /// Override the configured token budget
        #[arg(long)]
        max_new_tokens: Option<usize>,
    },

    /// Score near-duplicate sentences by model probability
    Rerank {
        /// Sentences to compare
        #[arg(required = true, num_args = 2..)]
        sentences: Vec<String>,
    },

    /// Encode a text and print the token ids and decoded round trip
    Tokenize {
        /// Text to encode
        text: String,
    },

    /// Scan the models directory and list the registry
    Models,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults() {
        let cli = Cli::parse_from(["onnxgen"]);
        assert!(cli.command.is_none());
        assert!(cli.model.is_none());
    }

    #[test]
    fn test_generate_with_prompts() {
        let cli = Cli::parse_from(["onnxgen", "generate", "昔々あるところに", "--max-new-tokens", "5"]);
        match cli.command {
            Some(Command::Generate { prompts, max_new_tokens }) => {
                assert_eq!(prompts.len(), 1);
                assert_eq!(max_new_tokens, Some(5));
            }
            other => panic!("expected generate, got {:?}", other),
        }
    }

    #[test]
    fn test_rerank_requires_two_sentences() {
        let result = Cli::try_parse_from(["onnxgen", "rerank", "only-one"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_model_override_is_global() {
        let cli = Cli::parse_from(["onnxgen", "verify", "--model", "rinna-neox-3.6b"]);
        assert_eq!(cli.model.as_deref(), Some("rinna-neox-3.6b"));
    }
}
