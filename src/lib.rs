//! # onnxgen
//!
//! Verification harness for causal language models exported to ONNX. Loads a
//! converted model folder (decoder graph + tokenizer.json + config.json),
//! composes a text-generation pipeline over ONNX Runtime, and checks the
//! export by generating from known prompts and reranking near-duplicate
//! sentences.

pub mod cli;
pub mod config;
pub mod display;
pub mod model;
pub mod onnx;
pub mod pipeline;
pub mod rerank;
pub mod tokenizer;
pub mod verify;
